//! Token issuance and verification.

pub mod claims;
pub mod decoder;
pub mod encoder;
pub mod service;

pub use claims::{InvitationClaims, SessionClaims, SignedToken, TokenKind};
pub use decoder::JwtDecoder;
pub use encoder::JwtEncoder;
pub use service::TokenService;
