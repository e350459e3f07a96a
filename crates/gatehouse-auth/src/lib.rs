//! # gatehouse-auth
//!
//! Authentication and authorization building blocks for Gatehouse.
//!
//! ## Modules
//!
//! - `jwt` issues and verifies access, refresh, and invitation tokens
//! - `password` hashes with Argon2id and enforces the password policy
//! - `session` runs login, refresh, logout, and the expired-session sweep
//! - `rbac` resolves permissions and gates operations on them

pub mod jwt;
pub mod password;
pub mod principal;
pub mod rbac;
pub mod session;

pub use jwt::{InvitationClaims, JwtDecoder, JwtEncoder, SessionClaims, TokenKind, TokenService};
pub use password::{PasswordHasher, PasswordValidator};
pub use principal::AuthenticatedPrincipal;
pub use rbac::AuthorizationGate;
pub use session::{ClientMeta, LoginResult, SessionCleanup, SessionManager};
