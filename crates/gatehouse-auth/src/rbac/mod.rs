//! Permission names and the authorization gate.

pub mod gate;
pub mod permissions;

pub use gate::AuthorizationGate;
