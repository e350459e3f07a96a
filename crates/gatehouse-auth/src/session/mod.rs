//! Login sessions: creation, refresh, termination, and the purge sweep.

pub mod cleanup;
pub mod manager;

pub use cleanup::SessionCleanup;
pub use manager::{ClientMeta, LoginResult, RefreshResult, SessionManager};
