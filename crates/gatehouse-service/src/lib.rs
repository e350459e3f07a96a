//! # gatehouse-service
//!
//! Business logic for Gatehouse. Each service orchestrates repositories,
//! the token and password components from `gatehouse-auth`, and the
//! notifier to implement one family of use cases. [`RbacService`] is the
//! single entry point the HTTP layer and the CLI talk to.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod email;
pub mod notify;
pub mod onboarding;
pub mod permission;
pub mod rbac;
pub mod role;
pub mod user;

pub use context::OpContext;
pub use notify::{LogNotifier, Notifier, RecordingNotifier, SmtpNotifier};
pub use onboarding::{AccountFields, InvitationStatus, OnboardingService};
pub use permission::PermissionService;
pub use rbac::RbacService;
pub use role::{NewRoleRequest, RoleService};
pub use user::UserService;
