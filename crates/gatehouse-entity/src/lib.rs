//! # gatehouse-entity
//!
//! Domain entity models for Gatehouse. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`; `New*` structs carry the fields a
//! repository needs to insert a row.

pub mod onboarding;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;

pub use onboarding::{NewOnboarding, OnboardingProcess, OnboardingStatus};
pub use permission::{NewPermission, Permission};
pub use role::{NewRole, Role, RoleWithPermissions};
pub use session::{NewSession, Session};
pub use user::{NewUser, User, UserWithRoles};
