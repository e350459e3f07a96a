//! PostgreSQL implementations of the repository traits.

pub mod assignment;
pub mod onboarding;
pub mod permission;
pub mod registrar;
pub mod role;
pub mod session;
pub mod user;

pub use assignment::{PgRoleAssignmentRepository, PgRolePermissionRepository};
pub use onboarding::PgOnboardingRepository;
pub use permission::{PgPermissionRepository, PgPermissionResolver};
pub use registrar::PgAccountRegistrar;
pub use role::PgRoleRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;

use gatehouse_core::error::{AppError, ErrorKind};

/// Wrap a sqlx error as a storage failure with context.
pub(crate) fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Storage, context, e)
}

/// Map a unique-constraint violation to `kind`; anything else is a storage failure.
pub(crate) fn on_unique(
    kind: ErrorKind,
    message: String,
    context: &'static str,
) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if is_unique_violation(&e) {
            AppError::new(kind, message)
        } else {
            AppError::with_source(ErrorKind::Storage, context, e)
        }
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_foreign_key_violation())
        .unwrap_or(false)
}

/// Convert an optional substring filter into an `ILIKE` pattern.
pub(crate) fn like_pattern(filter: Option<&str>) -> Option<String> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| format!("%{}%", f.replace('%', "\\%").replace('_', "\\_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(Some("user")), Some("%user%".to_string()));
        assert_eq!(like_pattern(Some("50%_")), Some("%50\\%\\_%".to_string()));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
