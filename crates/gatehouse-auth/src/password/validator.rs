//! Password policy enforcement for new passwords.

use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

/// Validates new passwords against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    min_length: usize,
    require_strong: bool,
}

impl PasswordValidator {
    /// Creates a new validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
            require_strong: config.require_strong_passwords,
        }
    }

    /// Check `password` against the policy, reporting the first violation.
    pub fn validate(&self, password: &str) -> AppResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if self.require_strong {
            let estimate = zxcvbn::zxcvbn(password, &[]);
            if estimate.score() < zxcvbn::Score::Three {
                return Err(AppError::validation(
                    "Password is too weak. Please use a stronger password with more entropy.",
                ));
            }
        }

        Ok(())
    }

    /// Reject a change that keeps the current password.
    pub fn validate_not_same(&self, old_password: &str, new_password: &str) -> AppResult<()> {
        if old_password == new_password {
            return Err(AppError::validation(
                "New password must be different from the current password",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::ErrorKind;

    use super::*;

    #[test]
    fn test_min_length_counts_characters() {
        let validator = PasswordValidator::new(&AuthConfig::default());
        assert!(validator.validate("abcdef").is_ok());
        assert_eq!(
            validator.validate("abcde").unwrap_err().kind,
            ErrorKind::Validation
        );
        // Six characters, twelve bytes.
        assert!(validator.validate("ääääää").is_ok());
    }

    #[test]
    fn test_strength_check_is_opt_in() {
        let config = AuthConfig {
            require_strong_passwords: true,
            ..AuthConfig::default()
        };
        let validator = PasswordValidator::new(&config);
        assert!(validator.validate("password").is_err());
        assert!(validator.validate("v9#Qm2!xLr@8Tz").is_ok());
    }

    #[test]
    fn test_same_password_rejected() {
        let validator = PasswordValidator::new(&AuthConfig::default());
        assert!(validator.validate_not_same("secret1", "secret1").is_err());
        assert!(validator.validate_not_same("secret1", "secret2").is_ok());
    }
}
