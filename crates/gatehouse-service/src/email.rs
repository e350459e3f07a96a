//! Email address normalization.

use validator::ValidateEmail;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

/// Trim and lowercase `raw`, then check it is a syntactically valid address.
pub fn normalize(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AppError::validation(format!("Invalid email address: {raw}")));
    }
    Ok(email)
}
