//! Argon2id password hashing and verification.
//!
//! Hashing is CPU-bound by design, so every public method runs on the
//! blocking pool and never holds a lock while it works.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use gatehouse_core::config::AuthConfig;
use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

/// Hashes and verifies passwords with configured Argon2id cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Digest of a throwaway password, verified against when the account
    /// does not exist.
    decoy: String,
}

impl PasswordHasher {
    /// Creates a hasher from auth configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AppError::configuration(format!("Invalid Argon2 parameters: {e}")))?;

        let decoy = hash_with(&params, "gatehouse-decoy-password")?;
        Ok(Self { params, decoy })
    }

    /// Hash `plaintext` with a fresh random salt, returning a PHC string.
    pub async fn hash(&self, plaintext: &str) -> AppResult<String> {
        let params = self.params.clone();
        let plaintext = plaintext.to_string();
        run_blocking(move || hash_with(&params, &plaintext)).await
    }

    /// Verify `plaintext` against a stored PHC digest in constant time.
    pub async fn verify(&self, plaintext: &str, digest: &str) -> AppResult<bool> {
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        run_blocking(move || verify_with(&plaintext, &digest)).await
    }

    /// Spend the same effort as [`Self::verify`] without a real digest.
    pub async fn verify_decoy(&self, plaintext: &str) {
        // The outcome is irrelevant; only the time spent matters.
        let _ = self.verify(plaintext, &self.decoy).await;
    }
}

fn argon2id(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_with(params: &Params, plaintext: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2id(params)
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

fn verify_with(plaintext: &str, digest: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(digest)
        .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

    // Cost parameters are read back from the digest itself.
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::internal(format!(
            "Password verification failed: {e}"
        ))),
    }
}

async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Password task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> AuthConfig {
        AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        }
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        let digest = hasher.hash("correct horse").await.unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("correct horse"));
        assert!(hasher.verify("correct horse", &digest).await.unwrap());
        assert!(!hasher.verify("wrong horse", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        let a = hasher.hash("same").await.unwrap();
        let b = hasher.hash("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_invalid_params() {
        let config = AuthConfig {
            argon2_memory_kib: 1,
            ..AuthConfig::default()
        };
        let err = PasswordHasher::new(&config).unwrap_err();
        assert_eq!(err.kind, gatehouse_core::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_garbage_digest_is_an_error() {
        let hasher = PasswordHasher::new(&fast_config()).unwrap();
        assert!(hasher.verify("pw", "not-a-phc-string").await.is_err());
    }
}
