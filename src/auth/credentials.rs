use crate::error::{AppError, AppResult};

/// One-way password digests.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Constant-time via bcrypt. A malformed digest never verifies.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        bcrypt::verify(password, digest).unwrap_or(false)
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: &str) -> AppResult<String> {
        let hasher = *self;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task panicked: {e}")))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(&self, password: &str, digest: &str) -> bool {
        let hasher = *self;
        let (password, digest) = (password.to_string(), digest.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
