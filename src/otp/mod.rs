
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::database::sqlite::Database;
use crate::{DocativeError, Result};

/// Minutes a verification code stays usable
pub const OTP_EXPIRY_MINUTES: i64 = 10;

/// Email-possession gate in front of uploads. Codes live in the injected
/// store, not process memory, so verification survives restarts and extra
/// instances.
#[derive(Debug, Clone)]
pub struct OtpGate {
    db: Database,
}

/// Generate a six-digit verification code
#[inline]
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

impl OtpGate {
    #[inline]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Issue a fresh code for the email and return it for delivery. Any
    /// previous code (and verified state) for the email is replaced.
    #[inline]
    pub async fn issue(&self, email: &str) -> Result<String> {
        let code = generate_code();
        let expires_at = Utc::now().naive_utc() + Duration::minutes(OTP_EXPIRY_MINUTES);

        self.db
            .store_verification(email, &code, expires_at)
            .await
            .map_err(|e| DocativeError::Storage(format!("failed to store code: {}", e)))?;

        debug!("Issued verification code for {}", email);
        Ok(code)
    }

    /// Check a submitted code. An expired row is cleared and fails; a
    /// matching code marks the email verified.
    #[inline]
    pub async fn verify(&self, email: &str, code: &str) -> Result<bool> {
        let Some(record) = self
            .db
            .get_verification(email)
            .await
            .map_err(|e| DocativeError::Storage(format!("failed to read code: {}", e)))?
        else {
            return Ok(false);
        };

        if record.is_expired(Utc::now().naive_utc()) {
            warn!("Verification code for {} has expired", email);
            self.db
                .delete_verification(email)
                .await
                .map_err(|e| DocativeError::Storage(format!("failed to clear code: {}", e)))?;
            return Ok(false);
        }

        if record.code != code {
            return Ok(false);
        }

        self.db
            .mark_verified(email)
            .await
            .map_err(|e| DocativeError::Storage(format!("failed to mark verified: {}", e)))?;

        debug!("Email {} verified", email);
        Ok(true)
    }

    /// Whether the email has completed verification
    #[inline]
    pub async fn is_verified(&self, email: &str) -> Result<bool> {
        let record = self
            .db
            .get_verification(email)
            .await
            .map_err(|e| DocativeError::Storage(format!("failed to read code: {}", e)))?;

        Ok(record.is_some_and(|r| r.verified))
    }
}
