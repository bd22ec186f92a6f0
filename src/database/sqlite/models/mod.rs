use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One email's OTP verification state. Rows are upserted on every code
/// issue; `verified` survives until a new code resets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VerificationRecord {
    pub email: String,
    pub code: String,
    pub expires_at: NaiveDateTime,
    pub verified: bool,
}

impl VerificationRecord {
    #[inline]
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }
}

/// A row of the append-only upload provenance log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UploadRecord {
    pub id: i64,
    pub owner_email: String,
    pub bot_id: String,
    pub source_name: String,
    pub display_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUploadRecord {
    pub owner_email: String,
    pub bot_id: String,
    pub source_name: String,
    pub display_name: String,
}
