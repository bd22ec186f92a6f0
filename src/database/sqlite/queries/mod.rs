use super::models::*;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

pub struct VerificationQueries;

impl VerificationQueries {
    /// Insert or replace the verification row for an email. A fresh code
    /// always resets the verified flag.
    #[inline]
    pub async fn upsert(
        pool: &SqlitePool,
        email: &str,
        code: &str,
        expires_at: NaiveDateTime,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verifications (email, code, expires_at, verified)
            VALUES (?, ?, ?, 0)
            ON CONFLICT(email) DO UPDATE SET
                code = excluded.code,
                expires_at = excluded.expires_at,
                verified = 0
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to store verification code")?;

        Ok(())
    }

    #[inline]
    pub async fn get(pool: &SqlitePool, email: &str) -> Result<Option<VerificationRecord>> {
        let record = sqlx::query_as::<_, VerificationRecord>(
            "SELECT email, code, expires_at, verified FROM verifications WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get verification record")?;

        Ok(record)
    }

    #[inline]
    pub async fn mark_verified(pool: &SqlitePool, email: &str) -> Result<()> {
        sqlx::query("UPDATE verifications SET verified = 1 WHERE email = ?")
            .bind(email)
            .execute(pool)
            .await
            .context("Failed to mark email verified")?;

        Ok(())
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, email: &str) -> Result<()> {
        sqlx::query("DELETE FROM verifications WHERE email = ?")
            .bind(email)
            .execute(pool)
            .await
            .context("Failed to delete verification record")?;

        Ok(())
    }
}

pub struct UploadLogQueries;

impl UploadLogQueries {
    /// Append one provenance row. The log is append-only; nothing updates
    /// or deletes rows.
    #[inline]
    pub async fn append(pool: &SqlitePool, record: NewUploadRecord) -> Result<UploadRecord> {
        let now = Utc::now().naive_utc();

        let id = sqlx::query(
            r#"
            INSERT INTO upload_log (owner_email, bot_id, source_name, display_name, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.owner_email)
        .bind(&record.bot_id)
        .bind(&record.source_name)
        .bind(&record.display_name)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to append upload record")?
        .last_insert_rowid();

        Ok(UploadRecord {
            id,
            owner_email: record.owner_email,
            bot_id: record.bot_id,
            source_name: record.source_name,
            display_name: record.display_name,
            created_at: now,
        })
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<UploadRecord>> {
        let records = sqlx::query_as::<_, UploadRecord>(
            r#"
            SELECT id, owner_email, bot_id, source_name, display_name, created_at
            FROM upload_log
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to list upload records")?;

        Ok(records)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM upload_log")
            .fetch_one(pool)
            .await
            .context("Failed to count upload records")?;

        Ok(count.0)
    }
}
