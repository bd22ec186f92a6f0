
pub mod models;
pub mod queries;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::sqlite::models::{NewUploadRecord, UploadRecord, VerificationRecord};
use crate::database::sqlite::queries::{UploadLogQueries, VerificationQueries};

pub type DbPool = Pool<Sqlite>;

/// SQLite store holding the OTP verification records and the append-only
/// upload log. Injected rather than process-global so the pipelines never
/// depend on process lifetime.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub async fn initialize_from_config(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.base_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.base_dir.display()
            )
        })?;

        Self::new(config.database_path()).await
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verifications (
                email TEXT PRIMARY KEY,
                code TEXT NOT NULL,
                expires_at DATETIME NOT NULL,
                verified INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create verifications table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_email TEXT NOT NULL,
                bot_id TEXT NOT NULL,
                source_name TEXT NOT NULL,
                display_name TEXT NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create upload_log table")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    // Verification operations
    pub async fn store_verification(
        &self,
        email: &str,
        code: &str,
        expires_at: chrono::NaiveDateTime,
    ) -> Result<()> {
        VerificationQueries::upsert(&self.pool, email, code, expires_at).await
    }

    pub async fn get_verification(&self, email: &str) -> Result<Option<VerificationRecord>> {
        VerificationQueries::get(&self.pool, email).await
    }

    pub async fn mark_verified(&self, email: &str) -> Result<()> {
        VerificationQueries::mark_verified(&self.pool, email).await
    }

    pub async fn delete_verification(&self, email: &str) -> Result<()> {
        VerificationQueries::delete(&self.pool, email).await
    }

    // Upload log operations
    pub async fn append_upload(&self, record: NewUploadRecord) -> Result<UploadRecord> {
        UploadLogQueries::append(&self.pool, record).await
    }

    pub async fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
        UploadLogQueries::list_all(&self.pool).await
    }

    pub async fn count_uploads(&self) -> Result<i64> {
        UploadLogQueries::count(&self.pool).await
    }
}
