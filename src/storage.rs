// src/storage.rs
//! Resume Store: durable key-value persistence over SQLite.
//!
//! Every record is a JSON document in a `records(key, value)` table, mirroring
//! the flat layout the frontend expects: the current resume, the flat list of
//! all resumes, the onboarding profile, one version list per resume id, and
//! the AI service credential.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tracing::info;

use crate::types::resume::{Resume, UserBasicInfo};

const CURRENT_RESUME_KEY: &str = "current-resume";
const RESUME_LIST_KEY: &str = "resumes";
const USER_INFO_KEY: &str = "user-basic-info";
const API_KEY_KEY: &str = "ai-api-key";

pub fn versions_key(resume_id: &str) -> String {
    format!("versions-{}", resume_id)
}

#[derive(Debug)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub pool: Option<SqlitePool>,
}

impl StoreConfig {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            pool: None,
        }
    }

    /// Initialize the database connection pool
    pub async fn init_pool(&mut self) -> Result<()> {
        if let Some(parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", self.database_path.display());
        let pool = SqlitePool::connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;
        self.pool = Some(pool);

        info!("Database connection pool initialized: {}", database_url);
        Ok(())
    }

    pub fn pool(&self) -> Result<&SqlitePool> {
        self.pool.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Database pool not initialized. Call init_pool() first.")
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        let pool = self.pool()?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(pool)
        .await?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

/// JSON record store over the shared pool. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct ResumeStore {
    pool: SqlitePool,
}

impl ResumeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open an in-memory store with migrations applied. Test helper, but also
    /// useful for ephemeral sessions. Pinned to a single pooled connection:
    /// every `sqlite::memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;
        let store = Self::new(pool);
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(&store.pool)
        .await?;
        Ok(store)
    }

    /// Read and deserialize one record. Missing keys are `None`; a record
    /// that exists but does not parse is an error, not a silent miss.
    pub async fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT value FROM records WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read record: {}", key))?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Malformed stored record: {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize and upsert one record.
    pub async fn put_record<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize record: {}", key))?;

        sqlx::query(
            r#"
            INSERT INTO records (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write record: {}", key))?;

        Ok(())
    }

    /// Delete one record. No-op if absent.
    pub async fn delete_record(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete record: {}", key))?;
        Ok(())
    }

    /// Persist a resume as the current one and upsert it into the flat list.
    /// Stamps `last_modified`; returns the stamped copy. Both records are
    /// written in one transaction so a failure cannot leave the current
    /// resume updated while the list stays stale.
    pub async fn save_resume(&self, resume: &Resume) -> Result<Resume> {
        let mut updated = resume.clone();
        updated.last_modified = Utc::now();

        let mut all = self.list_resumes().await?;
        match all.iter_mut().find(|r| r.id == updated.id) {
            Some(existing) => *existing = updated.clone(),
            None => all.push(updated.clone()),
        }

        let current_raw = serde_json::to_string(&updated)
            .with_context(|| format!("Failed to serialize record: {}", CURRENT_RESUME_KEY))?;
        let list_raw = serde_json::to_string(&all)
            .with_context(|| format!("Failed to serialize record: {}", RESUME_LIST_KEY))?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin resume save transaction")?;

        for (key, raw) in [(CURRENT_RESUME_KEY, current_raw), (RESUME_LIST_KEY, list_raw)] {
            sqlx::query(
                r#"
                INSERT INTO records (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(key)
            .bind(raw)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write record: {}", key))?;
        }

        tx.commit()
            .await
            .context("Failed to commit resume save transaction")?;

        Ok(updated)
    }

    pub async fn current_resume(&self) -> Result<Option<Resume>> {
        self.get_record(CURRENT_RESUME_KEY).await
    }

    pub async fn clear_current_resume(&self) -> Result<()> {
        self.delete_record(CURRENT_RESUME_KEY).await
    }

    pub async fn list_resumes(&self) -> Result<Vec<Resume>> {
        Ok(self
            .get_record::<Vec<Resume>>(RESUME_LIST_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Remove a resume from the flat list, drop its version record, and clear
    /// the current-resume slot when it points at the deleted id.
    pub async fn delete_resume(&self, resume_id: &str) -> Result<bool> {
        let mut all = self.list_resumes().await?;
        let before = all.len();
        all.retain(|r| r.id != resume_id);
        let removed = all.len() != before;

        if removed {
            self.put_record(RESUME_LIST_KEY, &all).await?;
            self.delete_record(&versions_key(resume_id)).await?;

            if let Some(current) = self.current_resume().await? {
                if current.id == resume_id {
                    self.clear_current_resume().await?;
                }
            }
            info!("Deleted resume: {}", resume_id);
        }

        Ok(removed)
    }

    pub async fn user_info(&self) -> Result<Option<UserBasicInfo>> {
        self.get_record(USER_INFO_KEY).await
    }

    pub async fn set_user_info(&self, info: &UserBasicInfo) -> Result<()> {
        self.put_record(USER_INFO_KEY, info).await
    }

    pub async fn api_key(&self) -> Result<Option<String>> {
        self.get_record(API_KEY_KEY).await
    }

    pub async fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.put_record(API_KEY_KEY, &api_key.to_string()).await
    }

    /// Close the backing pool; every later operation fails.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::resume::UserBasicInfo;

    fn sample_user() -> UserBasicInfo {
        UserBasicInfo {
            full_name: "Grace Hopper".to_string(),
            job_title: "Rear Admiral".to_string(),
            email: None,
            phone: None,
            location: None,
            target_role: None,
            experience: None,
            linkedin: None,
            github: None,
            portfolio: None,
        }
    }

    #[tokio::test]
    async fn test_current_resume_round_trip() {
        let store = ResumeStore::in_memory().await.unwrap();
        assert!(store.current_resume().await.unwrap().is_none());

        let resume = Resume::new(sample_user(), "en");
        let saved = store.save_resume(&resume).await.unwrap();
        assert!(saved.last_modified >= resume.last_modified);

        let loaded = store.current_resume().await.unwrap().unwrap();
        assert_eq!(loaded.id, resume.id);
        assert_eq!(loaded.created_at, resume.created_at);
        // last_modified was restamped on save and must survive the round trip.
        assert_eq!(loaded.last_modified, saved.last_modified);
    }

    #[tokio::test]
    async fn test_save_resume_upserts_into_list() {
        let store = ResumeStore::in_memory().await.unwrap();

        let mut resume = Resume::new(sample_user(), "en");
        store.save_resume(&resume).await.unwrap();
        assert_eq!(store.list_resumes().await.unwrap().len(), 1);

        resume.sections.summary = "Updated".to_string();
        store.save_resume(&resume).await.unwrap();

        let all = store.list_resumes().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].sections.summary, "Updated");

        let other = Resume::new(sample_user(), "fr");
        store.save_resume(&other).await.unwrap();
        assert_eq!(store.list_resumes().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_resume_keeps_current_and_list_consistent() {
        let store = ResumeStore::in_memory().await.unwrap();

        let resume = Resume::new(sample_user(), "en");
        let saved = store.save_resume(&resume).await.unwrap();

        // Both records come from the same stamped copy of the same write.
        let current = store.current_resume().await.unwrap().unwrap();
        let listed = &store.list_resumes().await.unwrap()[0];
        assert_eq!(current, saved);
        assert_eq!(listed, &saved);
        assert_eq!(current.last_modified, listed.last_modified);
    }

    #[tokio::test]
    async fn test_delete_resume_clears_current_and_versions() {
        let store = ResumeStore::in_memory().await.unwrap();
        let resume = Resume::new(sample_user(), "en");
        store.save_resume(&resume).await.unwrap();
        store
            .put_record(&versions_key(&resume.id), &vec!["placeholder"])
            .await
            .unwrap();

        assert!(store.delete_resume(&resume.id).await.unwrap());
        assert!(store.current_resume().await.unwrap().is_none());
        assert!(store.list_resumes().await.unwrap().is_empty());
        assert!(store
            .get_record::<Vec<String>>(&versions_key(&resume.id))
            .await
            .unwrap()
            .is_none());

        // Deleting again is a no-op.
        assert!(!store.delete_resume(&resume.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_api_key_and_user_info_records() {
        let store = ResumeStore::in_memory().await.unwrap();
        assert!(store.api_key().await.unwrap().is_none());

        store.set_api_key("sk-test").await.unwrap();
        assert_eq!(store.api_key().await.unwrap().unwrap(), "sk-test");

        let info = sample_user();
        store.set_user_info(&info).await.unwrap();
        assert_eq!(store.user_info().await.unwrap().unwrap(), info);
    }

    #[tokio::test]
    async fn test_malformed_record_is_an_error_not_a_miss() {
        let store = ResumeStore::in_memory().await.unwrap();
        store.put_record("current-resume", &"not a resume").await.unwrap();
        assert!(store.current_resume().await.is_err());
    }
}
