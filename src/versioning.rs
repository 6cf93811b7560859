// src/versioning.rs
//! Version History Engine: append-only log of resume snapshots per resume id,
//! with capped retention and point-in-time restore.
//!
//! Every operation returns `Result` so callers decide whether a persistence
//! failure is surfaced or tolerated; the engine itself never swallows errors.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::storage::{versions_key, ResumeStore};
use crate::types::resume::{Resume, ResumeVersion};

/// Retention cap per resume. Eviction is FIFO by insertion order, not by
/// timestamp comparison; the two coincide for the single-writer case.
pub const MAX_VERSIONS: usize = 50;

#[derive(Debug, Clone)]
pub struct VersionHistory {
    store: ResumeStore,
    /// Serializes every read-modify-write of a version list. Saves and
    /// deletes arrive from both the autosave timer and HTTP handlers, and an
    /// unsynchronized interleaving would drop appends.
    write_lock: Arc<Mutex<()>>,
}

impl VersionHistory {
    pub fn new(store: ResumeStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot the resume and append it to the per-resume version list.
    ///
    /// The snapshot is a structural deep copy; the live resume keeps mutating
    /// after this call without affecting the stored version. When the list
    /// exceeds the cap, the oldest-inserted entries are evicted.
    pub async fn save_version(
        &self,
        resume: &Resume,
        description: Option<&str>,
        is_auto_save: bool,
    ) -> Result<ResumeVersion> {
        let description = match description {
            Some(text) => text.to_string(),
            None if is_auto_save => format!("Auto-save - {}", Local::now().format("%H:%M:%S")),
            None => format!("Manual save - {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        };

        let version = ResumeVersion {
            id: Uuid::new_v4().to_string(),
            resume_id: resume.id.clone(),
            timestamp: Utc::now(),
            description,
            data: resume.clone(),
            is_auto_save,
        };

        let _guard = self.write_lock.lock().await;
        let mut versions = self.get_versions(&resume.id).await?;
        versions.push(version.clone());

        if versions.len() > MAX_VERSIONS {
            let excess = versions.len() - MAX_VERSIONS;
            versions.drain(..excess);
            debug!(
                "Evicted {} oldest version(s) for resume {}",
                excess, resume.id
            );
        }

        self.store
            .put_record(&versions_key(&resume.id), &versions)
            .await
            .with_context(|| format!("Failed to persist versions for resume {}", resume.id))?;

        info!(
            "Saved version {} for resume {} (auto: {})",
            version.id, resume.id, is_auto_save
        );
        Ok(version)
    }

    /// Manual save under a user-chosen name.
    pub async fn save_named_version(&self, resume: &Resume, name: &str) -> Result<ResumeVersion> {
        self.save_version(resume, Some(name), false).await
    }

    /// All stored versions for a resume, in storage (insertion) order.
    /// Callers that need recency order sort by timestamp themselves.
    pub async fn get_versions(&self, resume_id: &str) -> Result<Vec<ResumeVersion>> {
        Ok(self
            .store
            .get_record::<Vec<ResumeVersion>>(&versions_key(resume_id))
            .await?
            .unwrap_or_default())
    }

    /// Fresh copy of the snapshot embedded in a version, or `None` when the
    /// id is unknown. Does not mutate the list and does not touch the
    /// current-resume record; making the snapshot current is the caller's
    /// decision.
    pub async fn restore_version(
        &self,
        version_id: &str,
        resume_id: &str,
    ) -> Result<Option<Resume>> {
        let versions = self.get_versions(resume_id).await?;
        Ok(versions
            .into_iter()
            .find(|v| v.id == version_id)
            .map(|v| v.data))
    }

    /// Remove one version from the list. Idempotent: absent ids are a no-op.
    pub async fn delete_version(&self, version_id: &str, resume_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut versions = self.get_versions(resume_id).await?;
        let before = versions.len();
        versions.retain(|v| v.id != version_id);

        if versions.len() != before {
            self.store
                .put_record(&versions_key(resume_id), &versions)
                .await
                .with_context(|| format!("Failed to persist versions for resume {}", resume_id))?;
            info!("Deleted version {} for resume {}", version_id, resume_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::resume::UserBasicInfo;

    fn sample_resume() -> Resume {
        Resume::new(
            UserBasicInfo {
                full_name: "Linus".to_string(),
                job_title: "Kernel Developer".to_string(),
                email: None,
                phone: None,
                location: None,
                target_role: None,
                experience: None,
                linkedin: None,
                github: None,
                portfolio: None,
            },
            "en",
        )
    }

    async fn engine() -> VersionHistory {
        VersionHistory::new(ResumeStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_save_version_appends_in_order() {
        let history = engine().await;
        let mut resume = sample_resume();

        resume.sections.skills = vec!["C".to_string()];
        let first = history.save_version(&resume, None, false).await.unwrap();
        resume.sections.skills.push("Rust".to_string());
        let second = history.save_version(&resume, None, true).await.unwrap();

        let versions = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].id, first.id);
        assert_eq!(versions[1].id, second.id);
        assert!(!versions[0].is_auto_save);
        assert!(versions[1].is_auto_save);
        assert_eq!(versions[0].data.sections.skills, vec!["C"]);
        assert_eq!(versions[1].data.sections.skills, vec!["C", "Rust"]);
    }

    #[tokio::test]
    async fn test_default_descriptions() {
        let history = engine().await;
        let resume = sample_resume();

        let auto = history.save_version(&resume, None, true).await.unwrap();
        assert!(auto.description.starts_with("Auto-save - "));

        let manual = history.save_version(&resume, None, false).await.unwrap();
        assert!(manual.description.starts_with("Manual save - "));

        let named = history
            .save_named_version(&resume, "Before recruiter call")
            .await
            .unwrap();
        assert_eq!(named.description, "Before recruiter call");
        assert!(!named.is_auto_save);
    }

    #[tokio::test]
    async fn test_retention_cap_evicts_oldest_first() {
        let history = engine().await;
        let mut resume = sample_resume();

        let mut ids = Vec::new();
        for i in 0..(MAX_VERSIONS + 5) {
            resume.sections.summary = format!("revision {}", i);
            let v = history.save_version(&resume, None, true).await.unwrap();
            ids.push(v.id);
        }

        let versions = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(versions.len(), MAX_VERSIONS);
        // The five earliest-inserted snapshots are gone, the rest keep order.
        let surviving: Vec<_> = versions.iter().map(|v| v.id.clone()).collect();
        assert_eq!(surviving, ids[5..].to_vec());
        assert_eq!(versions[0].data.sections.summary, "revision 5");
    }

    #[tokio::test]
    async fn test_restore_returns_isolated_snapshot() {
        let history = engine().await;
        let mut resume = sample_resume();
        resume.sections.skills = vec!["Go".to_string()];

        let saved = history.save_version(&resume, None, false).await.unwrap();

        // The live resume keeps mutating; the snapshot must not follow.
        resume.sections.skills.push("Zig".to_string());

        let mut restored = history
            .restore_version(&saved.id, &resume.id)
            .await
            .unwrap()
            .expect("version should exist");
        assert_eq!(restored.sections.skills, vec!["Go"]);

        // Mutating the restored copy never changes the stored version.
        restored.sections.skills.clear();
        let again = history
            .restore_version(&saved.id, &resume.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.sections.skills, vec!["Go"]);
    }

    #[tokio::test]
    async fn test_restore_unknown_version_is_none() {
        let history = engine().await;
        let resume = sample_resume();
        let restored = history
            .restore_version("no-such-id", &resume.id)
            .await
            .unwrap();
        assert!(restored.is_none());
    }

    #[tokio::test]
    async fn test_delete_version_is_idempotent() {
        let history = engine().await;
        let resume = sample_resume();

        let keep = history.save_version(&resume, None, false).await.unwrap();
        let doomed = history.save_version(&resume, None, true).await.unwrap();

        history.delete_version(&doomed.id, &resume.id).await.unwrap();
        let after_first = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(after_first.len(), 1);
        assert_eq!(after_first[0].id, keep.id);

        // Second delete of the same id leaves the list unchanged.
        history.delete_version(&doomed.id, &resume.id).await.unwrap();
        let after_second = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(after_second, after_first);
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_every_version() {
        let history = engine().await;
        let resume = sample_resume();

        // Named saves from handlers race autosave-timer saves on the same
        // resume id; every append must survive the interleaving.
        let mut handles = Vec::new();
        for i in 0..10 {
            let history = history.clone();
            let mut resume = resume.clone();
            handles.push(tokio::spawn(async move {
                resume.sections.summary = format!("edit {}", i);
                history.save_version(&resume, None, i % 2 == 0).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let versions = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(versions.len(), 10);
    }

    #[tokio::test]
    async fn test_get_versions_empty_for_unknown_resume() {
        let history = engine().await;
        assert!(history.get_versions("unknown").await.unwrap().is_empty());
    }
}
