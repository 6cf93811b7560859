// src/autosave.rs
//! Autosave Coordinator: debounces a stream of in-memory edits into a bounded
//! number of persisted snapshots and publishes save status to the UI.
//!
//! Single-writer model: at most one debounce timer is pending at a time, a new
//! edit supersedes the previous timer outright, and a manual save flushes it.
//! In-flight persistence calls are never cancelled.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::storage::ResumeStore;
use crate::types::resume::{Resume, ResumeVersion};
use crate::versioning::VersionHistory;

/// Tri-state-plus-idle status signal consumed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

/// Outcome of one save attempt. Failures carry the reason so callers decide
/// how loudly to surface them; the status channel already reflects them.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(ResumeVersion),
    Unchanged,
    /// A newer edit or manual save superseded this timer before it could
    /// write; the stale content was dropped.
    Superseded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    /// Quiet period between the last edit and the persisted autosave.
    pub debounce: Duration,
    /// How long `Saved`/`Error` stays visible before reverting to `Idle`.
    pub status_revert: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2500),
            status_revert: Duration::from_millis(2000),
        }
    }
}

struct CoordinatorState {
    pending: Option<JoinHandle<()>>,
    /// Serialized form of the last successfully persisted resume; the
    /// change-detection comparison key.
    last_saved: Option<String>,
    /// Bumped on every status publish so a delayed revert never stomps a
    /// status published after it was scheduled.
    status_generation: u64,
    /// Bumped whenever a newer save supersedes a scheduled one. A timer
    /// carries the value current at schedule time; once the counter has
    /// moved on, the timer's write is dropped even if its sleep already
    /// returned and the abort came too late.
    save_generation: u64,
}

struct Inner {
    store: ResumeStore,
    history: VersionHistory,
    config: AutosaveConfig,
    state: Mutex<CoordinatorState>,
    /// Serializes save attempts: a timer firing while another save is in
    /// flight waits for it instead of interleaving list writes.
    save_lock: Mutex<()>,
    status_tx: watch::Sender<SaveStatus>,
}

#[derive(Clone)]
pub struct AutosaveCoordinator {
    inner: Arc<Inner>,
}

impl AutosaveCoordinator {
    pub fn new(store: ResumeStore, history: VersionHistory, config: AutosaveConfig) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                store,
                history,
                config,
                state: Mutex::new(CoordinatorState {
                    pending: None,
                    last_saved: None,
                    status_generation: 0,
                    save_generation: 0,
                }),
                save_lock: Mutex::new(()),
                status_tx,
            }),
        }
    }

    pub fn status(&self) -> SaveStatus {
        *self.inner.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Schedule a debounced autosave of `resume`.
    ///
    /// No-op when the content is identical to the last persisted snapshot
    /// (no timer, no status transition). Otherwise any pending timer is
    /// superseded; only the latest scheduled state gets persisted. Returns
    /// whether a timer was (re)scheduled.
    pub async fn schedule_auto_save(&self, resume: &Resume) -> Result<bool> {
        let key = snapshot_key(resume)?;
        let mut state = self.inner.state.lock().await;

        if state.last_saved.as_deref() == Some(key.as_str()) {
            debug!("Autosave skipped: content unchanged for {}", resume.id);
            return Ok(false);
        }

        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        state.save_generation += 1;
        let generation = state.save_generation;

        let inner = Arc::clone(&self.inner);
        let resume = resume.clone();
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            // Detach the write so a later reschedule cannot cancel it
            // mid-flight; only the quiet period itself is cancellable. The
            // generation check drops the write if it was superseded anyway.
            let key = match snapshot_key(&resume) {
                Ok(key) => key,
                Err(e) => {
                    error!("Autosave serialization failed: {:#}", e);
                    return;
                }
            };
            tokio::spawn(async move {
                save(&inner, resume, key, true, Some(generation)).await;
            });
        }));

        Ok(true)
    }

    /// Flush any pending timer and persist `resume` immediately as a manual
    /// save. The save itself still awaits the storage layer.
    pub async fn manual_save(&self, resume: &Resume) -> Result<SaveOutcome> {
        let key = snapshot_key(resume)?;
        {
            let mut state = self.inner.state.lock().await;
            if let Some(pending) = state.pending.take() {
                pending.abort();
            }
            // Invalidate any timer that already fired but has not written.
            state.save_generation += 1;
        }
        Ok(save(&self.inner, resume.clone(), key, false, None).await)
    }
}

async fn save(
    inner: &Arc<Inner>,
    resume: Resume,
    key: String,
    is_auto_save: bool,
    generation: Option<u64>,
) -> SaveOutcome {
    let _guard = inner.save_lock.lock().await;

    {
        let state = inner.state.lock().await;
        // A timer that lost the race to a newer edit or a manual save must
        // not persist its stale content.
        if let Some(generation) = generation {
            if state.save_generation != generation {
                debug!("Autosave dropped: superseded before writing");
                return SaveOutcome::Superseded;
            }
        }
        // A manual save may have persisted identical content while this
        // timer was sleeping.
        if state.last_saved.as_deref() == Some(key.as_str()) {
            return SaveOutcome::Unchanged;
        }
    }

    publish(inner, SaveStatus::Saving).await;

    let result = async {
        let stamped = inner.store.save_resume(&resume).await?;
        inner
            .history
            .save_version(&stamped, None, is_auto_save)
            .await
    }
    .await;

    match result {
        Ok(version) => {
            {
                let mut state = inner.state.lock().await;
                state.last_saved = Some(key);
            }
            publish_with_revert(inner, SaveStatus::Saved).await;
            SaveOutcome::Saved(version)
        }
        Err(e) => {
            error!("Save failed for resume {}: {:#}", resume.id, e);
            publish_with_revert(inner, SaveStatus::Error).await;
            SaveOutcome::Failed(format!("{:#}", e))
        }
    }
}

async fn publish(inner: &Arc<Inner>, status: SaveStatus) -> u64 {
    let mut state = inner.state.lock().await;
    state.status_generation += 1;
    inner.status_tx.send_replace(status);
    state.status_generation
}

/// Publish a terminal status and revert to `Idle` after the configured delay,
/// unless a newer status was published in the meantime.
async fn publish_with_revert(inner: &Arc<Inner>, status: SaveStatus) {
    let generation = publish(inner, status).await;
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(inner.config.status_revert).await;
        let mut state = inner.state.lock().await;
        if state.status_generation == generation {
            state.status_generation += 1;
            inner.status_tx.send_replace(SaveStatus::Idle);
        }
    });
}

fn snapshot_key(resume: &Resume) -> Result<String> {
    serde_json::to_string(resume).context("Failed to serialize resume for change detection")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::resume::UserBasicInfo;

    fn sample_resume(skills: &[&str]) -> Resume {
        let mut resume = Resume::new(
            UserBasicInfo {
                full_name: "Ken Thompson".to_string(),
                job_title: "Systems Programmer".to_string(),
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
        );
        resume.sections.skills = skills.iter().map(|s| s.to_string()).collect();
        resume
    }

    fn test_config() -> AutosaveConfig {
        AutosaveConfig {
            debounce: Duration::from_millis(40),
            status_revert: Duration::from_millis(40),
        }
    }

    async fn coordinator() -> (AutosaveCoordinator, VersionHistory, ResumeStore) {
        let store = ResumeStore::in_memory().await.unwrap();
        let history = VersionHistory::new(store.clone());
        let coordinator =
            AutosaveCoordinator::new(store.clone(), history.clone(), test_config());
        (coordinator, history, store)
    }

    async fn settle() {
        // Past debounce + write + status revert for the test config.
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    #[tokio::test]
    async fn test_rapid_edits_collapse_to_latest_snapshot() {
        let (coordinator, history, _) = coordinator().await;
        let resume = sample_resume(&["Go"]);

        assert!(coordinator.schedule_auto_save(&resume).await.unwrap());
        let edited = {
            let mut r = resume.clone();
            r.sections.skills.push("Rust".to_string());
            r
        };
        assert!(coordinator.schedule_auto_save(&edited).await.unwrap());

        settle().await;

        let versions = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].is_auto_save);
        assert_eq!(versions[0].data.sections.skills, vec!["Go", "Rust"]);
    }

    #[tokio::test]
    async fn test_unchanged_content_is_a_no_op() {
        let (coordinator, history, _) = coordinator().await;
        let resume = sample_resume(&["Go"]);

        let outcome = coordinator.manual_save(&resume).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        settle().await;
        assert_eq!(coordinator.status(), SaveStatus::Idle);

        // Same content again: no timer, no version, no status transition.
        assert!(!coordinator.schedule_auto_save(&resume).await.unwrap());
        settle().await;
        assert_eq!(coordinator.status(), SaveStatus::Idle);
        assert_eq!(history.get_versions(&resume.id).await.unwrap().len(), 1);

        let repeat = coordinator.manual_save(&resume).await.unwrap();
        assert_eq!(repeat, SaveOutcome::Unchanged);
        assert_eq!(history.get_versions(&resume.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_save_flushes_pending_timer() {
        let (coordinator, history, store) = coordinator().await;
        let scheduled = sample_resume(&["Go"]);

        assert!(coordinator.schedule_auto_save(&scheduled).await.unwrap());

        // Manual save of a newer edit while the timer is still pending.
        let mut newer = scheduled.clone();
        newer.sections.skills.push("Rust".to_string());
        let outcome = coordinator.manual_save(&newer).await.unwrap();
        let version = match outcome {
            SaveOutcome::Saved(v) => v,
            other => panic!("expected Saved, got {:?}", other),
        };
        assert!(!version.is_auto_save);

        // The superseded timer content must never appear, neither as a later
        // snapshot nor as the current resume.
        settle().await;
        let versions = history.get_versions(&scheduled.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].data.sections.skills, vec!["Go", "Rust"]);
        let current = store.current_resume().await.unwrap().unwrap();
        assert_eq!(current.sections.skills, vec!["Go", "Rust"]);
    }

    #[tokio::test]
    async fn test_fired_timer_write_is_dropped_once_superseded() {
        let (coordinator, history, store) = coordinator().await;
        let older = sample_resume(&["Go"]);

        // A timer scheduled for the older content captured this generation.
        let stale_generation = {
            let mut state = coordinator.inner.state.lock().await;
            state.save_generation += 1;
            state.save_generation
        };

        let mut newer = older.clone();
        newer.sections.skills.push("Rust".to_string());
        let outcome = coordinator.manual_save(&newer).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved(_)));

        // The timer fires after the manual save already won; its write must
        // be dropped, not persisted as stale current state.
        let key = snapshot_key(&older).unwrap();
        let outcome = save(&coordinator.inner, older.clone(), key, true, Some(stale_generation)).await;
        assert_eq!(outcome, SaveOutcome::Superseded);

        assert_eq!(history.get_versions(&older.id).await.unwrap().len(), 1);
        let current = store.current_resume().await.unwrap().unwrap();
        assert_eq!(current.sections.skills, vec!["Go", "Rust"]);
    }

    #[tokio::test]
    async fn test_status_reaches_saved_then_reverts_to_idle() {
        let (coordinator, _, _) = coordinator().await;
        let resume = sample_resume(&["Go"]);

        let outcome = coordinator.manual_save(&resume).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        assert_eq!(coordinator.status(), SaveStatus::Saved);

        settle().await;
        assert_eq!(coordinator.status(), SaveStatus::Idle);
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces_as_error_status() {
        let store = ResumeStore::in_memory().await.unwrap();
        let history = VersionHistory::new(store.clone());
        let coordinator = AutosaveCoordinator::new(store.clone(), history, test_config());

        // Kill the backing pool so every write fails.
        store.close().await;

        let resume = sample_resume(&["Go"]);
        let outcome = coordinator.manual_save(&resume).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Failed(_)));
        assert_eq!(coordinator.status(), SaveStatus::Error);

        settle().await;
        assert_eq!(coordinator.status(), SaveStatus::Idle);
    }

    #[tokio::test]
    async fn test_manual_then_autosave_end_to_end() {
        let (coordinator, history, store) = coordinator().await;

        // Manual save of the initial resume.
        let resume = sample_resume(&["Go"]);
        let outcome = coordinator.manual_save(&resume).await.unwrap();
        let first = match outcome {
            SaveOutcome::Saved(v) => v,
            other => panic!("expected Saved, got {:?}", other),
        };

        let versions = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].description.starts_with("Manual save - "));
        assert!(!versions[0].is_auto_save);

        // Edit, then let the debounce fire.
        let mut edited = resume.clone();
        edited.sections.skills.push("Rust".to_string());
        assert!(coordinator.schedule_auto_save(&edited).await.unwrap());
        settle().await;

        let versions = history.get_versions(&resume.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions[1].is_auto_save);
        assert_eq!(versions[1].data.sections.skills, vec!["Go", "Rust"]);
        let second = versions[1].clone();

        // Point-in-time restore of the first snapshot.
        let restored = history
            .restore_version(&first.id, &resume.id)
            .await
            .unwrap()
            .expect("first version should exist");
        assert_eq!(restored.sections.skills, vec!["Go"]);

        // Delete the autosaved snapshot.
        history.delete_version(&second.id, &resume.id).await.unwrap();
        assert_eq!(history.get_versions(&resume.id).await.unwrap().len(), 1);

        // The store holds the latest persisted state, not the restored one.
        let current = store.current_resume().await.unwrap().unwrap();
        assert_eq!(current.sections.skills, vec!["Go", "Rust"]);
    }
}
