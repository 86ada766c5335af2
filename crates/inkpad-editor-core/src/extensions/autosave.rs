//! Debounced auto-save.
//!
//! Every committed change replaces the pending snapshot and restarts the
//! idle timer; only the snapshot that survives a full idle window is
//! persisted. Dropping the [`Autosave`] abandons whatever is pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use n0_future::boxed::BoxFuture;
use n0_future::task::JoinHandle;
use tokio::sync::watch;

use crate::error::PersistError;
use crate::extension::Extension;

/// Exported document content handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub revision: u64,
    pub html: String,
}

/// Stores snapshots. Implemented by the host.
pub trait Persist: Send + Sync + 'static {
    fn persist(&self, snapshot: Snapshot) -> BoxFuture<Result<(), PersistError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// A change is waiting out the idle window.
    Pending,
    Saving { revision: u64 },
    Saved { revision: u64 },
    Failed { revision: u64, error: String },
}

pub struct Autosave {
    snapshots: Arc<watch::Sender<Option<Snapshot>>>,
    revision: Arc<AtomicU64>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Start the save loop. Must be called inside a tokio runtime.
    pub fn spawn(persist: Arc<dyn Persist>, delay: Duration) -> Self {
        let (snapshots, rx) = watch::channel(None);
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let task = n0_future::task::spawn(save_loop(rx, persist, delay, status_tx));
        Self {
            snapshots: Arc::new(snapshots),
            revision: Arc::new(AtomicU64::new(0)),
            status,
            task,
        }
    }

    /// Replace the pending snapshot and restart the idle window.
    pub fn schedule(&self, html: String) -> u64 {
        schedule(&self.snapshots, &self.revision, html)
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Change hook that schedules the exported HTML of each new document.
    pub fn extension(&self) -> Extension {
        let snapshots = self.snapshots.clone();
        let revision = self.revision.clone();
        Extension::new("autosave").on_document_changed(move |change| {
            if change.doc == change.previous {
                return;
            }
            schedule(&snapshots, &revision, crate::html::to_html(change.schema, change.doc));
        })
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for Autosave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autosave")
            .field("revision", &self.revision.load(Ordering::Relaxed))
            .field("status", &*self.status.borrow())
            .finish()
    }
}

fn schedule(snapshots: &watch::Sender<Option<Snapshot>>, revision: &AtomicU64, html: String) -> u64 {
    let revision = revision.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::trace!(target: "inkpad::autosave", revision, "save scheduled");
    snapshots.send_replace(Some(Snapshot { revision, html }));
    revision
}

async fn save_loop(
    mut snapshots: watch::Receiver<Option<Snapshot>>,
    persist: Arc<dyn Persist>,
    delay: Duration,
    status: watch::Sender<SaveStatus>,
) {
    loop {
        if snapshots.changed().await.is_err() {
            return;
        }
        status.send_replace(SaveStatus::Pending);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        tracing::debug!(target: "inkpad::autosave", "editor closed, pending save dropped");
                        return;
                    }
                }
            }
        }

        let Some(snapshot) = snapshots.borrow_and_update().clone() else {
            continue;
        };
        let revision = snapshot.revision;
        status.send_replace(SaveStatus::Saving { revision });
        match persist.persist(snapshot).await {
            Ok(()) => {
                tracing::debug!(target: "inkpad::autosave", revision, "saved");
                status.send_replace(SaveStatus::Saved { revision });
            }
            Err(err) => {
                tracing::warn!(target: "inkpad::autosave", revision, error = %err, "save failed");
                status.send_replace(SaveStatus::Failed {
                    revision,
                    error: err.to_string(),
                });
            }
        }
    }
}
