//! Persistence Sync: one background task per open session.
//!
//! The task watches the session's snapshot channel, waits for a quiet period
//! so that a burst of keystroke-level edits becomes a single write, then
//! saves the latest snapshot through the [`ResumeStore`]. Writes run one at a
//! time: a mutation that lands while a write is in flight simply marks the
//! channel changed again, and the next debounce cycle catches up to it.
//!
//! Nothing on the mutation path ever waits on this task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::editor::session::{SharedSession, Snapshot};
use crate::store::ResumeStore;

enum SyncCommand {
    /// Write now, skipping the quiet period. Used for user-initiated retry.
    Flush,
    /// Final write if dirty, then stop.
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running sync task. Cheap to clone.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
}

impl SyncHandle {
    /// Starts the sync task for `session`.
    pub async fn spawn(
        session: SharedSession,
        store: Arc<dyn ResumeStore>,
        debounce: Duration,
    ) -> (Self, JoinHandle<()>) {
        let changes = session.lock().await.subscribe();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(session, store, debounce, changes, command_rx));
        (Self { commands }, task)
    }

    /// Asks for an immediate write. Returns `false` if the task has stopped.
    pub fn flush_now(&self) -> bool {
        self.commands.send(SyncCommand::Flush).is_ok()
    }

    /// Performs a final write if the session is dirty and stops the task.
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(SyncCommand::Shutdown(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn run(
    session: SharedSession,
    store: Arc<dyn ResumeStore>,
    debounce: Duration,
    mut changes: watch::Receiver<Snapshot>,
    mut commands: mpsc::UnboundedReceiver<SyncCommand>,
) {
    // `changes` came from `subscribe()`, so the snapshot the session was
    // opened with already counts as seen.
    loop {
        let command = tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                match wait_for_quiet(&mut changes, &mut commands, debounce).await {
                    Quiet::Settled => {
                        write_latest(&session, store.as_ref(), &mut changes).await;
                        continue;
                    }
                    Quiet::Interrupted(command) => command,
                }
            }
            command = commands.recv() => command,
        };

        match command {
            Some(SyncCommand::Flush) => {
                write_latest(&session, store.as_ref(), &mut changes).await;
            }
            Some(SyncCommand::Shutdown(done)) => {
                write_latest(&session, store.as_ref(), &mut changes).await;
                let _ = done.send(());
                break;
            }
            None => break,
        }
    }

    debug!("Persistence sync stopped");
}

enum Quiet {
    /// No new snapshot for a full debounce period.
    Settled,
    /// A command arrived first; it is handled without waiting out the burst.
    Interrupted(Option<SyncCommand>),
}

async fn wait_for_quiet(
    changes: &mut watch::Receiver<Snapshot>,
    commands: &mut mpsc::UnboundedReceiver<SyncCommand>,
    debounce: Duration,
) -> Quiet {
    loop {
        tokio::select! {
            changed = tokio::time::timeout(debounce, changes.changed()) => match changed {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => return Quiet::Settled,
            },
            command = commands.recv() => return Quiet::Interrupted(command),
        }
    }
}

/// Writes the most recent snapshot unless it is already durable, then
/// reports the outcome back to the session.
async fn write_latest(
    session: &SharedSession,
    store: &dyn ResumeStore,
    changes: &mut watch::Receiver<Snapshot>,
) {
    let snapshot = changes.borrow_and_update().clone();

    if session.lock().await.persisted_revision() >= snapshot.revision {
        return;
    }

    match store.save(&snapshot).await {
        Ok(()) => {
            info!(
                "Persisted resume {} at revision {}",
                snapshot.resume_id, snapshot.revision
            );
            session.lock().await.flush(snapshot.revision);
        }
        Err(e) => {
            warn!(
                "Failed to persist resume {} at revision {}: {e:#}",
                snapshot.resume_id, snapshot.revision
            );
            session
                .lock()
                .await
                .record_save_failure(snapshot.revision, e.to_string());
        }
    }
}
