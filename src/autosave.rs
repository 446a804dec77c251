//! Debounced persistence of reading progress.
//!
//! A background task owns the store; the session side holds a cheap
//! [`Autosaver`] handle. Navigation updates supersede each other: only the
//! most recent pending update is written, after a quiet period with no
//! further updates. A periodic flush keeps long idle sessions persisted.
//! Shutting down (or dropping) the handle cancels any pending save.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::progress::{ProgressStore, ProgressUpdate};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(2);
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Save indicator surfaced to the reader UI. Store failures are non-fatal;
/// the in-memory navigation state stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    pub quiet_period: Duration,
    pub flush_interval: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

enum Command {
    Update(ProgressUpdate),
    Flush,
    Shutdown,
}

pub struct Autosaver {
    tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<SaveState>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Autosaver {
    pub fn spawn(
        store: Arc<dyn ProgressStore>,
        user_id: impl Into<String>,
        config: AutosaveConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveState::Idle);
        let handle = tokio::spawn(run_loop(store, user_id.into(), config, rx, status_tx));
        Self {
            tx,
            status_rx,
            handle: Some(handle),
        }
    }

    /// Records the latest navigation state and (re)arms the quiet period,
    /// superseding any pending save.
    pub fn update(&self, update: ProgressUpdate) {
        let _ = self.tx.send(Command::Update(update));
    }

    /// Persists the latest known state immediately.
    pub fn flush(&self) {
        let _ = self.tx.send(Command::Flush);
    }

    pub fn status(&self) -> SaveState {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.status_rx.clone()
    }

    /// Stops the background task, cancelling any pending save.
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn run_loop(
    store: Arc<dyn ProgressStore>,
    user_id: String,
    config: AutosaveConfig,
    mut rx: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<SaveState>,
) {
    let mut pending: Option<ProgressUpdate> = None;
    let mut latest: Option<ProgressUpdate> = None;
    let mut deadline: Option<Instant> = None;
    let mut flush_tick = tokio::time::interval_at(
        Instant::now() + config.flush_interval,
        config.flush_interval,
    );
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let quiet_deadline = deadline;
        let quiet = async move {
            match quiet_deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Update(update)) => {
                    latest = Some(update.clone());
                    pending = Some(update);
                    deadline = Some(Instant::now() + config.quiet_period);
                }
                Some(Command::Flush) => {
                    deadline = None;
                    if let Some(update) = pending.take().or_else(|| latest.clone()) {
                        save(store.as_ref(), &user_id, update, &status_tx).await;
                    }
                }
                // Sender dropped or explicit shutdown: the pending save is
                // cancelled, never written after teardown.
                Some(Command::Shutdown) | None => break,
            },
            _ = quiet => {
                deadline = None;
                if let Some(update) = pending.take() {
                    save(store.as_ref(), &user_id, update, &status_tx).await;
                }
            }
            _ = flush_tick.tick() => {
                if let Some(update) = pending.take().or_else(|| latest.clone()) {
                    deadline = None;
                    save(store.as_ref(), &user_id, update, &status_tx).await;
                }
            }
        }
    }
}

async fn save(
    store: &dyn ProgressStore,
    user_id: &str,
    update: ProgressUpdate,
    status_tx: &watch::Sender<SaveState>,
) {
    let _ = status_tx.send(SaveState::Saving);
    let progress = update.to_progress(user_id);
    match store.save(&progress).await {
        Ok(()) => {
            tracing::debug!(
                user_id,
                grimoire_id = %progress.grimoire_id,
                current_page = progress.current_page,
                "progress saved"
            );
            let _ = status_tx.send(SaveState::Saved);
        }
        Err(err) => {
            tracing::warn!(
                user_id,
                grimoire_id = %progress.grimoire_id,
                ?err,
                "progress save failed; in-memory state remains authoritative"
            );
            let _ = status_tx.send(SaveState::Error);
        }
    }
}
