use crate::core::document::Library;
use crate::core::io::Storage;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const LIBRARY_FILE: &str = "library_v1.json";

const SAVE_DEBOUNCE: Duration = Duration::from_secs(1);
const SAVED_HOLD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "",
            SaveStatus::Saving => "saving…",
            SaveStatus::Saved => "saved",
        }
    }
}

/// Debounced writer for the library snapshot. Every mutation re-arms a timer;
/// only the last state scheduled before the timer fires reaches storage.
pub struct PersistenceGateway {
    storage: Arc<dyn Storage>,
    key: String,
    debounce: Duration,
    saved_hold: Duration,
    status: watch::Sender<SaveStatus>,
    pending: Option<JoinHandle<()>>,
}

impl PersistenceGateway {
    pub fn new(storage: Arc<dyn Storage>, data_folder: &str) -> Self {
        Self::with_intervals(storage, data_folder, SAVE_DEBOUNCE, SAVED_HOLD)
    }

    pub fn with_intervals(
        storage: Arc<dyn Storage>,
        data_folder: &str,
        debounce: Duration,
        saved_hold: Duration,
    ) -> Self {
        let key = Path::new(data_folder)
            .join(LIBRARY_FILE)
            .to_string_lossy()
            .to_string();
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            storage,
            key,
            debounce,
            saved_hold,
            status,
            pending: None,
        }
    }

    /// Reads the snapshot. Missing or corrupt snapshots degrade to an empty
    /// library; this never fails the caller.
    pub async fn load(&self) -> Library {
        match self.try_load().await {
            Ok(Some(library)) => library,
            Ok(None) => Library::default(),
            Err(e) => {
                log::warn!("Could not load library snapshot, starting empty: {:#}", e);
                Library::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<Library>> {
        if !self.storage.exists(&self.key).await? {
            return Ok(None);
        }
        let bytes = self.storage.read(&self.key).await?;
        let content = String::from_utf8(bytes)?;
        let library =
            serde_json::from_str(&content).context("Snapshot did not parse as a library")?;
        Ok(Some(library))
    }

    /// (Re)arms the debounce window with the given state. A newer call
    /// cancels the previous pending write, so a burst of edits produces one
    /// write carrying the last state. The write itself runs on its own task
    /// and never blocks the caller.
    pub fn schedule(&mut self, library: &Library) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.status.send_replace(SaveStatus::Saving);

        let storage = self.storage.clone();
        let key = self.key.clone();
        let status = self.status.clone();
        let snapshot = library.clone();
        let debounce = self.debounce;
        let saved_hold = self.saved_hold;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            match write_snapshot(storage.as_ref(), &key, &snapshot).await {
                Ok(()) => {
                    status.send_replace(SaveStatus::Saved);
                    // Feedback only; a newer schedule aborts this task before
                    // the reversion can clobber its Saving status.
                    tokio::time::sleep(saved_hold).await;
                    status.send_replace(SaveStatus::Idle);
                }
                Err(e) => {
                    log::warn!("Failed to persist library: {:#}", e);
                    status.send_replace(SaveStatus::Idle);
                }
            }
        }));
    }

    /// Immediate write, cancelling any pending debounced one.
    pub async fn flush(&mut self, library: &Library) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let result = write_snapshot(self.storage.as_ref(), &self.key, library).await;
        self.status.send_replace(SaveStatus::Idle);
        result
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    pub fn snapshot_key(&self) -> &str {
        &self.key
    }
}

async fn write_snapshot(storage: &dyn Storage, key: &str, library: &Library) -> Result<()> {
    let content =
        serde_json::to_string_pretty(library).context("Failed to serialize library")?;
    storage.write(key, content.as_bytes()).await
}
