use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::WaitlistEntry;
use storage::Storage;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Local storage slot holding the JSON array of submitted entries.
pub const WAITLIST_SLOT: &str = "credupi_waitlist";

/// Append-only backup trail of every submission attempt.
#[async_trait]
pub trait EntryCache: Send + Sync {
    /// Appends one entry and returns the new length of the trail.
    async fn append(&self, entry: &WaitlistEntry) -> Result<usize>;
    async fn entries(&self) -> Result<Vec<WaitlistEntry>>;
}

pub struct LocalEntryCache {
    storage: Storage,
    slot: String,
    // Detached partial saves may append concurrently with a completion.
    append_lock: Mutex<()>,
}

impl LocalEntryCache {
    pub fn new(storage: Storage) -> Self {
        Self::with_slot(storage, WAITLIST_SLOT)
    }

    pub fn with_slot(storage: Storage, slot: impl Into<String>) -> Self {
        Self {
            storage,
            slot: slot.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub async fn open(database_url: &str) -> Result<Self> {
        let storage = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to open local waitlist cache at '{database_url}'"))?;
        Ok(Self::new(storage))
    }

    async fn load(&self) -> Result<Vec<WaitlistEntry>> {
        let Some(raw) = self.storage.read_slot(&self.slot).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                warn!(
                    slot = %self.slot,
                    %error,
                    "local waitlist cache is not a JSON entry array; starting a new trail"
                );
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl EntryCache for LocalEntryCache {
    async fn append(&self, entry: &WaitlistEntry) -> Result<usize> {
        let _guard = self.append_lock.lock().await;

        let mut entries = self.load().await?;
        entries.push(entry.clone());
        let raw = serde_json::to_string(&entries).context("failed to encode waitlist cache")?;
        self.storage.write_slot(&self.slot, &raw).await?;

        debug!(slot = %self.slot, len = entries.len(), "appended entry to local waitlist cache");
        Ok(entries.len())
    }

    async fn entries(&self) -> Result<Vec<WaitlistEntry>> {
        self.load().await
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
