//! Per-user append-only vote logs.
//!
//! [`VoteLog`] is the contract every backend satisfies. The Redis backend lives
//! in [`crate::database`], [`MemoryLog`] is the in-process fake.
use std::sync::OnceLock;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::codec::{CodecError, Entry};

pub const LAYOUT_KEY: &str = "votes:layout";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt entry in {key}: {source}")]
    CorruptEntry {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Store holds layout {found:?}, expected {expected:?}")]
    LayoutMismatch { expected: String, found: String },
}

pub fn user_key(user: &str) -> String {
    format!("user:{user}:votes")
}

/// Ordered, append-only sequence of entries per user.
///
/// Ordering of concurrent appends to one user is whatever the backend's own
/// single-entry append gives; implementations add no locking of their own.
#[async_trait]
pub trait VoteLog: Send + Sync {
    /// Pushes `entry` as the new last element and returns the new length.
    async fn append(&self, user: &str, entry: Entry) -> Result<u64, StoreError>;

    /// Entries at positions `[start, len)`. Empty when `start >= len` or the
    /// user has never been written.
    async fn read_from(&self, user: &str, start: u64) -> Result<Vec<Entry>, StoreError>;

    async fn len(&self, user: &str) -> Result<u64, StoreError>;

    /// Records `layout` as the encoding of this store, or checks it against
    /// the one already recorded.
    async fn claim_layout(&self, layout: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    logs: DashMap<String, Vec<Entry>>,
    layout: OnceLock<String>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteLog for MemoryLog {
    async fn append(&self, user: &str, entry: Entry) -> Result<u64, StoreError> {
        let mut log = self.logs.entry(user_key(user)).or_default();
        log.push(entry);

        trace!(user, %entry, len = log.len(), "Appended entry");
        Ok(log.len() as u64)
    }

    async fn read_from(&self, user: &str, start: u64) -> Result<Vec<Entry>, StoreError> {
        let Some(log) = self.logs.get(&user_key(user)) else {
            return Ok(Vec::new());
        };

        let start = usize::try_from(start).unwrap_or(usize::MAX);
        Ok(log.get(start..).map(<[Entry]>::to_vec).unwrap_or_default())
    }

    async fn len(&self, user: &str) -> Result<u64, StoreError> {
        Ok(self
            .logs
            .get(&user_key(user))
            .map_or(0, |log| log.len() as u64))
    }

    async fn claim_layout(&self, layout: &str) -> Result<(), StoreError> {
        let found = self.layout.get_or_init(|| layout.to_string());

        if found != layout {
            return Err(StoreError::LayoutMismatch {
                expected: layout.to_string(),
                found: found.clone(),
            });
        }

        debug!(layout, "Layout claimed");
        Ok(())
    }
}
