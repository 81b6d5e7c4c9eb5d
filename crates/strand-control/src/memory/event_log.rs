//! In-memory event log for completion records.

use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::InMemoryDesiredState;
use crate::{traits::EventLogWriter, types::*};

/// A completion record together with the key and position it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedCompletion {
    pub position: i64,
    pub key: u64,
    pub record: CompletionRecord,
}

/// Append-only list of completion records.
///
/// Optionally applies every accepted record to a desired-state store, standing
/// in for the downstream consumer that records partition ids on the topic.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    entries: Mutex<Vec<LoggedCompletion>>,
    rejections: AtomicU32,
    forward_to: Option<Arc<InMemoryDesiredState>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forwarding(desired: Arc<InMemoryDesiredState>) -> Self {
        Self {
            forward_to: Some(desired),
            ..Self::default()
        }
    }

    /// Make the next `count` appends report "try again".
    pub fn reject_next(&self, count: u32) {
        self.rejections.store(count, Ordering::SeqCst);
    }

    /// Appends still scripted to report "try again".
    pub fn pending_rejections(&self) -> u32 {
        self.rejections.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> Vec<LoggedCompletion> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl EventLogWriter for InMemoryEventLog {
    fn append_completion(&self, key: u64, record: &CompletionRecord) -> i64 {
        let rejected = self
            .rejections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if rejected {
            return -1;
        }

        let position = {
            let mut entries = self.entries.lock();
            let position = i64::try_from(entries.len()).unwrap_or(i64::MAX);
            entries.push(LoggedCompletion {
                position,
                key,
                record: record.clone(),
            });
            position
        };

        if let Some(desired) = &self.forward_to {
            if let Err(e) = desired.apply_completion(record) {
                warn!("Could not apply completion of topic '{}': {e}", record.topic);
            }
        }

        position
    }
}
