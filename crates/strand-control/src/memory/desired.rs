//! In-memory desired-state store.

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::{ControlError, manifest::ClusterManifest, traits::DesiredStateStore, types::*};

const NOTIFICATION_CAPACITY: usize = 256;

/// Declared topics held in memory, enumerated in name order.
#[derive(Debug)]
pub struct InMemoryDesiredState {
    topics: RwLock<BTreeMap<String, DesiredTopic>>,
    notifications: broadcast::Sender<TopicNotification>,
    next_key: AtomicU64,
}

impl InMemoryDesiredState {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            topics: RwLock::new(BTreeMap::new()),
            notifications,
            next_key: AtomicU64::new(1),
        }
    }

    /// Create a store holding the topics declared in `manifest`.
    pub fn from_manifest(manifest: &ClusterManifest) -> Result<Arc<Self>, ControlError> {
        let store = Arc::new(Self::new());
        for spec in &manifest.topics {
            let mut topic = store.declare(&spec.name, spec.partition_count, spec.replication_factor)?;
            if !spec.partition_ids.is_empty() {
                topic.partition_ids = spec.partition_ids.clone();
                store.topics.write().insert(topic.name.clone(), topic);
            }
        }
        Ok(store)
    }

    /// Declare a new topic and notify subscribers.
    pub fn declare(
        &self,
        name: &str,
        partition_count: u32,
        replication_factor: u32,
    ) -> Result<DesiredTopic, ControlError> {
        if partition_count == 0 || replication_factor == 0 {
            return Err(ControlError::Validation {
                message: format!(
                    "topic '{name}' needs a positive partition count and replication factor"
                ),
            });
        }

        let topic = {
            let mut topics = self.topics.write();
            if topics.contains_key(name) {
                return Err(ControlError::Validation {
                    message: format!("topic '{name}' is already declared"),
                });
            }
            let key = self.next_key.fetch_add(1, Ordering::SeqCst);
            let topic = DesiredTopic::new(name, partition_count, replication_factor, key);
            topics.insert(name.to_string(), topic.clone());
            topic
        };

        self.notify(TopicNotification::Created {
            topic: name.to_string(),
        });
        Ok(topic)
    }

    /// Record the partition ids carried by a completion record.
    pub fn apply_completion(&self, record: &CompletionRecord) -> Result<(), ControlError> {
        {
            let mut topics = self.topics.write();
            let topic = topics
                .get_mut(&record.topic)
                .ok_or_else(|| ControlError::TopicNotFound {
                    topic: record.topic.clone(),
                })?;
            topic.partition_ids = record.partition_ids.clone();
        }

        self.notify(TopicNotification::Updated {
            topic: record.topic.clone(),
        });
        Ok(())
    }

    pub fn topic(&self, name: &str) -> Option<DesiredTopic> {
        self.topics.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.topics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.read().is_empty()
    }

    fn notify(&self, notification: TopicNotification) {
        // Nobody may be listening yet
        if self.notifications.send(notification).is_err() {
            debug!("No subscribers for desired-state notification");
        }
    }
}

impl Default for InMemoryDesiredState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DesiredStateStore for InMemoryDesiredState {
    async fn topics(&self, name_filter: Option<&str>) -> Result<Vec<DesiredTopic>, ControlError> {
        let topics = self.topics.read();
        Ok(match name_filter {
            Some(name) => topics.get(name).cloned().into_iter().collect(),
            None => topics.values().cloned().collect(),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<TopicNotification> {
        self.notifications.subscribe()
    }
}
