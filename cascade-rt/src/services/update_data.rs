//! The update-data broker.
//!
//! Holds intermediate update payloads keyed by sender-derived keys.
//! Producers `PUT` their results, consumers `GET` them filtered by their
//! subscription mask, and a producer issues `CLEAR` with its own name as
//! prefix at every time advance so stale inter-tick deliveries are
//! discarded. The broker never interprets timestamps.

// Layer 1: Standard library imports
use std::path::PathBuf;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{error, info};

// Layer 3: Internal module imports
use super::traits::{Service, ServiceError};
use crate::mask::{filter_value, parse_mask};
use crate::message::{
    ClearDataMessage, DataMessage, ErrorMessage, GetDataMessage, Message, PutDataMessage,
};
use crate::settings::Settings;
use crate::transport::MessageRouter;
use crate::util::BoundedTaskPool;

/// Concurrent artifact writes are capped so a slow disk cannot absorb the
/// whole runtime.
const MAX_ARTIFACT_WRITERS: usize = 5;

/// In-memory request/reply store for update payloads.
#[derive(Default)]
pub struct UpdateDataService {
    store: DashMap<String, Value>,
    artifact_dir: Option<PathBuf>,
    writers: Option<BoundedTaskPool>,
}

impl UpdateDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Produce the reply for one request. `None` means a plain `ACK`.
    pub fn handle_message(&self, message: &Message) -> Option<Message> {
        match message {
            Message::GetData(msg) => Some(self.get(msg)),
            Message::PutData(msg) => self.put(msg),
            Message::ClearData(msg) => {
                self.clear(msg);
                None
            }
            _ => Some(Message::Error(ErrorMessage::default())),
        }
    }

    fn get(&self, msg: &GetDataMessage) -> Message {
        let mask = match &msg.mask {
            None => None,
            Some(raw) => match parse_mask(raw) {
                Ok(mask) => Some(mask),
                Err(_) => return Message::Error(ErrorMessage::new("Invalid mask")),
            },
        };
        let Some(stored) = self.store.get(&msg.key) else {
            return Message::Error(ErrorMessage::new("Key not found"));
        };
        let filtered = match &mask {
            Some(mask) => filter_value(stored.value(), mask),
            None => stored.value().clone(),
        };
        match serde_json::to_vec(&filtered) {
            Ok(raw) => Message::Data(DataMessage::new(raw)),
            Err(err) => {
                error!("Failed to serialize payload for key '{}': {err}", msg.key);
                Message::Error(ErrorMessage::default())
            }
        }
    }

    fn put(&self, msg: &PutDataMessage) -> Option<Message> {
        let parsed: Value = match serde_json::from_slice(&msg.data) {
            Ok(value) => value,
            Err(_) => return Some(Message::Error(ErrorMessage::new("Invalid data"))),
        };
        if !parsed.is_object() {
            return Some(Message::Error(ErrorMessage::new("Invalid data")));
        }
        self.store.insert(msg.key.clone(), parsed);
        None
    }

    fn clear(&self, msg: &ClearDataMessage) {
        self.store
            .retain(|key, _| !key.starts_with(&msg.prefix));
    }

    async fn persist_artifact(&mut self, key: &str, data: &[u8]) {
        let Some(dir) = &self.artifact_dir else {
            return;
        };
        let path = dir.join(format!("{key}.json"));
        let payload = data.to_vec();
        if let Some(writers) = &mut self.writers {
            writers
                .submit(async move { tokio::fs::write(path, payload).await })
                .await;
        }
    }
}

#[async_trait]
impl Service for UpdateDataService {
    fn setup(&mut self, settings: &Settings) -> Result<(), ServiceError> {
        if let Some(dir) = &settings.storage_dir {
            std::fs::create_dir_all(dir)?;
            self.artifact_dir = Some(dir.clone());
            self.writers = Some(BoundedTaskPool::new(MAX_ARTIFACT_WRITERS));
        }
        Ok(())
    }

    async fn run(&mut self, router: &mut MessageRouter) -> Result<i32, ServiceError> {
        info!("Update data service listening on {}", router.address());
        while let Some((identity, message)) = router.recv().await {
            let is_put = matches!(&message, Message::PutData(_));
            let reply = self
                .handle_message(&message)
                .unwrap_or(Message::Acknowledge(crate::message::AcknowledgeMessage {}));
            if is_put && !matches!(reply, Message::Error(_)) {
                if let Message::PutData(msg) = &message {
                    self.persist_artifact(&msg.key, &msg.data).await;
                }
            }
            if let Err(err) = router.send(&identity, &reply).await {
                error!("Failed to reply to '{identity}': {err}");
            }
        }
        if let Some(writers) = &mut self.writers {
            if let Err(err) = writers.join().await {
                error!("Artifact writes failed: {err}");
            }
        }
        Ok(0)
    }
}
