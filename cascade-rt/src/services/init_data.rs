//! The init-data server.
//!
//! Resolves dataset names to files in the data directory. The index is
//! built once at startup; the directory is read-only for the lifetime of a
//! simulation. The server never reads file contents: clients pick a parser
//! from the file suffix.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tracing::{error, info, warn};
use walkdir::WalkDir;

// Layer 3: Internal module imports
use super::traits::{Service, ServiceError};
use crate::message::{ErrorMessage, GetDataMessage, Message, PathMessage};
use crate::settings::Settings;
use crate::transport::MessageRouter;

/// Serves dataset file paths by dataset name (the file stem).
#[derive(Debug, Default)]
pub struct InitDataService {
    index: HashMap<String, PathBuf>,
}

impl InitDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the name → path index by scanning `root` recursively. The
    /// first file seen for a stem wins.
    pub fn scan(root: &Path) -> Self {
        let mut index = HashMap::new();
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(stem) = entry.path().file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            index
                .entry(stem.to_owned())
                .or_insert_with(|| entry.path().to_path_buf());
        }
        Self { index }
    }

    /// Number of indexed datasets.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Produce the reply for one request.
    pub fn handle_message(&self, message: &Message) -> Message {
        match message {
            Message::GetData(msg) => self.get(msg),
            _ => Message::Error(ErrorMessage::default()),
        }
    }

    fn get(&self, msg: &GetDataMessage) -> Message {
        if msg.mask.is_some() {
            warn!("Ignoring data mask");
        }
        Message::Path(PathMessage {
            path: self.index.get(&msg.key).cloned(),
        })
    }
}

#[async_trait]
impl Service for InitDataService {
    fn setup(&mut self, settings: &Settings) -> Result<(), ServiceError> {
        *self = Self::scan(&settings.data_dir);
        info!(
            "Init data service indexed {} dataset(s) under {}",
            self.len(),
            settings.data_dir.display()
        );
        Ok(())
    }

    async fn run(&mut self, router: &mut MessageRouter) -> Result<i32, ServiceError> {
        info!("Init data service listening on {}", router.address());
        while let Some((identity, message)) = router.recv().await {
            let reply = self.handle_message(&message);
            if let Err(err) = router.send(&identity, &reply).await {
                error!("Failed to reply to '{identity}': {err}");
            }
        }
        Ok(0)
    }
}
