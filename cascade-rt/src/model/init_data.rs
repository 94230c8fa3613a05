//! Init-data access for models: dataset resolution by name.

// Layer 1: Standard library imports
use std::path::{Path, PathBuf};

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use walkdir::WalkDir;

// Layer 3: Internal module imports
use super::clients::InitDataClient;
use super::error::ModelError;

/// Dataset file types a model can ask for, derived from the file suffix.
/// The runtime never parses file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Msgpack,
    Csv,
    NetCdf,
    Other,
}

impl FileType {
    /// Map a file extension (with or without the leading dot) to a type.
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "json" => FileType::Json,
            "msgpack" => FileType::Msgpack,
            "csv" => FileType::Csv,
            "nc" => FileType::NetCdf,
            _ => FileType::Other,
        }
    }

    fn of_path(path: &Path) -> Self {
        path.extension()
            .and_then(|extension| extension.to_str())
            .map(FileType::from_extension)
            .unwrap_or(FileType::Other)
    }
}

/// Resolves dataset names to typed file paths.
#[async_trait]
pub trait InitDataHandler: Send {
    /// Look up a dataset; `None` when it does not exist. Whether a miss is
    /// fatal is the caller's decision.
    async fn get(&mut self, name: &str) -> Result<Option<(FileType, PathBuf)>, ModelError>;

    /// Look up a dataset and insist on a specific file type.
    async fn ensure_ftype(
        &mut self,
        name: &str,
        expected: FileType,
    ) -> Result<PathBuf, ModelError> {
        match self.get(name).await? {
            None => Err(ModelError::DatasetNotFound(name.to_owned())),
            Some((actual, _)) if actual != expected => Err(ModelError::WrongFileType {
                name: name.to_owned(),
                expected,
                actual,
            }),
            Some((_, path)) => Ok(path),
        }
    }
}

/// Resolves datasets directly from a local directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryInitDataHandler {
    pub root: PathBuf,
}

impl DirectoryInitDataHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl InitDataHandler for DirectoryInitDataHandler {
    async fn get(&mut self, name: &str) -> Result<Option<(FileType, PathBuf)>, ModelError> {
        for entry in WalkDir::new(&self.root).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file()
                && entry.path().file_stem().and_then(|stem| stem.to_str()) == Some(name)
            {
                let path = entry.path().to_path_buf();
                return Ok(Some((FileType::of_path(&path), path)));
            }
        }
        Ok(None)
    }
}

/// Resolves datasets through the init-data server.
pub struct ServicedInitDataHandler {
    client: InitDataClient,
}

impl ServicedInitDataHandler {
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            client: InitDataClient::new(name, server),
        }
    }

    pub async fn close(&mut self) {
        self.client.close().await;
    }
}

#[async_trait]
impl InitDataHandler for ServicedInitDataHandler {
    async fn get(&mut self, name: &str) -> Result<Option<(FileType, PathBuf)>, ModelError> {
        let path = self.client.get(name).await?;
        Ok(path.map(|path| (FileType::of_path(&path), path)))
    }
}
