//! Message kinds exchanged between the orchestrator, services and models.
//!
//! Commands flow from the orchestrator to models (`NEW_TIME`, `UPDATE`,
//! `UPDATE_SERIES`, `END`); responses flow back (`READY`, `ACK`, `RESULT`,
//! `ERROR`). The data services speak a request/reply subset (`GET`, `PUT`,
//! `CLEAR`, `DATA`, `PATH`, `ERROR`).

// Layer 1: Standard library imports
use std::path::PathBuf;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::error::WireError;
use crate::mask::MaskTree;
use crate::timeline::Timestamp;

/// A message paired with the identity of the peer it came from or goes to.
pub type ModelMessage = (String, Message);

/// Registration from a model: its publish and subscribe masks.
///
/// An absent mask means "no constraint" (the model publishes or subscribes
/// to everything); an empty mask tree means "nothing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationMessage {
    #[serde(rename = "pub", default)]
    pub pub_mask: Option<MaskTree>,
    #[serde(rename = "sub", default)]
    pub sub_mask: Option<MaskTree>,
}

/// Orchestrator → model: advance the model's clock to `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeMessage {
    pub timestamp: Timestamp,
}

/// Orchestrator → model: compute at `timestamp`.
///
/// A bare update (no key/address) is a wake-up call; one carrying a
/// key/address pair points at a payload held by an update-data broker.
/// `origin` names the model that produced the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl UpdateMessage {
    /// A wake-up call without attached data.
    pub fn wake(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            key: None,
            address: None,
            origin: None,
        }
    }

    /// An update pointing at a payload stored in an update-data broker.
    pub fn with_data(
        timestamp: Timestamp,
        key: impl Into<String>,
        address: impl Into<String>,
        origin: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            key: Some(key.into()),
            address: Some(address.into()),
            origin,
        }
    }

    /// Whether this update points at broker-held data.
    pub fn has_data(&self) -> bool {
        self.key.is_some() && self.address.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), WireError> {
        if self.key.is_some() != self.address.is_some() {
            return Err(WireError::KeyAddressMismatch);
        }
        Ok(())
    }
}

/// A batch of updates delivered to a model as a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSeriesMessage {
    pub updates: Vec<UpdateMessage>,
}

impl UpdateSeriesMessage {
    pub fn new(updates: Vec<UpdateMessage>) -> Self {
        Self { updates }
    }

    /// The timestamp of the series: the maximum over its entries, `None`
    /// for an empty series.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.updates.iter().map(|upd| upd.timestamp).max()
    }
}

/// Model → orchestrator: computation finished.
///
/// `key`/`address` point at produced data (both absent when the model
/// produced none); `next_time` is the earliest future instant the model
/// wants to be woken again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub next_time: Option<Timestamp>,
    #[serde(default)]
    pub origin: Option<String>,
}

impl ResultMessage {
    /// Whether the model produced data for this result.
    pub fn has_data(&self) -> bool {
        self.key.is_some() && self.address.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), WireError> {
        if self.key.is_some() != self.address.is_some() {
            return Err(WireError::KeyAddressMismatch);
        }
        Ok(())
    }
}

/// Generic acknowledgement, the response to `NEW_TIME` and `END`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgeMessage {}

/// Terminate: the receiver finalizes and acknowledges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuitMessage {}

/// Client → data service: fetch the value stored under `key`, filtered by
/// an optional data mask. The mask is kept as raw JSON so that services can
/// answer shape errors with an `ERROR` reply instead of dropping the
/// request at the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDataMessage {
    pub key: String,
    #[serde(default)]
    pub mask: Option<serde_json::Value>,
}

/// Producer → update broker: store `data` under `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutDataMessage {
    pub key: String,
    pub data: Bytes,
}

impl PutDataMessage {
    pub fn new(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Producer → update broker: drop every key starting with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearDataMessage {
    pub prefix: String,
}

/// Data service → client: an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessage {
    pub data: Bytes,
}

impl DataMessage {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Init-data server → client: the resolved dataset file path, `None` when
/// the dataset is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMessage {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Failure notice, sent in place of any other reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorMessage {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
}

/// The sum of all control messages, tagged on the wire by an ASCII frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Registration(RegistrationMessage),
    NewTime(NewTimeMessage),
    Update(UpdateMessage),
    UpdateSeries(UpdateSeriesMessage),
    Result(ResultMessage),
    Acknowledge(AcknowledgeMessage),
    Quit(QuitMessage),
    GetData(GetDataMessage),
    PutData(PutDataMessage),
    ClearData(ClearDataMessage),
    Data(DataMessage),
    Path(PathMessage),
    Error(ErrorMessage),
}

impl Message {
    /// The ASCII tag identifying this message kind on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Registration(_) => "READY",
            Message::NewTime(_) => "NEW_TIME",
            Message::Update(_) => "UPDATE",
            Message::UpdateSeries(_) => "UPDATE_SERIES",
            Message::Result(_) => "RESULT",
            Message::Acknowledge(_) => "ACK",
            Message::Quit(_) => "END",
            Message::GetData(_) => "GET",
            Message::PutData(_) => "PUT",
            Message::ClearData(_) => "CLEAR",
            Message::Data(_) => "DATA",
            Message::Path(_) => "PATH",
            Message::Error(_) => "ERROR",
        }
    }
}
