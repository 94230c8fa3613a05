//! Clients for the data services, used from inside model subprocesses.

// Layer 1: Standard library imports
use std::path::PathBuf;
use std::time::Duration;

// Layer 2: Third-party crate imports
use bytes::Bytes;

// Layer 3: Internal module imports
use super::error::ModelError;
use crate::mask::MaskTree;
use crate::message::{
    ClearDataMessage, GetDataMessage, Message, PutDataMessage,
};
use crate::transport::RequestClient;

const CLOSE_LINGER: Duration = Duration::from_secs(1);

/// Client for the update-data broker.
///
/// Produced payloads are stored under counter-derived keys
/// (`{model}_{n}`); the counter resets on `clear`, which a model issues at
/// every time advance to drop its stale inter-tick payloads.
pub struct UpdateDataClient {
    name: String,
    home_address: String,
    client: RequestClient,
    counter: u64,
}

impl UpdateDataClient {
    pub fn new(name: impl Into<String>, home_address: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            client: RequestClient::new(name.clone()),
            name,
            home_address: home_address.into(),
            counter: 0,
        }
    }

    /// The address other models use to fetch this model's payloads.
    pub fn home_address(&self) -> &str {
        &self.home_address
    }

    /// Fetch a payload from the broker at `address`, filtered by the
    /// caller's subscription mask.
    pub async fn get(
        &mut self,
        address: &str,
        key: &str,
        mask: Option<&MaskTree>,
    ) -> Result<Bytes, ModelError> {
        let mask = match mask {
            Some(mask) => Some(
                serde_json::to_value(mask)
                    .map_err(|err| ModelError::failure(err.to_string()))?,
            ),
            None => None,
        };
        let reply = self
            .client
            .request(
                address,
                &Message::GetData(GetDataMessage {
                    key: key.to_owned(),
                    mask,
                }),
            )
            .await?;
        match reply {
            Message::Data(data) => Ok(data.data),
            other => Err(crate::transport::RequestError::UnexpectedReply(other.tag()).into()),
        }
    }

    /// Store a produced payload in the home broker; returns the
    /// `(address, key)` pair to advertise in the result message.
    pub async fn put(&mut self, data: impl Into<Bytes>) -> Result<(String, String), ModelError> {
        let key = format!("{}_{}", self.name, self.counter);
        self.counter += 1;
        let reply = self
            .client
            .request(
                &self.home_address.clone(),
                &Message::PutData(PutDataMessage::new(key.clone(), data)),
            )
            .await?;
        match reply {
            Message::Acknowledge(_) => Ok((self.home_address.clone(), key)),
            other => Err(crate::transport::RequestError::UnexpectedReply(other.tag()).into()),
        }
    }

    /// Drop every payload this model stored and restart the key counter.
    pub async fn clear(&mut self) -> Result<(), ModelError> {
        let reply = self
            .client
            .request(
                &self.home_address.clone(),
                &Message::ClearData(ClearDataMessage {
                    prefix: self.name.clone(),
                }),
            )
            .await?;
        match reply {
            Message::Acknowledge(_) => {
                self.counter = 0;
                Ok(())
            }
            other => Err(crate::transport::RequestError::UnexpectedReply(other.tag()).into()),
        }
    }

    pub async fn close(&mut self) {
        self.client.close(CLOSE_LINGER).await;
    }
}

/// Client for the init-data server.
pub struct InitDataClient {
    server: String,
    client: RequestClient,
}

impl InitDataClient {
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            client: RequestClient::new(name),
            server: server.into(),
        }
    }

    /// Resolve a dataset name to a file path, `None` on a miss.
    pub async fn get(&mut self, key: &str) -> Result<Option<PathBuf>, ModelError> {
        let reply = self
            .client
            .request(
                &self.server.clone(),
                &Message::GetData(GetDataMessage {
                    key: key.to_owned(),
                    mask: None,
                }),
            )
            .await?;
        match reply {
            Message::Path(path) => Ok(path.path),
            other => Err(crate::transport::RequestError::UnexpectedReply(other.tag()).into()),
        }
    }

    pub async fn close(&mut self) {
        self.client.close(CLOSE_LINGER).await;
    }
}
