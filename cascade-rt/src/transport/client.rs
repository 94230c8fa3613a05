//! Strict request/reply client over cached dealer connections.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::dealer::MessageDealer;
use super::error::RequestError;
use crate::message::Message;

/// A request/reply client that keeps one connection per remote address,
/// all announced under the caller's identity.
pub struct RequestClient {
    identity: String,
    connections: HashMap<String, MessageDealer>,
}

impl RequestClient {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            connections: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Send `message` to the service at `address` and await its reply.
    ///
    /// An `ERROR` reply is surfaced as [`RequestError::Remote`].
    pub async fn request(
        &mut self,
        address: &str,
        message: &Message,
    ) -> Result<Message, RequestError> {
        if !self.connections.contains_key(address) {
            let dealer = MessageDealer::connect(address, &self.identity).await?;
            self.connections.insert(address.to_owned(), dealer);
        }
        let dealer = self
            .connections
            .get_mut(address)
            .ok_or(super::TransportError::ConnectionClosed)?;
        dealer.send(message).await?;
        let reply = dealer.recv().await?;
        if let Message::Error(error) = reply {
            return Err(RequestError::Remote(
                error.error.unwrap_or_else(|| "<no detail>".to_owned()),
            ));
        }
        Ok(reply)
    }

    /// Close every cached connection, allowing `linger` per connection for
    /// the final flush.
    pub async fn close(&mut self, linger: Duration) {
        for (_, dealer) in self.connections.drain() {
            dealer.close(linger).await;
        }
    }
}
