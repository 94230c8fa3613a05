//! The dealer socket: a model-side connection to a router.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::warn;

// Layer 3: Internal module imports
use super::error::TransportError;
use super::multipart::MultipartCodec;
use super::socket_address;
use crate::message::{decode_message, encode_message, Message};

/// A client connection to a [`super::MessageRouter`], announced under a
/// fixed identity.
pub struct MessageDealer {
    framed: Framed<TcpStream, MultipartCodec>,
    identity: String,
}

impl MessageDealer {
    /// Connect to a router address (`tcp://127.0.0.1:<port>`) and announce
    /// `identity`.
    pub async fn connect(address: &str, identity: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(socket_address(address)?).await?;
        let mut framed = Framed::new(stream, MultipartCodec::new());
        framed
            .send(vec![Bytes::copy_from_slice(identity.as_bytes())])
            .await?;
        Ok(Self {
            framed,
            identity: identity.to_owned(),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let frames = encode_message(message)?;
        self.framed.send(frames).await?;
        Ok(())
    }

    /// Receive the next well-formed message. Malformed multipart messages
    /// are logged and skipped, matching the receiving-stream contract.
    pub async fn recv(&mut self) -> Result<Message, TransportError> {
        loop {
            match self.framed.next().await {
                Some(Ok(frames)) => match decode_message(&frames) {
                    Ok(message) => return Ok(message),
                    Err(error) => warn!("Invalid message on '{}': {error}", self.identity),
                },
                Some(Err(error)) => return Err(error.into()),
                None => return Err(TransportError::ConnectionClosed),
            }
        }
    }

    /// Send a raw multipart message, bypassing the codec.
    #[cfg(test)]
    pub(crate) async fn send_raw(&mut self, frames: Vec<Bytes>) -> Result<(), TransportError> {
        self.framed.send(frames).await?;
        Ok(())
    }

    /// Flush buffered writes and close the connection, waiting at most
    /// `linger` for the flush (used to push out a final error message).
    pub async fn close(mut self, linger: Duration) {
        let _ = tokio::time::timeout(linger, async {
            let _ = self.framed.flush().await;
            let _ = self.framed.close().await;
        })
        .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::message::{AcknowledgeMessage, ErrorMessage};
    use crate::transport::MessageRouter;

    #[tokio::test]
    async fn test_connect_to_invalid_scheme_fails() {
        let result = MessageDealer::connect("ipc:///tmp/sock", "m").await;
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_close_flushes_final_message() {
        let mut router = MessageRouter::bind().await.unwrap();
        let address = router.address();
        let mut dealer = MessageDealer::connect(&address, "failing").await.unwrap();
        dealer
            .send(&Message::Error(ErrorMessage::new("fatal")))
            .await
            .unwrap();
        dealer.close(Duration::from_secs(1)).await;

        let (identity, message) = router.recv().await.unwrap();
        assert_eq!(identity, "failing");
        assert_eq!(message, Message::Error(ErrorMessage::new("fatal")));
    }

    #[tokio::test]
    async fn test_recv_after_router_drop_errors() {
        let router = MessageRouter::bind().await.unwrap();
        let address = router.address();
        let mut dealer = MessageDealer::connect(&address, "m").await.unwrap();
        dealer
            .send(&Message::Acknowledge(AcknowledgeMessage {}))
            .await
            .unwrap();
        drop(router);
        let result = dealer.recv().await;
        assert!(result.is_err());
    }
}
