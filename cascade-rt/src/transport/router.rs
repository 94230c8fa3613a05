//! The router socket: identity-keyed fan-in/fan-out over TCP loopback.

// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::error::TransportError;
use super::multipart::MultipartCodec;
use crate::message::{decode_message, encode_message, Message, ModelMessage};

const CHANNEL_CAPACITY: usize = 1024;

type PeerTable = Arc<DashMap<String, mpsc::Sender<Vec<Bytes>>>>;

/// Accepts peer connections and routes messages by peer identity.
///
/// A connecting peer announces its identity as the first multipart message
/// (a single frame holding the identity string); from then on every
/// multipart message it sends is decoded and surfaced as
/// `(identity, message)`. Sends are routed back over the peer's connection.
///
/// Malformed messages are logged as warnings and skipped; the stream
/// continues.
pub struct MessageRouter {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<ModelMessage>,
    peers: PeerTable,
    accept_task: JoinHandle<()>,
}

impl MessageRouter {
    /// Bind to an ephemeral loopback port and start accepting peers.
    pub async fn bind() -> Result<Self, TransportError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let local_addr = listener.local_addr()?;
        let peers: PeerTable = Arc::new(DashMap::new());
        let (incoming_tx, incoming_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let accept_peers = Arc::clone(&peers);
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        tokio::spawn(serve_peer(
                            stream,
                            Arc::clone(&accept_peers),
                            incoming_tx.clone(),
                        ));
                    }
                    Err(error) => {
                        warn!("Router accept failed: {error}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            local_addr,
            incoming: incoming_rx,
            peers,
            accept_task,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The address peers use to reach this router.
    pub fn address(&self) -> String {
        super::loopback_address(self.port())
    }

    /// The next decoded message from any peer, or `None` when the router
    /// has shut down.
    pub async fn recv(&mut self) -> Option<ModelMessage> {
        self.incoming.recv().await
    }

    /// Send a message to the peer with the given identity.
    pub async fn send(&self, identity: &str, message: &Message) -> Result<(), TransportError> {
        let frames = encode_message(message)?;
        let sender = self
            .peers
            .get(identity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::UnknownPeer(identity.to_owned()))?;
        sender
            .send(frames)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Identities of the currently connected peers.
    pub fn connected_peers(&self) -> Vec<String> {
        self.peers.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Drop for MessageRouter {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_peer(stream: TcpStream, peers: PeerTable, incoming: mpsc::Sender<ModelMessage>) {
    let mut framed = Framed::new(stream, MultipartCodec::new());

    let identity = match framed.next().await {
        Some(Ok(frames)) => match identity_from_handshake(&frames) {
            Some(identity) => identity,
            None => {
                warn!("Dropping peer with invalid identity handshake");
                return;
            }
        },
        _ => return,
    };
    debug!("Peer '{identity}' connected");

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Vec<Bytes>>(CHANNEL_CAPACITY);
    peers.insert(identity.clone(), outgoing_tx);

    loop {
        tokio::select! {
            inbound = framed.next() => match inbound {
                Some(Ok(frames)) => match decode_message(&frames) {
                    Ok(message) => {
                        if incoming.send((identity.clone(), message)).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => warn!("Invalid message from '{identity}': {error}"),
                },
                Some(Err(error)) => {
                    warn!("Stream error from '{identity}': {error}");
                    break;
                }
                None => break,
            },
            outbound = outgoing_rx.recv() => match outbound {
                Some(frames) => {
                    if let Err(error) = framed.send(frames).await {
                        warn!("Failed to send to '{identity}': {error}");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    peers.remove(&identity);
    debug!("Peer '{identity}' disconnected");
}

fn identity_from_handshake(frames: &[Bytes]) -> Option<String> {
    match frames {
        [identity] if !identity.is_empty() => {
            std::str::from_utf8(identity).ok().map(str::to_owned)
        }
        _ => None,
    }
}
