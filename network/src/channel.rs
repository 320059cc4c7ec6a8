//! Direct unicast channels for frame-at-a-time sync.
//!
//! A [`DirectChannel`] is the requesting half of a per-peer unicast stream;
//! a [`ChannelServer`] is the answering half. The transport that carries
//! them is abstracted behind [`DirectChannelProvider`] — the in-memory
//! implementation here wires both halves through mpsc channels and backs
//! tests and loopback deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use pulse_types::PeerId;

use crate::wire::{FrameRequest, FrameResponse};
use crate::NetworkError;

/// Buffer size for request/response channels. Sync is strictly
/// request-then-response, so a small buffer suffices.
const CHANNEL_BUFFER: usize = 8;

/// Requesting half of a direct channel to one peer.
pub struct DirectChannel {
    peer_id: PeerId,
    request_tx: mpsc::Sender<FrameRequest>,
    response_rx: mpsc::Receiver<FrameResponse>,
}

impl DirectChannel {
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Request one frame and await the peer's response.
    pub async fn request_frame(&mut self, frame_number: u64) -> Result<FrameResponse, NetworkError> {
        self.request_tx
            .send(FrameRequest { frame_number })
            .await
            .map_err(|_| NetworkError::ChannelClosed)?;
        self.response_rx
            .recv()
            .await
            .ok_or(NetworkError::ChannelClosed)
    }

    /// Close the channel. Dropping both halves tears the stream down.
    pub fn close(self) {}
}

/// Answering half of a direct channel.
pub struct ChannelServer {
    pub request_rx: mpsc::Receiver<FrameRequest>,
    pub response_tx: mpsc::Sender<FrameResponse>,
}

/// Build a connected channel pair for `peer_id`.
pub fn channel_pair(peer_id: PeerId) -> (DirectChannel, ChannelServer) {
    let (request_tx, request_rx) = mpsc::channel(CHANNEL_BUFFER);
    let (response_tx, response_rx) = mpsc::channel(CHANNEL_BUFFER);
    (
        DirectChannel {
            peer_id,
            request_tx,
            response_rx,
        },
        ChannelServer {
            request_rx,
            response_tx,
        },
    )
}

/// Opens direct channels to peers. Implemented by the transport layer;
/// tolerates concurrent opens to distinct peers.
pub trait DirectChannelProvider: Send + Sync {
    fn open(&self, peer_id: &PeerId, purpose: &str) -> Result<DirectChannel, NetworkError>;
}

type ServerHandler = Arc<dyn Fn(ChannelServer) + Send + Sync>;

/// In-memory transport: each registered peer is a handler that receives the
/// answering half of every channel opened to it.
pub struct MemoryChannelNetwork {
    handlers: RwLock<HashMap<PeerId, ServerHandler>>,
}

impl MemoryChannelNetwork {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a peer. The handler is invoked once per opened channel,
    /// typically spawning a task that serves it.
    pub fn register_peer(
        &self,
        peer_id: PeerId,
        handler: impl Fn(ChannelServer) + Send + Sync + 'static,
    ) {
        let mut handlers = self.handlers.write().expect("handler map lock poisoned");
        handlers.insert(peer_id, Arc::new(handler));
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        let mut handlers = self.handlers.write().expect("handler map lock poisoned");
        handlers.remove(peer_id);
    }
}

impl Default for MemoryChannelNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectChannelProvider for MemoryChannelNetwork {
    fn open(&self, peer_id: &PeerId, purpose: &str) -> Result<DirectChannel, NetworkError> {
        let handler = {
            let handlers = self.handlers.read().expect("handler map lock poisoned");
            handlers.get(peer_id).cloned()
        };
        let Some(handler) = handler else {
            return Err(NetworkError::ChannelOpen(format!(
                "no route to peer {peer_id} for {purpose}"
            )));
        };
        let (channel, server) = channel_pair(peer_id.clone());
        handler(server);
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::SYNC_CHANNEL_PURPOSE;

    #[tokio::test]
    async fn request_response_roundtrip() {
        let network = MemoryChannelNetwork::new();
        let peer = PeerId::new(vec![1]);
        network.register_peer(peer.clone(), |mut server| {
            tokio::spawn(async move {
                while let Some(request) = server.request_rx.recv().await {
                    assert_eq!(request.frame_number, 6);
                    let _ = server.response_tx.send(FrameResponse { frame: None }).await;
                }
            });
        });

        let mut channel = network.open(&peer, SYNC_CHANNEL_PURPOSE).unwrap();
        let response = channel.request_frame(6).await.unwrap();
        assert!(response.frame.is_none());
    }

    #[tokio::test]
    async fn unknown_peer_fails_to_open() {
        let network = MemoryChannelNetwork::new();
        let result = network.open(&PeerId::new(vec![9]), SYNC_CHANNEL_PURPOSE);
        assert!(matches!(result, Err(NetworkError::ChannelOpen(_))));
    }

    #[tokio::test]
    async fn dropped_server_closes_channel() {
        let network = MemoryChannelNetwork::new();
        let peer = PeerId::new(vec![2]);
        network.register_peer(peer.clone(), |server| {
            // Drop the answering half immediately.
            drop(server);
        });

        let mut channel = network.open(&peer, SYNC_CHANNEL_PURPOSE).unwrap();
        let result = channel.request_frame(1).await;
        assert!(matches!(result, Err(NetworkError::ChannelClosed)));
    }
}
