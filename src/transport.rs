//! In-process peer identity and transport.
//!
//! The coordinator only needs four things from a transport: an identity
//! service that assigns a unique peer id, outbound connects addressed by
//! peer id, a stream of inbound channels, and reliable ordered duplex
//! channels with a close notification. [`Switchboard`] provides all four
//! inside one process, which is enough for the demo binary and the test
//! suite; a WebRTC- or TCP-backed transport would expose the same surface.

use std::{collections::HashMap, fmt, sync::Arc};

use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::error::{Error, Result};

const PEER_ID_LEN: usize = 12;

/// Opaque unique peer identifier, assigned once per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    fn generate() -> Self {
        Self(nanoid!(PEER_ID_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One reliable, ordered duplex channel to a remote peer.
///
/// Dropping a `Channel` closes it: the remote side observes the close when
/// its receive half yields `None`.
#[derive(Debug)]
pub struct Channel {
    pub remote: PeerId,
    pub outgoing: mpsc::UnboundedSender<Value>,
    pub incoming: mpsc::UnboundedReceiver<Value>,
}

/// A registered endpoint: the assigned local id plus the stream of inbound
/// channels opened by other peers.
#[derive(Debug)]
pub struct Endpoint {
    pub peer_id: PeerId,
    pub incoming: mpsc::UnboundedReceiver<Channel>,
}

/// In-process identity service and rendezvous point.
///
/// Clone handles freely; all endpoints registered against the same
/// switchboard can reach each other by peer id.
#[derive(Debug, Clone, Default)]
pub struct Switchboard {
    peers: Arc<Mutex<HashMap<PeerId, mpsc::UnboundedSender<Channel>>>>,
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a fresh peer id and registers the endpoint for inbound
    /// channels.
    pub async fn register(&self) -> Endpoint {
        let peer_id = PeerId::generate();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        self.peers.lock().await.insert(peer_id.clone(), inbound_tx);
        Endpoint {
            peer_id,
            incoming: inbound_rx,
        }
    }

    /// Opens a channel from `local` to `remote`, handing the remote endpoint
    /// its half through its inbound stream.
    pub async fn connect(&self, local: &PeerId, remote: &PeerId) -> Result<Channel> {
        let peers = self.peers.lock().await;
        let inbound = peers
            .get(remote)
            .ok_or_else(|| Error::ConnectionFailed(remote.clone()))?;

        let (to_remote_tx, to_remote_rx) = mpsc::unbounded_channel();
        let (to_local_tx, to_local_rx) = mpsc::unbounded_channel();

        let remote_half = Channel {
            remote: local.clone(),
            outgoing: to_local_tx,
            incoming: to_remote_rx,
        };
        inbound
            .send(remote_half)
            .map_err(|_| Error::ConnectionFailed(remote.clone()))?;

        Ok(Channel {
            remote: remote.clone(),
            outgoing: to_remote_tx,
            incoming: to_local_rx,
        })
    }
}
