use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::{Channel, PeerId};

/// Notification produced by a channel pump and consumed by the dispatch
/// loop.
#[derive(Debug)]
pub(crate) enum TransportEvent {
    Data { peer: PeerId, payload: Value },
    Closed { peer: PeerId },
}

/// Owns the set of open channels, keyed by remote peer id.
///
/// Each adopted channel gets a pump task that forwards inbound frames (and
/// finally the close notification) into the single dispatch loop, so the
/// loop remains the only place that reads or mutates session state.
#[derive(Debug)]
pub(crate) struct Connections {
    channels: HashMap<PeerId, mpsc::UnboundedSender<Value>>,
    notifications: mpsc::UnboundedSender<TransportEvent>,
}

impl Connections {
    pub(crate) fn new(notifications: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            channels: HashMap::new(),
            notifications,
        }
    }

    /// Takes ownership of a freshly opened channel and starts its pump.
    ///
    /// A second channel from the same peer replaces the first; the stale
    /// pump winds down once the remote side drops its half.
    pub(crate) fn adopt(&mut self, channel: Channel) {
        let Channel {
            remote,
            outgoing,
            mut incoming,
        } = channel;

        self.channels.insert(remote.clone(), outgoing);

        let notifications = self.notifications.clone();
        tokio::spawn(async move {
            while let Some(payload) = incoming.recv().await {
                let event = TransportEvent::Data {
                    peer: remote.clone(),
                    payload,
                };
                if notifications.send(event).is_err() {
                    return;
                }
            }
            let _ = notifications.send(TransportEvent::Closed { peer: remote });
        });
    }

    pub(crate) fn remove(&mut self, peer: &PeerId) -> bool {
        self.channels.remove(peer).is_some()
    }

    /// Fire-and-forget send to one peer. A failed send is logged and
    /// otherwise ignored; channel loss is only acted on when the close
    /// notification arrives.
    pub(crate) fn send_to(&self, peer: &PeerId, payload: &Value) {
        if let Some(channel) = self.channels.get(peer) {
            if channel.send(payload.clone()).is_err() {
                debug!(peer = %peer, "send on closing channel dropped");
            }
        }
    }

    /// Fire-and-forget fan-out to every open channel.
    pub(crate) fn broadcast(&self, payload: &Value) {
        for (peer, channel) in &self.channels {
            if channel.send(payload.clone()).is_err() {
                debug!(peer = %peer, "broadcast to closing channel dropped");
            }
        }
    }
}
