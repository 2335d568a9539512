use indexmap::IndexMap;

use crate::{message::PlayerInfo, transport::PeerId};

/// Insertion-ordered mapping from peer id to player metadata.
///
/// On the host this is the single writable source of truth, mutated on every
/// membership change. On a guest it is a replica that is wholesale-replaced
/// by each received snapshot, never merged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlayerRegistry {
    players: IndexMap<PeerId, PlayerInfo>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites one entry. Overwriting keeps the entry's
    /// original position in the order.
    pub fn upsert(&mut self, peer_id: PeerId, info: PlayerInfo) {
        self.players.insert(peer_id, info);
    }

    /// Removes one entry, preserving the order of the rest.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<PlayerInfo> {
        self.players.shift_remove(peer_id)
    }

    /// Discards the current contents and installs the snapshot as-is.
    pub fn replace_all(&mut self, snapshot: Vec<(PeerId, PlayerInfo)>) {
        self.players = snapshot.into_iter().collect();
    }

    /// Full ordered copy, as broadcast in LOBBY_STATE and GAME_START.
    pub fn snapshot(&self) -> Vec<(PeerId, PlayerInfo)> {
        self.players
            .iter()
            .map(|(id, info)| (id.clone(), info.clone()))
            .collect()
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PlayerInfo> {
        self.players.get(peer_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
