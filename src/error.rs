use thiserror::Error;

use crate::transport::PeerId;

#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not open a channel to the given peer. Not
    /// retried automatically.
    #[error("unable to open a channel to peer {0}")]
    ConnectionFailed(PeerId),

    /// `join_room` was called with the local peer's own id.
    #[error("cannot join a room hosted by the local peer")]
    JoinOwnRoom,

    /// A room can only be created or joined from an idle session.
    #[error("session is no longer idle")]
    NotIdle,

    /// The coordinator task has shut down and can no longer accept commands.
    #[error("session coordinator is no longer running")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
