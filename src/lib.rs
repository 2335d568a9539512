//! Peer-session coordinator for a serverless drawing and guessing game.
//!
//! One participant hosts a room, others join it directly, and gameplay
//! traffic is relayed peer-to-peer over point-to-point channels. This crate
//! is the coordination core only: connection lifecycle, host-authoritative
//! roster replication, and the routing protocol that multiplexes control
//! and gameplay messages. Rendering strokes and running the actual game is
//! left to a consuming layer fed typed [`session::SessionEvent`]s.
//!
//! Each module covers one responsibility:
//!
//! - [`transport`] assigns peer identities and opens in-process channels
//!   between registered endpoints.
//! - [`connection`] owns the open channel set and fans broadcasts out to it.
//! - [`message`] defines the tagged JSON wire schema and classifies inbound
//!   payloads into control vs. opaque gameplay traffic.
//! - [`registry`] keeps the insertion-ordered player roster: authored by
//!   the host, wholesale-replaced on guests.
//! - [`session`] ties it together: one dispatch loop owning all mutable
//!   session state, driven by transport notifications and boundary
//!   commands.
//! - [`cli`] parses the demo binary's command line.
//!
//! Integration tests exercise the coordinator through [`session::PeerSession`]
//! and through raw [`transport::Switchboard`] endpoints acting as scripted
//! peers.

pub mod cli;
pub mod connection;
pub mod error;
pub mod message;
pub mod registry;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use message::PlayerInfo;
pub use session::{PeerSession, SessionEvent, SessionState};
pub use transport::{PeerId, Switchboard};
