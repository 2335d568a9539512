//! Session coordinator: state machine, dispatch loop, and boundary API.
//!
//! All transport notifications and boundary commands funnel into one
//! `select!` loop that owns the player registry and the channel set. The
//! loop is the sole writer of both, so no locking is needed anywhere in the
//! coordinator.

use serde_json::Value;
use tokio::{
    select,
    sync::{mpsc, oneshot},
};
use tracing::{debug, info, warn};

use crate::{
    connection::{Connections, TransportEvent},
    error::{Error, Result},
    message::{ControlMessage, PlayerInfo, Routed, classify},
    registry::PlayerRegistry,
    transport::{Channel, PeerId, Switchboard},
};

const SENDER_ID_FIELD: &str = "senderId";
const TYPE_FIELD: &str = "type";
const DEFAULT_UPDATE_TYPE: &str = "DRAWING_UPDATE";

/// Whether the local peer authors the registry or replicates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// Coordinator lifecycle. There is no transition out of `InGame`; rematches
/// reuse the established channels and registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Hosting,
    Joining,
    InLobby,
    InGame,
}

/// Typed events delivered to the consuming (rendering/UI) layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The lobby roster changed: a snapshot was produced (host) or received
    /// (guest), or a peer's departure shrank the local view.
    LobbyUpdated { players: Vec<(PeerId, PlayerInfo)> },
    /// The host started the game; carries the final roster.
    GameStarted { players: Vec<(PeerId, PlayerInfo)> },
    /// Opaque gameplay payload from another peer, forwarded verbatim.
    PeerUpdate { payload: Value },
}

enum Command {
    CreateRoom {
        reply: oneshot::Sender<Result<PeerId>>,
    },
    JoinRoom {
        host: PeerId,
        reply: oneshot::Sender<Result<()>>,
    },
    StartGame,
    SendUpdate {
        payload: Value,
    },
}

/// Boundary handle to a running session coordinator.
///
/// Dropping the handle shuts the coordinator down, which closes every open
/// channel; remote peers observe the closes as normal departures.
pub struct PeerSession {
    peer_id: PeerId,
    commands: mpsc::UnboundedSender<Command>,
}

impl PeerSession {
    /// Registers with the identity service and starts the dispatch loop.
    ///
    /// Resolves once the local peer id has been assigned; until then no
    /// identifier exists for callers to use.
    pub async fn initialize(
        switchboard: Switchboard,
        player_name: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let endpoint = switchboard.register().await;
        let peer_id = endpoint.peer_id.clone();
        info!(peer = %peer_id, "peer identity assigned");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let coordinator = Coordinator {
            peer_id: peer_id.clone(),
            player_name: player_name.into(),
            switchboard,
            role: None,
            state: SessionState::Idle,
            room_id: None,
            registry: PlayerRegistry::new(),
            connections: Connections::new(notify_tx),
            inbound: endpoint.incoming,
            notifications: notify_rx,
            commands: command_rx,
            events: event_tx,
        };
        tokio::spawn(coordinator.run());

        (
            Self {
                peer_id,
                commands: command_tx,
            },
            event_rx,
        )
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Becomes host of a new room. The returned room id is the local peer
    /// id; hand it to prospective guests out of band.
    pub async fn create_room(&self) -> Result<PeerId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::CreateRoom { reply: reply_tx })
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)?
    }

    /// Joins the room hosted by `room_id`. Fails with
    /// [`Error::ConnectionFailed`] when the transport cannot open the
    /// channel; no retry is attempted.
    pub async fn join_room(&self, room_id: PeerId) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::JoinRoom {
                host: room_id,
                reply: reply_tx,
            })
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)?
    }

    /// Starts the game. Host-only: calls from a guest are logged no-ops, as
    /// is a repeat call once the game is running.
    pub fn start_game(&self) -> Result<()> {
        self.commands
            .send(Command::StartGame)
            .map_err(|_| Error::SessionClosed)
    }

    /// Stamps `payload` with the local peer id and broadcasts it to every
    /// open channel, fire-and-forget. Payloads without a `type` tag go out
    /// as `DRAWING_UPDATE`.
    pub fn send_update(&self, payload: Value) -> Result<()> {
        self.commands
            .send(Command::SendUpdate { payload })
            .map_err(|_| Error::SessionClosed)
    }
}

struct Coordinator {
    peer_id: PeerId,
    player_name: String,
    switchboard: Switchboard,
    role: Option<Role>,
    state: SessionState,
    room_id: Option<PeerId>,
    registry: PlayerRegistry,
    connections: Connections,
    inbound: mpsc::UnboundedReceiver<Channel>,
    notifications: mpsc::UnboundedReceiver<TransportEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Coordinator {
    async fn run(mut self) {
        loop {
            select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    // Boundary handle dropped: tear down, closing channels.
                    None => break,
                },
                channel = self.inbound.recv() => match channel {
                    Some(channel) => self.accept_channel(channel),
                    None => break,
                },
                notification = self.notifications.recv() => match notification {
                    Some(event) => self.handle_transport_event(event),
                    None => break,
                },
            }
        }
        info!(peer = %self.peer_id, "session coordinator stopped");
    }

    fn is_host(&self) -> bool {
        self.role == Some(Role::Host)
    }

    fn emit(&self, event: SessionEvent) {
        // The consumer may have dropped its receiver; that is its choice.
        let _ = self.events.send(event);
    }

    /// Adopts an accepted or opened channel and immediately introduces the
    /// local player over it.
    fn accept_channel(&mut self, channel: Channel) {
        let peer = channel.remote.clone();
        info!(peer = %peer, "channel open");
        self.connections.adopt(channel);

        let hello = ControlMessage::PlayerInfo {
            player_id: self.peer_id.clone(),
            player_name: self.player_name.clone(),
            is_host: self.is_host(),
        };
        self.connections.send_to(&peer, &hello.into_value());
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::CreateRoom { reply } => {
                let _ = reply.send(self.create_room());
            }
            Command::JoinRoom { host, reply } => {
                let _ = reply.send(self.join_room(host).await);
            }
            Command::StartGame => self.start_game(),
            Command::SendUpdate { payload } => self.send_update(payload),
        }
    }

    fn create_room(&mut self) -> Result<PeerId> {
        if self.state != SessionState::Idle {
            return Err(Error::NotIdle);
        }

        self.role = Some(Role::Host);
        self.state = SessionState::Hosting;
        self.room_id = Some(self.peer_id.clone());
        self.registry.upsert(
            self.peer_id.clone(),
            PlayerInfo::new(self.player_name.clone(), true),
        );
        info!(room = %self.peer_id, "hosting room");
        self.broadcast_lobby();

        Ok(self.peer_id.clone())
    }

    async fn join_room(&mut self, host: PeerId) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(Error::NotIdle);
        }
        if host == self.peer_id {
            return Err(Error::JoinOwnRoom);
        }

        let channel = self.switchboard.connect(&self.peer_id, &host).await?;
        self.role = Some(Role::Guest);
        self.state = SessionState::Joining;
        self.room_id = Some(host.clone());
        info!(room = %host, "joining room");
        self.accept_channel(channel);

        Ok(())
    }

    fn start_game(&mut self) {
        if !self.is_host() {
            debug!("ignoring start_game from a non-host session");
            return;
        }
        if self.state == SessionState::InGame {
            debug!("game already started");
            return;
        }

        let players = self.registry.snapshot();
        let message = ControlMessage::GameStart {
            players: players.clone(),
        };
        self.connections.broadcast(&message.into_value());
        self.state = SessionState::InGame;
        info!(players = players.len(), "game started");
        self.emit(SessionEvent::GameStarted { players });
    }

    fn send_update(&mut self, payload: Value) {
        let Value::Object(mut fields) = payload else {
            warn!("dropping non-object gameplay update");
            return;
        };

        fields.insert(
            SENDER_ID_FIELD.to_string(),
            Value::String(self.peer_id.as_str().to_string()),
        );
        if !fields.contains_key(TYPE_FIELD) {
            fields.insert(
                TYPE_FIELD.to_string(),
                Value::String(DEFAULT_UPDATE_TYPE.to_string()),
            );
        }
        self.connections.broadcast(&Value::Object(fields));
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Data { peer, payload } => match classify(payload) {
                Some(Routed::Control(control)) => self.handle_control(peer, control),
                Some(Routed::Gameplay(payload)) => self.handle_gameplay(payload),
                None => warn!(peer = %peer, "dropping unroutable payload"),
            },
            TransportEvent::Closed { peer } => self.handle_close(peer),
        }
    }

    fn handle_control(&mut self, sender: PeerId, control: ControlMessage) {
        match control {
            ControlMessage::PlayerInfo {
                player_id,
                player_name,
                is_host,
            } => {
                if !self.is_host() {
                    // Guest registries change only through snapshots.
                    debug!(peer = %player_id, "guest ignoring PLAYER_INFO");
                    return;
                }
                self.registry
                    .upsert(player_id, PlayerInfo::new(player_name, is_host));
                self.broadcast_lobby();
            }
            ControlMessage::LobbyState { players } => {
                if self.is_host() {
                    warn!(peer = %sender, "host ignoring injected LOBBY_STATE");
                    return;
                }
                if !self.from_room_host(&sender) {
                    warn!(peer = %sender, "ignoring LOBBY_STATE from non-host peer");
                    return;
                }
                self.registry.replace_all(players);
                self.note_snapshot();
                self.emit(SessionEvent::LobbyUpdated {
                    players: self.registry.snapshot(),
                });
            }
            ControlMessage::GameStart { players } => {
                if self.is_host() {
                    warn!(peer = %sender, "host ignoring injected GAME_START");
                    return;
                }
                if !self.from_room_host(&sender) {
                    warn!(peer = %sender, "ignoring GAME_START from non-host peer");
                    return;
                }
                if self.state == SessionState::InGame {
                    debug!("already in game, GAME_START is a no-op");
                    return;
                }
                self.registry.replace_all(players);
                self.state = SessionState::InGame;
                self.emit(SessionEvent::GameStarted {
                    players: self.registry.snapshot(),
                });
            }
        }
    }

    fn handle_gameplay(&mut self, payload: Value) {
        let sender_id = payload.get(SENDER_ID_FIELD).and_then(Value::as_str);
        if sender_id == Some(self.peer_id.as_str()) {
            debug!("suppressing echoed gameplay update");
            return;
        }
        self.emit(SessionEvent::PeerUpdate { payload });
    }

    /// Channel and registry entries leave together; the host republishes
    /// the shrunken roster, a guest only updates its local view.
    fn handle_close(&mut self, peer: PeerId) {
        if !self.connections.remove(&peer) {
            return;
        }
        info!(peer = %peer, "channel closed");

        if self.registry.remove(&peer).is_none() {
            return;
        }
        if self.is_host() {
            self.broadcast_lobby();
        } else {
            self.emit(SessionEvent::LobbyUpdated {
                players: self.registry.snapshot(),
            });
        }
    }

    /// Host-side snapshot publication: fan out LOBBY_STATE and mirror it to
    /// the local consumer.
    fn broadcast_lobby(&mut self) {
        let players = self.registry.snapshot();
        let message = ControlMessage::LobbyState {
            players: players.clone(),
        };
        self.connections.broadcast(&message.into_value());
        self.note_snapshot();
        self.emit(SessionEvent::LobbyUpdated { players });
    }

    /// Producing or receiving the first snapshot lands the session in the
    /// lobby.
    fn note_snapshot(&mut self) {
        if matches!(self.state, SessionState::Hosting | SessionState::Joining) {
            self.state = SessionState::InLobby;
        }
    }

    fn from_room_host(&self, sender: &PeerId) -> bool {
        self.room_id.as_ref() == Some(sender)
    }
}
