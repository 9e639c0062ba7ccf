//! Session registry for live connections
//!
//! Each WebSocket connection gets a session as soon as it is accepted. A
//! session carries the connection's outbox and, once the client has sent
//! `join`, the player it controls. Sessions without a player are invisible to
//! gameplay: they are not counted, not listed and receive no broadcasts.

use log::info;
use shared::{Player, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// Server-assigned identifier for a connection.
pub type ConnectionId = u64;

/// Outbound message queue drained by the connection's writer task.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// A live connection and the player bound to it, if any.
#[derive(Debug)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    pub player: Option<Player>,
    outbox: Outbox,
}

impl Session {
    pub fn new(connection_id: ConnectionId, addr: SocketAddr, outbox: Outbox) -> Self {
        Self {
            connection_id,
            addr,
            connected_at: Instant::now(),
            player: None,
            outbox,
        }
    }

    /// Queues a message for delivery. Returns false if the connection's
    /// writer has already shut down.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbox.send(message).is_ok()
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }
}

/// Maps connection identifiers to sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection. Returns false if the id is
    /// already in use.
    pub fn open(&mut self, connection_id: ConnectionId, addr: SocketAddr, outbox: Outbox) -> bool {
        if self.sessions.contains_key(&connection_id) {
            return false;
        }
        info!("Connection {} opened from {}", connection_id, addr);
        self.sessions
            .insert(connection_id, Session::new(connection_id, addr, outbox));
        true
    }

    /// Removes a connection's session, returning it if it existed.
    pub fn close(&mut self, connection_id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection_id)?;
        info!(
            "Connection {} from {} closed after {:.1}s",
            connection_id,
            session.addr,
            session.connected_at.elapsed().as_secs_f32()
        );
        Some(session)
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    /// Binds a player to a connection that does not have one yet.
    pub fn bind_player(&mut self, connection_id: ConnectionId, player: Player) -> bool {
        match self.sessions.get_mut(&connection_id) {
            Some(session) if session.player.is_none() => {
                session.player = Some(player);
                true
            }
            _ => false,
        }
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.sessions.get(&connection_id)?.player.as_ref()
    }

    pub fn player_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Player> {
        self.sessions.get_mut(&connection_id)?.player.as_mut()
    }

    /// All bound players, ordered by id.
    pub fn players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self
            .sessions
            .values()
            .filter_map(|session| session.player.clone())
            .collect();
        players.sort_by_key(|player| player.id);
        players
    }

    /// Sessions that have a bound player.
    pub fn joined(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().filter(|session| session.has_player())
    }

    /// Number of sessions with a bound player, counted on every call.
    pub fn connection_count(&self) -> usize {
        self.joined().count()
    }

    /// Total number of open connections, joined or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
