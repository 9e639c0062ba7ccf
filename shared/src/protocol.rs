//! JSON wire messages exchanged over the WebSocket connection.
//!
//! Every frame is a single JSON object tagged by a `"type"` field.

use crate::{Cell, Player, PlayerId, World};
use serde::{Deserialize, Serialize};

/// Requests sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join,
    Move { x: f64, y: f64 },
    PlaceObstacle,
}

/// Notifications sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Full snapshot, sent once to a connection right after it joins.
    #[serde(rename_all = "camelCase")]
    Init {
        world: World,
        own_id: PlayerId,
        players: Vec<Player>,
        blocks: Vec<Cell>,
        connection_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player: Player,
        connection_count: usize,
    },
    PlayerMoved { id: PlayerId, x: f64, y: f64 },
    ObstaclePlaced { x: i32, y: i32 },
    /// Blocks cleared to make room for a spawning player.
    ObstaclesRemoved { blocks: Vec<Cell> },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        id: PlayerId,
        connection_count: usize,
    },
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
