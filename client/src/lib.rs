//! # Game Client Library
//!
//! Headless client for the shared-world movement game. It connects to the
//! server over WebSocket, keeps a local mirror of the authoritative world and
//! plans movement requests the way the browser client does.
//!
//! ## Architecture Overview
//!
//! The server is the only authority. A client never moves its own player
//! locally; it asks for a destination and waits for the `player-moved`
//! broadcast that carries the validated position. The mirror is therefore
//! always a (slightly delayed) copy of the server state.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! [`game::ClientWorld`] applies server messages to the local mirror:
//! - Snapshot on `init`
//! - Player arrivals, moves and departures
//! - Block placement and spawn clearing
//!
//! ### Input Module (`input`)
//! [`input::MovementPlanner`] turns a direction into a target one cell away
//! and rate-limits requests on the client side.
//!
//! ### Network Module (`network`)
//! [`network::Connection`] wraps the WebSocket and speaks the JSON protocol.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientWorld;
//! use client::input::MovementPlanner;
//! use client::network::Connection;
//! use std::time::{Duration, Instant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut connection = Connection::connect("ws://127.0.0.1:8081").await?;
//!     connection.join().await?;
//!
//!     let mut world = ClientWorld::new();
//!     while !world.is_initialized() {
//!         match connection.next_message().await? {
//!             Some(message) => world.apply(message),
//!             None => return Ok(()),
//!         }
//!     }
//!
//!     let mut planner = MovementPlanner::new(*world.world().unwrap(), Duration::from_millis(100));
//!     let from = world.own_player().unwrap().position();
//!     if let Some(target) = planner.plan(from, 90.0, Instant::now()) {
//!         connection.send_move(target.x, target.y).await?;
//!     }
//!
//!     connection.close().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
