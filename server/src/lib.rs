//! # Game Server Library
//!
//! Authoritative server for the shared-world movement game. It owns the
//! canonical set of players and placed blocks, validates every requested move
//! against the block grid and broadcasts the outcome to every joined client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Movement
//! Clients only ever *request* a destination. The server clamps it to the
//! world, walks the straight path in fixed-length chunks and stops the player
//! one chunk short of the first occupied cell. The resulting position is what
//! every client sees, including the one that asked.
//!
//! ### Session Management
//! Handles the lifecycle of each WebSocket connection:
//! - Connection registration on accept
//! - Player spawn and binding on `join`
//! - Cleanup and departure broadcast on disconnect
//!
//! ### Block Grid
//! Players drop blocks on the cell under them. Blocks persist across restarts
//! through a [`store::BlockStore`] and are only ever removed to clear space
//! around a freshly spawned player.
//!
//! ## Architecture Design
//!
//! ### Single Coordinator
//! Each connection runs its own reader and writer task, but all decisions are
//! made by one [`game::GameServer`] that consumes connection events from a
//! single channel. Events from one connection are therefore handled in the
//! order they arrived and no two handlers ever overlap.
//!
//! ### JSON over WebSocket
//! Messages are small JSON objects tagged by `"type"` (see
//! [`shared::protocol`]). Malformed frames are logged and dropped without
//! closing the connection.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! World geometry, movement tuning, bind address and block file location.
//!
//! ### Game Module (`game`)
//! The coordinator: join, move, place-obstacle and disconnect handling.
//!
//! ### Grid Module (`grid`)
//! In-memory block set with a background writer mirroring it to a store.
//!
//! ### Network Module (`network`)
//! Listener, per-connection tasks and the event loop.
//!
//! ### Session Module (`session`)
//! Connection registry and per-connection outboxes.
//!
//! ### Store Module (`store`)
//! File-backed and in-memory block stores.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::game::GameServer;
//! use server::grid::BlockGrid;
//! use server::network::Server;
//! use server::store::MemoryBlockStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig::default();
//!     config.validate()?;
//!
//!     let (grid, _writer) = BlockGrid::load(MemoryBlockStore::new())?;
//!     let game = GameServer::new(&config, grid);
//!
//!     let server = Server::bind(&config.bind_addr, game).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod grid;
pub mod network;
pub mod session;
pub mod store;
