//! Connection coordinator and authoritative game state
//!
//! [`GameServer`] owns the session registry and the block grid. All connection
//! events are funnelled into it one at a time, so every handler runs with
//! exclusive access to the world and no handler observes a half-applied event.

use crate::config::ServerConfig;
use crate::grid::BlockGrid;
use crate::session::{ConnectionId, Outbox, SessionRegistry};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{ClientMessage, MovementValidator, Player, PlayerId, Point, ServerMessage, World};
use std::net::SocketAddr;

/// Events produced by connection tasks for the coordinator.
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        connection_id: ConnectionId,
        addr: SocketAddr,
        outbox: Outbox,
    },
    Message {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

pub struct GameServer {
    world: World,
    validator: MovementValidator,
    spawn_clearance: i32,
    sessions: SessionRegistry,
    grid: BlockGrid,
    next_player_id: PlayerId,
    rng: StdRng,
}

impl GameServer {
    pub fn new(config: &ServerConfig, grid: BlockGrid) -> Self {
        Self::with_rng(config, grid, StdRng::from_entropy())
    }

    /// Creates a coordinator with a caller-supplied random source for spawns.
    pub fn with_rng(config: &ServerConfig, grid: BlockGrid, rng: StdRng) -> Self {
        Self {
            world: config.world,
            validator: MovementValidator::new(config.world, config.chunk_length),
            spawn_clearance: config.spawn_clearance,
            sessions: SessionRegistry::new(),
            grid,
            next_player_id: 0,
            rng,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Routes an event to its handler.
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected {
                connection_id,
                addr,
                outbox,
            } => self.on_connect(connection_id, addr, outbox),
            ServerEvent::Message {
                connection_id,
                message,
            } => match message {
                ClientMessage::Join => self.on_join(connection_id),
                ClientMessage::Move { x, y } => self.on_move(connection_id, x, y),
                ClientMessage::PlaceObstacle => self.on_place_obstacle(connection_id),
            },
            ServerEvent::Disconnected { connection_id } => self.on_disconnect(connection_id),
        }
    }

    pub fn on_connect(&mut self, connection_id: ConnectionId, addr: SocketAddr, outbox: Outbox) {
        self.sessions.open(connection_id, addr, outbox);
    }

    /// Creates a player for the connection, sends it the full snapshot and
    /// announces it to everyone else.
    pub fn on_join(&mut self, connection_id: ConnectionId) {
        match self.sessions.get(connection_id) {
            None => return,
            Some(session) if session.has_player() => {
                debug!("Connection {} sent join twice, ignoring", connection_id);
                return;
            }
            Some(_) => {}
        }

        let player = self.spawn();
        self.sessions.bind_player(connection_id, player.clone());
        let connection_count = self.connection_count();
        info!(
            "Player {} joined on connection {} at ({}, {}), {} connected",
            player.id, connection_id, player.x, player.y, connection_count
        );

        if let Some(session) = self.sessions.get(connection_id) {
            session.send(ServerMessage::Init {
                world: self.world,
                own_id: player.id,
                players: self.sessions.players(),
                blocks: self.grid.list_all(),
                connection_count,
            });
        }

        self.broadcast(
            ServerMessage::PlayerJoined {
                player,
                connection_count,
            },
            Some(connection_id),
        );
    }

    /// Clamps the requested destination, clips it against the grid and
    /// broadcasts the resulting position to every player, the mover included.
    pub fn on_move(&mut self, connection_id: ConnectionId, x: f64, y: f64) {
        let start = match self.sessions.player(connection_id) {
            Some(player) => player.position(),
            None => return,
        };

        let destination = self.sanitize(x, y);
        let end = self.validator.clip(start, destination, &self.grid);

        let Some(player) = self.sessions.player_mut(connection_id) else {
            return;
        };
        player.set_position(end);
        let moved = ServerMessage::PlayerMoved {
            id: player.id,
            x: player.x,
            y: player.y,
        };
        debug!(
            "Player {} moved ({:.1}, {:.1}) -> ({:.1}, {:.1}), requested ({:.1}, {:.1})",
            player.id, start.x, start.y, end.x, end.y, x, y
        );

        self.broadcast(moved, None);
    }

    /// Drops a block on the cell under the requesting player.
    pub fn on_place_obstacle(&mut self, connection_id: ConnectionId) {
        let Some(player) = self.sessions.player(connection_id) else {
            return;
        };
        let cell = self.world.cell_of(&player.position());
        let player_id = player.id;

        if !self.grid.add(cell) {
            debug!("Player {} re-placed existing block {:?}", player_id, cell);
            return;
        }

        debug!("Player {} placed block at {:?}", player_id, cell);
        self.broadcast(ServerMessage::ObstaclePlaced { x: cell.x, y: cell.y }, None);
    }

    /// Releases the connection's session and announces the departure of its
    /// player, if it had one.
    pub fn on_disconnect(&mut self, connection_id: ConnectionId) {
        let Some(session) = self.sessions.close(connection_id) else {
            return;
        };
        let Some(player) = session.player else {
            return;
        };

        let connection_count = self.connection_count();
        info!("Player {} left, {} connected", player.id, connection_count);
        self.broadcast(
            ServerMessage::PlayerLeft {
                id: player.id,
                connection_count,
            },
            None,
        );
    }

    /// Number of connections with a joined player.
    pub fn connection_count(&self) -> usize {
        self.sessions.connection_count()
    }

    /// Picks a random starting position, clears the obstacles around it and
    /// allocates a new player id. Players already in the game are told which
    /// blocks were removed.
    pub fn spawn(&mut self) -> Player {
        let position = self.starting_position();
        let cell = self.world.cell_of(&position);
        let cleared = self.grid.clear_near(cell, self.spawn_clearance);
        if !cleared.is_empty() {
            debug!("Cleared {} blocks around spawn cell {:?}", cleared.len(), cell);
            self.broadcast(ServerMessage::ObstaclesRemoved { blocks: cleared }, None);
        }

        let id = self.next_player_id;
        self.next_player_id += 1;
        Player::new(id, position.x, position.y)
    }

    /// Clamps a requested position into the world's valid range.
    pub fn sanitize(&self, x: f64, y: f64) -> Point {
        self.world.clamp(x, y)
    }

    /// Uniformly random whole-pixel position within the valid range.
    fn starting_position(&mut self) -> Point {
        let x = self
            .rng
            .gen_range(self.world.min_x().ceil() as i64..=self.world.max_x().floor() as i64);
        let y = self
            .rng
            .gen_range(self.world.min_y().ceil() as i64..=self.world.max_y().floor() as i64);
        Point::new(x as f64, y as f64)
    }

    /// Queues a message for every joined session except `exclude`.
    fn broadcast(&self, message: ServerMessage, exclude: Option<ConnectionId>) {
        for session in self.sessions.joined() {
            if Some(session.connection_id) == exclude {
                continue;
            }
            session.send(message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::Cell;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn game_with_grid(grid: BlockGrid) -> GameServer {
        GameServer::with_rng(&ServerConfig::default(), grid, StdRng::seed_from_u64(7))
    }

    fn game() -> GameServer {
        game_with_grid(BlockGrid::new())
    }

    fn connect(
        game: &mut GameServer,
        connection_id: ConnectionId,
    ) -> UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        game.handle_event(ServerEvent::Connected {
            connection_id,
            addr: test_addr(),
            outbox: tx,
        });
        rx
    }

    fn send(game: &mut GameServer, connection_id: ConnectionId, message: ClientMessage) {
        game.handle_event(ServerEvent::Message {
            connection_id,
            message,
        });
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn own_id(messages: &[ServerMessage]) -> PlayerId {
        match &messages[0] {
            ServerMessage::Init { own_id, .. } => *own_id,
            other => panic!("Expected init, got {:?}", other),
        }
    }

    fn place_player(game: &mut GameServer, connection_id: ConnectionId, x: f64, y: f64) {
        game.sessions
            .player_mut(connection_id)
            .unwrap()
            .set_position(Point::new(x, y));
    }

    #[test]
    fn test_join_sends_init_snapshot() {
        let grid: BlockGrid = [Cell::new(50, 25)].into_iter().collect();
        let mut game = game_with_grid(grid);
        let mut rx = connect(&mut game, 1);

        send(&mut game, 1, ClientMessage::Join);

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::Init {
                world,
                own_id,
                players,
                blocks,
                connection_count,
            } => {
                assert_eq!(*world, World::default());
                assert_eq!(*own_id, 0);
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, 0);
                assert_eq!(*connection_count, 1);
                assert_eq!(*blocks, game.grid().list_all());
            }
            other => panic!("Expected init, got {:?}", other),
        }
    }

    #[test]
    fn test_join_notifies_others_only() {
        let mut game = game();
        let mut rx1 = connect(&mut game, 1);
        let mut rx2 = connect(&mut game, 2);
        send(&mut game, 1, ClientMessage::Join);
        drain(&mut rx1);

        send(&mut game, 2, ClientMessage::Join);

        let first = drain(&mut rx1);
        let second = drain(&mut rx2);
        assert_eq!(first.len(), 1);
        match &first[0] {
            ServerMessage::PlayerJoined {
                player,
                connection_count,
            } => {
                assert_eq!(player.id, 1);
                assert_eq!(*connection_count, 2);
            }
            other => panic!("Expected player-joined, got {:?}", other),
        }
        assert_eq!(second.len(), 1);
        match &second[0] {
            ServerMessage::Init { players, own_id, .. } => {
                assert_eq!(*own_id, 1);
                let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
                assert_eq!(ids, vec![0, 1]);
            }
            other => panic!("Expected init, got {:?}", other),
        }
    }

    #[test]
    fn test_second_join_is_ignored() {
        let mut game = game();
        let mut rx = connect(&mut game, 1);
        send(&mut game, 1, ClientMessage::Join);
        send(&mut game, 1, ClientMessage::Join);

        assert_eq!(drain(&mut rx).len(), 1);
        assert_eq!(game.sessions().player(1).unwrap().id, 0);
        assert_eq!(game.connection_count(), 1);
    }

    #[test]
    fn test_events_before_join_are_ignored() {
        let mut game = game();
        let mut rx = connect(&mut game, 1);

        send(&mut game, 1, ClientMessage::Move { x: 500.0, y: 500.0 });
        send(&mut game, 1, ClientMessage::PlaceObstacle);
        game.on_disconnect(1);

        assert!(drain(&mut rx).is_empty());
        assert!(game.grid().is_empty());
        assert!(game.sessions().is_empty());
    }

    #[test]
    fn test_events_from_unknown_connection_are_ignored() {
        let mut game = game();
        send(&mut game, 42, ClientMessage::Join);
        send(&mut game, 42, ClientMessage::Move { x: 1.0, y: 1.0 });
        game.handle_event(ServerEvent::Disconnected { connection_id: 42 });
        assert_eq!(game.connection_count(), 0);
    }

    #[test]
    fn test_move_broadcasts_to_everyone() {
        let mut game = game();
        let mut rx1 = connect(&mut game, 1);
        let mut rx2 = connect(&mut game, 2);
        send(&mut game, 1, ClientMessage::Join);
        send(&mut game, 2, ClientMessage::Join);
        let id = own_id(&drain(&mut rx1));
        drain(&mut rx2);

        send(&mut game, 1, ClientMessage::Move { x: 640.0, y: 480.0 });

        let expected = ServerMessage::PlayerMoved {
            id,
            x: 640.0,
            y: 480.0,
        };
        assert_eq!(drain(&mut rx1), vec![expected.clone()]);
        assert_eq!(drain(&mut rx2), vec![expected]);
        assert_eq!(game.sessions().player(1).unwrap().position(), Point::new(640.0, 480.0));
    }

    #[test]
    fn test_move_is_clamped_into_world() {
        let mut game = game();
        let mut rx = connect(&mut game, 1);
        send(&mut game, 1, ClientMessage::Join);
        drain(&mut rx);

        for (x, y) in [(-500.0, -500.0), (1e7, 1e7), (3000.0, 40.0), (5.0, 1190.0)] {
            send(&mut game, 1, ClientMessage::Move { x, y });
            let player = game.sessions().player(1).unwrap();
            assert!(game.world().contains(&player.position()), "{:?}", player);
        }
        assert_eq!(game.sessions().player(1).unwrap().position(), Point::new(16.0, 1168.0));
    }

    #[test]
    fn test_move_is_clipped_by_block() {
        let mut game = game();
        let mut rx = connect(&mut game, 1);
        send(&mut game, 1, ClientMessage::Join);
        drain(&mut rx);
        game.grid.add(Cell::new(2, 10));
        place_player(&mut game, 1, 100.0, 100.0);

        send(&mut game, 1, ClientMessage::Move { x: 100.0, y: 500.0 });

        let player = game.sessions().player(1).unwrap();
        assert_approx_eq!(player.x, 100.0, 1e-9);
        assert_approx_eq!(player.y, 380.0, 1e-9);
    }

    #[test]
    fn test_place_obstacle_uses_player_cell() {
        let mut game = game();
        let mut rx1 = connect(&mut game, 1);
        let mut rx2 = connect(&mut game, 2);
        send(&mut game, 1, ClientMessage::Join);
        send(&mut game, 2, ClientMessage::Join);
        drain(&mut rx1);
        drain(&mut rx2);
        place_player(&mut game, 1, 130.0, 95.0);

        send(&mut game, 1, ClientMessage::PlaceObstacle);

        let expected = ServerMessage::ObstaclePlaced { x: 3, y: 2 };
        assert_eq!(drain(&mut rx1), vec![expected.clone()]);
        assert_eq!(drain(&mut rx2), vec![expected]);
        assert!(game.grid().contains(Cell::new(3, 2)));
    }

    #[test]
    fn test_place_obstacle_is_idempotent() {
        let mut game = game();
        let mut rx = connect(&mut game, 1);
        send(&mut game, 1, ClientMessage::Join);
        drain(&mut rx);
        place_player(&mut game, 1, 300.0, 300.0);

        send(&mut game, 1, ClientMessage::PlaceObstacle);
        send(&mut game, 1, ClientMessage::PlaceObstacle);

        assert_eq!(game.grid().len(), 1);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_disconnect_notifies_remaining_players() {
        let mut game = game();
        let mut rx1 = connect(&mut game, 1);
        let mut rx2 = connect(&mut game, 2);
        send(&mut game, 1, ClientMessage::Join);
        send(&mut game, 2, ClientMessage::Join);
        drain(&mut rx1);
        let departing = own_id(&drain(&mut rx2));

        game.handle_event(ServerEvent::Disconnected { connection_id: 2 });
        game.handle_event(ServerEvent::Disconnected { connection_id: 2 });

        assert_eq!(
            drain(&mut rx1),
            vec![ServerMessage::PlayerLeft {
                id: departing,
                connection_count: 1,
            }]
        );
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(game.connection_count(), 1);
    }

    #[test]
    fn test_connection_count_tracks_joins_and_leaves() {
        let mut game = game();
        let mut receivers = Vec::new();
        for connection_id in 1..=5 {
            receivers.push(connect(&mut game, connection_id));
        }
        for connection_id in [1, 2, 4] {
            send(&mut game, connection_id, ClientMessage::Join);
        }
        assert_eq!(game.connection_count(), 3);

        game.on_disconnect(2);
        game.on_disconnect(3);
        assert_eq!(game.connection_count(), 2);
        assert_eq!(game.connection_count(), game.sessions().players().len());

        send(&mut game, 5, ClientMessage::Join);
        assert_eq!(game.connection_count(), 3);
    }

    #[test]
    fn test_player_ids_are_never_reused() {
        let mut game = game();
        let _rx1 = connect(&mut game, 1);
        send(&mut game, 1, ClientMessage::Join);
        game.on_disconnect(1);

        let mut rx2 = connect(&mut game, 2);
        send(&mut game, 2, ClientMessage::Join);

        assert_eq!(own_id(&drain(&mut rx2)), 1);
    }

    #[test]
    fn test_spawn_is_in_bounds_and_cleared() {
        let grid: BlockGrid = (0..57)
            .flat_map(|x| (0..30).map(move |y| Cell::new(x, y)))
            .collect();
        let mut game = game_with_grid(grid);

        for _ in 0..50 {
            let player = game.spawn();
            let position = player.position();
            assert!(game.world().contains(&position));
            assert_eq!(position.x.fract(), 0.0);

            let cell = game.world().cell_of(&position);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    assert!(!game.grid().contains(Cell::new(cell.x + dx, cell.y + dy)));
                }
            }
        }
    }

    #[test]
    fn test_spawn_clearance_is_announced() {
        let grid: BlockGrid = (0..57)
            .flat_map(|x| (0..30).map(move |y| Cell::new(x, y)))
            .collect();
        let mut game = game_with_grid(grid);
        let mut rx1 = connect(&mut game, 1);
        send(&mut game, 1, ClientMessage::Join);
        drain(&mut rx1);
        let _rx2 = connect(&mut game, 2);

        send(&mut game, 2, ClientMessage::Join);

        let messages = drain(&mut rx1);
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            ServerMessage::ObstaclesRemoved { blocks } => {
                assert!(!blocks.is_empty());
                assert!(blocks.iter().all(|cell| !game.grid().contains(*cell)));
            }
            other => panic!("Expected obstacles-removed, got {:?}", other),
        }
        assert!(matches!(messages[1], ServerMessage::PlayerJoined { .. }));
    }

    #[test]
    fn test_spawn_allocates_monotonic_ids() {
        let mut game = game();
        let ids: Vec<PlayerId> = (0..4).map(|_| game.spawn().id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sanitize_clamps() {
        let game = game();
        assert_eq!(game.sanitize(-1.0, 5000.0), Point::new(16.0, 1168.0));
        assert_eq!(game.sanitize(100.0, 200.0), Point::new(100.0, 200.0));
    }
}
