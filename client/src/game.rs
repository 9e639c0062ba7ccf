//! Local mirror of the authoritative world

use log::{debug, info};
use shared::{Cell, Player, PlayerId, ServerMessage, World};
use std::collections::{HashMap, HashSet};

/// Client-side copy of the server state, rebuilt from `init` and kept current
/// by the broadcasts that follow it.
#[derive(Debug, Clone, Default)]
pub struct ClientWorld {
    world: Option<World>,
    own_id: Option<PlayerId>,
    players: HashMap<PlayerId, Player>,
    blocks: HashSet<Cell>,
    connection_count: usize,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one server message. Everything received before `init` is
    /// dropped, since the mirror has nothing to apply it to yet.
    pub fn apply(&mut self, message: ServerMessage) {
        if !self.is_initialized() && !matches!(message, ServerMessage::Init { .. }) {
            debug!("Ignoring {:?} received before init", message);
            return;
        }

        match message {
            ServerMessage::Init {
                world,
                own_id,
                players,
                blocks,
                connection_count,
            } => {
                info!(
                    "Joined as player {} with {} players and {} blocks",
                    own_id,
                    players.len(),
                    blocks.len()
                );
                self.world = Some(world);
                self.own_id = Some(own_id);
                self.players = players.into_iter().map(|p| (p.id, p)).collect();
                self.blocks = blocks.into_iter().collect();
                self.connection_count = connection_count;
            }
            ServerMessage::PlayerJoined {
                player,
                connection_count,
            } => {
                debug!("Player {} joined", player.id);
                self.players.insert(player.id, player);
                self.connection_count = connection_count;
            }
            ServerMessage::PlayerMoved { id, x, y } => match self.players.get_mut(&id) {
                Some(player) => {
                    player.x = x;
                    player.y = y;
                }
                None => debug!("Ignoring move for unknown player {}", id),
            },
            ServerMessage::ObstaclePlaced { x, y } => {
                self.blocks.insert(Cell::new(x, y));
            }
            ServerMessage::ObstaclesRemoved { blocks } => {
                for cell in &blocks {
                    self.blocks.remove(cell);
                }
            }
            ServerMessage::PlayerLeft {
                id,
                connection_count,
            } => {
                debug!("Player {} left", id);
                self.players.remove(&id);
                self.connection_count = connection_count;
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.own_id.is_some()
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn own_id(&self) -> Option<PlayerId> {
        self.own_id
    }

    pub fn own_player(&self) -> Option<&Player> {
        self.players.get(&self.own_id?)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    pub fn has_block(&self, cell: Cell) -> bool {
        self.blocks.contains(&cell)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_message() -> ServerMessage {
        ServerMessage::Init {
            world: World::default(),
            own_id: 1,
            players: vec![Player::new(0, 300.0, 300.0), Player::new(1, 100.0, 100.0)],
            blocks: vec![Cell::new(2, 2), Cell::new(5, 5)],
            connection_count: 2,
        }
    }

    #[test]
    fn test_init_builds_snapshot() {
        let mut mirror = ClientWorld::new();
        assert!(!mirror.is_initialized());

        mirror.apply(init_message());

        assert!(mirror.is_initialized());
        assert_eq!(mirror.own_id(), Some(1));
        assert_eq!(mirror.own_player().unwrap().position().x, 100.0);
        assert_eq!(mirror.player_count(), 2);
        assert_eq!(mirror.block_count(), 2);
        assert_eq!(mirror.connection_count(), 2);
        assert_eq!(mirror.world().unwrap().cell_width, 40.0);
    }

    #[test]
    fn test_messages_before_init_are_ignored() {
        let mut mirror = ClientWorld::new();
        mirror.apply(ServerMessage::PlayerJoined {
            player: Player::new(4, 1.0, 1.0),
            connection_count: 1,
        });
        mirror.apply(ServerMessage::ObstaclePlaced { x: 1, y: 1 });

        assert_eq!(mirror.player_count(), 0);
        assert_eq!(mirror.block_count(), 0);
        assert_eq!(mirror.connection_count(), 0);
    }

    #[test]
    fn test_players_join_move_and_leave() {
        let mut mirror = ClientWorld::new();
        mirror.apply(init_message());

        mirror.apply(ServerMessage::PlayerJoined {
            player: Player::new(2, 50.0, 60.0),
            connection_count: 3,
        });
        mirror.apply(ServerMessage::PlayerMoved {
            id: 2,
            x: 70.0,
            y: 80.0,
        });
        assert_eq!(mirror.player(2).unwrap(), &Player::new(2, 70.0, 80.0));
        assert_eq!(mirror.connection_count(), 3);

        mirror.apply(ServerMessage::PlayerLeft {
            id: 2,
            connection_count: 2,
        });
        assert!(mirror.player(2).is_none());
        assert_eq!(mirror.connection_count(), 2);
    }

    #[test]
    fn test_move_for_unknown_player_is_ignored() {
        let mut mirror = ClientWorld::new();
        mirror.apply(init_message());
        mirror.apply(ServerMessage::PlayerMoved {
            id: 99,
            x: 1.0,
            y: 1.0,
        });

        assert_eq!(mirror.player_count(), 2);
        assert!(mirror.player(99).is_none());
    }

    #[test]
    fn test_blocks_placed_and_cleared() {
        let mut mirror = ClientWorld::new();
        mirror.apply(init_message());

        mirror.apply(ServerMessage::ObstaclePlaced { x: 7, y: 3 });
        mirror.apply(ServerMessage::ObstaclePlaced { x: 7, y: 3 });
        assert!(mirror.has_block(Cell::new(7, 3)));
        assert_eq!(mirror.block_count(), 3);

        mirror.apply(ServerMessage::ObstaclesRemoved {
            blocks: vec![Cell::new(2, 2), Cell::new(7, 3)],
        });
        assert_eq!(mirror.block_count(), 1);
        assert!(mirror.has_block(Cell::new(5, 5)));
    }
}
