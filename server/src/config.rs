//! Server configuration

use shared::{World, CHUNK_LENGTH};
use std::path::PathBuf;
use thiserror::Error;

/// Largest spawn clearance radius, in cells, accepted at startup.
pub const MAX_SPAWN_CLEARANCE: i32 = 16;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("World dimensions must be positive, got {0}x{1}")]
    WorldSize(f64, f64),

    #[error("Cell dimensions must be positive, got {0}x{1}")]
    CellSize(f64, f64),

    #[error("Sprite {0}x{1} leaves no whole-pixel positions in the world")]
    SpriteSize(f64, f64),

    #[error("Chunk length must be positive, got {0}")]
    ChunkLength(f64),

    #[error("Spawn clearance must be between 0 and {max}, got {0}", max = MAX_SPAWN_CLEARANCE)]
    SpawnClearance(i32),
}

/// Runtime settings for a game server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub world: World,
    /// Sampling interval, in pixels, used when checking paths for obstacles.
    pub chunk_length: f64,
    /// Radius in cells cleared around each spawn point.
    pub spawn_clearance: i32,
    /// Block file; `None` keeps blocks in memory only.
    pub blocks_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if !(world.width > 0.0 && world.height > 0.0) {
            return Err(ConfigError::WorldSize(world.width, world.height));
        }
        if !(world.cell_width > 0.0 && world.cell_height > 0.0) {
            return Err(ConfigError::CellSize(world.cell_width, world.cell_height));
        }
        if !(world.sprite_width >= 0.0
            && world.sprite_height >= 0.0
            && world.min_x().ceil() <= world.max_x().floor()
            && world.min_y().ceil() <= world.max_y().floor())
        {
            return Err(ConfigError::SpriteSize(
                world.sprite_width,
                world.sprite_height,
            ));
        }
        if !(self.chunk_length > 0.0) {
            return Err(ConfigError::ChunkLength(self.chunk_length));
        }
        if !(0..=MAX_SPAWN_CLEARANCE).contains(&self.spawn_clearance) {
            return Err(ConfigError::SpawnClearance(self.spawn_clearance));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8081".to_string(),
            world: World::default(),
            chunk_length: CHUNK_LENGTH,
            spawn_clearance: 1,
            blocks_file: None,
        }
    }
}
