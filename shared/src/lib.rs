//! Geometry, movement rules and wire protocol shared by the server and client.
//!
//! Coordinates are floating-point pixels with a downward-positive y axis. The
//! world is partitioned into a grid of cells; obstacles ("blocks") occupy whole
//! cells and are addressed by integer cell coordinates.

use serde::{Deserialize, Serialize};

pub mod movement;
pub mod protocol;

pub use movement::{GridQuery, MovementValidator};
pub use protocol::{ClientMessage, ServerMessage};

pub const WORLD_WIDTH: f64 = 2250.0;
pub const WORLD_HEIGHT: f64 = 1200.0;
pub const SPRITE_WIDTH: f64 = 32.0;
pub const SPRITE_HEIGHT: f64 = 32.0;
pub const CELL_WIDTH: f64 = 40.0;
pub const CELL_HEIGHT: f64 = 40.0;
pub const CHUNK_LENGTH: f64 = 20.0;

pub type PlayerId = u32;

/// A position in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A grid cell, addressed by integer cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Immutable world parameters, fixed at server startup and sent to every
/// client in its initialization snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub width: f64,
    pub height: f64,
    pub sprite_width: f64,
    pub sprite_height: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl World {
    pub fn min_x(&self) -> f64 {
        self.sprite_width / 2.0
    }

    pub fn max_x(&self) -> f64 {
        self.width - self.sprite_width
    }

    pub fn min_y(&self) -> f64 {
        self.sprite_height / 2.0
    }

    pub fn max_y(&self) -> f64 {
        self.height - self.sprite_height
    }

    /// Clamps each axis independently into the valid coordinate range.
    pub fn clamp(&self, x: f64, y: f64) -> Point {
        Point {
            x: x.min(self.max_x()).max(self.min_x()),
            y: y.min(self.max_y()).max(self.min_y()),
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        (self.min_x()..=self.max_x()).contains(&point.x)
            && (self.min_y()..=self.max_y()).contains(&point.y)
    }

    /// Returns the cell containing a pixel position.
    pub fn cell_of(&self, point: &Point) -> Cell {
        Cell {
            x: (point.x / self.cell_width).floor() as i32,
            y: (point.y / self.cell_height).floor() as i32,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            sprite_width: SPRITE_WIDTH,
            sprite_height: SPRITE_HEIGHT,
            cell_width: CELL_WIDTH,
            cell_height: CELL_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub x: f64,
    pub y: f64,
}

impl Player {
    pub fn new(id: PlayerId, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, point: Point) {
        self.x = point.x;
        self.y = point.y;
    }
}
