//! Collision clipping for straight-line movement requests
//!
//! A requested path is sampled at fixed chunk intervals. The first sample that
//! lands in an occupied cell (other than the cell the move started in) stops the
//! move one chunk short of that cell. Moves shorter than half a chunk produce
//! zero samples and are never checked against the grid.

use crate::{Cell, Point, World, CHUNK_LENGTH};
use std::collections::HashSet;

/// Read-only view of obstacle occupancy.
pub trait GridQuery {
    fn is_blocked(&self, cell: Cell) -> bool;
}

impl GridQuery for HashSet<Cell> {
    fn is_blocked(&self, cell: Cell) -> bool {
        self.contains(&cell)
    }
}

impl<G: GridQuery + ?Sized> GridQuery for &G {
    fn is_blocked(&self, cell: Cell) -> bool {
        (**self).is_blocked(cell)
    }
}

/// Computes collision-clipped destinations against a grid.
#[derive(Debug, Clone, Copy)]
pub struct MovementValidator {
    world: World,
    chunk_length: f64,
}

impl MovementValidator {
    pub fn new(world: World, chunk_length: f64) -> Self {
        Self {
            world,
            chunk_length,
        }
    }

    pub fn chunk_length(&self) -> f64 {
        self.chunk_length
    }

    /// Returns the furthest reachable point on the path from `start` to `end`.
    ///
    /// If no sample lands on an occupied cell outside the starting cell, `end`
    /// is returned unmodified.
    pub fn clip<G: GridQuery + ?Sized>(&self, start: Point, end: Point, grid: &G) -> Point {
        let start_cell = self.world.cell_of(&start);
        let (step_x, step_y) = unit_step(direction_angle(&start, &end));
        let chunks = (start.distance(&end) / self.chunk_length).round() as u64;

        let mut probe = start;
        for _ in 0..chunks {
            probe.x += step_x * self.chunk_length;
            probe.y += step_y * self.chunk_length;

            let cell = self.world.cell_of(&probe);
            if cell == start_cell {
                continue;
            }
            if grid.is_blocked(cell) {
                return Point::new(
                    probe.x - step_x * self.chunk_length,
                    probe.y - step_y * self.chunk_length,
                );
            }
        }

        end
    }
}

impl Default for MovementValidator {
    fn default() -> Self {
        Self::new(World::default(), CHUNK_LENGTH)
    }
}

/// Angle of the line from `a` to `b`, sign-flipped for a y-down screen.
pub fn direction_angle(a: &Point, b: &Point) -> f64 {
    -(b.y - a.y).atan2(b.x - a.x)
}

/// Unit step vector for an angle produced by [`direction_angle`].
pub fn unit_step(angle: f64) -> (f64, f64) {
    (angle.cos(), -angle.sin())
}
