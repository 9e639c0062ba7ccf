//! Movement planning with a client-side request delay

use shared::{Point, World};
use std::time::{Duration, Instant};

pub const DEFAULT_MOVE_DELAY: Duration = Duration::from_millis(100);

/// Turns direction angles into movement requests one cell away.
///
/// The delay between requests is a courtesy to the server only; the server
/// accepts requests at any rate.
#[derive(Debug, Clone)]
pub struct MovementPlanner {
    world: World,
    move_delay: Duration,
    last_move: Option<Instant>,
}

impl MovementPlanner {
    pub fn new(world: World, move_delay: Duration) -> Self {
        Self {
            world,
            move_delay,
            last_move: None,
        }
    }

    pub fn can_move_again(&self, now: Instant) -> bool {
        match self.last_move {
            Some(last) => now.saturating_duration_since(last) >= self.move_delay,
            None => true,
        }
    }

    /// Target one cell away from `from` in the direction of `angle_deg`,
    /// measured counter-clockwise from the positive x axis. Screen y grows
    /// downward, hence the subtraction.
    pub fn compute_movement(&self, from: Point, angle_deg: f64) -> Point {
        let angle = angle_deg.to_radians();
        Point::new(
            from.x + angle.cos() * self.world.cell_width,
            from.y - angle.sin() * self.world.cell_height,
        )
    }

    /// Returns the next target if the delay has elapsed, recording `now` as
    /// the time of the request.
    pub fn plan(&mut self, from: Point, angle_deg: f64, now: Instant) -> Option<Point> {
        if !self.can_move_again(now) {
            return None;
        }
        self.last_move = Some(now);
        Some(self.compute_movement(from, angle_deg))
    }
}
