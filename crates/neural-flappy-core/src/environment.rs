//! Single-lane obstacle course: a queue of upcoming gap heights scrolling
//! toward a fixed agent column, plus score and cross-generation records.

use crate::config::SimConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const OBSTACLE_COUNT: usize = 4;

/// Axis-aligned rectangle anchored at its lower-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict overlap. Rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

#[derive(Clone, Debug)]
pub struct Environment {
    /// Gap centres of the next pipes, nearest first.
    pub(crate) obstacles: [f32; OBSTACLE_COUNT],
    /// Horizontal offset of the nearest pipe.
    pub(crate) pipe_x: f32,
    pub(crate) score: u32,
    pub(crate) score_lock: bool,
    pub(crate) countdown: f32,
    pub(crate) generation: u32,
    pub(crate) best_score: u32,
    pub(crate) best_score_generation: u32,
}

impl Environment {
    pub fn new<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let mut env = Self {
            obstacles: [0.0; OBSTACLE_COUNT],
            pipe_x: config.pipe_start_x,
            score: 0,
            score_lock: false,
            countdown: 0.0,
            generation: 0,
            best_score: 0,
            best_score_generation: 0,
        };
        env.reset(config, rng, false);
        env
    }

    /// Start a new generation's course. `fast` selects the short countdown
    /// used when the simulation is fast-forwarded.
    pub fn reset<R: Rng + ?Sized>(&mut self, config: &SimConfig, rng: &mut R, fast: bool) {
        self.pipe_x = config.pipe_start_x;
        self.score = 0;
        self.score_lock = false;
        self.countdown = if fast {
            config.fast_countdown_secs
        } else {
            config.countdown_secs
        };
        for gap in &mut self.obstacles {
            *gap = Self::random_gap(config, rng);
        }
    }

    pub(crate) fn clear_records(&mut self, generation: u32) {
        self.generation = generation;
        self.best_score = 0;
        self.best_score_generation = 0;
    }

    pub(crate) fn advance_generation(&mut self) {
        self.generation = self.generation.saturating_add(1);
    }

    fn random_gap<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> f32 {
        config.gap_min + rng.random::<f32>() * config.gap_span
    }

    /// Burn down the pre-generation pause. Returns true while physics
    /// should still be skipped.
    pub(crate) fn tick_countdown(&mut self, dt: f32) -> bool {
        if self.countdown > 0.0 {
            self.countdown -= dt;
        }
        self.countdown > 0.0
    }

    pub(crate) fn advance_pipes(&mut self, config: &SimConfig) {
        self.pipe_x -= config.pipe_speed * config.dt;
    }

    /// Gap the agents steer toward. Once the front pipe is in the
    /// just-passed zone the next one takes over.
    pub fn current_gap(&self, config: &SimConfig) -> f32 {
        if self.pipe_x < config.score_zone_x {
            self.obstacles[1]
        } else {
            self.obstacles[0]
        }
    }

    /// Count the front pipe as passed, at most once per pipe cycle.
    pub(crate) fn update_score(&mut self, config: &SimConfig) {
        if self.pipe_x < config.score_zone_x && !self.score_lock {
            self.score += 1;
            if self.score > self.best_score {
                self.best_score = self.score;
                self.best_score_generation = self.generation;
            }
            self.score_lock = true;
        }
    }

    /// Horizontal distance from the agent lane to the pipe ahead of it.
    pub fn sensing_distance(&self, config: &SimConfig) -> f32 {
        let mut x = self.pipe_x;
        if x < config.agent_x {
            x += config.pipe_spacing;
        }
        x - config.agent_x
    }

    /// Upper and lower rectangles of the front pipe.
    pub fn pipe_rects(&self, config: &SimConfig) -> (Rect, Rect) {
        let gap = self.obstacles[0];
        let upper = Rect::new(
            self.pipe_x,
            gap + config.half_gap,
            config.pipe_width,
            config.pipe_height,
        );
        let lower = Rect::new(
            self.pipe_x,
            gap - config.half_gap - config.pipe_height,
            config.pipe_width,
            config.pipe_height,
        );
        (upper, lower)
    }

    pub fn agent_rect(config: &SimConfig, position: f32) -> Rect {
        Rect::new(
            config.agent_x,
            position - config.agent_height / 2.0,
            config.agent_width,
            config.agent_height,
        )
    }

    /// True if an agent at `position` hits the front pipe or the floor.
    pub fn collides(&self, config: &SimConfig, position: f32) -> bool {
        let agent = Self::agent_rect(config, position);
        let (upper, lower) = self.pipe_rects(config);
        agent.overlaps(&lower) || agent.overlaps(&upper) || position < config.floor
    }

    /// Shift the queue once the front pipe has scrolled past the rear
    /// threshold. Returns true if a pipe was recycled.
    pub(crate) fn recycle_pipe<R: Rng + ?Sized>(&mut self, config: &SimConfig, rng: &mut R) -> bool {
        if self.pipe_x > config.pipe_recycle_x {
            return false;
        }
        self.pipe_x += config.pipe_spacing;
        self.obstacles.copy_within(1.., 0);
        self.obstacles[OBSTACLE_COUNT - 1] = Self::random_gap(config, rng);
        self.score_lock = false;
        true
    }

    pub fn obstacles(&self) -> &[f32; OBSTACLE_COUNT] {
        &self.obstacles
    }

    pub fn pipe_x(&self) -> f32 {
        self.pipe_x
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown > 0.0
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn best_score_generation(&self) -> u32 {
        self.best_score_generation
    }
}
