use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the elite set is folded into the generation's best network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMode {
    /// `best.breed(e)` for each elite in index order. Later elites weigh more.
    #[default]
    SequentialFold,
    /// One elementwise mean over `best` and every elite.
    CohortMean,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for the single simulation RNG.
    pub seed: u64,
    /// Number of agents, each owning one network.
    pub population_size: usize,
    /// Fixed timestep in seconds.
    pub dt: f32,
    /// Velocity lost per second of simulated time.
    pub gravity: f32,
    /// Velocity snapped to when an agent flaps.
    pub flap_velocity: f32,
    /// An agent may only flap while its velocity is below this.
    pub flap_velocity_cap: f32,
    /// An agent may only flap while at or below this height.
    pub flap_ceiling: f32,
    /// Agents below this height die.
    pub floor: f32,
    pub spawn_height: f32,
    pub spawn_velocity: f32,
    /// Horizontal pipe speed in units per second.
    pub pipe_speed: f32,
    /// Horizontal distance between consecutive pipes.
    pub pipe_spacing: f32,
    /// `pipe_x` right after a reset.
    pub pipe_start_x: f32,
    /// Once `pipe_x` is at or below this, the front pipe is recycled.
    pub pipe_recycle_x: f32,
    /// Below this `pipe_x` the front pipe counts as passed.
    pub score_zone_x: f32,
    pub half_gap: f32,
    pub pipe_width: f32,
    pub pipe_height: f32,
    /// Fixed horizontal lane of every agent.
    pub agent_x: f32,
    pub agent_width: f32,
    pub agent_height: f32,
    /// Gap centres are drawn uniformly from `[gap_min, gap_min + gap_span)`.
    pub gap_min: f32,
    pub gap_span: f32,
    /// Half-width of the uniform perturbation applied to cloned networks.
    pub mutation_rate: f32,
    /// Networks with at least `floor(best * elite_ratio)` fitness join the elite.
    pub elite_ratio: f32,
    pub crossover: CrossoverMode,
    /// Pause before a generation starts moving at 1x speed.
    pub countdown_secs: f32,
    /// Pause used when the speed multiplier is above 1x.
    pub fast_countdown_secs: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            population_size: 20,
            dt: 1.0 / 60.0,
            gravity: 10.0,
            flap_velocity: 4.0,
            flap_velocity_cap: 1.2,
            flap_ceiling: 420.0,
            floor: 100.0,
            spawn_height: 256.0,
            spawn_velocity: 2.0,
            pipe_speed: 80.0,
            pipe_spacing: 200.0,
            pipe_start_x: 200.0,
            pipe_recycle_x: -54.0,
            score_zone_x: 50.0,
            half_gap: 60.0,
            pipe_width: 52.0,
            pipe_height: 320.0,
            agent_x: 100.0,
            agent_width: 34.0,
            agent_height: 24.0,
            gap_min: 200.0,
            gap_span: 200.0,
            mutation_rate: 0.3,
            elite_ratio: 0.8,
            crossover: CrossoverMode::SequentialFold,
            countdown_secs: 1.0,
            fast_countdown_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimConfigError {
    #[error("population_size must be between 1 and {max}, got {actual}")]
    InvalidPopulationSize { max: usize, actual: usize },
    #[error("dt must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    #[error("mutation_rate must be non-negative and finite, got {0}")]
    InvalidMutationRate(f32),
    #[error("elite_ratio must be within [0, 1], got {0}")]
    InvalidEliteRatio(f32),
    #[error("gap_span must be non-negative and finite, got {0}")]
    InvalidGapSpan(f32),
    #[error("pipe_spacing must be positive, got {0}")]
    InvalidPipeSpacing(f32),
    #[error("{field} must be positive, got {value}")]
    NonPositiveDimension { field: &'static str, value: f32 },
    #[error("countdowns must be non-negative")]
    NegativeCountdown,
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },
}

impl SimConfig {
    pub const MAX_POPULATION: usize = 4096;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.population_size == 0 || self.population_size > Self::MAX_POPULATION {
            return Err(SimConfigError::InvalidPopulationSize {
                max: Self::MAX_POPULATION,
                actual: self.population_size,
            });
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimConfigError::InvalidTimestep(self.dt));
        }
        if !(self.mutation_rate.is_finite() && self.mutation_rate >= 0.0) {
            return Err(SimConfigError::InvalidMutationRate(self.mutation_rate));
        }
        if !(0.0..=1.0).contains(&self.elite_ratio) {
            return Err(SimConfigError::InvalidEliteRatio(self.elite_ratio));
        }
        if !(self.gap_span.is_finite() && self.gap_span >= 0.0) {
            return Err(SimConfigError::InvalidGapSpan(self.gap_span));
        }
        if !(self.pipe_spacing > 0.0) {
            return Err(SimConfigError::InvalidPipeSpacing(self.pipe_spacing));
        }
        for (field, value) in [
            ("pipe_width", self.pipe_width),
            ("pipe_height", self.pipe_height),
            ("agent_width", self.agent_width),
            ("agent_height", self.agent_height),
        ] {
            if !(value > 0.0) {
                return Err(SimConfigError::NonPositiveDimension { field, value });
            }
        }
        if self.countdown_secs < 0.0 || self.fast_countdown_secs < 0.0 {
            return Err(SimConfigError::NegativeCountdown);
        }
        for (field, value) in [
            ("gravity", self.gravity),
            ("flap_velocity", self.flap_velocity),
            ("flap_velocity_cap", self.flap_velocity_cap),
            ("flap_ceiling", self.flap_ceiling),
            ("floor", self.floor),
            ("spawn_height", self.spawn_height),
            ("spawn_velocity", self.spawn_velocity),
            ("pipe_speed", self.pipe_speed),
            ("pipe_spacing", self.pipe_spacing),
            ("pipe_start_x", self.pipe_start_x),
            ("pipe_recycle_x", self.pipe_recycle_x),
            ("score_zone_x", self.score_zone_x),
            ("half_gap", self.half_gap),
            ("pipe_width", self.pipe_width),
            ("pipe_height", self.pipe_height),
            ("agent_x", self.agent_x),
            ("agent_width", self.agent_width),
            ("agent_height", self.agent_height),
            ("gap_min", self.gap_min),
            ("countdown_secs", self.countdown_secs),
            ("fast_countdown_secs", self.fast_countdown_secs),
        ] {
            if !value.is_finite() {
                return Err(SimConfigError::NonFinite { field, value });
            }
        }
        Ok(())
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn empty_population_is_rejected() {
        let config = SimConfig {
            population_size: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InvalidPopulationSize { actual: 0, .. })
        ));
    }

    #[test]
    fn non_finite_physics_is_rejected() {
        let config = SimConfig {
            pipe_speed: f32::NAN,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::NonFinite { field: "pipe_speed", .. })
        ));

        let config = SimConfig {
            pipe_recycle_x: f32::NEG_INFINITY,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::NonFinite { field: "pipe_recycle_x", .. })
        ));
    }

    #[test]
    fn elite_ratio_out_of_range_is_rejected() {
        let config = SimConfig {
            elite_ratio: 1.5,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidEliteRatio(1.5))
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            SimConfig::from_json_str(r#"{"seed": 7, "crossover": "cohort_mean"}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.crossover, CrossoverMode::CohortMean);
        assert_eq!(config.population_size, 20);
        assert_eq!(config.pipe_spacing, 200.0);
    }
}
