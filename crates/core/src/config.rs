//! Packing strategies and run configuration.

use crate::geometry::{Axis, EPS};
use crate::sa::SaConfig;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Placement strategy used inside each partition.
///
/// The strategy is always chosen by the caller; it is never inferred from the
/// size of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Strategy {
    /// Bottom-Left-Fill searched over item orderings by simulated annealing.
    #[default]
    BlfAnnealing,
    /// A single Bottom-Left-Fill pass (items sorted by ascending height).
    Blf,
    /// Uniform slot lattice sized by the largest item (fast, coarse).
    GridStack,
    /// Greedy row/layer fill in the given order (fastest, no rotation).
    RowFill,
}

impl Strategy {
    /// Returns the display name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::BlfAnnealing => "BlfAnnealing",
            Strategy::Blf => "Blf",
            Strategy::GridStack => "GridStack",
            Strategy::RowFill => "RowFill",
        }
    }
}

/// What to do when an item does not fit in its own partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum OverflowPolicy {
    /// Borrow from a neighbor first, then spill to the overflow partition.
    #[default]
    BorrowFirst,
    /// Spill to the overflow partition first, then borrow from a neighbor.
    SpillFirst,
    /// Never borrow or spill; the item is unplaced.
    Disabled,
}

/// Which point of a placed box is reported as its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PositionConvention {
    /// The world-frame min corner.
    #[default]
    MinCorner,
    /// The world-frame center.
    Center,
}

/// Configuration for a packing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Placement strategy.
    pub strategy: Strategy,

    /// Overflow policy.
    pub overflow_policy: OverflowPolicy,

    /// Tolerance for containment and intersection tests.
    pub tolerance: f64,

    /// Minimum gap kept between placed boxes.
    pub gap: f64,

    /// Annealing iteration budget.
    pub max_iterations: u64,

    /// Annealing start temperature.
    pub initial_temp: f64,

    /// Geometric cooling factor applied after every iteration.
    pub cooling_rate: f64,

    /// Seed for the annealing RNG (None = entropy).
    pub seed: Option<u64>,

    /// Number of independent annealing restarts run in parallel.
    pub restarts: usize,

    /// Maximum annealing time per partition in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,

    /// Axis along which the planner cuts lanes.
    pub split_axis: Axis,

    /// Lanes thinner than this along the split axis are skipped.
    pub min_lane_thickness: f64,

    /// Grid stacker scan order: outer, middle, inner axis.
    pub grid_scan_order: [Axis; 3],

    /// Reported position convention.
    pub position_convention: PositionConvention,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            overflow_policy: OverflowPolicy::default(),
            tolerance: EPS,
            gap: 0.0,
            max_iterations: 100,
            initial_temp: 1.0,
            cooling_rate: 0.99,
            seed: None,
            restarts: 1,
            time_limit_ms: 0,
            split_axis: Axis::X,
            min_lane_thickness: 0.05,
            grid_scan_order: [Axis::Y, Axis::Z, Axis::X],
            position_convention: PositionConvention::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the placement strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the overflow policy.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Sets the geometric tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Sets the minimum gap between boxes.
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap.max(0.0);
        self
    }

    /// Sets the annealing iteration budget.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Sets the annealing start temperature.
    pub fn with_initial_temp(mut self, temp: f64) -> Self {
        self.initial_temp = temp;
        self
    }

    /// Sets the cooling factor.
    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the number of parallel annealing restarts.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Sets the time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the lane split axis.
    pub fn with_split_axis(mut self, axis: Axis) -> Self {
        self.split_axis = axis;
        self
    }

    /// Sets the minimum lane thickness.
    pub fn with_min_lane_thickness(mut self, thickness: f64) -> Self {
        self.min_lane_thickness = thickness.max(0.0);
        self
    }

    /// Sets the grid stacker scan order.
    pub fn with_grid_scan_order(mut self, order: [Axis; 3]) -> Self {
        self.grid_scan_order = order;
        self
    }

    /// Sets the reported position convention.
    pub fn with_position_convention(mut self, convention: PositionConvention) -> Self {
        self.position_convention = convention;
        self
    }

    /// Checks the configuration for values the engine cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.tolerance.is_finite() || !self.gap.is_finite() {
            return Err(crate::Error::ConfigError(
                "Tolerance and gap must be finite".into(),
            ));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(crate::Error::ConfigError(format!(
                "Cooling rate must be in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if self.initial_temp <= 0.0 {
            return Err(crate::Error::ConfigError(
                "Initial temperature must be positive".into(),
            ));
        }
        let mut seen = [false; 3];
        for axis in self.grid_scan_order {
            seen[axis.index()] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(crate::Error::ConfigError(
                "Grid scan order must name every axis exactly once".into(),
            ));
        }
        Ok(())
    }

    /// Builds the annealing configuration derived from this config.
    pub fn sa_config(&self) -> SaConfig {
        let mut sa = SaConfig::default()
            .with_initial_temp(self.initial_temp)
            .with_cooling_rate(self.cooling_rate)
            .with_max_iterations(self.max_iterations);
        if self.time_limit_ms > 0 {
            sa = sa.with_time_limit(Duration::from_millis(self.time_limit_ms));
        }
        if let Some(seed) = self.seed {
            sa = sa.with_seed(seed);
        }
        sa
    }
}

/// Progress callback for long-running runs.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

/// Progress information reported between optimizer iterations.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Partition currently being optimized.
    pub partition_id: String,
    /// Iterations completed in this partition.
    pub iteration: u64,
    /// Iteration budget.
    pub max_iterations: u64,
    /// Items placed by the best solution so far.
    pub best_placed: usize,
    /// Utilization (percent) of the best solution so far.
    pub best_utilization: f64,
    /// Elapsed time in milliseconds since the run started.
    pub elapsed_ms: u64,
}

impl ProgressInfo {
    /// Returns progress in percent for the current partition.
    pub fn percent(&self) -> f64 {
        if self.max_iterations == 0 {
            return 100.0;
        }
        (self.iteration as f64 / self.max_iterations as f64 * 100.0).min(100.0)
    }
}
