//! Simulated annealing over item orderings, decoded by BLF.
//!
//! The initial order is descending volume. Each neighbor swaps two items and
//! is re-packed from scratch by a BLF pass that keeps the perturbed order.
//! The cost is `(placed count, utilization %)`, compared lexicographically.

use crate::blf::{run_blf, sort_items, SortPolicy};
use crate::item::Item;
use crate::placer::{PlaceOutcome, Placer};
use lanepack_core::config::{ProgressCallback, ProgressInfo};
use lanepack_core::geometry::Box3;
use lanepack_core::sa::{PermutationSolution, SaConfig, SaCost, SaProblem, SaRunner, SaSolution};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Packing cost: placed count first, utilization percent second.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct PackingCost {
    /// Number of placed items.
    pub placed: usize,
    /// Placed volume as a percentage of the usable region volume.
    pub utilization: f64,
}

impl PackingCost {
    /// Scalar form `100 * placed + utilization`, monotone in the lexicographic order.
    pub fn score(&self) -> f64 {
        100.0 * self.placed as f64 + self.utilization
    }
}

impl SaCost for PackingCost {
    fn energy_delta(&self, previous: &Self) -> f64 {
        100.0 * (self.placed as f64 - previous.placed as f64)
            + (self.utilization - previous.utilization)
    }
}

/// Annealing problem for one region.
pub struct SaPackingProblem<'a> {
    items: Vec<&'a Item>,
    region: Box3,
    occupied: Vec<Box3>,
    usable_volume: f64,
    tolerance: f64,
    gap: f64,
    label: String,
    max_iterations: u64,
    progress: Option<&'a ProgressCallback>,
    started: Instant,
}

impl<'a> SaPackingProblem<'a> {
    /// Creates a problem; `items` are sorted by descending volume for the initial order.
    pub fn new(
        items: &[&'a Item],
        region: Box3,
        occupied: &[Box3],
        tolerance: f64,
        gap: f64,
    ) -> Self {
        let mut items = items.to_vec();
        sort_items(&mut items, SortPolicy::DescendingVolume);

        let blocked: f64 = occupied.iter().map(|b| b.overlap_volume(&region)).sum();
        let usable_volume = (region.volume() - blocked).max(0.0);

        Self {
            items,
            region,
            occupied: occupied.to_vec(),
            usable_volume,
            tolerance,
            gap,
            label: String::new(),
            max_iterations: 0,
            progress: None,
            started: Instant::now(),
        }
    }

    /// Attaches a progress callback reported after every temperature step.
    pub fn with_progress(
        mut self,
        label: impl Into<String>,
        max_iterations: u64,
        progress: Option<&'a ProgressCallback>,
    ) -> Self {
        self.label = label.into();
        self.max_iterations = max_iterations;
        self.progress = progress;
        self
    }

    /// Returns the number of items.
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Volume available to items (region minus obstacles).
    pub fn usable_volume(&self) -> f64 {
        self.usable_volume
    }

    /// Decodes an order into placements with one BLF pass.
    pub fn decode(&self, solution: &PermutationSolution<PackingCost>) -> PlaceOutcome {
        let ordered: Vec<&Item> = solution
            .sequence
            .iter()
            .filter_map(|&idx| self.items.get(idx).copied())
            .collect();
        run_blf(&ordered, &self.region, &self.occupied, self.tolerance, self.gap)
    }

    fn cost_of(&self, outcome: &PlaceOutcome) -> PackingCost {
        let utilization = if self.usable_volume > 0.0 {
            outcome.placed_volume() / self.usable_volume * 100.0
        } else {
            0.0
        };
        PackingCost {
            placed: outcome.placed.len(),
            utilization,
        }
    }
}

impl SaProblem for SaPackingProblem<'_> {
    type Solution = PermutationSolution<PackingCost>;

    fn initial_solution<R: rand::Rng>(&self, _rng: &mut R) -> Self::Solution {
        PermutationSolution::new(self.items.len())
    }

    fn neighbor<R: rand::Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution {
        solution.apply_swap(rng)
    }

    fn has_neighbors(&self) -> bool {
        self.items.len() >= 2
    }

    fn evaluate(&self, solution: &mut Self::Solution) {
        let outcome = self.decode(solution);
        solution.set_objective(self.cost_of(&outcome));
    }

    fn on_temperature_change(
        &self,
        temperature: f64,
        iteration: u64,
        best: &Self::Solution,
        _current: &Self::Solution,
    ) {
        let cost = best.objective();
        log::debug!(
            "Annealing '{}' iteration {}: temp={:.4}, placed={}, utilization={:.2}%",
            self.label,
            iteration,
            temperature,
            cost.placed,
            cost.utilization
        );
        if let Some(callback) = self.progress {
            callback(ProgressInfo {
                partition_id: self.label.clone(),
                iteration,
                max_iterations: self.max_iterations,
                best_placed: cost.placed,
                best_utilization: cost.utilization,
                elapsed_ms: self.started.elapsed().as_millis() as u64,
            });
        }
    }
}

/// Runs annealing for one region and decodes the best order.
///
/// Unplaced items are the input items whose ids are absent from the best
/// placement, in input order.
pub fn run_sa_packing(
    problem: SaPackingProblem<'_>,
    sa_config: SaConfig,
    restarts: usize,
    cancelled: Arc<AtomicBool>,
) -> PlaceOutcome {
    let runner = SaRunner::new(sa_config, problem).with_cancel_flag(cancelled);
    let sa_result = runner.run_parallel(restarts);
    let problem = runner.problem();

    let mut outcome = problem.decode(&sa_result.best);
    let placed_ids: HashSet<&str> = outcome.placed.iter().map(|p| p.item_id.as_str()).collect();
    let unplaced: Vec<String> = problem
        .items
        .iter()
        .filter(|item| !placed_ids.contains(item.id()))
        .map(|item| item.id().to_string())
        .collect();

    outcome.unplaced = unplaced;
    outcome.iterations = sa_result.iterations;
    outcome.history = sa_result.history.iter().map(PackingCost::score).collect();
    outcome.cancelled = sa_result.cancelled;
    outcome
}

/// BLF searched over orderings by simulated annealing.
pub struct AnnealingPlacer<'a> {
    tolerance: f64,
    gap: f64,
    sa_config: SaConfig,
    restarts: usize,
    cancelled: Arc<AtomicBool>,
    label: String,
    progress: Option<&'a ProgressCallback>,
}

impl<'a> AnnealingPlacer<'a> {
    /// Creates an annealing placer.
    pub fn new(tolerance: f64, gap: f64, sa_config: SaConfig, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            tolerance,
            gap,
            sa_config,
            restarts: 1,
            cancelled,
            label: String::new(),
            progress: None,
        }
    }

    /// Sets the number of parallel restarts.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Sets the progress label and callback.
    pub fn with_progress(
        mut self,
        label: impl Into<String>,
        progress: Option<&'a ProgressCallback>,
    ) -> Self {
        self.label = label.into();
        self.progress = progress;
        self
    }
}

impl Placer for AnnealingPlacer<'_> {
    fn name(&self) -> &'static str {
        "BlfAnnealing"
    }

    fn place(&self, items: &[&Item], region: &Box3, occupied: &[Box3]) -> PlaceOutcome {
        let max_iterations = self.sa_config.max_iterations.unwrap_or(0);
        let problem = SaPackingProblem::new(items, *region, occupied, self.tolerance, self.gap)
            .with_progress(self.label.clone(), max_iterations, self.progress);
        run_sa_packing(
            problem,
            self.sa_config.clone(),
            self.restarts,
            self.cancelled.clone(),
        )
    }
}
