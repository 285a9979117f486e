//! Simulated annealing over caller-defined solutions.
//!
//! The runner maximizes a [`SaCost`]. A strictly better neighbor is always
//! accepted; any other neighbor is accepted with probability
//! `exp(delta / T)`, where `delta` is the (non-positive) energy difference
//! reported by the cost type.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the annealing runner.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SaConfig {
    /// Initial temperature.
    pub initial_temp: f64,
    /// Temperature at which a run without an iteration budget stops.
    pub final_temp: f64,
    /// Geometric cooling factor: `T_new = T * cooling_rate`.
    pub cooling_rate: f64,
    /// Number of iterations at each temperature level.
    pub iterations_per_temp: usize,
    /// Iteration budget. When set, the run ends only when the budget is spent
    /// (or on time limit or cancel); otherwise it ends at `final_temp`.
    pub max_iterations: Option<u64>,
    /// Maximum time limit (None = unlimited).
    pub time_limit: Option<Duration>,
    /// RNG seed (None = entropy).
    pub seed: Option<u64>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temp: 1.0,
            final_temp: 1e-4,
            cooling_rate: 0.99,
            iterations_per_temp: 1,
            max_iterations: Some(100),
            time_limit: None,
            seed: None,
        }
    }
}

impl SaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial temperature.
    pub fn with_initial_temp(mut self, temp: f64) -> Self {
        self.initial_temp = temp.max(1e-9);
        self
    }

    /// Sets the final temperature.
    pub fn with_final_temp(mut self, temp: f64) -> Self {
        self.final_temp = temp.max(1e-12);
        self
    }

    /// Sets the cooling rate.
    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate.clamp(0.001, 0.9999);
        self
    }

    /// Sets the iterations per temperature level.
    pub fn with_iterations_per_temp(mut self, iterations: usize) -> Self {
        self.iterations_per_temp = iterations.max(1);
        self
    }

    /// Sets the maximum iterations.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, duration: Duration) -> Self {
        self.time_limit = Some(duration);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A cost the runner maximizes.
pub trait SaCost: Copy + PartialOrd + Debug + Default + Send + Sync {
    /// Energy difference `self - previous`, used in the acceptance rule.
    fn energy_delta(&self, previous: &Self) -> f64;
}

impl SaCost for f64 {
    fn energy_delta(&self, previous: &Self) -> f64 {
        self - previous
    }
}

/// Trait for solutions in simulated annealing.
pub trait SaSolution: Clone + Send + Sync {
    /// Cost type; higher is better.
    type Cost: SaCost;

    /// Returns the cached cost of this solution.
    fn objective(&self) -> Self::Cost;

    /// Caches the cost of this solution.
    fn set_objective(&mut self, value: Self::Cost);
}

/// Trait for problem-specific annealing operations.
pub trait SaProblem: Send + Sync {
    /// The solution type for this problem.
    type Solution: SaSolution;

    /// Creates an initial solution.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Generates a neighbor solution.
    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution;

    /// Evaluates and caches the cost of a solution.
    fn evaluate(&self, solution: &mut Self::Solution);

    /// False when no neighbor differs from its source, e.g. a single item.
    fn has_neighbors(&self) -> bool {
        true
    }

    /// Called after each temperature level.
    fn on_temperature_change(
        &self,
        _temperature: f64,
        _iteration: u64,
        _best: &Self::Solution,
        _current: &Self::Solution,
    ) {
    }
}

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct SaResult<S: SaSolution> {
    /// The best solution found.
    pub best: S,
    /// Final temperature reached.
    pub final_temperature: f64,
    /// Total iterations performed.
    pub iterations: u64,
    /// Number of accepted moves.
    pub accepted: u64,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// Whether the run stopped because of the cancel flag.
    pub cancelled: bool,
    /// Best cost after the initial solution and after every temperature level.
    pub history: Vec<S::Cost>,
}

/// Simulated annealing runner.
pub struct SaRunner<P: SaProblem> {
    config: SaConfig,
    problem: P,
    cancelled: Arc<AtomicBool>,
}

impl<P: SaProblem> SaRunner<P> {
    /// Creates a new runner.
    pub fn new(config: SaConfig, problem: P) -> Self {
        Self {
            config,
            problem,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an existing cancel flag with this runner.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Returns a handle to cancel the run.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Returns the problem being solved.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs with an RNG seeded from the config (or entropy).
    pub fn run(&self) -> SaResult<P::Solution> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(&mut rng)
    }

    /// Runs with a specific RNG.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> SaResult<P::Solution> {
        let start = Instant::now();

        let mut current = self.problem.initial_solution(rng);
        self.problem.evaluate(&mut current);
        let mut best = current.clone();
        let mut history = vec![best.objective()];

        let mut temperature = self.config.initial_temp;
        let mut iteration = 0u64;
        let mut accepted = 0u64;
        let mut cancelled = false;

        if !self.problem.has_neighbors() {
            return SaResult {
                best,
                final_temperature: temperature,
                iterations: 0,
                accepted: 0,
                elapsed: start.elapsed(),
                cancelled: false,
                history,
            };
        }

        'outer: loop {
            if self.config.max_iterations.is_none() && temperature <= self.config.final_temp {
                break;
            }
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            if let Some(limit) = self.config.time_limit {
                if start.elapsed() > limit {
                    break;
                }
            }
            if let Some(max) = self.config.max_iterations {
                if iteration >= max {
                    break;
                }
            }

            for _ in 0..self.config.iterations_per_temp {
                iteration += 1;

                let mut neighbor = self.problem.neighbor(&current, rng);
                self.problem.evaluate(&mut neighbor);

                let candidate = neighbor.objective();
                let accept = if candidate > current.objective() {
                    true
                } else {
                    let delta = candidate.energy_delta(&current.objective());
                    rng.gen::<f64>() < (delta / temperature).exp()
                };

                if accept {
                    accepted += 1;
                    current = neighbor;
                    if current.objective() > best.objective() {
                        best = current.clone();
                    }
                }

                if let Some(max) = self.config.max_iterations {
                    if iteration >= max {
                        history.push(best.objective());
                        break 'outer;
                    }
                }
            }

            history.push(best.objective());
            self.problem
                .on_temperature_change(temperature, iteration, &best, &current);
            // Stays positive: the acceptance rule divides by it.
            temperature = (temperature * self.config.cooling_rate).max(f64::MIN_POSITIVE);
        }

        SaResult {
            best,
            final_temperature: temperature,
            iterations: iteration,
            accepted,
            elapsed: start.elapsed(),
            cancelled,
            history,
        }
    }

    /// Runs `num_restarts` independent runs in parallel and keeps the best.
    ///
    /// With a configured seed, restart `i` uses `seed + i`, so the outcome is
    /// reproducible. Ties go to the lowest restart index.
    pub fn run_parallel(&self, num_restarts: usize) -> SaResult<P::Solution> {
        let num_restarts = num_restarts.max(1);
        if num_restarts == 1 {
            return self.run();
        }

        let results: Vec<SaResult<P::Solution>> = (0..num_restarts)
            .into_par_iter()
            .map(|i| {
                let mut rng = match self.config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => StdRng::from_entropy(),
                };
                self.run_with_rng(&mut rng)
            })
            .collect();

        results
            .into_iter()
            .reduce(|best, next| {
                if next.best.objective() > best.best.objective() {
                    next
                } else {
                    best
                }
            })
            .unwrap_or_else(|| self.run())
    }
}

/// Permutation-based solution.
#[derive(Debug, Clone)]
pub struct PermutationSolution<C: SaCost = f64> {
    /// The permutation (indices).
    pub sequence: Vec<usize>,
    objective: C,
}

impl<C: SaCost> PermutationSolution<C> {
    /// Creates the identity permutation.
    pub fn new(size: usize) -> Self {
        Self::from_sequence((0..size).collect())
    }

    /// Wraps an existing order.
    pub fn from_sequence(sequence: Vec<usize>) -> Self {
        Self {
            sequence,
            objective: C::default(),
        }
    }

    /// Returns the length of the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Swaps two distinct positions. Sequences shorter than two are returned unchanged.
    pub fn apply_swap<R: Rng>(&self, rng: &mut R) -> Self {
        let mut result = self.clone();
        let n = result.sequence.len();
        if n < 2 {
            return result;
        }

        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        result.sequence.swap(i, j);
        result.objective = C::default();
        result
    }
}

impl<C: SaCost> SaSolution for PermutationSolution<C> {
    type Cost = C;

    fn objective(&self) -> C {
        self.objective
    }

    fn set_objective(&mut self, value: C) {
        self.objective = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct SortProblem {
        size: usize,
    }

    impl SaProblem for SortProblem {
        type Solution = PermutationSolution;

        fn initial_solution<R: Rng>(&self, _rng: &mut R) -> Self::Solution {
            PermutationSolution::from_sequence((0..self.size).rev().collect())
        }

        fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution {
            solution.apply_swap(rng)
        }

        fn evaluate(&self, solution: &mut Self::Solution) {
            let mut inversions = 0i64;
            for i in 0..solution.sequence.len() {
                for j in (i + 1)..solution.sequence.len() {
                    if solution.sequence[i] > solution.sequence[j] {
                        inversions += 1;
                    }
                }
            }
            solution.set_objective(-inversions as f64);
        }

        fn has_neighbors(&self) -> bool {
            self.size >= 2
        }
    }

    #[test]
    fn test_sa_improves() {
        let config = SaConfig::default()
            .with_initial_temp(10.0)
            .with_final_temp(0.01)
            .with_cooling_rate(0.95)
            .with_iterations_per_temp(20)
            .with_max_iterations(4000)
            .with_seed(1);

        let runner = SaRunner::new(config, SortProblem { size: 10 });
        let result = runner.run();

        assert!(result.best.objective() > -20.0);
        assert!(result.iterations > 0);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_history_is_non_decreasing() {
        let config = SaConfig::default().with_max_iterations(200).with_seed(3);
        let result = SaRunner::new(config, SortProblem { size: 8 }).run();

        assert!(result.history.len() >= 2);
        for pair in result.history.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(result.history.last().copied(), Some(result.best.objective()));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let config = SaConfig::default().with_max_iterations(150).with_seed(42);
        let a = SaRunner::new(config.clone(), SortProblem { size: 9 }).run();
        let b = SaRunner::new(config, SortProblem { size: 9 }).run();
        assert_eq!(a.best.sequence, b.best.sequence);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_budget_outlasts_final_temperature() {
        let config = SaConfig::default()
            .with_final_temp(0.5)
            .with_max_iterations(2000)
            .with_seed(5);
        let result = SaRunner::new(config, SortProblem { size: 5 }).run();
        assert_eq!(result.iterations, 2000);
        assert!(result.final_temperature > 0.0);
    }

    #[test]
    fn test_unbudgeted_run_stops_at_final_temperature() {
        let config = SaConfig {
            max_iterations: None,
            ..SaConfig::default().with_final_temp(0.5).with_seed(5)
        };
        let result = SaRunner::new(config, SortProblem { size: 5 }).run();
        // 0.99^69 is the first power at or below 0.5.
        assert_eq!(result.iterations, 69);
    }

    #[test]
    fn test_single_element_has_no_moves() {
        let result = SaRunner::new(SaConfig::default(), SortProblem { size: 1 }).run();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.history.len(), 1);
    }

    #[test]
    fn test_cancel_stops_immediately() {
        let runner = SaRunner::new(SaConfig::default(), SortProblem { size: 6 });
        runner.cancel_handle().store(true, Ordering::Relaxed);
        let result = runner.run();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_parallel_restarts() {
        let config = SaConfig::default().with_max_iterations(100).with_seed(9);
        let runner = SaRunner::new(config, SortProblem { size: 7 });
        let single = runner.run();
        let parallel = runner.run_parallel(4);
        assert!(parallel.best.objective() >= single.best.objective());
    }

    #[test]
    fn test_swap_keeps_permutation() {
        let mut rng = StdRng::seed_from_u64(11);
        let solution: PermutationSolution = PermutationSolution::from_sequence(vec![3, 0, 4, 1, 2]);

        for _ in 0..20 {
            let swapped = solution.apply_swap(&mut rng);
            assert_ne!(swapped.sequence, solution.sequence);
            let mut sorted = swapped.sequence.clone();
            sorted.sort();
            assert_eq!(sorted, (0..5).collect::<Vec<_>>());
        }

        let single: PermutationSolution = PermutationSolution::new(1);
        assert_eq!(single.apply_swap(&mut rng).sequence, vec![0]);
    }
}
