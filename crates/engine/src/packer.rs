//! Run orchestration.
//!
//! A run validates its input, rejects items no orientation can fit into the
//! container, plans lanes (or adopts caller zones), packs every partition
//! with the configured strategy and finally hands the leftovers to the
//! overflow manager. All run state is local to one call.

use crate::blf::BlfPlacer;
use crate::container::Container;
use crate::grid_stack::GridStacker;
use crate::item::{validate_batch, Group, Item};
use crate::overflow::{OverflowManager, OverflowOutcome};
use crate::partition::{Layout, Partition};
use crate::placer::Placer;
use crate::planner::LanePlanner;
use crate::request::PackingRequest;
use crate::row_fill::RowFiller;
use crate::sa_packing::AnnealingPlacer;
use lanepack_core::config::{Config, ProgressCallback, Strategy};
use lanepack_core::geometry::Box3;
use lanepack_core::placement::Placement;
use lanepack_core::result::{PackingResult, UnplacedItem, UnplacedReason};
use lanepack_core::rotation::is_fittable;
use lanepack_core::Result;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Everything one run packs.
struct RunInput {
    container: Container,
    items: Vec<Item>,
    groups: Vec<Group>,
    zones: Vec<Partition>,
    obstacles: Vec<Box3>,
}

/// Group-aware 3D packer.
pub struct Packer {
    config: Config,
    cancelled: Arc<AtomicBool>,
}

impl Packer {
    /// Creates a new packer with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a packer with default configuration.
    pub fn default_config() -> Self {
        Self::new(Config::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the flag that [`Packer::cancel`] sets, for use from callbacks or other threads.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Requests cancellation of the running optimization.
    ///
    /// The run stops between optimizer iterations and returns its best result so far.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Packs a request.
    pub fn pack(&self, request: &PackingRequest) -> Result<PackingResult> {
        self.cancelled.store(false, Ordering::Relaxed);
        self.pack_request(request, None)
    }

    /// Packs a request, reporting optimizer progress to `callback`.
    pub fn pack_with_progress(
        &self,
        request: &PackingRequest,
        callback: ProgressCallback,
    ) -> Result<PackingResult> {
        self.cancelled.store(false, Ordering::Relaxed);
        self.pack_request(request, Some(&callback))
    }

    /// Packs items into planned lanes of `container`.
    pub fn pack_items(
        &self,
        container: &Container,
        items: &[Item],
        groups: &[Group],
    ) -> Result<PackingResult> {
        self.config.validate()?;
        container.validate()?;
        validate_batch(items, groups)?;
        self.cancelled.store(false, Ordering::Relaxed);

        let input = RunInput {
            container: container.clone(),
            items: items.to_vec(),
            groups: groups.to_vec(),
            zones: Vec::new(),
            obstacles: Vec::new(),
        };
        Ok(self.run(input, &self.config, None))
    }

    /// Packs independent requests in parallel.
    pub fn pack_batch(&self, requests: &[PackingRequest]) -> Vec<Result<PackingResult>> {
        self.cancelled.store(false, Ordering::Relaxed);
        requests
            .par_iter()
            .map(|request| self.pack_request(request, None))
            .collect()
    }

    fn pack_request(
        &self,
        request: &PackingRequest,
        progress: Option<&ProgressCallback>,
    ) -> Result<PackingResult> {
        let config = request.apply_overrides(self.config.clone());
        config.validate()?;
        request.validate()?;

        let input = RunInput {
            container: request.container(),
            items: request.items(),
            groups: request.groups.clone(),
            zones: request.partitions(),
            obstacles: request.obstacles(),
        };
        Ok(self.run(input, &config, progress))
    }

    fn placer_for<'a>(
        &self,
        config: &Config,
        label: &str,
        progress: Option<&'a ProgressCallback>,
    ) -> Box<dyn Placer + 'a> {
        let tol = config.tolerance;
        let gap = config.gap;
        match config.strategy {
            Strategy::BlfAnnealing => Box::new(
                AnnealingPlacer::new(tol, gap, config.sa_config(), self.cancelled.clone())
                    .with_restarts(config.restarts)
                    .with_progress(label, progress),
            ),
            Strategy::Blf => Box::new(BlfPlacer::new(tol, gap)),
            Strategy::GridStack => {
                Box::new(GridStacker::new(tol).with_scan_order(config.grid_scan_order))
            }
            Strategy::RowFill => Box::new(RowFiller::new(tol, gap)),
        }
    }

    fn run(
        &self,
        input: RunInput,
        config: &Config,
        progress: Option<&ProgressCallback>,
    ) -> PackingResult {
        let start = Instant::now();
        let mut result = PackingResult::new().with_strategy(config.strategy.name());
        result.total_volume = input.container.volume();
        let bounds = *input.container.bounds();

        let order: HashMap<&str, usize> = input
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id(), i))
            .collect();

        let mut fittable: Vec<&Item> = Vec::with_capacity(input.items.len());
        for item in &input.items {
            if is_fittable(item.dims(), item.orientation_constraint(), &bounds) {
                fittable.push(item);
            } else {
                log::debug!("Item '{}' exceeds the container in every orientation", item.id());
                result
                    .unplaced
                    .push(UnplacedItem::new(item.id(), UnplacedReason::TooLarge));
            }
        }

        let mut layout = if input.zones.is_empty() {
            LanePlanner::from_config(config).plan(&input.container, &input.groups, &fittable)
        } else {
            Layout::from_zones(input.zones, Vec::new())
        };
        layout.obstacles = input.obstacles;

        // Route each item to its partition; items without one go straight to overflow.
        let mut batches: Vec<Vec<&Item>> = vec![Vec::new(); layout.partitions.len()];
        let mut failures: Vec<(Option<usize>, &Item)> = Vec::new();
        for item in fittable {
            let target = if item.is_confirmed() {
                layout.lane_for_group(item.group_id())
            } else {
                layout.first_groupless()
            };
            match target {
                Some(idx) => batches[idx].push(item),
                None => failures.push((None, item)),
            }
        }

        for (idx, batch) in batches.iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            let partition_id = layout.partitions[idx].id.clone();
            let region = layout.partitions[idx].bounds;
            let occupied = layout.occupied_in(idx);

            let placer = self.placer_for(config, &partition_id, progress);
            let outcome = placer.place(batch, &region, &occupied);
            log::debug!(
                "{} packed '{}': {} placed, {} unplaced",
                placer.name(),
                partition_id,
                outcome.placed.len(),
                outcome.unplaced.len()
            );

            result.iterations += outcome.iterations;
            result.cancelled |= outcome.cancelled;
            if !outcome.history.is_empty() {
                result.best_cost_history = outcome.history;
            }
            for placed in outcome.placed {
                layout.partitions[idx].record(placed);
            }
            for id in &outcome.unplaced {
                if let Some(item) = batch.iter().find(|item| item.id() == id.as_str()).copied() {
                    failures.push((Some(idx), item));
                }
            }
        }

        failures.sort_by_key(|(_, item)| order.get(item.id()).copied().unwrap_or(usize::MAX));
        let manager = OverflowManager::new(config.overflow_policy, config.tolerance, config.gap)
            .with_overflow_partition(input.container.overflow_partition_id().map(str::to_string));
        for (source, item) in failures {
            match manager.resolve(&mut layout, source, item) {
                OverflowOutcome::Borrowed(op) => result.borrow_ops.push(op),
                OverflowOutcome::Spilled(op) => result.spill_ops.push(op),
                OverflowOutcome::Unplaced => result
                    .unplaced
                    .push(UnplacedItem::new(item.id(), UnplacedReason::NoSpaceAvailable)),
            }
        }

        for partition in &layout.partitions {
            for placed in &partition.placed {
                result.placements.push(Placement::new(
                    placed.item_id.clone(),
                    partition.id.clone(),
                    placed.pose,
                    placed.rotated,
                ));
            }
        }
        result.partitions = layout.summaries();
        result.recompute_utilization();
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        result.message = format!(
            "{}/{} items placed",
            result.placed_count(),
            input.items.len()
        );
        if result.cancelled {
            result.message.push_str(" (cancelled)");
        }

        log::info!("Packing finished: {}", result.summary());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanepack_core::config::OverflowPolicy;
    use lanepack_core::geometry::EPS;

    #[test]
    fn test_simple_packing() {
        let items: Vec<Item> = (0..5)
            .map(|i| Item::new(format!("B{i}"), "G1", 20.0, 20.0, 20.0))
            .collect();
        let container = Container::new(100.0, 80.0, 50.0);
        let packer = Packer::new(Config::default().with_seed(1));

        let result = packer.pack_items(&container, &items, &[]).unwrap();
        assert_eq!(result.placed_count(), 5);
        assert!(result.utilization > 0.0);
        assert_eq!(result.strategy, "BlfAnnealing");
        assert_eq!(result.partitions.len(), 1);
    }

    #[test]
    fn test_placements_within_container() {
        let items: Vec<Item> = (0..12)
            .map(|i| Item::new(format!("B{i}"), "G1", 25.0, 30.0, 20.0))
            .collect();
        let container = Container::new(100.0, 60.0, 40.0);

        for strategy in [
            Strategy::Blf,
            Strategy::GridStack,
            Strategy::RowFill,
            Strategy::BlfAnnealing,
        ] {
            let packer = Packer::new(Config::default().with_strategy(strategy).with_seed(3));
            let result = packer.pack_items(&container, &items, &[]).unwrap();
            for p in &result.placements {
                assert!(p.pose.fits_in(container.bounds(), EPS), "{strategy:?}");
            }
            assert_eq!(result.placed_count() + result.unplaced_count(), items.len());
        }
    }

    #[test]
    fn test_rejects_invalid_items() {
        let packer = Packer::default_config();
        let container = Container::new(10.0, 10.0, 10.0);
        let err = packer.pack_items(&container, &[], &[]).unwrap_err();
        assert_eq!(err.code(), "EMPTY_REQUEST");

        let items = vec![Item::new("A", "G1", 0.0, 1.0, 1.0)];
        let err = packer.pack_items(&container, &items, &[]).unwrap_err();
        assert_eq!(err.code(), "INVALID_ITEM");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let packer = Packer::new(Config::default().with_cooling_rate(1.5));
        let container = Container::new(10.0, 10.0, 10.0);
        let items = vec![Item::new("A", "G1", 1.0, 1.0, 1.0)];
        let err = packer.pack_items(&container, &items, &[]).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_skipped_lane_items_spill_to_deferred() {
        let container = Container::new(10.0, 10.0, 10.0);
        let items = vec![
            Item::new("A1", "A", 5.0, 5.0, 5.0),
            Item::new("U1", "A", 5.0, 5.0, 5.0).with_confirmed(false),
            Item::new("B1", "B", 0.001, 0.001, 0.001),
        ];
        let packer = Packer::new(
            Config::default()
                .with_strategy(Strategy::Blf)
                .with_overflow_policy(OverflowPolicy::BorrowFirst),
        );
        let result = packer.pack_items(&container, &items, &[]).unwrap();

        assert!(result.partition("LANE_B").is_none());
        assert_eq!(result.spill_ops.len(), 1);
        assert_eq!(result.spill_ops[0].item_id, "B1");
        assert_eq!(result.spill_ops[0].to, "LANE_DEFERRED");
        assert!(result.all_placed());
    }

    #[test]
    fn test_cancel_flag_is_reset_per_run() {
        let packer = Packer::new(Config::default().with_seed(2));
        packer.cancel();
        let container = Container::new(10.0, 10.0, 10.0);
        let items = vec![Item::new("A", "G1", 1.0, 1.0, 1.0)];
        let result = packer.pack_items(&container, &items, &[]).unwrap();
        assert!(!result.cancelled);
        assert_eq!(result.iterations, 100);
    }
}
