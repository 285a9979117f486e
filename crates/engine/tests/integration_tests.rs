//! Integration tests for lanepack-engine.

use approx::assert_relative_eq;
use lanepack_core::config::{Config, OverflowPolicy, PositionConvention, Strategy};
use lanepack_core::geometry::{intersects, vec3, Axis, Box3, EPS};
use lanepack_core::result::{BorrowOp, PackingResult, UnplacedReason};
use lanepack_engine::blf::{BlfPlacer, SortPolicy};
use lanepack_engine::bsp::BspTree;
use lanepack_engine::{Container, Group, Item, Packer, PackingRequest, PackingResponse, Placer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn blf_packer() -> Packer {
    Packer::new(Config::default().with_strategy(Strategy::Blf))
}

fn assert_run_invariants(result: &PackingResult, item_ids: &[&str], obstacles: &[Box3]) {
    for (i, a) in result.placements.iter().enumerate() {
        for b in &result.placements[i + 1..] {
            assert!(
                !intersects(&a.pose, &b.pose, EPS),
                "'{}' overlaps '{}'",
                a.item_id,
                b.item_id
            );
        }
        for obstacle in obstacles {
            assert!(!intersects(&a.pose, obstacle, EPS), "'{}' overlaps an obstacle", a.item_id);
        }
        let partition = result
            .partition(&a.partition_id)
            .expect("placement references a known partition");
        assert!(
            a.pose.fits_in(&partition.bounds, EPS),
            "'{}' leaves partition '{}'",
            a.item_id,
            partition.id
        );
    }

    for p in &result.partitions {
        assert!(
            p.used_volume <= p.reserved_volume + p.borrowed_in - p.borrowed_out + 1e-6,
            "partition '{}' over its reservation",
            p.id
        );
    }

    let placed: HashSet<&str> = result.placements.iter().map(|p| p.item_id.as_str()).collect();
    let unplaced: HashSet<&str> = result.unplaced.iter().map(|u| u.item_id.as_str()).collect();
    assert_eq!(placed.len(), result.placements.len());
    assert_eq!(unplaced.len(), result.unplaced.len());
    assert!(placed.is_disjoint(&unplaced));
    let all: HashSet<&str> = placed.union(&unplaced).copied().collect();
    let expected: HashSet<&str> = item_ids.iter().copied().collect();
    assert_eq!(all, expected);
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_single_item_at_origin() {
        let container = Container::new(100.0, 100.0, 100.0);
        let items = vec![Item::new("I1", "G1", 50.0, 50.0, 50.0)];

        let result = Packer::new(Config::default().with_seed(1))
            .pack_items(&container, &items, &[])
            .unwrap();

        let placement = result.placement_of("I1").unwrap();
        assert_eq!(placement.pose.min, vec3(0.0, 0.0, 0.0));
        assert_relative_eq!(result.utilization, 0.125, epsilon = 1e-12);
        assert!(result.all_placed());
    }

    #[test]
    fn test_oversized_item_is_too_large() {
        let container = Container::new(10.0, 10.0, 10.0);
        let items = vec![Item::new("I1", "G1", 20.0, 5.0, 5.0)];

        let result = Packer::default_config()
            .pack_items(&container, &items, &[])
            .unwrap();

        assert_eq!(result.placed_count(), 0);
        assert_eq!(result.unplaced_reason("I1"), Some(UnplacedReason::TooLarge));
        assert!(result.success);
    }

    #[test]
    fn test_second_long_item_has_no_space() {
        let container = Container::new(100.0, 10.0, 10.0);
        let items = vec![
            Item::new("A", "G1", 60.0, 10.0, 10.0),
            Item::new("B", "G1", 60.0, 10.0, 10.0),
        ];

        let result = Packer::new(Config::default().with_seed(5))
            .pack_items(&container, &items, &[])
            .unwrap();

        assert_eq!(result.placement_of("A").unwrap().pose.min, vec3(0.0, 0.0, 0.0));
        assert_eq!(
            result.unplaced_reason("B"),
            Some(UnplacedReason::NoSpaceAvailable)
        );
        assert_relative_eq!(result.utilization, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_lanes_follow_demand_ratio() {
        let container = Container::new(100.0, 10.0, 10.0);
        let items = vec![
            Item::new("A1", "A", 10.0, 10.0, 10.0),
            Item::new("A2", "A", 10.0, 10.0, 10.0),
            Item::new("A3", "A", 10.0, 10.0, 10.0),
            Item::new("B1", "B", 10.0, 10.0, 10.0),
        ];
        let groups = vec![Group::new("A"), Group::new("B")];

        let result = blf_packer().pack_items(&container, &items, &groups).unwrap();

        let a = result.partition("LANE_A").unwrap();
        let b = result.partition("LANE_B").unwrap();
        assert_relative_eq!(a.bounds.extent(Axis::X), 75.0, epsilon = 1e-9);
        assert_relative_eq!(b.bounds.extent(Axis::X), 25.0, epsilon = 1e-9);
        assert_relative_eq!(a.ratio, 0.75, epsilon = 1e-9);
        assert!(b.bounds.extent(Axis::X) >= Config::default().min_lane_thickness);
        assert!(result.all_placed());
    }

    #[test]
    fn test_borrow_from_neighbor_zone() {
        let request = PackingRequest::from_json(
            r#"{
                "container": { "width": 30, "height": 1, "depth": 1 },
                "zones": [
                    { "id": "A", "group_id": "A", "min": [0, 0, 0], "max": [10, 1, 1], "neighbors": ["B"] },
                    { "id": "B", "group_id": "B", "min": [10, 0, 0], "max": [30, 1, 1], "neighbors": ["A"] }
                ],
                "items": [
                    { "id": "A1", "group_id": "A", "width": 10, "height": 1, "depth": 1 },
                    { "id": "A2", "group_id": "A", "width": 10, "height": 1, "depth": 1 }
                ],
                "strategy": "blf"
            }"#,
        )
        .unwrap();

        let result = Packer::default_config().pack(&request).unwrap();

        assert!(result.all_placed());
        assert_eq!(result.borrow_ops.len(), 1);
        let op: &BorrowOp = &result.borrow_ops[0];
        assert_eq!(op.from, "B");
        assert_eq!(op.to, "A");
        assert_relative_eq!(op.volume, 10.0, epsilon = 1e-9);

        let a = result.partition("A").unwrap();
        let b = result.partition("B").unwrap();
        assert_relative_eq!(a.borrowed_in, 10.0, epsilon = 1e-9);
        assert_relative_eq!(b.borrowed_out, 10.0, epsilon = 1e-9);
        assert_run_invariants(&result, &["A1", "A2"], &[]);
    }

    #[test]
    fn test_borrow_refused_across_mismatched_faces() {
        let request = PackingRequest::from_json(
            r#"{
                "container": { "width": 30, "height": 2, "depth": 1 },
                "zones": [
                    { "id": "A", "group_id": "A", "min": [0, 0, 0], "max": [10, 2, 1], "neighbors": ["B"] },
                    { "id": "B", "group_id": "B", "min": [10, 0, 0], "max": [30, 1, 1] },
                    { "id": "C", "group_id": "C", "min": [10, 1, 0], "max": [30, 2, 1] }
                ],
                "items": [
                    { "id": "A1", "group_id": "A", "width": 10, "height": 2, "depth": 1 },
                    { "id": "C1", "group_id": "C", "width": 20, "height": 1, "depth": 1 },
                    { "id": "A2", "group_id": "A", "width": 5, "height": 2, "depth": 1 }
                ],
                "strategy": "blf"
            }"#,
        )
        .unwrap();

        let result = Packer::default_config().pack(&request).unwrap();

        assert!(result.borrow_ops.is_empty());
        assert_eq!(
            result.unplaced_reason("A2"),
            Some(UnplacedReason::NoSpaceAvailable)
        );
        assert_eq!(result.placement_of("C1").unwrap().partition_id, "C");
        let a = result.partition("A").unwrap();
        assert_eq!(a.bounds.max, vec3(10.0, 2.0, 1.0));
        assert_run_invariants(&result, &["A1", "C1", "A2"], &[]);
    }

    #[test]
    fn test_iteration_budget_is_spent() {
        let container = Container::new(40.0, 20.0, 20.0);
        let items: Vec<Item> = (0..6)
            .map(|i| Item::new(format!("I{i}"), "G1", 5.0 + i as f64, 5.0, 5.0))
            .collect();

        let result = Packer::new(Config::default().with_seed(1).with_max_iterations(2000))
            .pack_items(&container, &items, &[])
            .unwrap();

        assert_eq!(result.iterations, 2000);
        assert!(result.all_placed());
    }

    #[test]
    fn test_best_cost_history_is_monotone() {
        let container = Container::new(30.0, 20.0, 30.0);
        let items: Vec<Item> = (0..25)
            .map(|i| {
                Item::new(
                    format!("I{i}"),
                    "G1",
                    4.0 + (i % 5) as f64 * 2.0,
                    3.0 + (i % 3) as f64 * 3.0,
                    5.0 + (i % 4) as f64 * 2.0,
                )
            })
            .collect();

        let result = Packer::new(Config::default().with_seed(11))
            .pack_items(&container, &items, &[])
            .unwrap();

        assert!(result.best_cost_history.len() > 1);
        for pair in result.best_cost_history.windows(2) {
            assert!(pair[1] >= pair[0], "history decreased: {:?}", pair);
        }
        assert_eq!(result.iterations, 100);
    }
}

mod invariant_tests {
    use super::*;

    fn mixed_request(strategy: &str, policy: &str) -> PackingRequest {
        let mut items = Vec::new();
        for i in 0..18 {
            let group = ["north", "south", "east"][i % 3];
            items.push(format!(
                r#"{{ "id": "I{i}", "group_id": "{group}", "width": {w}, "height": {h}, "depth": {d}, "confirmed": {c} }}"#,
                w = 6 + (i % 4) * 3,
                h = 5 + (i % 3) * 4,
                d = 4 + (i % 5) * 2,
                c = i % 7 != 0,
            ));
        }
        items.push(
            r#"{ "id": "HUGE", "group_id": "north", "width": 500, "height": 1, "depth": 1 }"#
                .to_string(),
        );
        let json = format!(
            r#"{{
                "container": {{ "width": 60, "height": 20, "depth": 20 }},
                "groups": [ {{ "id": "south", "priority": -1 }}, {{ "id": "east", "min_volume": 900 }} ],
                "items": [ {} ],
                "obstacles": [ {{ "min": [28, 0, 0], "max": [32, 4, 4] }} ],
                "strategy": "{strategy}",
                "overflow_policy": "{policy}",
                "seed": 3
            }}"#,
            items.join(",")
        );
        PackingRequest::from_json(&json).unwrap()
    }

    #[test]
    fn test_invariants_hold_for_every_strategy() {
        for strategy in ["blf-annealing", "blf", "grid-stack", "row-fill"] {
            for policy in ["borrow-first", "spill-first", "disabled"] {
                let request = mixed_request(strategy, policy);
                let ids: Vec<&str> = request.items.iter().map(|i| i.id.as_str()).collect();
                let obstacles = request.obstacles();

                let result = Packer::default_config().pack(&request).unwrap();
                assert_run_invariants(&result, &ids, &obstacles);
                assert_eq!(result.unplaced_reason("HUGE"), Some(UnplacedReason::TooLarge));
                if policy == "disabled" {
                    assert!(result.borrow_ops.is_empty());
                    assert!(result.spill_ops.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_blf_is_deterministic() {
        let items: Vec<Item> = (0..15)
            .map(|i| {
                let (w, h) = (3.0 + (i % 4) as f64, 2.0 + (i % 3) as f64);
                Item::new(format!("I{i}"), "G1", w, h, 5.0)
            })
            .collect();
        let refs: Vec<&Item> = items.iter().collect();
        let region = Box3::with_dims(20.0, 10.0, 10.0);
        let placer = BlfPlacer::new(EPS, 0.0).with_sort(SortPolicy::AsGiven);

        let first = placer.place(&refs, &region, &[]);
        let second = placer.place(&refs, &region, &[]);
        assert_eq!(first.placed, second.placed);
        assert_eq!(first.unplaced, second.unplaced);
    }

    #[test]
    fn test_bsp_invariants_after_random_operations() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut tree = BspTree::new(Box3::with_dims(50.0, 30.0, 40.0));

        for _ in 0..60 {
            let leaves = tree.get_leaves();
            let leaf = leaves[rng.gen_range(0..leaves.len())];
            let axis = Axis::ALL[rng.gen_range(0..3)];
            match rng.gen_range(0..3) {
                0 => {
                    let volume = tree.bounds(leaf).unwrap().volume();
                    tree.split_by_volume(leaf, volume * rng.gen_range(0.1..0.9), axis);
                }
                1 => {
                    let extent = tree.bounds(leaf).unwrap().extent(axis);
                    tree.split_by_thickness(leaf, axis, extent * rng.gen_range(0.1..1.2));
                }
                _ => {
                    let mut node = leaf;
                    while let Some(parent) = tree.parent(node) {
                        node = parent;
                        if rng.gen_bool(0.5) {
                            break;
                        }
                    }
                    if let Some((split_axis, _)) = tree.split_of(node) {
                        let b = tree.bounds(node).unwrap();
                        let value = rng.gen_range(b.min_on(split_axis)..=b.max_on(split_axis));
                        tree.update_split(node, value);
                    }
                }
            }
            tree.check_invariants().unwrap();
        }

        let total: f64 = tree
            .get_leaves()
            .iter()
            .map(|id| tree.bounds(*id).unwrap().volume())
            .sum();
        assert_relative_eq!(total, 50.0 * 30.0 * 40.0, epsilon = 1e-6);
    }
}

mod run_tests {
    use super::*;

    const SMALL: &str = r#"{
        "container": { "width": 40, "height": 20, "depth": 20 },
        "items": [
            { "id": "A1", "group_id": "A", "width": 10, "height": 10, "depth": 10 },
            { "id": "A2", "group_id": "A", "width": 8, "height": 6, "depth": 10 },
            { "id": "A3", "group_id": "A", "width": 5, "height": 5, "depth": 5 },
            { "id": "B1", "group_id": "B", "width": 10, "height": 5, "depth": 10 },
            { "id": "U1", "group_id": "B", "width": 2, "height": 10, "depth": 10, "confirmed": false }
        ],
        "seed": 9
    }"#;

    #[test]
    fn test_progress_reports_and_cancel() {
        let request = PackingRequest::from_json(SMALL).unwrap();
        let packer = Packer::default_config();
        let handle = packer.cancel_handle();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let result = packer
            .pack_with_progress(
                &request,
                Box::new(move |info| {
                    assert!(info.percent() <= 100.0);
                    seen.fetch_add(1, Ordering::Relaxed);
                    handle.store(true, Ordering::Relaxed);
                }),
            )
            .unwrap();

        assert!(result.cancelled);
        assert!(calls.load(Ordering::Relaxed) >= 1);
        assert!(result.iterations < 100);
        assert!(result.message.ends_with("(cancelled)"));
        assert_run_invariants(&result, &["A1", "A2", "A3", "B1", "U1"], &[]);
    }

    #[test]
    fn test_unconfirmed_items_use_deferred_lane() {
        let request = PackingRequest::from_json(SMALL).unwrap();
        let result = Packer::default_config().pack(&request).unwrap();

        let deferred = result.partition("LANE_DEFERRED").unwrap();
        assert!(deferred.group_id.is_none());
        assert_eq!(result.placement_of("U1").unwrap().partition_id, "LANE_DEFERRED");
        assert_eq!(result.partitions[0].id, "LANE_DEFERRED");
    }

    #[test]
    fn test_pack_batch() {
        let good = PackingRequest::from_json(SMALL).unwrap();
        let mut bad = good.clone();
        bad.items.clear();

        let results = blf_packer().pack_batch(&[good.clone(), bad, good]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().code(), "EMPTY_REQUEST");
        assert_eq!(
            results[0].as_ref().unwrap().placed_count(),
            results[2].as_ref().unwrap().placed_count()
        );
    }

    #[test]
    fn test_response_round_trip() {
        let request = PackingRequest::from_json(SMALL).unwrap();
        let result = blf_packer().pack(&request).unwrap();

        let response = PackingResponse::from_result(&result, PositionConvention::Center);
        let json = response.to_json().unwrap();
        let parsed: PackingResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.placed.len(), result.placed_count());
        assert_eq!(parsed.statistics.placed_count, result.placed_count());
        let a1 = parsed.placed.iter().find(|p| p.item_id == "A1").unwrap();
        let pose = result.placement_of("A1").unwrap().pose;
        assert_eq!(a1.position, [pose.center().x, pose.center().y, pose.center().z]);
    }

    #[test]
    fn test_overflow_partition_override() {
        let request = PackingRequest::from_json(
            r#"{
                "container": { "width": 30, "height": 1, "depth": 1, "overflow_partition_id": "SPARE" },
                "zones": [
                    { "id": "A", "group_id": "A", "min": [0, 0, 0], "max": [10, 1, 1] },
                    { "id": "LOOSE", "min": [10, 0, 0], "max": [20, 1, 1] },
                    { "id": "SPARE", "group_id": "S", "min": [20, 0, 0], "max": [30, 1, 1] }
                ],
                "items": [
                    { "id": "A1", "group_id": "A", "width": 10, "height": 1, "depth": 1 },
                    { "id": "A2", "group_id": "A", "width": 10, "height": 1, "depth": 1 }
                ],
                "strategy": "blf",
                "overflow_policy": "spill-first"
            }"#,
        )
        .unwrap();

        let result = Packer::default_config().pack(&request).unwrap();
        assert_eq!(result.spill_ops.len(), 1);
        assert_eq!(result.spill_ops[0].to, "SPARE");
        assert_eq!(result.placement_of("A2").unwrap().partition_id, "SPARE");
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let mut request = PackingRequest::from_json(SMALL).unwrap();
        request.items[0].width = -1.0;
        let err = Packer::default_config().pack(&request).unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(PackingResponse::error(&err).error_code.as_deref(), Some("INVALID_ITEM"));
    }
}
