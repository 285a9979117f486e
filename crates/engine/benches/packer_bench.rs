//! Benchmarks for lane packing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lanepack_core::config::{Config, Strategy};
use lanepack_engine::{Container, Item, Packer};

fn uniform_boxes(count: usize, groups: usize) -> Vec<Item> {
    (0..count)
        .map(|i| Item::new(format!("B{i}"), format!("G{}", i % groups), 10.0, 10.0, 10.0))
        .collect()
}

fn packer_benchmark(c: &mut Criterion) {
    let container = Container::new(100.0, 100.0, 100.0);
    let items = uniform_boxes(20, 1);

    for strategy in [Strategy::Blf, Strategy::GridStack, Strategy::BlfAnnealing] {
        let packer = Packer::new(Config::default().with_strategy(strategy).with_seed(1));
        c.bench_function(&format!("pack_20_uniform_boxes_{}", strategy.name()), |b| {
            b.iter(|| {
                let result = packer.pack_items(black_box(&container), black_box(&items), &[]);
                black_box(result)
            })
        });
    }

    let grouped = uniform_boxes(60, 3);
    let packer = Packer::new(Config::default().with_strategy(Strategy::Blf));
    c.bench_function("pack_60_boxes_3_lanes", |b| {
        b.iter(|| {
            let result = packer.pack_items(black_box(&container), black_box(&grouped), &[]);
            black_box(result)
        })
    });
}

criterion_group!(benches, packer_benchmark);
criterion_main!(benches);
