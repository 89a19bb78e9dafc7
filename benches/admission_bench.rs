//! Benchmarks for the orchestrator.
//!
//! Benchmarks cover:
//! - Build order over layered graphs
//! - Admission queue priority ordering
//! - Scheduler admission under randomized outcome streams

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::time::Duration;

use prometheus_build_orchestrator::core::{
    AdmissionQueue, BudgetThresholds, BudgetTracker, DependencyGraph, LaunchOutcome, LaunchTask,
    Scheduler, SchedulerLimits, UnitLevel, WorkUnit,
};
use prometheus_build_orchestrator::infra::{InMemoryCheckpointStore, InMemoryRegistry};

// ============================================================================
// Helper Functions
// ============================================================================

/// Five levels, each unit depending on up to three units one level below.
fn layered_units(count: usize, rng: &mut StdRng) -> Vec<WorkUnit> {
    let levels = [
        UnitLevel::Base,
        UnitLevel::Core,
        UnitLevel::Feature,
        UnitLevel::Integration,
        UnitLevel::Application,
    ];
    let per_level = count.div_ceil(levels.len()).max(1);
    let mut units: Vec<WorkUnit> = Vec::with_capacity(count);
    for i in 0..count {
        let tier = (i / per_level).min(levels.len() - 1);
        let mut unit = WorkUnit::new(format!("u{i:05}"), levels[tier], rng.random_range(1_000..60_000))
            .with_priority(rng.random_range(0..4));
        if tier > 0 {
            let lower = (tier - 1) * per_level..tier * per_level;
            for _ in 0..rng.random_range(1..=3) {
                unit.dependencies
                    .insert(format!("u{:05}", rng.random_range(lower.clone())));
            }
        }
        units.push(unit);
    }
    units
}

fn scheduler(limit: usize) -> Scheduler {
    Scheduler::new(
        SchedulerLimits {
            concurrency_limit: limit,
            max_retries: 2,
            idle_timeout: Duration::from_secs(600),
        },
        BudgetTracker::new(BudgetThresholds::default(), 20_000, 180_000)
            .expect("default thresholds"),
        Box::new(InMemoryCheckpointStore::new()),
        Box::new(InMemoryRegistry::new()),
    )
    .expect("valid limits")
}

// ============================================================================
// Graph Benchmarks
// ============================================================================

fn bench_build_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build_order");
    for size in [100usize, 1_000, 5_000] {
        let mut rng = StdRng::seed_from_u64(7);
        let graph = DependencyGraph::from_units(layered_units(size, &mut rng)).expect("graph");
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| black_box(graph.build_order().expect("acyclic")));
        });
    }
    group.finish();
}

fn bench_detect_cycles(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let graph = DependencyGraph::from_units(layered_units(2_000, &mut rng)).expect("graph");
    c.bench_function("graph_detect_cycles_2000", |b| {
        b.iter(|| black_box(graph.detect_cycles()));
    });
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_priority_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_queue");
    for size in [100u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut rng = StdRng::seed_from_u64(3);
            let priorities: Vec<i32> = (0..size).map(|_| rng.random_range(-5..5)).collect();
            b.iter(|| {
                let mut queue = AdmissionQueue::new();
                for (i, priority) in priorities.iter().enumerate() {
                    queue.enqueue(format!("u{i}"), LaunchTask::new("t", 1), *priority);
                }
                while let Some(launch) = queue.pop() {
                    black_box(launch);
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_scheduler_random_outcomes(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_admission");
    for units in [50usize, 200] {
        group.throughput(Throughput::Elements(units as u64));
        group.bench_with_input(BenchmarkId::from_parameter(units), &units, |b, &units| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                let s = scheduler(3);
                for i in 0..units {
                    s.add_unit(WorkUnit::new(format!("u{i}"), UnitLevel::Base, 10_000))
                        .expect("unique id");
                }
                let mut running = Vec::new();
                for i in 0..units {
                    if let Ok(LaunchOutcome::Admitted(a)) =
                        s.request_launch(&format!("u{i}"), LaunchTask::new("t", 1_000), 0)
                    {
                        running.push(a.unit.id);
                    }
                }
                while let Some(id) = running.pop() {
                    let report = if rng.random_bool(0.8) {
                        s.on_unit_completed(&id)
                    } else {
                        s.on_unit_failed(&id, "flaky")
                    };
                    // Retried units come back through `promoted`.
                    if let Ok(report) = report {
                        running.extend(report.promoted.into_iter().map(|a| a.unit.id));
                    }
                }
                black_box(s.status_summary())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build_order,
    bench_detect_cycles,
    bench_queue_priority_order,
    bench_scheduler_random_outcomes
);
criterion_main!(benches);
