//! Property tests for admission, classification, and build order.

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;

use prometheus_build_orchestrator::core::{
    BudgetThresholds, BudgetTracker, CheckpointData, DependencyGraph, LaunchTask, Scheduler,
    SchedulerLimits, UnitLevel, UnitStatus, WorkUnit,
};
use prometheus_build_orchestrator::infra::{InMemoryCheckpointStore, InMemoryRegistry};

const UNITS: usize = 8;

#[derive(Debug, Clone)]
enum Event {
    Launch(usize, i32),
    Complete(usize),
    Fail(usize),
    Suspend(usize),
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0..UNITS, -3..3i32).prop_map(|(u, p)| Event::Launch(u, p)),
        (0..UNITS).prop_map(Event::Complete),
        (0..UNITS).prop_map(Event::Fail),
        (0..UNITS).prop_map(Event::Suspend),
    ]
}

fn id(i: usize) -> String {
    format!("u{i}")
}

proptest! {
    #[test]
    fn active_never_exceeds_limit(limit in 1usize..4, events in prop::collection::vec(event(), 1..80)) {
        let s = Scheduler::new(
            SchedulerLimits { concurrency_limit: limit, max_retries: 1, idle_timeout: Duration::from_secs(60) },
            BudgetTracker::new(BudgetThresholds::default(), 20_000, 180_000).unwrap(),
            Box::new(InMemoryCheckpointStore::new()),
            Box::new(InMemoryRegistry::new()),
        ).unwrap();
        for i in 0..UNITS {
            // Every odd unit depends on its predecessor.
            let unit = WorkUnit::new(id(i), UnitLevel::Base, 1_000);
            let unit = if i % 2 == 1 { unit.with_dependencies([id(i - 1)]) } else { unit };
            s.add_unit(unit).unwrap();
        }

        for event in events {
            // Errors are expected for events that do not match the unit's state.
            let _ = match event {
                Event::Launch(u, p) => s.request_launch(&id(u), LaunchTask::new("t", 1_000), p).map(|_| ()),
                Event::Complete(u) => s.on_unit_completed(&id(u)).map(|_| ()),
                Event::Fail(u) => s.on_unit_failed(&id(u), "boom").map(|_| ()),
                Event::Suspend(u) => s.on_unit_suspended(&id(u), CheckpointData::default()).map(|_| ()),
            };
            let summary = s.status_summary();
            prop_assert!(summary.active.len() <= limit);
            prop_assert_eq!(summary.active.len(), s.active_count());
            for running in &summary.active {
                let unit = s.unit(running).unwrap();
                prop_assert_eq!(unit.status, UnitStatus::Running);
                for dep in &unit.dependencies {
                    prop_assert_eq!(s.unit(dep).unwrap().status, UnitStatus::Complete);
                }
            }
        }
    }

    #[test]
    fn classify_is_monotonic(a in any::<u64>(), b in any::<u64>()) {
        let t = BudgetTracker::new(BudgetThresholds::default(), 0, u64::MAX).unwrap();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(t.classify(lo) <= t.classify(hi));
    }

    #[test]
    fn build_order_puts_dependencies_first(
        edges in prop::collection::vec((0usize..10, 0usize..10), 0..30),
        priorities in prop::collection::vec(-5i32..5, 10),
    ) {
        // Only edges from a higher index to a lower one, so the graph is acyclic.
        let mut graph = DependencyGraph::new();
        for (i, priority) in priorities.iter().enumerate() {
            graph.add_unit(WorkUnit::new(id(i), UnitLevel::Base, 1).with_priority(*priority)).unwrap();
        }
        for (a, b) in edges {
            if a > b {
                graph.add_edge(&id(a), &id(b)).unwrap();
            }
        }

        let order = graph.build_order().unwrap();
        prop_assert_eq!(order.len(), 10);
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, u)| (u.as_str(), i)).collect();
        for unit in graph.units() {
            for dep in &unit.dependencies {
                prop_assert!(position[dep.as_str()] < position[unit.id.as_str()]);
            }
        }
        prop_assert_eq!(graph.clone().build_order().unwrap(), order);
    }
}
