mod common;
use crate::common::{RecordingExecutor, assert_edges_ordered, init_tracing, rank, sleeping};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use taskflow::dag::{Scheduler, SchedulerOptions, SchedulerState};
use taskflow::errors::TaskflowError;
use taskflow::exec::ConcurrentExecutor;
use taskflow::types::ExecutorKind;

/// {A,B,C,D,E}: B and C wait for A, D for B, E for C.
fn five_task_graph(s: &mut Scheduler) {
    s.add_task("A", sleeping(20)).unwrap();
    s.add_task("B", sleeping(10)).unwrap();
    s.add_task("C", sleeping(30)).unwrap();
    s.add_task("D", sleeping(5)).unwrap();
    s.add_task("E", sleeping(5)).unwrap();
    s.add_dependencies("B", ["A"]).unwrap();
    s.add_dependencies("C", ["A"]).unwrap();
    s.add_dependency("D", "B").unwrap();
    s.add_dependency("E", "C").unwrap();
}

fn assert_five_task_order(s: &Scheduler) {
    assert!(rank(s, "B") > rank(s, "A"));
    assert!(rank(s, "C") > rank(s, "A"));
    assert!(rank(s, "D") > rank(s, "B"));
    assert!(rank(s, "E") > rank(s, "C"));
    assert_edges_ordered(s);

    let report = s.export_report();
    assert_eq!(report.executed_count(), 5);
    for name in ["A", "B", "C", "D", "E"] {
        assert!(report.node(name).unwrap().executed());
    }
}

#[test]
fn five_task_scenario_sequential() {
    init_tracing();
    let mut s = Scheduler::with_options(SchedulerOptions {
        executor: ExecutorKind::Sequential,
        ..SchedulerOptions::default()
    });
    five_task_graph(&mut s);

    let summary = s.run().unwrap();
    assert_eq!(summary.state, SchedulerState::Drained);
    assert!(s.all_completed());
    assert!(!s.has_errors());
    assert_five_task_order(&s);
}

#[test]
fn five_task_scenario_concurrent() {
    init_tracing();
    let mut s = Scheduler::new();
    assert_eq!(s.executor_name(), "concurrent");
    five_task_graph(&mut s);

    let summary = s.run().unwrap();
    assert_eq!(summary.state, SchedulerState::Drained);
    assert_eq!(summary.batches, 1);
    assert_five_task_order(&s);
}

#[test]
fn capped_pool_still_drains_a_chain() {
    init_tracing();
    let mut s = Scheduler::new();
    s.set_executor(ConcurrentExecutor::new(Some(1)));

    // Registered in reverse so list order would put dependents first.
    for i in (0..6).rev() {
        s.add_task(format!("step_{i}"), sleeping(2)).unwrap();
    }
    for i in 1..6 {
        s.add_dependency(&format!("step_{i}"), &format!("step_{}", i - 1))
            .unwrap();
    }

    assert_eq!(s.run().unwrap().state, SchedulerState::Drained);
    for i in 0..6 {
        assert_eq!(rank(&s, &format!("step_{i}")), i);
    }
}

#[test]
fn independent_tasks_overlap_under_concurrent_executor() {
    init_tracing();
    let mut s = Scheduler::new();
    for name in ["w", "x", "y", "z"] {
        s.add_task(name, sleeping(150)).unwrap();
    }
    s.run().unwrap();

    let timings = s.timings();
    assert_eq!(timings.len(), 4);
    let latest_start = timings.values().map(|t| t.start).max().unwrap();
    let earliest_end = timings.values().map(|t| t.end).min().unwrap();
    assert!(
        latest_start < earliest_end,
        "tasks did not overlap: {timings:?}"
    );
}

#[test]
fn every_run_uses_one_batch_per_iteration() {
    init_tracing();
    let recorder = RecordingExecutor::new();
    let batches = recorder.batches_handle();

    let mut s = Scheduler::new();
    s.set_executor(recorder);
    s.add_task("A", || Ok(())).unwrap();
    s.add_task("B", || Ok(())).unwrap();
    s.add_dependency("B", "A").unwrap();

    s.run().unwrap();
    s.run().unwrap();

    // The second run is a no-op and dispatches nothing.
    assert_eq!(*batches.lock().unwrap(), vec![2]);
}

#[test]
fn bodies_run_exactly_once_and_rerun_is_a_no_op() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut s = Scheduler::new();
    for name in ["a", "b", "c"] {
        let calls = Arc::clone(&calls);
        s.add_task(name, move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }
    s.add_dependencies("c", ["a", "b"]).unwrap();

    s.run().unwrap();
    let again = s.run().unwrap();

    assert_eq!(again.state, SchedulerState::Drained);
    assert_eq!(again.batches, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn cycle_rejection_leaves_graph_runnable() {
    init_tracing();
    let mut s = Scheduler::new();
    for name in ["A", "B", "C"] {
        s.add_task(name, || Ok(())).unwrap();
    }
    s.add_dependency("B", "A").unwrap();
    s.add_dependency("C", "B").unwrap();

    let before: Vec<usize> = ["A", "B", "C"]
        .iter()
        .map(|n| s.task(n).unwrap().dependency_count())
        .collect();

    let err = s.add_dependency("A", "C").unwrap_err();
    assert!(matches!(
        err,
        TaskflowError::CycleRejected { ref dependent, ref dependency }
            if dependent == "A" && dependency == "C"
    ));

    let after: Vec<usize> = ["A", "B", "C"]
        .iter()
        .map(|n| s.task(n).unwrap().dependency_count())
        .collect();
    assert_eq!(before, after);

    assert_eq!(s.run().unwrap().state, SchedulerState::Drained);
}

#[test]
fn diamond_heavy_graph_inserts_quickly() {
    // Layered diamonds: every node of layer k depends on every node of k-1.
    let mut s = Scheduler::new();
    let layers = 12;
    let width = 3;
    for layer in 0..layers {
        for i in 0..width {
            s.add_task(format!("n{layer}_{i}"), || Ok(())).unwrap();
        }
    }
    for layer in 1..layers {
        for i in 0..width {
            for j in 0..width {
                s.add_dependency(&format!("n{layer}_{i}"), &format!("n{}_{j}", layer - 1))
                    .unwrap();
            }
        }
    }
    assert!(matches!(
        s.add_dependency("n0_0", &format!("n{}_0", layers - 1)),
        Err(TaskflowError::CycleRejected { .. })
    ));

    assert_eq!(s.run().unwrap().completed, layers * width);
    assert_edges_ordered(&s);
}

#[test]
fn task_body_can_run_its_own_concurrent_graph() {
    init_tracing();
    let inner_ran = Arc::new(AtomicUsize::new(0));

    let mut outer = Scheduler::new();
    outer.add_task("prepare", sleeping(1)).unwrap();
    let counter = Arc::clone(&inner_ran);
    outer
        .add_task("subgraph", move || {
            let mut inner = Scheduler::new();
            for name in ["x", "y", "z"] {
                let counter = Arc::clone(&counter);
                inner.add_task(name, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
            }
            inner.add_dependencies("z", ["x", "y"])?;

            let summary = inner.run()?;
            anyhow::ensure!(
                summary.state == SchedulerState::Drained,
                "inner graph ended {}: {:?}",
                summary.state,
                inner.errors()
            );
            Ok(())
        })
        .unwrap();
    outer.add_dependency("subgraph", "prepare").unwrap();

    let summary = outer.run().unwrap();
    assert_eq!(summary.state, SchedulerState::Drained, "{:?}", outer.errors());
    assert_eq!(inner_ran.load(Ordering::SeqCst), 3);
}

#[test]
fn run_from_inside_spawn_blocking() {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()
        .unwrap();

    let summary = runtime
        .block_on(runtime.spawn_blocking(|| {
            let mut s = Scheduler::new();
            five_task_graph(&mut s);
            s.run()
        }))
        .unwrap()
        .unwrap();

    assert_eq!(summary.state, SchedulerState::Drained);
    assert_eq!(summary.completed, 5);
}
