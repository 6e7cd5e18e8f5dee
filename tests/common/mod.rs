#![allow(dead_code)]

pub use taskflow_test_utils::builders;
pub use taskflow_test_utils::{RecordingExecutor, failing, init_tracing, sleeping};

use taskflow::dag::Scheduler;

/// Completion rank of `name`, panicking if it did not complete.
pub fn rank(s: &Scheduler, name: &str) -> u32 {
    s.task(name)
        .and_then(|t| t.completion_rank())
        .unwrap_or_else(|| panic!("task {name} has no completion rank"))
}

/// Assert that for every edge, the dependency finished before the dependent
/// started and was ranked lower.
pub fn assert_edges_ordered(s: &Scheduler) {
    let report = s.export_report();
    for node in &report.nodes {
        let Some(timing) = node.timing else { continue };
        for dep in &node.dependencies {
            let dep_timing = s
                .timing_of(dep)
                .unwrap_or_else(|| panic!("{} ran but its dependency {dep} has no timing", node.name));
            assert!(
                dep_timing.end <= timing.start,
                "{dep} ended at {:?} after {} started at {:?}",
                dep_timing.end,
                node.name,
                timing.start
            );
            assert!(rank(s, dep) < rank(s, &node.name));
        }
    }
}
