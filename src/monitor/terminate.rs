//! Killing a whole process tree.

use itertools::Itertools;
use thiserror::Error;

use super::tree::{discover_tree, TrackedSet};
use crate::collection::{
    error::{CollectionError, CollectionResult},
    processes::{Pid, ProcessHandle},
    ProcessSource,
};

/// What happened while terminating a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    /// Processes that were sent a kill signal.
    pub signalled: Vec<Pid>,

    /// Processes that were already gone when their turn came.
    pub already_exited: Vec<Pid>,
}

/// Termination that left some processes standing.
#[derive(Debug, Error)]
#[error("failed to terminate {}", describe_failures(.failures))]
pub struct TerminationError {
    /// Every process that could not be killed, with the reason.
    pub failures: Vec<(Pid, CollectionError)>,

    /// What did work.
    pub report: TerminationReport,
}

fn describe_failures(failures: &[(Pid, CollectionError)]) -> String {
    failures
        .iter()
        .map(|(pid, err)| format!("pid {pid} ({err})"))
        .join(", ")
}

/// Forcibly kills every process in the tree under `root`.
///
/// The tree is re-discovered from scratch, so children that appeared after the
/// last sample are included. `survivors` are handles from an earlier sampling
/// pass; each one whose PID still belongs to the same process is expanded as
/// well, which catches descendants that got orphaned when their parent exited.
///
/// Members are killed children first and `root` last. A member that has
/// already exited counts as success. Other failures do not stop the rest from
/// being killed; they are collected into the returned error.
///
/// This is safe to call more than once, and from more than one thread.
pub fn terminate_tree<S: ProcessSource>(
    source: &mut S, root: Pid, survivors: &[ProcessHandle],
) -> Result<TerminationReport, TerminationError> {
    let members = match collect_members(source, root, survivors) {
        Ok(members) => members,
        Err(err) => {
            // Still try the ones we know about.
            log::warn!("could not rediscover the tree of pid {root}: {err}");
            let mut fallback = TrackedSet::new();
            fallback.insert(root);
            for handle in survivors {
                if source.is_same_process(handle) {
                    fallback.insert(handle.pid);
                }
            }
            fallback
        }
    };

    let mut report = TerminationReport::default();
    let mut failures = Vec::new();

    // Discovery order is breadth-first from the root, so walking it backwards
    // kills the deepest members first.
    let order = members.iter().collect::<Vec<_>>();
    for pid in order.into_iter().rev() {
        match source.kill(pid) {
            Ok(()) => report.signalled.push(pid),
            Err(CollectionError::NotFound(_)) => report.already_exited.push(pid),
            Err(err) => {
                log::error!("failed to kill pid {pid}: {err}");
                failures.push((pid, err));
            }
        }
    }

    log::debug!(
        "terminated tree of pid {root}: {} signalled, {} already exited, {} failed",
        report.signalled.len(),
        report.already_exited.len(),
        failures.len()
    );

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(TerminationError { failures, report })
    }
}

fn collect_members<S: ProcessSource>(
    source: &mut S, root: Pid, survivors: &[ProcessHandle],
) -> CollectionResult<TrackedSet> {
    source.refresh()?;

    let mut members = TrackedSet::new();
    members.insert(root);
    members = discover_tree(source, root, &members)?;

    for handle in survivors {
        if handle.pid != root && source.is_same_process(handle) {
            members = discover_tree(source, handle.pid, &members)?;
        }
    }

    Ok(members)
}
