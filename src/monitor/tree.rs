//! Discovery of a workload's process tree.

use std::collections::VecDeque;

use hashbrown::HashSet;
use indexmap::IndexSet;

use crate::collection::{
    error::{CollectionError, CollectionResult},
    processes::Pid,
    ProcessSource,
};

/// The PIDs known to belong to a workload's tree, in the order they were first
/// seen.
///
/// A tracked set only ever grows. A process that exits stays in the set so its
/// history is kept until the end of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSet {
    pids: IndexSet<Pid>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a PID. Returns `true` if it was not tracked yet.
    pub fn insert(&mut self, pid: Pid) -> bool {
        self.pids.insert(pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.pids.iter().copied()
    }
}

impl FromIterator<Pid> for TrackedSet {
    fn from_iter<T: IntoIterator<Item = Pid>>(iter: T) -> Self {
        Self {
            pids: iter.into_iter().collect(),
        }
    }
}

impl Extend<Pid> for TrackedSet {
    fn extend<T: IntoIterator<Item = Pid>>(&mut self, iter: T) {
        self.pids.extend(iter);
    }
}

/// Walks the tree under `root` breadth-first and returns `known` plus every
/// process found on the way.
///
/// Known PIDs are kept even if their processes are gone. They are still
/// expanded if they are alive, so that new children of old members are found.
/// A root that can't be resolved yields `known` unchanged, as does a child that
/// exits between being listed and being resolved. Any other failure aborts the
/// walk.
pub fn discover_tree<S: ProcessSource>(
    source: &mut S, root: Pid, known: &TrackedSet,
) -> CollectionResult<TrackedSet> {
    let mut tree = known.clone();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(root);
    queue.push_back(root);

    while let Some(pid) = queue.pop_front() {
        let handle = match source.resolve(pid) {
            Ok(handle) => handle,
            Err(CollectionError::NotFound(_)) => {
                log::trace!("pid {pid} is gone, not expanding it");
                continue;
            }
            Err(err) => return Err(err),
        };
        tree.insert(pid);

        for child in source.children(&handle)? {
            if visited.insert(child) {
                queue.push_back(child);
            }
        }
    }

    Ok(tree)
}
