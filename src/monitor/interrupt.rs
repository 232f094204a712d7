//! Tearing the workload down when benchmon itself is interrupted.
//!
//! The watcher runs on its own thread and only learns about the workload
//! through [`InterruptEvent`]s. It never touches the session's state; it finds
//! the tree again through its own process source.

use std::{
    process,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;

use super::terminate::terminate_tree;
use crate::{
    collection::{
        processes::{Pid, ProcessHandle},
        SysinfoSource,
    },
    constants::INTERRUPTED_EXIT_CODE,
};

/// How long an interrupt that lands mid-spawn waits to learn the new root.
const SPAWN_GRACE: Duration = Duration::from_secs(2);

/// Messages to the interrupt watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptEvent {
    /// A workload is about to be started.
    Spawning,

    /// A workload was started with this root.
    Watch(Pid),

    /// The processes of the current tree that were alive at the last tick.
    Members(Vec<ProcessHandle>),

    /// The current workload has been stopped, or never started.
    Unwatch,

    /// SIGINT or SIGTERM was received.
    Interrupt,
}

/// The workload the watcher would tear down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watched {
    pub root: Pid,

    /// Last known members of the tree. These are still reachable if the root
    /// exits and its children are reparented.
    pub members: Vec<ProcessHandle>,
}

/// Installs the signal handler and starts the watcher thread. The returned
/// sender should be handed to the session.
pub fn install() -> anyhow::Result<Sender<InterruptEvent>> {
    let (sender, receiver) = mpsc::channel();

    let signal_sender = sender.clone();
    ctrlc::set_handler(move || {
        // The receiver only goes away with the whole process.
        let _ = signal_sender.send(InterruptEvent::Interrupt);
    })
    .context("failed to set the interrupt handler")?;

    thread::Builder::new()
        .name("interrupt-watcher".into())
        .spawn(move || watch(receiver, SPAWN_GRACE, stop_and_exit))
        .context("failed to start the interrupt watcher")?;

    Ok(sender)
}

/// Follows the events on `receiver` until an interrupt arrives, then calls
/// `on_interrupt` with the workload that is running at that moment, if any.
/// Returns without calling it if every sender is dropped.
///
/// An interrupt that arrives while a workload is being spawned waits up to
/// `grace` for its root, so that a freshly started tree is not left behind.
pub fn watch<F: FnOnce(Option<Watched>)>(
    receiver: Receiver<InterruptEvent>, grace: Duration, on_interrupt: F,
) {
    let mut current = None;
    let mut spawning = false;

    while let Ok(event) = receiver.recv() {
        match event {
            InterruptEvent::Spawning => spawning = true,
            InterruptEvent::Watch(root) => {
                spawning = false;
                current = Some(Watched {
                    root,
                    members: Vec::new(),
                });
            }
            InterruptEvent::Members(members) => {
                if let Some(watched) = current.as_mut() {
                    watched.members = members;
                }
            }
            InterruptEvent::Unwatch => {
                spawning = false;
                current = None;
            }
            InterruptEvent::Interrupt => {
                log::info!("interrupted, stopping the workload");
                if spawning {
                    current = await_root(&receiver, grace);
                }
                on_interrupt(current);
                return;
            }
        }
    }
}

/// Waits for the root of a workload that is being spawned.
fn await_root(receiver: &Receiver<InterruptEvent>, grace: Duration) -> Option<Watched> {
    let deadline = Instant::now() + grace;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(InterruptEvent::Watch(root)) => {
                return Some(Watched {
                    root,
                    members: Vec::new(),
                });
            }
            Ok(InterruptEvent::Unwatch) => return None,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("gave up waiting for the workload to start");
                return None;
            }
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn stop_and_exit(watched: Option<Watched>) {
    if let Some(Watched { root, members }) = watched {
        let mut source = SysinfoSource::new();
        if let Err(err) = terminate_tree(&mut source, root, &members) {
            log::error!("cleanup failed: {err}");
        }
    }

    process::exit(INTERRUPTED_EXIT_CODE);
}
