//! Running the workload, repetition by repetition.

use std::{
    fmt,
    io::Write,
    sync::mpsc::Sender,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use indexmap::IndexMap;
use time::OffsetDateTime;

use super::{
    aggregate::{summarize_all, ProcessSummary},
    interrupt::InterruptEvent,
    sampler::{ProcessHistory, Sampler},
    terminate::terminate_tree,
    tree::{discover_tree, TrackedSet},
};
use crate::{
    collection::{
        cpu::{get_load_avg, LoadAvg},
        processes::{Pid, ProcessHandle, ProcessSample},
        ProcessSource,
    },
    constants::{DEFAULT_REPETITIONS, TICK_INTERVAL},
    launcher::CommandLauncher,
    output::{console::Console, IntervalRecord},
};

/// Where a repetition currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Spawning,
    Sampling,
    Stopping,
    Reporting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Spawning => "spawning",
            SessionState::Sampling => "sampling",
            SessionState::Stopping => "stopping",
            SessionState::Reporting => "reporting",
        };

        f.write_str(name)
    }
}

/// A fixed-period clock. Ticks are scheduled from the first one, so time spent
/// working between waits does not make the schedule drift.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Blocks until the next tick. If the work since the last tick took longer
    /// than a whole period, this returns immediately and the schedule restarts
    /// from now, so ticks never pile up.
    pub fn wait(&mut self) {
        let now = Instant::now();

        match self.next.checked_duration_since(now) {
            Some(remaining) => {
                thread::sleep(remaining);
                self.next += self.period;
            }
            None => {
                log::debug!("tick overran by {:?}", now - self.next);
                self.next = now + self.period;
            }
        }
    }
}

/// Why a sampling window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// The configured duration elapsed.
    Deadline,

    /// The root process of the workload went away first.
    WorkloadExited,
}

/// Everything a sampling window collected.
#[derive(Debug)]
pub struct WindowOutput {
    pub end: WindowEnd,

    /// Every PID ever seen in the tree during the window.
    pub tracked: TrackedSet,

    /// Samples per PID, in the order the PIDs were first sampled.
    pub histories: IndexMap<Pid, ProcessHistory>,

    /// Handles of the processes that were still alive at their last sample.
    pub survivors: Vec<ProcessHandle>,
}

/// Samples the tree under `root` once per tick until either `duration` has
/// passed or the root process exits.
#[derive(Debug, Clone, Copy)]
pub struct SamplingWindow {
    root: Pid,
    duration: Duration,
    tick: Duration,
}

impl SamplingWindow {
    pub fn new(root: Pid, duration: Duration, tick: Duration) -> Self {
        Self {
            root,
            duration,
            tick,
        }
    }

    /// Runs the window to completion. `on_tick` sees the samples of every tick
    /// as they are taken, along with the handles of the processes that were
    /// alive for them.
    ///
    /// Every tick discovers the tree from the same snapshot it samples, so a
    /// process is sampled on the first tick it shows up in.
    ///
    /// The handle cache lives and dies with this call.
    pub fn run<S, F>(&self, source: &mut S, mut on_tick: F) -> WindowOutput
    where
        S: ProcessSource,
        F: FnMut(&[ProcessSample], &[ProcessHandle]),
    {
        let deadline = Instant::now() + self.duration;
        let mut ticker = Ticker::new(self.tick);
        let mut sampler = Sampler::new();
        let mut histories: IndexMap<Pid, ProcessHistory> = IndexMap::new();

        let mut tracked = TrackedSet::new();
        tracked.insert(self.root);

        let end = loop {
            refresh(source);
            tracked = self.rediscover(source, tracked);

            let samples = sampler.sample_once(source, &tracked, Instant::now());
            log::trace!(
                "sampled {} of {} tracked processes",
                samples.len(),
                tracked.len()
            );

            on_tick(&samples, &sampler.cache().survivors());
            for sample in samples {
                histories.entry(sample.pid).or_default().push(sample);
            }

            if let Err(err) = source.resolve(self.root) {
                log::warn!("workload exited prematurely ({err})");
                break WindowEnd::WorkloadExited;
            }

            ticker.wait();
            if Instant::now() >= deadline {
                break WindowEnd::Deadline;
            }
        };

        WindowOutput {
            end,
            tracked,
            histories,
            survivors: sampler.cache().survivors(),
        }
    }

    fn rediscover<S: ProcessSource>(&self, source: &mut S, tracked: TrackedSet) -> TrackedSet {
        match discover_tree(source, self.root, &tracked) {
            Ok(tree) => tree,
            Err(err) => {
                log::warn!("failed to discover the tree of pid {}: {err}", self.root);
                tracked
            }
        }
    }
}

fn refresh<S: ProcessSource>(source: &mut S) {
    if let Err(err) = source.refresh() {
        log::warn!("failed to refresh the process table: {err}");
    }
}

/// Settings for a whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long each repetition samples the workload for.
    pub duration: Duration,
    pub repetitions: u32,
    pub tick: Duration,

    /// Whether every sample is kept for the interval table.
    pub record_intervals: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            repetitions: DEFAULT_REPETITIONS,
            tick: TICK_INTERVAL,
            record_intervals: false,
        }
    }
}

/// What one repetition measured.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    /// Which repetition this was, starting from 0.
    pub repetition: u32,

    /// From asking for the workload to be spawned to the spawn returning.
    pub start_latency: Duration,

    /// From asking for the tree to be killed to the root being reaped.
    pub stop_latency: Duration,

    /// Read once, right after sampling. `None` if it couldn't be read.
    pub load_avg: Option<LoadAvg>,

    pub summaries: Vec<ProcessSummary>,
    pub window_end: WindowEnd,
}

impl SessionResult {
    pub fn exited_early(&self) -> bool {
        self.window_end == WindowEnd::WorkloadExited
    }
}

/// Everything a finished session produced.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    pub results: Vec<SessionResult>,

    /// Every sample of every repetition, if they were being recorded.
    pub intervals: Vec<IntervalRecord>,
}

/// Launches, samples, stops and reports the workload, once per repetition.
/// Repetitions run strictly one after the other.
pub struct Session<S: ProcessSource, W: Write> {
    config: SessionConfig,
    launcher: CommandLauncher,
    source: S,
    console: Console<W>,
    interrupts: Option<Sender<InterruptEvent>>,
    state: SessionState,
}

impl<S: ProcessSource, W: Write> Session<S, W> {
    pub fn new(
        config: SessionConfig, launcher: CommandLauncher, source: S, console: Console<W>,
    ) -> Self {
        Self {
            config,
            launcher,
            source,
            console,
            interrupts: None,
            state: SessionState::Spawning,
        }
    }

    /// Keeps the interrupt watcher told about which tree to tear down.
    pub fn with_interrupts(mut self, interrupts: Sender<InterruptEvent>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn into_console(self) -> Console<W> {
        self.console
    }

    /// Runs every repetition. Failing to launch the workload ends the whole
    /// session; everything else that goes wrong is logged and worked around.
    pub fn run(&mut self) -> anyhow::Result<SessionOutcome> {
        let mut outcome = SessionOutcome::default();

        for repetition in 0..self.config.repetitions {
            let result = self.run_repetition(repetition, &mut outcome.intervals)?;
            outcome.results.push(result);
        }

        Ok(outcome)
    }

    fn run_repetition(
        &mut self, repetition: u32, intervals: &mut Vec<IntervalRecord>,
    ) -> anyhow::Result<SessionResult> {
        self.transition(repetition, SessionState::Spawning);
        self.notify(InterruptEvent::Spawning);
        let spawn_requested = Instant::now();
        let launched = self.launcher.launch();
        let start_latency = spawn_requested.elapsed();
        let mut workload = match launched {
            Ok(workload) => workload,
            Err(err) => {
                self.notify(InterruptEvent::Unwatch);
                return Err(err).with_context(|| {
                    format!("failed to launch {}", self.launcher.program().display())
                });
            }
        };
        let root = workload.pid();
        self.notify(InterruptEvent::Watch(root));

        self.transition(repetition, SessionState::Sampling);
        let window = SamplingWindow::new(root, self.config.duration, self.config.tick);
        let console = &mut self.console;
        let record_intervals = self.config.record_intervals;
        let interrupts = &self.interrupts;
        let output = window.run(&mut self.source, |samples, members| {
            notify(interrupts, InterruptEvent::Members(members.to_vec()));

            if let Err(err) = console.tick(samples) {
                log::warn!("failed to print samples: {err}");
            }

            if record_intervals {
                let now = OffsetDateTime::now_utc();
                intervals.extend(samples.iter().map(|sample| IntervalRecord::new(now, sample)));
            }
        });

        self.transition(repetition, SessionState::Stopping);
        let load_avg = match get_load_avg() {
            Ok(load_avg) => Some(load_avg),
            Err(err) => {
                log::error!("failed to read the load average: {err}");
                None
            }
        };

        let stop_requested = Instant::now();
        if let Err(err) = terminate_tree(&mut self.source, root, &output.survivors) {
            log::error!("cleanup failed: {err}");
        }
        if let Err(err) = workload.reap() {
            log::error!("failed to reap pid {root}: {err}");
        }
        let stop_latency = stop_requested.elapsed();
        self.notify(InterruptEvent::Unwatch);

        self.transition(repetition, SessionState::Reporting);
        let result = SessionResult {
            repetition,
            start_latency,
            stop_latency,
            load_avg,
            summaries: summarize_all(&output.histories),
            window_end: output.end,
        };

        if let Err(err) = self.console.repetition(&result) {
            log::warn!("failed to print the results: {err}");
        }

        Ok(result)
    }

    fn transition(&mut self, repetition: u32, state: SessionState) {
        log::debug!("repetition {repetition}: {} -> {state}", self.state);
        self.state = state;
    }

    fn notify(&self, event: InterruptEvent) {
        notify(&self.interrupts, event);
    }
}

fn notify(interrupts: &Option<Sender<InterruptEvent>>, event: InterruptEvent) {
    if let Some(interrupts) = interrupts {
        if interrupts.send(event).is_err() {
            log::warn!("the interrupt watcher is gone");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collection::fake::FakeSource;

    const SHORT_TICK: Duration = Duration::from_millis(5);

    fn tree() -> FakeSource {
        let mut source = FakeSource::new();
        source.spawn(1, None, "root", 100);
        source.spawn(2, Some(1), "a", 200);
        source.spawn(3, Some(2), "b", 300);
        source
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Spawning.to_string(), "spawning");
        assert_eq!(SessionState::Reporting.to_string(), "reporting");
    }

    #[test]
    fn test_ticker_keeps_its_period() {
        let mut ticker = Ticker::new(Duration::from_millis(20));
        let start = Instant::now();
        ticker.wait();
        ticker.wait();

        assert_eq!(ticker.period(), Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_ticker_does_not_pile_up() {
        let mut ticker = Ticker::new(Duration::from_millis(100));
        thread::sleep(Duration::from_millis(250));

        // The overrun tick returns at once, and the next one is a full period
        // away instead of being due already.
        let start = Instant::now();
        ticker.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
        ticker.wait();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_window_runs_until_deadline() {
        let mut source = tree();
        let window = SamplingWindow::new(1, Duration::from_millis(30), SHORT_TICK);

        let mut ticks = 0;
        let output = window.run(&mut source, |samples, members| {
            assert_eq!(samples.len(), 3);
            assert_eq!(members.len(), 3);
            ticks += 1;
        });

        assert_eq!(output.end, WindowEnd::Deadline);
        assert!(ticks >= 2);
        assert_eq!(output.histories.len(), 3);
        assert_eq!(output.histories[&3].len(), ticks);
        assert_eq!(output.survivors.len(), 3);
    }

    #[test]
    fn test_window_ends_when_root_exits() {
        let mut source = tree();
        source.exit(1);

        let window = SamplingWindow::new(1, Duration::from_secs(60), SHORT_TICK);
        let output = window.run(&mut source, |_, _| {});

        assert_eq!(output.end, WindowEnd::WorkloadExited);
        assert!(output.histories.is_empty());
        assert!(output.tracked.contains(1));
    }

    #[test]
    fn test_every_sampled_pid_is_tracked() {
        let mut source = tree();
        source.spawn(4, Some(3), "c", 400);

        let window = SamplingWindow::new(1, Duration::from_millis(20), SHORT_TICK);
        let output = window.run(&mut source, |_, _| {});

        for pid in output.histories.keys() {
            assert!(output.tracked.contains(*pid));
        }
        assert_eq!(output.tracked.len(), 4);
    }

    #[test]
    fn test_new_process_is_sampled_on_the_tick_it_appears() {
        let mut source = FakeSource::new();
        source.spawn(1, None, "root", 100);
        // Shows up in the second snapshot and is gone by the third.
        source.spawn_on_refresh(2, 2, Some(1), "short", 200);
        source.exit_on_refresh(3, 2);
        source.spawn_on_refresh(3, 3, Some(1), "late", 300);

        let window = SamplingWindow::new(1, Duration::from_millis(200), SHORT_TICK);
        let mut ticks: Vec<Vec<Pid>> = Vec::new();
        let output = window.run(&mut source, |samples, _| {
            ticks.push(samples.iter().map(|sample| sample.pid).collect());
        });

        assert!(ticks.len() >= 3);
        assert_eq!(ticks[0], vec![1]);
        assert_eq!(ticks[1], vec![1, 2]);
        assert_eq!(ticks[2], vec![1, 3]);

        assert_eq!(output.histories[&2].len(), 1);
        for pid in output.tracked.iter() {
            assert!(output.histories.contains_key(&pid), "{pid} was never sampled");
        }
    }

    #[test]
    fn test_discovery_failure_keeps_sampling() {
        let mut source = tree();
        source.broken_children.insert(1);

        let window = SamplingWindow::new(1, Duration::from_millis(20), SHORT_TICK);
        let output = window.run(&mut source, |_, _| {});

        // Only the root could be found, but it was still sampled.
        assert_eq!(output.end, WindowEnd::Deadline);
        assert_eq!(output.histories.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_exited_early() {
        let result = SessionResult {
            repetition: 0,
            start_latency: Duration::ZERO,
            stop_latency: Duration::ZERO,
            load_avg: None,
            summaries: Vec::new(),
            window_end: WindowEnd::WorkloadExited,
        };
        assert!(result.exited_early());
    }

    #[cfg(target_family = "unix")]
    mod unix {
        use std::sync::mpsc;

        use super::*;
        use crate::collection::SysinfoSource;

        fn session(
            launcher: CommandLauncher, duration: Duration, repetitions: u32,
        ) -> Session<SysinfoSource, Vec<u8>> {
            let config = SessionConfig {
                duration,
                repetitions,
                tick: Duration::from_millis(100),
                record_intervals: true,
            };

            Session::new(
                config,
                launcher,
                SysinfoSource::new(),
                Console::new(Vec::new(), true, false),
            )
        }

        fn is_running(pid: Pid) -> bool {
            let mut source = SysinfoSource::new();
            source.refresh().unwrap();
            source.resolve(pid).is_ok()
        }

        #[test]
        fn test_workload_that_exits_immediately() {
            let launcher = CommandLauncher::new("sh").args(["-c", "exit 0"]);
            let mut session = session(launcher, Duration::from_secs(30), 1);

            let outcome = session.run().unwrap();
            assert_eq!(outcome.results.len(), 1);
            assert!(outcome.results[0].exited_early());
            assert_eq!(session.state(), SessionState::Reporting);

            let console = String::from_utf8(session.into_console().into_inner()).unwrap();
            assert!(console.contains("workload stop time:"));
        }

        #[test]
        fn test_workload_is_stopped_at_deadline() {
            let launcher = CommandLauncher::new("sleep").arg("30");
            let mut session = session(launcher, Duration::from_millis(300), 1);

            let outcome = session.run().unwrap();
            let result = &outcome.results[0];
            assert_eq!(result.window_end, WindowEnd::Deadline);
            assert!(result.start_latency > Duration::ZERO);
            assert!(result.stop_latency > Duration::ZERO);

            let root = &result.summaries[0];
            assert!(root.sample_count >= 1);
            assert!(!is_running(root.pid));
            assert!(outcome.intervals.iter().all(|record| record.pid == root.pid));
        }

        #[test]
        fn test_whole_tree_is_stopped() {
            let launcher =
                CommandLauncher::new("sh").args(["-c", "sleep 30 & sleep 30 & wait"]);
            let mut session = session(launcher, Duration::from_millis(500), 1);

            let outcome = session.run().unwrap();
            let summaries = &outcome.results[0].summaries;

            assert!(summaries.iter().any(|summary| summary.name == "sleep"));
            for summary in summaries {
                assert!(!is_running(summary.pid), "{} is still running", summary.pid);
            }
        }

        #[test]
        fn test_repetitions_run_in_order() {
            let launcher = CommandLauncher::new("sh").args(["-c", "exit 0"]);
            let mut session = session(launcher, Duration::from_secs(30), 2);

            let outcome = session.run().unwrap();
            let repetitions: Vec<u32> = outcome.results.iter().map(|r| r.repetition).collect();
            assert_eq!(repetitions, vec![0, 1]);
        }

        #[test]
        fn test_launch_failure_is_fatal() {
            let launcher = CommandLauncher::new("/this/does/not/exist/benchmon-workload");
            let mut session = session(launcher, Duration::from_secs(1), 3);

            assert!(session.run().is_err());
            assert_eq!(session.state(), SessionState::Spawning);
        }

        #[test]
        fn test_interrupt_watcher_is_kept_informed() {
            let (sender, receiver) = mpsc::channel();
            let launcher = CommandLauncher::new("sh").args(["-c", "exit 0"]);
            let mut session =
                session(launcher, Duration::from_secs(30), 1).with_interrupts(sender);

            session.run().unwrap();
            let events: Vec<InterruptEvent> = receiver.try_iter().collect();

            assert_eq!(events[0], InterruptEvent::Spawning);
            assert!(matches!(events[1], InterruptEvent::Watch(_)));
            assert_eq!(events.last(), Some(&InterruptEvent::Unwatch));
            assert!(events[2..events.len() - 1]
                .iter()
                .all(|event| matches!(event, InterruptEvent::Members(_))));
        }

        #[test]
        fn test_interrupt_watcher_hears_of_failed_launch() {
            let (sender, receiver) = mpsc::channel();
            let launcher = CommandLauncher::new("/this/does/not/exist/benchmon-workload");
            let mut session =
                session(launcher, Duration::from_secs(1), 1).with_interrupts(sender);

            assert!(session.run().is_err());
            let events: Vec<InterruptEvent> = receiver.try_iter().collect();
            assert_eq!(events, vec![InterruptEvent::Spawning, InterruptEvent::Unwatch]);
        }

        #[test]
        fn test_interrupt_watcher_learns_tree_members() {
            let (sender, receiver) = mpsc::channel();
            let launcher = CommandLauncher::new("sh").args(["-c", "sleep 30 & wait"]);
            let mut session =
                session(launcher, Duration::from_millis(500), 1).with_interrupts(sender);

            session.run().unwrap();
            let events: Vec<InterruptEvent> = receiver.try_iter().collect();
            let root = match events[1] {
                InterruptEvent::Watch(root) => root,
                ref other => panic!("expected a watch event, got {other:?}"),
            };

            let widest = events
                .iter()
                .filter_map(|event| match event {
                    InterruptEvent::Members(members) => Some(members.len()),
                    _ => None,
                })
                .max();
            assert!(widest >= Some(2));
            assert!(events.iter().any(|event| matches!(
                event,
                InterruptEvent::Members(members) if members.iter().any(|m| m.pid == root)
            )));
        }
    }
}
