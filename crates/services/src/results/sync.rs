//! Client-side view of test results.
//!
//! `ResultSync` owns every timer involved in showing results: the repeating
//! report poll, and while a run is in flight, the status poll plus a one-shot
//! safety ceiling. The ceiling is armed as soon as a run is requested, so a
//! runner that never answers the start request is released too. Each timer is
//! a separately abortable task; `teardown` (or drop) aborts all of them.
//!
//! Report fetches are not sequenced: a slow response can land after a newer
//! one and overwrite it. The last write wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use course_core::filter::{SuiteMap, filter_for_exercise};
use course_core::model::{
    ExerciseId, NormalizedSuite, RunRequest, TestReportDocument, normalize_report,
};
use tokio::sync::{Notify, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::results::source::ReportSource;
use crate::results::trigger::{RunTriggerClient, StartResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Cadence of the report poll.
    pub report_interval: Duration,
    /// Cadence of the status check while a run is in flight.
    pub status_interval: Duration,
    /// Longest a run is waited for, measured from the start request.
    pub run_ceiling: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_millis(3_000),
            status_interval: Duration::from_millis(200),
            run_ceiling: Duration::from_millis(120_000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPhase {
    #[default]
    NotRunning,
    Requested,
    Polling,
}

/// User-facing notice about a start request that did not start a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunNotice {
    AlreadyRunning,
    RunnerUnavailable,
}

impl RunNotice {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::AlreadyRunning => "Tests are already running",
            Self::RunnerUnavailable => {
                "Failed to run tests. Make sure the test runner is running"
            }
        }
    }
}

/// Why the last run stopped being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Finished,
    /// The status check failed; the outcome is unknown.
    StatusUnavailable,
    CeilingReached,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStart {
    Started,
    /// Rejected locally: a run is already requested or being polled.
    AlreadyActive,
    /// The runner answered that it is already running.
    AlreadyRunning,
    RunnerUnavailable,
    /// The runner did not answer the start request before the ceiling.
    TimedOut,
    /// The coordinator was torn down.
    Closed,
}

/// Everything a results view needs to render.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    /// True until the first fetch completes, successfully or not.
    pub loading: bool,
    pub report: Option<Arc<TestReportDocument>>,
    pub suites: Arc<Vec<NormalizedSuite>>,
    pub error: Option<String>,
    pub run_phase: RunPhase,
    pub notice: Option<RunNotice>,
    pub last_run_end: Option<RunEnd>,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            report: None,
            suites: Arc::new(Vec::new()),
            error: None,
            run_phase: RunPhase::NotRunning,
            notice: None,
            last_run_end: None,
        }
    }
}

impl SyncSnapshot {
    #[must_use]
    pub fn suites_for(&self, exercise: Option<&ExerciseId>, map: &SuiteMap) -> Vec<NormalizedSuite> {
        filter_for_exercise(&self.suites, exercise, map)
    }

    #[must_use]
    pub fn can_start_run(&self) -> bool {
        self.run_phase == RunPhase::NotRunning
    }
}

struct ActiveRun {
    generation: u64,
    /// Set once the runner has accepted the run.
    status: Option<AbortHandle>,
    ceiling: AbortHandle,
}

impl ActiveRun {
    fn abort_status(&self) {
        if let Some(status) = &self.status {
            status.abort();
        }
    }
}

#[derive(Default)]
struct RunSlot {
    next_generation: u64,
    active: Option<ActiveRun>,
}

struct Shared {
    source: Arc<dyn ReportSource>,
    trigger: Arc<dyn RunTriggerClient>,
    config: SyncConfig,
    state: watch::Sender<SyncSnapshot>,
    run: Mutex<RunSlot>,
    refresh_now: Notify,
    polling_reports: AtomicBool,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    async fn refresh(&self) {
        match self.source.fetch_report().await {
            Ok(report) => {
                let suites = normalize_report(&report);
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.report = Some(Arc::new(report));
                    state.suites = Arc::new(suites);
                    state.error = None;
                });
            }
            Err(err) => {
                debug!(error = %err, "test report unavailable");
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(err.to_string());
                });
            }
        }
    }

    /// Stop tracking run `generation`. Returns false if it already ended.
    fn finish(&self, generation: u64, end: RunEnd) -> bool {
        let active = lock(&self.run)
            .active
            .take_if(|active| active.generation == generation);
        let Some(active) = active else {
            return false;
        };

        // A timer calling in returns on its own.
        match end {
            RunEnd::CeilingReached => active.abort_status(),
            RunEnd::Finished | RunEnd::StatusUnavailable => active.ceiling.abort(),
            RunEnd::TornDown => {
                active.abort_status();
                active.ceiling.abort();
            }
        }

        self.state.send_modify(|state| {
            if end == RunEnd::CeilingReached && state.run_phase == RunPhase::Requested {
                state.notice = Some(RunNotice::RunnerUnavailable);
            }
            state.run_phase = RunPhase::NotRunning;
            state.last_run_end = Some(end);
        });
        true
    }

    /// Release run `generation` after the runner declined it.
    fn decline(&self, generation: u64, notice: RunNotice) {
        let active = lock(&self.run)
            .active
            .take_if(|active| active.generation == generation);
        let Some(active) = active else {
            return;
        };
        active.ceiling.abort();

        self.state.send_modify(|state| {
            state.run_phase = RunPhase::NotRunning;
            state.notice = Some(notice);
        });
    }
}

async fn poll_reports(shared: Arc<Shared>) {
    let mut ticker = time::interval(shared.config.report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = shared.refresh_now.notified() => debug!("refreshing test report after run"),
        }
        while in_flight.try_join_next().is_some() {}

        let shared = Arc::clone(&shared);
        in_flight.spawn(async move { shared.refresh().await });
    }
}

async fn poll_status(shared: Arc<Shared>, generation: u64) {
    let period = shared.config.status_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match shared.trigger.run_status().await {
            Ok(status) if status.running => {}
            Ok(_) => {
                if shared.finish(generation, RunEnd::Finished) {
                    info!(generation, "test run finished");
                    // Unmounted views fetch on mount anyway.
                    if shared.polling_reports.load(Ordering::Acquire) {
                        shared.refresh_now.notify_one();
                    }
                }
                return;
            }
            Err(err) => {
                warn!(error = %err, generation, "test runner unreachable; assuming run finished");
                shared.finish(generation, RunEnd::StatusUnavailable);
                return;
            }
        }
    }
}

async fn enforce_ceiling(shared: Arc<Shared>, generation: u64, deadline: Instant) {
    time::sleep_until(deadline).await;
    if shared.finish(generation, RunEnd::CeilingReached) {
        warn!(
            generation,
            ceiling_secs = shared.config.run_ceiling.as_secs(),
            "test run exceeded the ceiling; stopped waiting"
        );
    }
}

/// Coordinator behind a results view. Create one per mounted view.
pub struct ResultSync {
    shared: Arc<Shared>,
    suite_map: SuiteMap,
    report_poll: Mutex<Option<JoinHandle<()>>>,
}

impl ResultSync {
    #[must_use]
    pub fn new(
        source: Arc<dyn ReportSource>,
        trigger: Arc<dyn RunTriggerClient>,
        suite_map: SuiteMap,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(SyncSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                source,
                trigger,
                config,
                state,
                run: Mutex::new(RunSlot::default()),
                refresh_now: Notify::new(),
                polling_reports: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
            suite_map,
            report_poll: Mutex::new(None),
        }
    }

    /// Start the report poll: one fetch now, then one per interval.
    ///
    /// Must be called from within a tokio runtime. Mounting twice, or after
    /// teardown, does nothing.
    pub fn mount(&self) {
        let mut poll = lock(&self.report_poll);
        if poll.is_some() || self.shared.closed.load(Ordering::Acquire) {
            return;
        }
        self.shared.polling_reports.store(true, Ordering::Release);
        *poll = Some(tokio::spawn(poll_reports(Arc::clone(&self.shared))));
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        lock(&self.report_poll).is_some()
    }

    /// Cancel every timer and in-flight fetch owned by this coordinator.
    pub fn teardown(&self) {
        self.shared.closed.store(true, Ordering::Release);

        if let Some(handle) = lock(&self.report_poll).take() {
            self.shared.polling_reports.store(false, Ordering::Release);
            handle.abort();
        }

        let active = lock(&self.shared.run).active.take();
        if let Some(active) = active {
            active.abort_status();
            active.ceiling.abort();
            self.shared.state.send_modify(|state| {
                state.run_phase = RunPhase::NotRunning;
                state.last_run_end = Some(RunEnd::TornDown);
            });
        }
    }

    /// Fetch the report right away, outside the poll cadence.
    pub async fn refresh(&self) {
        self.shared.refresh().await;
    }

    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn suite_map(&self) -> &SuiteMap {
        &self.suite_map
    }

    #[must_use]
    pub fn run_phase(&self) -> RunPhase {
        self.shared.state.borrow().run_phase
    }

    /// Ask the runner to start `request` and track it until it finishes.
    ///
    /// Only one run is tracked at a time; while one is requested or polled,
    /// new requests are rejected without contacting the runner.
    pub async fn start_run(&self, request: RunRequest) -> RunStart {
        if self.shared.closed.load(Ordering::Acquire) {
            return RunStart::Closed;
        }

        let mut admitted = false;
        self.shared.state.send_if_modified(|state| {
            if state.run_phase != RunPhase::NotRunning {
                return false;
            }
            state.run_phase = RunPhase::Requested;
            state.notice = None;
            admitted = true;
            true
        });
        if !admitted {
            debug!("test run already in progress; start request not sent");
            return RunStart::AlreadyActive;
        }

        let deadline = Instant::now() + self.shared.config.run_ceiling;
        let Some(generation) = self.arm_ceiling(deadline) else {
            return RunStart::Closed;
        };
        info!(
            generation,
            test_file = request.test_file.as_deref().unwrap_or("all"),
            exercise = request.exercise_number.as_deref().unwrap_or("all"),
            "starting test run"
        );

        let answer = time::timeout_at(deadline, self.shared.trigger.start_run(&request)).await;
        match answer {
            Ok(Ok(StartResponse::Accepted)) => self.begin_polling(generation),
            Ok(Ok(StartResponse::Conflict)) => {
                info!("test runner is already running");
                self.shared.decline(generation, RunNotice::AlreadyRunning);
                RunStart::AlreadyRunning
            }
            Ok(Err(err)) => {
                warn!(error = %err, "failed to start test run");
                self.shared.decline(generation, RunNotice::RunnerUnavailable);
                RunStart::RunnerUnavailable
            }
            Err(_) => {
                if self.shared.finish(generation, RunEnd::CeilingReached) {
                    warn!(generation, "test runner never answered the start request");
                }
                RunStart::TimedOut
            }
        }
    }

    /// Run only the tests of `exercise`. `None` when its suite file or
    /// number cannot be determined.
    pub async fn run_for_exercise(&self, exercise: &ExerciseId) -> Option<RunStart> {
        let key = self.suite_map.filter_key(exercise)?;
        let number = key.exercise_number?;
        Some(
            self.start_run(RunRequest::for_file(key.suite_file, Some(number)))
                .await,
        )
    }

    pub async fn run_all(&self) -> RunStart {
        self.start_run(RunRequest::all()).await
    }

    /// Register a new run and start its ceiling timer. `None` after teardown.
    fn arm_ceiling(&self, deadline: Instant) -> Option<u64> {
        let shared = &self.shared;
        let mut slot = lock(&shared.run);
        if shared.closed.load(Ordering::Acquire) {
            shared
                .state
                .send_modify(|state| state.run_phase = RunPhase::NotRunning);
            return None;
        }

        slot.next_generation += 1;
        let generation = slot.next_generation;
        let ceiling = tokio::spawn(enforce_ceiling(Arc::clone(shared), generation, deadline));
        slot.active = Some(ActiveRun {
            generation,
            status: None,
            ceiling: ceiling.abort_handle(),
        });
        Some(generation)
    }

    fn begin_polling(&self, generation: u64) -> RunStart {
        let shared = &self.shared;
        let mut slot = lock(&shared.run);
        let Some(active) = slot
            .active
            .as_mut()
            .filter(|active| active.generation == generation)
        else {
            // Released while the start request was in flight.
            return if shared.closed.load(Ordering::Acquire) {
                RunStart::Closed
            } else {
                RunStart::TimedOut
            };
        };

        shared
            .state
            .send_modify(|state| state.run_phase = RunPhase::Polling);
        let status = tokio::spawn(poll_status(Arc::clone(shared), generation));
        active.status = Some(status.abort_handle());
        RunStart::Started
    }
}

impl Drop for ResultSync {
    fn drop(&mut self) {
        self.teardown();
    }
}
