//! Probe engine: bounded-concurrency sweep with a latched stop.
//!
//! A [`ProbeSession`] owns one run: `concurrency` workers pull candidates
//! from a shared source, attempt each under a timeout guard, judge the
//! result, consult the continuation policy and publish the [`Outcome`] on a
//! bounded channel consumed through [`Sweep`].
//!
//! Session lifecycle:
//!
//! ```text
//! Idle → Running → Draining → Closed(Exhausted | StoppedSuccess | StoppedError)
//!                ↘ Closed(Cancelled)
//! ```
//!
//! Once a stop is latched no further candidate is pulled, but attempts
//! already in flight finish and are delivered. Cancellation abandons them.

use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::Stream;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::policy::{ContinuationPolicy, Decision, Policy};
use crate::probe::{Pacing, Probe};
use crate::{Outcome, Status, TransportError};

/// Per-attempt timeout when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────────────────────────────────────
// Session configuration / state
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum simultaneous in-flight attempts (at least 1).
    pub concurrency: usize,
    /// Guard applied to every attempt.
    pub attempt_timeout: Duration,
    /// Inter-dispatch delay per worker.
    pub pacing: Pacing,
}

impl SessionConfig {
    /// Concurrency below 1 is raised to 1.
    pub fn new(concurrency: usize, attempt_timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            attempt_timeout,
            pacing: Pacing::None,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(1, DEFAULT_ATTEMPT_TIMEOUT)
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every candidate was attempted.
    Exhausted,
    /// The policy stopped the sweep on a Positive.
    StoppedSuccess,
    /// The policy stopped the sweep on an Error or Timeout.
    StoppedError,
    /// The cancellation signal fired; in-flight attempts were abandoned.
    Cancelled,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::StoppedSuccess => "stopped-success",
            Self::StoppedError => "stopped-error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    /// Stop latched, in-flight attempts not yet completed.
    Draining,
    Closed(Termination),
}

/// Outcome counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub positive: usize,
    pub negative: usize,
    pub error: usize,
    pub timeout: usize,
}

impl Tally {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Positive => self.positive += 1,
            Status::Negative => self.negative += 1,
            Status::Error => self.error += 1,
            Status::Timeout => self.timeout += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.error + self.timeout
    }
}

/// Final accounting of a closed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub termination: Termination,
    /// Candidates pulled from the source and attempted.
    pub dispatched: usize,
    /// Outcomes published.
    pub completed: usize,
    /// Attempts dropped on cancellation, including judged outcomes that
    /// could not be published.
    pub abandoned: usize,
    pub tally: Tally,
    /// Candidate whose outcome latched the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub duration_ms: u64,
}

impl SessionReport {
    fn aborted(session_id: Uuid, started: Instant) -> Self {
        Self {
            session_id,
            termination: Termination::Cancelled,
            dispatched: 0,
            completed: 0,
            abandoned: 0,
            tally: Tally::default(),
            trigger: None,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared worker state
// ─────────────────────────────────────────────────────────────────────────────

const LATCH_OPEN: u8 = 0;
const LATCH_SUCCESS: u8 = 1;
const LATCH_ERROR: u8 = 2;

/// One-way stop flag. The first compare-and-set wins; later stop decisions
/// are ignored.
#[derive(Debug, Default)]
struct StopLatch(AtomicU8);

impl StopLatch {
    fn try_latch(&self, decision: Decision) -> bool {
        let code = match decision {
            Decision::Continue => return false,
            Decision::StopSuccess => LATCH_SUCCESS,
            Decision::StopError => LATCH_ERROR,
        };
        self.0
            .compare_exchange(LATCH_OPEN, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn decision(&self) -> Option<Decision> {
        match self.0.load(Ordering::Acquire) {
            LATCH_SUCCESS => Some(Decision::StopSuccess),
            LATCH_ERROR => Some(Decision::StopError),
            _ => None,
        }
    }
}

/// Read-once candidate queue. Latching takes the same lock as pulling, so
/// no pull can slip between a latch and the check that precedes it.
struct CandidateSource<C> {
    iter: Mutex<Box<dyn Iterator<Item = C> + Send>>,
    latch: StopLatch,
}

impl<C> CandidateSource<C> {
    fn new(iter: Box<dyn Iterator<Item = C> + Send>) -> Self {
        Self {
            iter: Mutex::new(iter),
            latch: StopLatch::default(),
        }
    }

    fn pull(&self) -> Option<C> {
        let mut iter = self.iter.lock().unwrap_or_else(PoisonError::into_inner);
        if self.latch.decision().is_some() {
            return None;
        }
        iter.next()
    }

    fn latch(&self, decision: Decision) -> bool {
        let _guard = self.iter.lock().unwrap_or_else(PoisonError::into_inner);
        self.latch.try_latch(decision)
    }
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicUsize,
    completed: AtomicUsize,
    abandoned: AtomicUsize,
    positive: AtomicUsize,
    negative: AtomicUsize,
    error: AtomicUsize,
    timeout: AtomicUsize,
}

impl Counters {
    fn record(&self, status: Status) {
        let slot = match status {
            Status::Positive => &self.positive,
            Status::Negative => &self.negative,
            Status::Error => &self.error,
            Status::Timeout => &self.timeout,
        };
        slot.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn tally(&self) -> Tally {
        Tally {
            positive: self.positive.load(Ordering::Relaxed),
            negative: self.negative.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
        }
    }
}

struct Shared<P: Probe, Pol> {
    probe: P,
    policy: Pol,
    source: CandidateSource<P::Candidate>,
    trigger: OnceLock<String>,
    counters: Counters,
    outcomes: mpsc::Sender<Outcome<P::Candidate>>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    attempt_timeout: Duration,
    pacing: Pacing,
}

enum WorkerExit {
    /// Source empty or stop latched.
    Drained,
    /// Cancellation fired.
    Cancelled,
    /// The consumer dropped the outcome stream.
    Detached,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Run-level context: target, strategy, policy, tuning and cancellation.
pub struct ProbeSession<P, Pol = Policy> {
    id: Uuid,
    target: String,
    probe: P,
    policy: Pol,
    config: SessionConfig,
    cancel: CancellationToken,
}

impl<P, Pol> ProbeSession<P, Pol>
where
    P: Probe,
    Pol: ContinuationPolicy<P::Candidate> + 'static,
{
    pub fn new(target: impl Into<String>, probe: P, policy: Pol, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            probe,
            policy,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the session to an external cancellation signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start the sweep. Must be called from within a tokio runtime.
    ///
    /// Returns immediately; outcomes arrive on the returned [`Sweep`] in
    /// completion order.
    pub fn run<I>(self, candidates: I) -> Sweep<P::Candidate>
    where
        I: IntoIterator<Item = P::Candidate>,
        I::IntoIter: Send + 'static,
    {
        let started = Instant::now();
        let concurrency = self.config.concurrency.max(1);
        let (tx, rx) = mpsc::channel(concurrency.saturating_mul(4).max(8));
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let cancel = self.cancel.child_token();

        let shared = Arc::new(Shared {
            probe: self.probe,
            policy: self.policy,
            source: CandidateSource::new(Box::new(candidates.into_iter())),
            trigger: OnceLock::new(),
            counters: Counters::default(),
            outcomes: tx,
            state: state_tx,
            cancel: cancel.clone(),
            attempt_timeout: self.config.attempt_timeout,
            pacing: self.config.pacing,
        });

        tracing::info!(
            session = %self.id,
            strategy = %shared.probe.kind(),
            target = %self.target,
            concurrency,
            timeout_ms = self.config.attempt_timeout.as_millis() as u64,
            pacing = %self.config.pacing,
            "probe session started"
        );

        let driver = tokio::spawn(drive(shared, concurrency, self.id, started));

        Sweep {
            session_id: self.id,
            outcomes: rx,
            state: state_rx,
            driver,
            cancel,
            started,
        }
    }
}

async fn drive<P, Pol>(
    shared: Arc<Shared<P, Pol>>,
    concurrency: usize,
    session_id: Uuid,
    started: Instant,
) -> SessionReport
where
    P: Probe,
    Pol: ContinuationPolicy<P::Candidate> + 'static,
{
    shared.state.send_replace(SessionState::Running);

    let mut workers = JoinSet::new();
    for worker in 0..concurrency {
        workers.spawn(run_worker(Arc::clone(&shared), worker));
    }

    let mut cancelled = false;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(WorkerExit::Drained) => {}
            Ok(WorkerExit::Cancelled) => cancelled = true,
            Ok(WorkerExit::Detached) => {
                // Nobody is listening any more; stop the other workers too.
                cancelled = true;
                shared.cancel.cancel();
            }
            Err(e) => tracing::error!(session = %session_id, error = %e, "probe worker failed"),
        }
    }

    let termination = if cancelled {
        Termination::Cancelled
    } else {
        match shared.source.latch.decision() {
            Some(Decision::StopSuccess) => Termination::StoppedSuccess,
            Some(Decision::StopError) => Termination::StoppedError,
            _ => Termination::Exhausted,
        }
    };
    shared.state.send_replace(SessionState::Closed(termination));

    let report = SessionReport {
        session_id,
        termination,
        dispatched: shared.counters.dispatched.load(Ordering::Relaxed),
        completed: shared.counters.completed.load(Ordering::Relaxed),
        abandoned: shared.counters.abandoned.load(Ordering::Relaxed),
        tally: shared.counters.tally(),
        trigger: shared.trigger.get().cloned(),
        duration_ms: started.elapsed().as_millis() as u64,
    };

    tracing::info!(
        session = %session_id,
        termination = %report.termination,
        dispatched = report.dispatched,
        completed = report.completed,
        abandoned = report.abandoned,
        duration_ms = report.duration_ms,
        "probe session closed"
    );

    report
}

async fn run_worker<P, Pol>(shared: Arc<Shared<P, Pol>>, worker: usize) -> WorkerExit
where
    P: Probe,
    Pol: ContinuationPolicy<P::Candidate> + 'static,
{
    let mut first = true;
    loop {
        if shared.cancel.is_cancelled() {
            return WorkerExit::Cancelled;
        }

        if !first {
            let delay = shared.pacing.jittered_delay();
            if !delay.is_zero() {
                tokio::select! {
                    _ = shared.cancel.cancelled() => return WorkerExit::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        first = false;

        let Some(candidate) = shared.source.pull() else {
            return WorkerExit::Drained;
        };
        shared.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(worker, candidate = %candidate, "dispatch");

        let started = Instant::now();
        let attempt = tokio::time::timeout(shared.attempt_timeout, shared.probe.attempt(&candidate));
        let result = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                shared.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(worker, candidate = %candidate, "attempt abandoned on cancellation");
                return WorkerExit::Cancelled;
            }
            res = attempt => res.unwrap_or_else(|_| Err(TransportError::TimedOut(Some(shared.attempt_timeout)))),
        };

        let verdict = shared.probe.judge(&candidate, result);
        let outcome = Outcome::new(candidate, verdict, started.elapsed());
        let status = outcome.status;

        let decision = shared.policy.decide(&outcome);
        if decision.is_stop() && shared.source.latch(decision) {
            let _ = shared.trigger.set(outcome.candidate.to_string());
            shared.state.send_replace(SessionState::Draining);
            tracing::info!(
                worker,
                candidate = %outcome.candidate,
                decision = ?decision,
                "stop latched, draining in-flight attempts"
            );
        }

        // A judged outcome that never reaches the consumer counts as abandoned.
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                shared.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                return WorkerExit::Cancelled;
            }
            sent = shared.outcomes.send(outcome) => {
                if sent.is_err() {
                    shared.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                    return WorkerExit::Detached;
                }
            }
        }
        shared.counters.record(status);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sweep (outcome stream)
// ─────────────────────────────────────────────────────────────────────────────

/// Lazy, finite, non-restartable sequence of outcomes of a running session.
pub struct Sweep<C> {
    session_id: Uuid,
    outcomes: mpsc::Receiver<Outcome<C>>,
    state: watch::Receiver<SessionState>,
    driver: JoinHandle<SessionReport>,
    cancel: CancellationToken,
    started: Instant,
}

impl<C> Sweep<C> {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Next outcome in completion order; `None` once the session is closed
    /// and every published outcome has been read.
    pub async fn next(&mut self) -> Option<Outcome<C>> {
        self.outcomes.recv().await
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Cancel this session only. In-flight attempts are abandoned; outcomes
    /// already published stay readable.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Discard unread outcomes and wait for the session to close.
    pub async fn finish(mut self) -> SessionReport {
        while self.outcomes.recv().await.is_some() {}
        self.report().await
    }

    /// Read every remaining outcome and wait for the session to close.
    pub async fn collect(mut self) -> (Vec<Outcome<C>>, SessionReport) {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.outcomes.recv().await {
            outcomes.push(outcome);
        }
        let report = self.report().await;
        (outcomes, report)
    }

    async fn report(self) -> SessionReport {
        match self.driver.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(session = %self.session_id, error = %e, "session driver failed");
                SessionReport::aborted(self.session_id, self.started)
            }
        }
    }
}

impl<C> Stream for Sweep<C> {
    type Item = Outcome<C>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().outcomes.poll_recv(cx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
