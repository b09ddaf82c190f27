//! Learning-oracle interfaces.
//!
//! Ownership model:
//! - `Oracle` is the swappable boundary to an external learner. It answers one
//!   example at a time and reports transport problems as `Err`.
//! - `OracleClient` owns the call policy (retries, per-call timeout) and folds
//!   every failure into `ProgramResult::NotLearned`, so one bad example never
//!   stops a run.
//! - Oracles that own external resources (processes) enforce the timeout
//!   themselves through `learn_within`. Other oracles run on a worker thread
//!   that is abandoned when the timeout elapses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::constants::oracle::{FN_ORACLE_NAME, TIMEOUT_REASON, WORKER_STOPPED_REASON};
use crate::data::{CandidateExample, ProgramResult};
use crate::errors::RewriteError;

/// Oracle backed by an external learner process.
pub mod command;

pub use command::{CommandOracle, CommandOracleConfig};

/// External string-transformation learner.
///
/// Callers guarantee `source != target`; implementations need not check.
/// Returning `Ok(ProgramResult::NotLearned)` is the normal "no rule found"
/// answer. `Err` is reserved for transport-level trouble (learner
/// unreachable, crashed, or answered garbage).
pub trait Oracle: Send + Sync {
    /// Stable oracle name used in logs and errors.
    fn name(&self) -> &str;
    /// Learn a program rewriting `source` into `target`.
    fn learn(&self, source: &str, target: &str) -> Result<ProgramResult, RewriteError>;

    /// True if `learn_within` enforces its deadline itself and releases
    /// every resource it acquired when the deadline elapses.
    fn enforces_deadline(&self) -> bool {
        false
    }

    /// Learn under a deadline, returning `RewriteError::OracleTimeout` once it
    /// elapses. Only called when `enforces_deadline` is true.
    fn learn_within(
        &self,
        source: &str,
        target: &str,
        _timeout: Duration,
    ) -> Result<ProgramResult, RewriteError> {
        self.learn(source, target)
    }
}

/// Oracle adapter around a closure.
///
/// Handy for embedding an in-process learner or a deterministic stub.
pub struct FnOracle<F> {
    name: String,
    learn: F,
}

impl<F> FnOracle<F>
where
    F: Fn(&str, &str) -> Result<ProgramResult, RewriteError> + Send + Sync,
{
    /// Wrap `learn` under the default `fn` name.
    pub fn new(learn: F) -> Self {
        Self::named(FN_ORACLE_NAME, learn)
    }

    /// Wrap `learn` under an explicit name.
    pub fn named(name: impl Into<String>, learn: F) -> Self {
        Self {
            name: name.into(),
            learn,
        }
    }
}

impl<F> Oracle for FnOracle<F>
where
    F: Fn(&str, &str) -> Result<ProgramResult, RewriteError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn learn(&self, source: &str, target: &str) -> Result<ProgramResult, RewriteError> {
        (self.learn)(source, target)
    }
}

/// Snapshot of oracle client counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OracleStats {
    /// Examples submitted to the client.
    pub examples: usize,
    /// Examples that produced a program.
    pub learned: usize,
    /// Examples that ended as not learned, for any reason.
    pub not_learned: usize,
    /// Transport failures, counted per attempt.
    pub failures: usize,
    /// Calls abandoned after the per-call timeout.
    pub timeouts: usize,
}

#[derive(Default)]
/// Client runtime counters.
struct ClientCounters {
    examples: AtomicUsize,
    learned: AtomicUsize,
    not_learned: AtomicUsize,
    failures: AtomicUsize,
    timeouts: AtomicUsize,
}

/// Result of one attempt against the oracle.
enum Attempt {
    Answered(ProgramResult),
    Failed(RewriteError),
    TimedOut,
}

/// Call-policy wrapper that turns every oracle outcome into a `ProgramResult`.
pub struct OracleClient {
    oracle: Arc<dyn Oracle>,
    timeout: Option<Duration>,
    retries: usize,
    counters: ClientCounters,
}

impl OracleClient {
    /// Client with no timeout and no retries.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            timeout: None,
            retries: 0,
            counters: ClientCounters::default(),
        }
    }

    /// Client using the oracle policy from `config`.
    pub fn from_config(oracle: Arc<dyn Oracle>, config: &PipelineConfig) -> Self {
        let mut client = Self::new(oracle).with_retries(config.oracle_retries);
        client.timeout = config.oracle_timeout;
        client
    }

    /// Abandon calls that run longer than `timeout` (they count as not learned).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry transport failures up to `retries` extra times.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Name of the wrapped oracle.
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Learn one example. Never fails: transport errors and timeouts become
    /// `NotLearned` after the retry budget is spent.
    pub fn learn(&self, example: &CandidateExample) -> ProgramResult {
        self.counters.examples.fetch_add(1, Ordering::Relaxed);
        let mut attempt = 0usize;
        let result = loop {
            match self.attempt(example) {
                Attempt::Answered(result) => break result,
                Attempt::TimedOut => {
                    self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "[rewrites:oracle] oracle='{}' {} for '{}'",
                        self.oracle.name(),
                        TIMEOUT_REASON,
                        example
                    );
                    break ProgramResult::NotLearned;
                }
                Attempt::Failed(err) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    if attempt < self.retries {
                        attempt += 1;
                        debug!(
                            "[rewrites:oracle] retrying '{}' (attempt {}/{}) after: {}",
                            example, attempt, self.retries, err
                        );
                        continue;
                    }
                    warn!(
                        "[rewrites:oracle] oracle='{}' failed for '{}': {}",
                        self.oracle.name(),
                        example,
                        err
                    );
                    break ProgramResult::NotLearned;
                }
            }
        };
        match &result {
            ProgramResult::Program(_) => self.counters.learned.fetch_add(1, Ordering::Relaxed),
            ProgramResult::NotLearned => self.counters.not_learned.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// Current counter values.
    pub fn stats(&self) -> OracleStats {
        OracleStats {
            examples: self.counters.examples.load(Ordering::Relaxed),
            learned: self.counters.learned.load(Ordering::Relaxed),
            not_learned: self.counters.not_learned.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
        }
    }

    fn attempt(&self, example: &CandidateExample) -> Attempt {
        let Some(timeout) = self.timeout else {
            return match self.oracle.learn(&example.source, &example.target) {
                Ok(result) => Attempt::Answered(result),
                Err(err) => Attempt::Failed(err),
            };
        };

        if self.oracle.enforces_deadline() {
            return match self
                .oracle
                .learn_within(&example.source, &example.target, timeout)
            {
                Ok(result) => Attempt::Answered(result),
                Err(RewriteError::OracleTimeout { .. }) => Attempt::TimedOut,
                Err(err) => Attempt::Failed(err),
            };
        }

        // In-process oracles hold nothing to reclaim: the worker is detached
        // on timeout and its late answer is dropped.
        let (sender, receiver) = mpsc::sync_channel(1);
        let oracle = Arc::clone(&self.oracle);
        let source = example.source.clone();
        let target = example.target.clone();
        thread::spawn(move || {
            let _ = sender.send(oracle.learn(&source, &target));
        });
        match receiver.recv_timeout(timeout) {
            Ok(Ok(result)) => Attempt::Answered(result),
            Ok(Err(err)) => Attempt::Failed(err),
            Err(RecvTimeoutError::Timeout) => Attempt::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Attempt::Failed(RewriteError::OracleUnavailable {
                oracle: self.oracle.name().to_string(),
                reason: WORKER_STOPPED_REASON.into(),
            }),
        }
    }
}
