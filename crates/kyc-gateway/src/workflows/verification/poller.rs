use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::domain::CaseReference;
use super::error::VerificationError;
use super::gateway::{CaseProgress, CaseStatus, CompletionPayload, GatewayError, VendorGateway};
use crate::config::VerificationConfig;

pub const DEFAULT_TIMEOUT_THRESHOLD: Duration = Duration::from_secs(600);

const MIN_BACKOFF_BASE: u32 = 2;
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);
const MAX_POLL_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Exponential wait schedule: `unit * base^(first_exponent + attempt - 1)`.
///
/// The base is clamped to at least 2 so every attempt waits strictly longer
/// than the one before it, until the wait saturates at `Duration::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    base: u32,
    first_exponent: u32,
    unit: Duration,
}

impl BackoffSchedule {
    pub fn new(base: u32, first_exponent: u32, unit: Duration) -> Self {
        let unit = if unit.is_zero() {
            DEFAULT_BACKOFF_UNIT
        } else {
            unit
        };

        Self {
            base: base.max(MIN_BACKOFF_BASE),
            first_exponent,
            unit,
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Wait before the given 1-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = self
            .first_exponent
            .saturating_add(attempt.saturating_sub(1));
        u128::from(self.base)
            .checked_pow(exponent)
            .and_then(|factor| self.unit.as_nanos().checked_mul(factor))
            .and_then(duration_from_nanos)
            .unwrap_or(Duration::MAX)
    }
}

fn duration_from_nanos(nanos: u128) -> Option<Duration> {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    let subsec = u32::try_from(nanos % NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, subsec))
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(MIN_BACKOFF_BASE, 1, DEFAULT_BACKOFF_UNIT)
    }
}

/// Deadline and wait schedule governing one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub backoff: BackoffSchedule,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_THRESHOLD,
            backoff: BackoffSchedule::default(),
        }
    }
}

impl From<&VerificationConfig> for PollPolicy {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            timeout: config.timeout_threshold,
            backoff: BackoffSchedule::new(
                config.backoff_base,
                config.backoff_first_exponent,
                DEFAULT_BACKOFF_UNIT,
            ),
        }
    }
}

/// Caller side of a cancellation pair.
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Token observed by the poll loop while it waits.
#[derive(Debug, Clone)]
pub struct Cancellation {
    receiver: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn pair() -> (CancellationHandle, Cancellation) {
        let (sender, receiver) = watch::channel(false);
        (CancellationHandle { sender }, Cancellation { receiver })
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_, token) = Self::pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        let outcome = self
            .receiver
            .wait_for(|cancelled| *cancelled)
            .await
            .map(|_| ());
        if outcome.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Transient bookkeeping for a single poll loop.
#[derive(Debug)]
struct PollAttempt {
    attempt: u32,
    elapsed: Duration,
    last_status: Option<CaseStatus>,
    last_error: Option<GatewayError>,
}

impl PollAttempt {
    fn timed_out(self, case: &CaseReference, started: Instant) -> VerificationError {
        warn!(
            %case,
            attempts = self.attempt,
            elapsed = ?self.elapsed,
            last_status = self.last_status.as_ref().map(CaseStatus::label),
            "verification polling timed out"
        );
        VerificationError::TimedOut {
            case: case.clone(),
            attempts: self.attempt,
            elapsed: started.elapsed(),
            last_error: self.last_error,
        }
    }
}

/// Waits for a vendor case to complete under a backoff schedule and deadline.
#[derive(Debug, Clone)]
pub struct VerificationPoller {
    policy: PollPolicy,
}

impl VerificationPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn poll<G>(
        &self,
        gateway: &G,
        case: &CaseReference,
        cancellation: &mut Cancellation,
    ) -> Result<CompletionPayload, VerificationError>
    where
        G: VendorGateway + ?Sized,
    {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.policy.timeout)
            .unwrap_or_else(|| started + MAX_POLL_WINDOW);
        let mut state = PollAttempt {
            attempt: 0,
            elapsed: Duration::ZERO,
            last_status: None,
            last_error: None,
        };

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(state.timed_out(case, started));
            }

            state.attempt += 1;
            let delay = self.policy.backoff.delay(state.attempt).min(remaining);

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!(%case, attempt = state.attempt, "verification polling cancelled");
                    return Err(VerificationError::Cancelled { case: case.clone() });
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let progress = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!(%case, attempt = state.attempt, "verification polling cancelled");
                    return Err(VerificationError::Cancelled { case: case.clone() });
                }
                progress = gateway.fetch_status(case) => progress,
                _ = tokio::time::sleep_until(deadline) => {
                    debug!(%case, attempt = state.attempt, "status check still pending at deadline");
                    state.elapsed = started.elapsed();
                    return Err(state.timed_out(case, started));
                }
            };
            state.elapsed = started.elapsed();

            match progress {
                Ok(CaseProgress::Complete(payload)) => {
                    info!(
                        %case,
                        attempt = state.attempt,
                        elapsed = ?state.elapsed,
                        "verification completed by vendor"
                    );
                    return Ok(payload);
                }
                Ok(CaseProgress::InProgress(status)) => {
                    debug!(
                        %case,
                        attempt = state.attempt,
                        status = status.label(),
                        "verification still in progress"
                    );
                    state.last_status = Some(status);
                    state.last_error = None;
                }
                Err(err) => {
                    warn!(
                        %case,
                        attempt = state.attempt,
                        error = %err,
                        "status check failed; retrying"
                    );
                    state.last_error = Some(err);
                }
            }
        }
    }
}
