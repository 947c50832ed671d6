//! Waiting for transformations to finish.
//!
//! The [`Poller`] checks the status of a request until it is done, has failed, or the
//! configured timeout has elapsed. Delays between checks back off exponentially up to a
//! maximum interval.

use std::{future::Future, time::Duration};

use backon::{BackoffBuilder as _, ExponentialBuilder};
use monitoring::logging;

use crate::{
    request::RequestId,
    status::{TransformState, TransformationStatus},
    transformation::{StatusError, TransformationsClient},
};

mod clock;

pub use self::clock::{Clock, ManualClock, TokioClock};

/// Anything that reports the status of a transformation request.
pub trait StatusSource {
    fn status(
        &self,
        id: &RequestId,
    ) -> impl Future<Output = Result<TransformationStatus, StatusError>> + Send;
}

impl StatusSource for TransformationsClient<'_> {
    fn status(
        &self,
        id: &RequestId,
    ) -> impl Future<Output = Result<TransformationStatus, StatusError>> + Send {
        TransformationsClient::status(self, id)
    }
}

/// Delay and timeout settings for [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first status check
    pub interval: Duration,
    /// Upper bound for the delay between checks
    pub max_interval: Duration,
    /// Multiplier applied to the delay after each check
    pub factor: f32,
    /// Time after the first check at which waiting stops
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            factor: 1.5,
            timeout: Duration::from_secs(1800),
        }
    }
}

impl PollPolicy {
    /// Delays between checks, never shorter than one millisecond.
    fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let floor = Duration::from_millis(1);
        let interval = self.interval.max(floor);
        let max_interval = self.max_interval.max(interval);
        let backoff = ExponentialBuilder::default()
            .with_min_delay(interval)
            .with_max_delay(max_interval)
            .with_factor(self.factor.max(1.0))
            .without_max_times()
            .build();
        backoff.chain(std::iter::repeat(max_interval))
    }
}

/// Progress of a request as seen by the poller.
///
/// States only move forward: `Pending` → `Running` → one of the terminal states. A status
/// report that would move the state backwards is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    Pending,
    Running,
    Done,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PollState::Done | PollState::Failed | PollState::TimedOut)
    }

    /// The state after observing `observed`.
    pub fn advance(self, observed: TransformState) -> PollState {
        let next = PollState::from(observed);
        if self.is_terminal() || next.rank() < self.rank() {
            return self;
        }
        next
    }

    fn rank(self) -> u8 {
        match self {
            PollState::Pending => 0,
            PollState::Running => 1,
            PollState::Done | PollState::Failed | PollState::TimedOut => 2,
        }
    }
}

impl From<TransformState> for PollState {
    fn from(state: TransformState) -> Self {
        match state {
            TransformState::Pending => PollState::Pending,
            TransformState::Running => PollState::Running,
            TransformState::Done => PollState::Done,
            TransformState::Failed => PollState::Failed,
        }
    }
}

/// A request that finished successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// The status document that reported completion
    pub status: TransformationStatus,
    /// Number of status checks made
    pub polls: u32,
    pub elapsed: Duration,
}

/// Checks the status of requests until they finish.
#[derive(Debug, Clone)]
pub struct Poller<C = TokioClock> {
    policy: PollPolicy,
    clock: C,
}

impl Poller<TokioClock> {
    pub fn new(policy: PollPolicy) -> Self {
        Self::with_clock(policy, TokioClock)
    }
}

impl<C: Clock> Poller<C> {
    pub fn with_clock(policy: PollPolicy, clock: C) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Waits for the request to finish.
    ///
    /// Returns as soon as a status check reports completion, without sleeping first, so
    /// waiting on a request that is already done makes exactly one check. Each check is bounded
    /// by the time left before the timeout, so a status call that never answers still ends the
    /// wait on time.
    ///
    /// # Errors
    ///
    /// - [`PollError::TransformationFailed`] when the request fails
    /// - [`PollError::TimedOut`] when the timeout elapses first
    /// - [`PollError::Status`] when a status check itself fails
    #[tracing::instrument(skip(self, source, id), fields(request_id = %id))]
    pub async fn wait<S>(&self, source: &S, id: &RequestId) -> Result<PollOutcome, PollError>
    where
        S: StatusSource,
    {
        let start = self.clock.now();
        let mut delays = self.policy.delays();
        let mut state = PollState::Pending;
        let mut polls = 0u32;

        loop {
            let remaining = self
                .policy
                .timeout
                .saturating_sub(self.clock.now().saturating_duration_since(start));
            let Some(result) = self.clock.timeout(remaining, source.status(id)).await else {
                let elapsed = self.clock.now().saturating_duration_since(start);
                tracing::warn!(polls, "Status check did not answer before the timeout");
                return Err(timed_out(id, elapsed, state, polls));
            };
            let status = result.map_err(|err| {
                tracing::warn!(error = %err, error_source = logging::error_source(&err), "Status check failed");
                PollError::Status {
                    request_id: id.clone(),
                    source: err,
                }
            })?;
            polls += 1;

            let observed = status.state();
            let next = state.advance(observed);
            if next != PollState::from(observed) {
                tracing::warn!(current = ?state, ?observed, "Ignoring status that moves backwards");
            } else if next != state {
                tracing::debug!(from = ?state, to = ?next, %status, "Transformation state changed");
            }
            state = next;

            let elapsed = self.clock.now().saturating_duration_since(start);
            match state {
                PollState::Done => {
                    tracing::info!(polls, elapsed_ms = elapsed.as_millis() as u64, "Transformation done");
                    return Ok(PollOutcome {
                        status,
                        polls,
                        elapsed,
                    });
                }
                PollState::Failed => {
                    tracing::warn!(%status, "Transformation failed");
                    return Err(PollError::TransformationFailed {
                        request_id: id.clone(),
                        status,
                    });
                }
                PollState::Pending | PollState::Running | PollState::TimedOut => {}
            }

            if elapsed >= self.policy.timeout {
                return Err(timed_out(id, elapsed, state, polls));
            }

            let remaining = self.policy.timeout - elapsed;
            let delay = delays
                .next()
                .unwrap_or(self.policy.max_interval)
                .min(remaining);
            tracing::trace!(delay_ms = delay.as_millis() as u64, "Waiting before next status check");
            self.clock.sleep(delay).await;
        }
    }
}

fn timed_out(id: &RequestId, elapsed: Duration, last_state: PollState, polls: u32) -> PollError {
    let state = PollState::TimedOut;
    tracing::warn!(?state, ?last_state, polls, "Timed out waiting for transformation");
    PollError::TimedOut {
        request_id: id.clone(),
        elapsed,
        last_state,
    }
}

/// Errors that can occur while waiting for a transformation.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// ServiceX reported the request as failed
    #[error("transformation {request_id} failed ({status})")]
    TransformationFailed {
        request_id: RequestId,
        status: TransformationStatus,
    },

    /// The request did not finish within the poll timeout
    #[error("transformation {request_id} did not finish within {elapsed:?} (last state {last_state:?})")]
    TimedOut {
        request_id: RequestId,
        elapsed: Duration,
        last_state: PollState,
    },

    /// A status check failed
    #[error("failed to check status of transformation {request_id}")]
    Status {
        request_id: RequestId,
        #[source]
        source: StatusError,
    },
}
