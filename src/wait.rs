//! Navigation and readiness polling.
//!
//! The readiness selector names a *loading marker*: while the marker matches
//! an element the page is still rendering, and the first query that finds no
//! match ends the wait. A driver-side "no such element" answer is treated as
//! not ready, like a present marker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use wd_session::{BrowserSession, ElementQuery, SessionError};

use crate::errors::{RenderError, RenderResult};
use crate::target::RenderTarget;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    NotNavigated,
    Navigating,
    Polling,
    Ready,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotReadyReason {
    MarkerStillPresent,
    NoSuchElementReported,
}

/// Result of one readiness check.
#[derive(Debug)]
pub enum PollOutcome {
    NotReady(NotReadyReason),
    Ready,
    Error(SessionError),
}

/// A matched marker means rendering has not finished.
pub fn marker_still_present(matches: usize) -> bool {
    matches > 0
}

impl PollOutcome {
    /// Classify the answer of a marker count query.
    pub fn classify(result: Result<usize, SessionError>) -> Self {
        match result {
            Ok(matches) if marker_still_present(matches) => {
                PollOutcome::NotReady(NotReadyReason::MarkerStillPresent)
            }
            Ok(_) => PollOutcome::Ready,
            Err(err) if err.is_no_such_element() => {
                PollOutcome::NotReady(NotReadyReason::NoSuchElementReported)
            }
            Err(err) => PollOutcome::Error(err),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready)
    }
}

/// Bounds of the polling loop. `None` bounds are not enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
    pub max_polls: Option<u64>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
            max_polls: None,
        }
    }
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
            max_polls: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_wait.is_none() && self.max_polls.is_none()
    }

    /// Delay before the next poll, or `None` once a bound is exhausted.
    pub fn next_delay(&self, attempts: u64, elapsed: Duration) -> Option<Duration> {
        if let Some(max_polls) = self.max_polls {
            if attempts >= max_polls {
                return None;
            }
        }
        match self.max_wait {
            Some(max_wait) => {
                let remaining = max_wait.checked_sub(elapsed)?;
                if remaining.is_zero() {
                    return None;
                }
                Some(self.interval.min(remaining))
            }
            None => Some(self.interval),
        }
    }
}

/// Time source for the polling loop.
#[async_trait]
pub trait PollClock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl PollClock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Summary of a wait that reached `Ready`. Only the polling loop builds one,
/// so holding a report proves the page is ready for extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollReport {
    attempts: u64,
    elapsed: Duration,
    marker_present: u64,
    no_such_element: u64,
}

impl PollReport {
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Polls that saw the marker element.
    pub fn marker_present(&self) -> u64 {
        self.marker_present
    }

    /// Polls the driver answered with "no such element".
    pub fn no_such_element(&self) -> u64 {
        self.no_such_element
    }
}

/// Drives one session from `NotNavigated` to `Ready` or `Failed`.
pub struct RenderWait<'a, S: ?Sized, C: ?Sized> {
    session: &'a S,
    clock: &'a C,
    policy: PollPolicy,
    state: RenderState,
}

impl<'a, S, C> RenderWait<'a, S, C>
where
    S: BrowserSession + ?Sized,
    C: PollClock + ?Sized,
{
    pub fn new(session: &'a S, clock: &'a C, policy: PollPolicy) -> Self {
        Self {
            session,
            clock,
            policy,
            state: RenderState::NotNavigated,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    fn transition(&mut self, next: RenderState) {
        debug!(from = ?self.state, to = ?next, "render state");
        self.state = next;
    }

    /// Navigate to the target and block until its marker is gone. Every call
    /// starts over with a fresh navigation.
    pub async fn wait_for_render(&mut self, target: &RenderTarget) -> RenderResult<PollReport> {
        self.state = RenderState::NotNavigated;
        self.navigate(target).await?;
        self.poll_until_ready(target.selector()).await
    }

    async fn navigate(&mut self, target: &RenderTarget) -> RenderResult<()> {
        self.transition(RenderState::Navigating);
        let url = target.navigation_url();
        info!(%url, "navigating");
        if let Err(source) = self.session.navigate(url.as_str()).await {
            self.transition(RenderState::Failed);
            return Err(RenderError::NavigationError {
                url: url.clone(),
                source,
            });
        }
        self.transition(RenderState::Polling);
        Ok(())
    }

    async fn poll_until_ready(&mut self, selector: &str) -> RenderResult<PollReport> {
        if self.policy.is_unbounded() {
            warn!(selector, "polling without a wait limit");
        }
        let query = ElementQuery::css(selector);
        let started = self.clock.now();
        let mut report = PollReport {
            attempts: 0,
            elapsed: Duration::ZERO,
            marker_present: 0,
            no_such_element: 0,
        };

        loop {
            report.attempts += 1;
            let outcome = PollOutcome::classify(self.session.count_matches(&query).await);
            report.elapsed = self.clock.now().saturating_duration_since(started);

            let reason = match outcome {
                PollOutcome::Ready => {
                    self.transition(RenderState::Ready);
                    info!(
                        selector,
                        attempts = report.attempts,
                        elapsed = ?report.elapsed,
                        "done waiting"
                    );
                    return Ok(report);
                }
                PollOutcome::Error(source) => {
                    self.transition(RenderState::Failed);
                    return Err(RenderError::PollError {
                        selector: selector.to_string(),
                        attempts: report.attempts,
                        source,
                    });
                }
                PollOutcome::NotReady(reason) => reason,
            };

            match reason {
                NotReadyReason::MarkerStillPresent => report.marker_present += 1,
                NotReadyReason::NoSuchElementReported => report.no_such_element += 1,
            }
            info!(
                attempt = report.attempts,
                ?reason,
                "waiting for element with selector {:?}... it has been {:?}",
                selector,
                report.elapsed
            );

            let Some(delay) = self.policy.next_delay(report.attempts, report.elapsed) else {
                self.transition(RenderState::Failed);
                return Err(RenderError::PollTimeout {
                    selector: selector.to_string(),
                    attempts: report.attempts,
                    waited: report.elapsed,
                });
            };
            self.clock.sleep(delay).await;
        }
    }
}
