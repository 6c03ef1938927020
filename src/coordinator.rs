//! One render run: origin gate, browser session, readiness wait, extraction,
//! emission. Each stage starts only after the previous one succeeded.

use std::time::Duration;

use tracing::{info, warn};
use wd_session::{BrowserSession, SessionConnector};

use crate::errors::{RenderError, RenderResult};
use crate::extract::{extract_document, RenderedDocument};
use crate::gate::{ensure_origin, OriginHandle, OriginMode};
use crate::output::{EmitReceipt, OutputSink};
use crate::target::RenderTarget;
use crate::wait::{PollClock, PollPolicy, PollReport, RenderWait, TokioClock};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// What a successful run did. A locally started origin keeps serving for as
/// long as the handle's task is left running.
#[derive(Debug)]
pub struct RunSummary {
    pub origin: OriginHandle,
    pub polls: PollReport,
    pub receipt: EmitReceipt,
}

pub struct Coordinator<K, C = TokioClock> {
    connector: K,
    clock: C,
    policy: PollPolicy,
    probe_timeout: Duration,
}

impl<K: SessionConnector> Coordinator<K, TokioClock> {
    pub fn new(connector: K, policy: PollPolicy) -> Self {
        Self {
            connector,
            clock: TokioClock,
            policy,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl<K, C> Coordinator<K, C>
where
    K: SessionConnector,
    C: PollClock,
{
    pub fn with_clock<C2: PollClock>(self, clock: C2) -> Coordinator<K, C2> {
        Coordinator {
            connector: self.connector,
            clock,
            policy: self.policy,
            probe_timeout: self.probe_timeout,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn run(
        &self,
        target: &RenderTarget,
        mode: &OriginMode,
        sink: &mut dyn OutputSink,
    ) -> RenderResult<RunSummary> {
        let origin = ensure_origin(target, mode, self.probe_timeout).await?;
        info!(origin = origin.label(), url = %target.navigation_url(), "origin ready");

        let session = self
            .connector
            .connect()
            .await
            .map_err(RenderError::SessionStartError)?;

        let captured = self.capture(&session, target).await;
        if let Err(err) = session.close().await {
            warn!(error = %err, "failed to close browser session");
        }
        let (polls, document) = captured?;

        let receipt = sink.emit(document).await?;
        info!(
            destination = %receipt.destination,
            bytes = receipt.bytes,
            polls = polls.attempts(),
            "render complete"
        );
        Ok(RunSummary {
            origin,
            polls,
            receipt,
        })
    }

    async fn capture(
        &self,
        session: &K::Session,
        target: &RenderTarget,
    ) -> RenderResult<(PollReport, RenderedDocument)> {
        let mut wait = RenderWait::new(session, &self.clock, self.policy);
        let polls = wait.wait_for_render(target).await?;
        let document = extract_document(session, &polls).await?;
        Ok((polls, document))
    }
}
