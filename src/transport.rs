//! Delivery of a pipeline run to the caller.
//!
//! Streamed and unary modes share one pipeline call and differ only in how
//! events surface, so the two paths cannot drift apart in behavior. The
//! whole attempt, including a fallback to unary when the stream cannot be
//! opened, runs under a single wall-clock timeout; expiry flips the
//! pipeline's cancellation flag so in-flight work stops at its next
//! suspension point.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use crate::error::{Result, StrategyError};
use crate::events::{FnSink, NullSink, StreamEvent};
use crate::pipeline::{RunRequest, StrategyPipeline};
use crate::types::Strategy;

/// Runs the pipeline and delivers progress in the caller's preferred mode.
#[derive(Clone)]
pub struct ProgressTransport {
    pipeline: Arc<StrategyPipeline>,
    timeout: Duration,
}

impl ProgressTransport {
    pub fn new(pipeline: Arc<StrategyPipeline>, timeout: Duration) -> Self {
        Self { pipeline, timeout }
    }

    /// Streamed first, unary on stream-setup failure, all under one
    /// deadline.
    ///
    /// `open_stream` establishes the event channel; when it fails before
    /// any event is emitted, the run proceeds in unary mode with an
    /// identical result. On deadline expiry the in-flight run is cancelled
    /// and [`StrategyError::Timeout`] is returned.
    pub async fn run<F>(&self, request: RunRequest, open_stream: F) -> Result<Strategy>
    where
        F: FnOnce() -> Result<UnboundedSender<StreamEvent>>,
    {
        match open_stream() {
            Ok(events) => {
                let attempt = self.streamed(request, events.clone());
                match tokio::time::timeout(self.timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => {
                        // The streamed future was dropped before it could
                        // send its terminal record, so send one here
                        self.pipeline.cancel_flag().store(true, Ordering::Relaxed);
                        let _ = events.send(StreamEvent::Error {
                            error: StrategyError::Timeout.to_string(),
                        });
                        Err(StrategyError::Timeout)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "stream setup failed, falling back to unary");
                self.run_unary(request).await
            }
        }
    }

    /// Unary mode: the terminal outcome only, under the deadline.
    pub async fn run_unary(&self, request: RunRequest) -> Result<Strategy> {
        match tokio::time::timeout(self.timeout, self.pipeline.run(request, &NullSink)).await {
            Ok(result) => result,
            Err(_) => {
                self.pipeline.cancel_flag().store(true, Ordering::Relaxed);
                Err(StrategyError::Timeout)
            }
        }
    }

    /// Spawn a streamed run and return the receiving end. The last record
    /// on the channel is always terminal, including on timeout.
    pub fn spawn_streamed(&self, request: RunRequest) -> UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = self.clone();
        tokio::spawn(async move {
            // Every path through run() has already sent the terminal record
            let _ = transport.run(request, move || Ok(tx)).await;
        });
        rx
    }

    /// One pipeline run with events forwarded into `events`. The terminal
    /// record is sent before this returns, on both paths.
    async fn streamed(
        &self,
        request: RunRequest,
        events: UnboundedSender<StreamEvent>,
    ) -> Result<Strategy> {
        let progress_tx = events.clone();
        let sink = FnSink(move |event| {
            // A consumer that hung up just stops observing; the run finishes
            let _ = progress_tx.send(StreamEvent::progress(&event));
        });

        let result = self.pipeline.run(request, &sink).await;

        let terminal = match &result {
            Ok(strategy) => StreamEvent::Complete {
                data: Box::new(strategy.clone()),
            },
            Err(e) => StreamEvent::Error {
                error: e.to_string(),
            },
        };
        let _ = events.send(terminal);

        result
    }
}
