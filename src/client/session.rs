//! Upload and analysis lifecycle for one client session.
//!
//! At most one analysis operation is live at a time. Each operation gets an
//! id from a generation counter plus an abort signal; starting a new one
//! (or calling [`AnalysisSession::reset`]) drops the previous operation's
//! abort sender, which both interrupts the pending request or timer and
//! makes any late completion a no-op. The live slot is checked and the
//! visible state written under the same lock, so a superseded operation can
//! never publish.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::debug;

use super::notify::{NoticeLevel, Notifier};
use super::transport::{AnalysisTransport, TransportFailure};
use super::upload::{self, SelectionError, UploadCandidate, UploadedFile};
use crate::domain::{demo, AnalysisResult};
use crate::error::AI_NOT_CONFIGURED;

/// Visible state of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    /// File chosen, not yet submitted.
    Uploading(Arc<UploadedFile>),
    /// One operation outstanding. `file` is `None` for a demo run.
    Analyzing { file: Option<Arc<UploadedFile>> },
    Succeeded(AnalysisResult),
    FailedOverToDemo(AnalysisResult),
    Errored(String),
}

impl LifecycleState {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Succeeded(result) | Self::FailedOverToDemo(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, Self::Analyzing { .. })
    }
}

/// How an operation ended, as seen by the caller that started it.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalEvent {
    Succeeded(AnalysisResult),
    FailedOverToDemo(AnalysisResult),
    /// Superseded by a newer operation or a reset. Nothing was published.
    Cancelled,
    Errored(String),
}

/// UX pacing. None of these decide whether a response is honored.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Pause before an explicit demo result appears.
    pub demo_delay: Duration,
    /// Pause before the offline sample replaces a failed analysis.
    pub fallback_delay: Duration,
    /// Pads a fast success so the loading view does not flash.
    pub min_visible_loading: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            demo_delay: Duration::from_secs(2),
            fallback_delay: Duration::from_secs(2),
            min_visible_loading: None,
        }
    }
}

impl Timing {
    pub fn immediate() -> Self {
        Self {
            demo_delay: Duration::ZERO,
            fallback_delay: Duration::ZERO,
            min_visible_loading: None,
        }
    }
}

struct LiveOperation {
    id: u64,
    // Dropping the sender aborts the operation.
    _abort: oneshot::Sender<()>,
}

/// Handed to the running operation. Resolves once it has been superseded.
struct OperationToken {
    id: u64,
    aborted: oneshot::Receiver<()>,
}

struct Inner {
    transport: Arc<dyn AnalysisTransport>,
    notifier: Arc<dyn Notifier>,
    timing: Timing,
    max_upload_bytes: AtomicU64,
    generation: AtomicU64,
    live: Mutex<Option<LiveOperation>>,
    state: watch::Sender<LifecycleState>,
}

#[derive(Clone)]
pub struct AnalysisSession {
    inner: Arc<Inner>,
}

impl AnalysisSession {
    pub fn new(
        transport: Arc<dyn AnalysisTransport>,
        notifier: Arc<dyn Notifier>,
        timing: Timing,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            inner: Arc::new(Inner {
                transport,
                notifier,
                timing,
                max_upload_bytes: AtomicU64::new(upload::DEFAULT_MAX_UPLOAD_BYTES),
                generation: AtomicU64::new(0),
                live: Mutex::new(None),
                state,
            }),
        }
    }

    /// Override the client-side upload cap. Should match the server's.
    pub fn with_max_upload_bytes(self, max_upload_bytes: u64) -> Self {
        self.inner
            .max_upload_bytes
            .store(max_upload_bytes, Ordering::Relaxed);
        self
    }

    fn max_upload_bytes(&self) -> u64 {
        self.inner.max_upload_bytes.load(Ordering::Relaxed)
    }

    /// Current visible state.
    pub fn state(&self) -> LifecycleState {
        self.inner.state.borrow().clone()
    }

    /// Watch the visible state.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Accept a file for analysis.
    ///
    /// A rejected file leaves the session untouched apart from a warning. An
    /// accepted one stops whatever was running and clears the previous
    /// result.
    pub fn select_file(
        &self,
        candidate: UploadCandidate,
    ) -> Result<Arc<UploadedFile>, SelectionError> {
        self.accept(upload::select_file(candidate, self.max_upload_bytes()))
    }

    /// Like [`select_file`](Self::select_file) for a multi-file drop. Anything
    /// other than exactly one file is rejected.
    pub fn select_files(
        &self,
        candidates: Vec<UploadCandidate>,
    ) -> Result<Arc<UploadedFile>, SelectionError> {
        self.accept(upload::select_one(candidates, self.max_upload_bytes()))
    }

    fn accept(
        &self,
        selection: Result<Arc<UploadedFile>, SelectionError>,
    ) -> Result<Arc<UploadedFile>, SelectionError> {
        match selection {
            Ok(file) => {
                self.inner.supersede(LifecycleState::Uploading(file.clone()));
                Ok(file)
            }
            Err(err) => {
                self.inner
                    .notifier
                    .notify(NoticeLevel::Warning, &err.to_string());
                Err(err)
            }
        }
    }

    /// Select a file and analyze it.
    pub async fn upload(&self, candidate: UploadCandidate) -> Result<TerminalEvent, SelectionError> {
        let file = self.select_file(candidate)?;
        Ok(self.analyze(file).await)
    }

    /// "Start Over": stop any running operation and return to idle.
    pub fn reset(&self) {
        self.inner.supersede(LifecycleState::Idle);
    }

    /// Submit `file` to the analysis service.
    pub async fn analyze(&self, file: Arc<UploadedFile>) -> TerminalEvent {
        let inner = &self.inner;
        let mut token = inner.begin(LifecycleState::Analyzing {
            file: Some(file.clone()),
        });
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = &mut token.aborted => return TerminalEvent::Cancelled,
            outcome = inner.transport.submit(&file) => outcome,
        };

        match outcome {
            Ok(result) => {
                if let Some(min) = inner.timing.min_visible_loading {
                    let remaining = min.saturating_sub(started.elapsed());
                    if !inner.pause(&mut token, remaining).await {
                        return TerminalEvent::Cancelled;
                    }
                }
                let event = inner.finish(token, LifecycleState::Succeeded(result));
                if let TerminalEvent::Succeeded(result) = &event {
                    inner.notifier.notify(
                        NoticeLevel::Success,
                        &format!("Analysis of {} complete", result.metadata.file_name),
                    );
                }
                event
            }
            Err(failure) if failure.is_rejection() => {
                let message = failure.user_message();
                let event = inner.finish(token, LifecycleState::Errored(message.clone()));
                if matches!(event, TerminalEvent::Errored(_)) {
                    inner.notifier.notify(NoticeLevel::Error, &message);
                }
                event
            }
            Err(failure) => {
                debug!(error = %failure, "Analysis failed, falling back to sample");
                let fallback_delay = inner.timing.fallback_delay;
                if !inner.pause(&mut token, fallback_delay).await {
                    return TerminalEvent::Cancelled;
                }
                let event = inner.finish(
                    token,
                    LifecycleState::FailedOverToDemo(demo::fallback_result(&file.name, file.size())),
                );
                if matches!(event, TerminalEvent::FailedOverToDemo(_)) {
                    inner
                        .notifier
                        .notify(NoticeLevel::Warning, &fallback_notice(&failure));
                }
                event
            }
        }
    }

    /// Show the canned demo analysis after the demo delay.
    pub async fn run_demo(&self) -> TerminalEvent {
        let inner = &self.inner;
        let mut token = inner.begin(LifecycleState::Analyzing { file: None });

        let demo_delay = inner.timing.demo_delay;
        if !inner.pause(&mut token, demo_delay).await {
            return TerminalEvent::Cancelled;
        }

        let event = inner.finish(token, LifecycleState::Succeeded(demo::demo_result()));
        if matches!(event, TerminalEvent::Succeeded(_)) {
            inner
                .notifier
                .notify(NoticeLevel::Success, "Demo analysis loaded");
        }
        event
    }
}

fn fallback_notice(failure: &TransportFailure) -> String {
    if failure.error_code() == Some(AI_NOT_CONFIGURED) {
        "AI analysis is not configured on the server. Showing a sample analysis; use demo mode to explore the full view.".to_string()
    } else {
        "Could not reach the analysis service. Showing a sample analysis instead.".to_string()
    }
}

impl Inner {
    /// Drop the live operation, if any, and publish `state`.
    fn supersede(&self, state: LifecycleState) {
        let stopped = {
            let mut live = self.live.lock();
            let stopped = live.take().is_some();
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state.send_replace(state);
            stopped
        };
        if stopped {
            self.notifier
                .notify(NoticeLevel::Info, "Previous analysis stopped");
        }
    }

    /// Start a new operation, superseding the live one.
    fn begin(&self, state: LifecycleState) -> OperationToken {
        let (abort, aborted) = oneshot::channel();
        let (id, stopped) = {
            let mut live = self.live.lock();
            let stopped = live.take().is_some();
            let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *live = Some(LiveOperation { id, _abort: abort });
            self.state.send_replace(state);
            (id, stopped)
        };
        if stopped {
            self.notifier
                .notify(NoticeLevel::Info, "Previous analysis stopped");
        }
        debug!(operation = id, "Analysis operation started");
        OperationToken { id, aborted }
    }

    /// Wait `duration` unless superseded first. Returns false when superseded.
    async fn pause(&self, token: &mut OperationToken, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_superseded(token);
        }
        tokio::select! {
            biased;
            _ = &mut token.aborted => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn is_superseded(&self, token: &OperationToken) -> bool {
        self.live.lock().as_ref().map(|op| op.id) != Some(token.id)
    }

    /// Publish `state` if `token` is still the live operation.
    fn finish(&self, token: OperationToken, state: LifecycleState) -> TerminalEvent {
        let mut live = self.live.lock();
        if live.as_ref().map(|op| op.id) != Some(token.id) {
            debug!(operation = token.id, "Superseded operation completed, discarding");
            return TerminalEvent::Cancelled;
        }
        *live = None;

        let event = match &state {
            LifecycleState::Succeeded(result) => TerminalEvent::Succeeded(result.clone()),
            LifecycleState::FailedOverToDemo(result) => {
                TerminalEvent::FailedOverToDemo(result.clone())
            }
            LifecycleState::Errored(message) => TerminalEvent::Errored(message.clone()),
            _ => TerminalEvent::Cancelled,
        };
        self.state.send_replace(state);
        event
    }
}
