//! Session State Machine and the public session handles.
//!
//! All mutable session facts (state, mode, gate, in-flight request, options,
//! stats) live in one `Inner` behind one mutex. Every decision that reads
//! and changes them (admission, dispatch, cancellation, completion, state
//! transitions) happens inside a single critical section, so readers never
//! see a torn state and a frame can never be admitted "between" a pause and
//! the cancellation it causes.
//!
//! Two handles expose the session:
//! - [`RecognitionSession`] owns it and terminates it on drop.
//! - [`SessionControl`] is a cheap, non-owning handle for observers and UI
//!   code; once the owner is gone every call reports `Terminated`.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::dispatcher::{outcome_label, spawn_exchange, ActiveRequest};
use crate::error::SessionError;
use crate::gate::{Admission, FrameGate, GateContext};
use crate::lifecycle::{SessionState, Transition};
use crate::retry::RetryPolicy;
use crate::router::{in_delivery, DeferredOp, DeferredQueue, RecognitionObserver, ResultRouter};
use crate::stats::SessionStats;
use crate::transport::RecognitionTransport;
use crate::types::{
    FailureKind, Frame, Options, RecognitionMode, RecognitionRequest, RecognitionResult,
    RequestId, RequestSource, SessionId,
};

/// The in-flight request as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub id: RequestId,
    pub mode: RecognitionMode,
    pub attempt: u32,
}

/// Consistent point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub state: SessionState,
    pub mode: RecognitionMode,
    pub in_flight: Option<InFlight>,
    pub stats: SessionStats,
}

struct Inner {
    state: SessionState,
    mode: RecognitionMode,
    gate: FrameGate,
    active: Option<ActiveRequest>,
    next_id: u64,
    options: Arc<Options>,
    stats: SessionStats,
    deferred: DeferredQueue,
}

pub(crate) struct SessionCore {
    id: SessionId,
    config: EngineConfig,
    transport: Arc<dyn RecognitionTransport>,
    runtime: Handle,
    /// Held for the duration of every transport call
    wire: tokio::sync::Mutex<()>,
    router: ResultRouter,
    inner: Mutex<Inner>,
}

impl SessionCore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub(crate) fn wire(&self) -> &tokio::sync::Mutex<()> {
        &self.wire
    }

    pub(crate) fn transport(&self) -> &dyn RecognitionTransport {
        self.transport.as_ref()
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    fn state(&self) -> SessionState {
        self.lock().state
    }

    fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            session_id: self.id,
            state: inner.state,
            mode: inner.mode,
            in_flight: inner.active.as_ref().map(|a| InFlight {
                id: a.id,
                mode: a.mode,
                attempt: a.attempt,
            }),
            stats: inner.stats,
        }
    }

    /// Apply `transition`, or report why it is illegal.
    fn transition(
        &self,
        inner: &mut Inner,
        transition: Transition,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if inner.state.is_terminated() {
            return Err(SessionError::Terminated);
        }
        let next = inner
            .state
            .apply(transition)
            .ok_or_else(|| SessionError::invalid(operation, inner.state))?;
        if next != inner.state {
            tracing::debug!(
                session.id = %self.id,
                from = %inner.state,
                to = %next,
                "Session state changed"
            );
        }
        inner.state = next;
        Ok(())
    }

    fn fault(&self, inner: &mut Inner, reason: &str) {
        self.cancel_active(inner, "session faulted");
        if let Some(next) = inner.state.apply(Transition::Fault) {
            inner.state = next;
            tracing::warn!(session.id = %self.id, reason = %reason, "Session entered error state");
        }
    }

    /// Cancel the in-flight request, if any, delivering `Cancelled` for it.
    fn cancel_active(&self, inner: &mut Inner, reason: &'static str) {
        let Some(active) = inner.active.take() else {
            return;
        };
        active.cancel.cancel();
        inner.stats.record_outcome(&RecognitionResult::Cancelled);
        self.router.deliver(active.id, RecognitionResult::Cancelled);
        tracing::info!(
            session.id = %self.id,
            request.id = %active.id,
            request.mode = %active.mode,
            reason,
            "Request cancelled"
        );
    }

    fn dispatch(
        self: &Arc<Self>,
        inner: &mut Inner,
        source: RequestSource,
        mode: RecognitionMode,
    ) -> RequestId {
        inner.next_id += 1;
        let id = RequestId(inner.next_id);
        let cancel = CancellationToken::new();

        let request = RecognitionRequest {
            id,
            session_id: self.id,
            client_id: Arc::clone(&self.config.client_id),
            source,
            mode,
            attempt: 1,
            submitted_at: chrono::Utc::now(),
            options: Arc::clone(&inner.options),
        };

        inner.active = Some(ActiveRequest::new(id, mode, cancel.clone()));
        inner.stats.requests_dispatched += 1;

        tracing::info!(
            session.id = %self.id,
            request.id = %id,
            request.mode = %mode,
            "Request dispatched"
        );

        spawn_exchange(Arc::clone(self), request, cancel);
        id
    }

    #[tracing::instrument(name = "glimpse.session.start", skip_all, fields(session.id = %self.id))]
    fn start(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Terminated => return Err(SessionError::Terminated),
            SessionState::Active | SessionState::Starting => return Ok(()),
            _ => {}
        }

        self.transition(&mut inner, Transition::Begin, "start")?;
        if let Err(err) = self.config.validate() {
            self.fault(&mut inner, &err.to_string());
            return Err(err);
        }
        self.transition(&mut inner, Transition::Activate, "start")?;

        tracing::info!(mode = %inner.mode, "Session started");
        Ok(())
    }

    /// Move `Idle -> Starting` on behalf of the presentation controller.
    pub(crate) fn begin_start(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        self.transition(&mut inner, Transition::Begin, "present")?;
        if let Err(err) = self.config.validate() {
            self.fault(&mut inner, &err.to_string());
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn activate(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        self.transition(&mut inner, Transition::Activate, "activate")?;
        tracing::info!(session.id = %self.id, mode = %inner.mode, "Session started");
        Ok(())
    }

    /// Undo `begin_start` after a failed presentation. No-op unless `Starting`.
    pub(crate) fn abandon_start(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Starting {
            let _ = self.transition(&mut inner, Transition::Abandon, "abandon");
        }
    }

    fn pause(&self) -> Result<(), SessionError> {
        if in_delivery(self.id) {
            return self.defer(DeferredOp::Pause);
        }
        self.pause_now()
    }

    fn resume(&self) -> Result<(), SessionError> {
        if in_delivery(self.id) {
            return self.defer(DeferredOp::Resume);
        }
        self.resume_now()
    }

    fn terminate(&self) -> Result<(), SessionError> {
        if in_delivery(self.id) {
            return self.defer(DeferredOp::Terminate);
        }
        self.terminate_now()
    }

    #[tracing::instrument(name = "glimpse.session.pause", skip_all, fields(session.id = %self.id))]
    fn pause_now(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state == SessionState::Active {
            self.cancel_active(&mut inner, "session paused");
        }
        self.transition(&mut inner, Transition::Pause, "pause")
    }

    #[tracing::instrument(name = "glimpse.session.resume", skip_all, fields(session.id = %self.id))]
    fn resume_now(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state == SessionState::Active {
            return Ok(());
        }
        self.transition(&mut inner, Transition::Resume, "resume")
    }

    #[tracing::instrument(name = "glimpse.session.terminate", skip_all, fields(session.id = %self.id))]
    fn terminate_now(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state.is_terminated() {
            return Ok(());
        }

        self.cancel_active(&mut inner, "session terminated");
        self.transition(&mut inner, Transition::Terminate, "terminate")?;
        inner.gate.reset();
        inner.options = Arc::default();
        inner.deferred.clear();
        self.router.shutdown();

        tracing::info!(stats = ?inner.stats, "Session terminated");
        Ok(())
    }

    /// Queue a control call made from inside an observer callback.
    ///
    /// Legality is checked against the state the session will have once
    /// every earlier deferred call is applied.
    fn defer(&self, op: DeferredOp) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let projected = inner.deferred.iter().fold(inner.state, |state, op| project(state, *op));

        let legal = match (op, projected) {
            (_, SessionState::Terminated) => return Err(SessionError::Terminated),
            (DeferredOp::Pause, SessionState::Active | SessionState::Paused) => true,
            (DeferredOp::Resume, SessionState::Active | SessionState::Paused) => true,
            (DeferredOp::Terminate, _) => true,
            _ => false,
        };
        if !legal {
            let operation = match op {
                DeferredOp::Pause => "pause",
                DeferredOp::Resume => "resume",
                DeferredOp::Terminate => "terminate",
            };
            return Err(SessionError::invalid(operation, projected));
        }

        tracing::debug!(session.id = %self.id, op = ?op, "Deferring control call until delivery completes");
        inner.deferred.push_back(op);
        Ok(())
    }

    /// Apply control calls queued during the last delivery, in order.
    pub(crate) fn apply_deferred(&self) {
        loop {
            let Some(op) = self.lock().deferred.pop_front() else {
                break;
            };
            let result = match op {
                DeferredOp::Pause => self.pause_now(),
                DeferredOp::Resume => self.resume_now(),
                DeferredOp::Terminate => self.terminate_now(),
            };
            if let Err(err) = result {
                tracing::warn!(session.id = %self.id, op = ?op, error = %err, "Deferred control call failed");
            }
        }
    }

    fn submit_frame(self: &Arc<Self>, frame: Frame) -> Result<Admission, SessionError> {
        let mut inner = self.lock();
        if inner.state.is_terminated() {
            return Err(SessionError::Terminated);
        }

        let ctx = GateContext {
            state: inner.state,
            mode: inner.mode,
            in_flight: inner.active.as_ref().map(|a| a.mode),
        };
        let verdict = inner.gate.admit(&frame, ctx);
        inner.stats.record_admission(verdict);

        match verdict {
            Ok(()) => {
                let id = self.dispatch(&mut inner, RequestSource::Frame(frame), RecognitionMode::Continuous);
                Ok(Admission::Admitted(id))
            }
            Err(reason) => {
                tracing::trace!(
                    session.id = %self.id,
                    frame.sequence = frame.sequence,
                    reason = %reason,
                    "Frame dropped"
                );
                Ok(Admission::Dropped(reason))
            }
        }
    }

    #[tracing::instrument(name = "glimpse.session.submit_image", skip_all, fields(session.id = %self.id))]
    fn submit_image(self: &Arc<Self>, image: Bytes) -> Result<RequestId, SessionError> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Terminated => return Err(SessionError::Terminated),
            SessionState::Active => {}
            state => return Err(SessionError::invalid("submit_image", state)),
        }

        match inner.active.as_ref().map(|a| (a.id, a.mode)) {
            Some((id, RecognitionMode::Manual)) => return Err(SessionError::ManualInFlight(id)),
            Some((_, RecognitionMode::Continuous)) => {
                self.cancel_active(&mut inner, "preempted by manual submission");
            }
            None => {}
        }

        Ok(self.dispatch(&mut inner, RequestSource::Image(image), RecognitionMode::Manual))
    }

    fn set_mode(&self, mode: RecognitionMode) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state.is_terminated() {
            return Err(SessionError::Terminated);
        }
        if inner.mode != mode {
            tracing::info!(session.id = %self.id, mode = %mode, "Recognition mode changed");
            inner.mode = mode;
        }
        Ok(())
    }

    fn set_options(&self, options: Option<Options>) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.state.is_terminated() {
            return Err(SessionError::Terminated);
        }
        inner.options = Arc::new(options.unwrap_or_default());
        Ok(())
    }

    /// Record the terminal outcome reported by an exchange task.
    ///
    /// If the request is no longer the active one it was already resolved
    /// (cancelled), and the response is discarded.
    pub(crate) fn complete(&self, id: RequestId, result: RecognitionResult) {
        let mut inner = self.lock();
        if !inner.active.as_ref().is_some_and(|a| a.id == id) {
            inner.stats.late_discarded += 1;
            tracing::debug!(
                session.id = %self.id,
                request.id = %id,
                outcome = outcome_label(&result),
                "Discarding late response"
            );
            return;
        }

        inner.active = None;
        inner.stats.record_outcome(&result);

        let kind = result.failure_kind();
        match &result {
            RecognitionResult::Failure { message, .. } => tracing::warn!(
                session.id = %self.id,
                request.id = %id,
                outcome = outcome_label(&result),
                error = %message,
                "Request failed"
            ),
            _ => tracing::info!(
                session.id = %self.id,
                request.id = %id,
                outcome = outcome_label(&result),
                "Request completed"
            ),
        }
        self.router.deliver(id, result);

        if kind == Some(FailureKind::Unauthorized) {
            self.fault(&mut inner, "client credentials rejected");
        }
    }

    /// Record that the exchange for `id` is starting another attempt.
    /// Returns false when the request is no longer in flight.
    pub(crate) fn note_retry(&self, id: RequestId, attempt: u32) -> bool {
        let mut inner = self.lock();
        let Some(active) = inner.active.as_mut().filter(|a| a.id == id) else {
            return false;
        };
        active.attempt = attempt;
        inner.stats.retries += 1;
        true
    }
}

/// State after a deferred op is applied, ignoring illegal ones.
fn project(state: SessionState, op: DeferredOp) -> SessionState {
    match (op, state) {
        (DeferredOp::Pause, SessionState::Active) => SessionState::Paused,
        (DeferredOp::Resume, SessionState::Paused) => SessionState::Active,
        (DeferredOp::Terminate, _) => SessionState::Terminated,
        _ => state,
    }
}

/// A continuous recognition session.
///
/// Dropping the session terminates it: the in-flight request (if any) is
/// cancelled and `Cancelled` is still delivered to a live observer.
pub struct RecognitionSession {
    core: Arc<SessionCore>,
}

impl RecognitionSession {
    /// Create a session on the current tokio runtime.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn RecognitionTransport>,
    ) -> Result<Self, SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        Ok(Self::with_runtime(config, transport, runtime))
    }

    /// Create a session whose exchange and delivery tasks run on `runtime`.
    pub fn with_runtime(
        config: EngineConfig,
        transport: Arc<dyn RecognitionTransport>,
        runtime: Handle,
    ) -> Self {
        let id = SessionId::generate();
        let (router, queue) = ResultRouter::new(id);

        let inner = Inner {
            state: SessionState::Idle,
            mode: config.mode,
            gate: FrameGate::new(config.debounce),
            active: None,
            next_id: 0,
            options: Arc::new(config.options.clone()),
            stats: SessionStats::default(),
            deferred: DeferredQueue::new(),
        };

        tracing::info!(
            session.id = %id,
            mode = %config.mode,
            transport = transport.name(),
            debounce_ms = config.debounce.as_millis() as u64,
            "Session created"
        );

        let core = Arc::new(SessionCore {
            id,
            config,
            transport,
            runtime,
            wire: tokio::sync::Mutex::new(()),
            router,
            inner: Mutex::new(inner),
        });
        queue.spawn(&core.runtime, id, Arc::downgrade(&core));

        Self { core }
    }

    /// Register `observer` without taking ownership of it.
    pub fn with_observer<O: RecognitionObserver + 'static>(self, observer: &Arc<O>) -> Self {
        self.set_observer(observer);
        self
    }

    /// Replace the observer. Only a weak reference is kept.
    pub fn set_observer<O: RecognitionObserver + 'static>(&self, observer: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(observer);
        self.core.router.observer().set(Some(weak));
    }

    pub fn clear_observer(&self) {
        self.core.router.observer().set(None);
    }

    pub fn id(&self) -> SessionId {
        self.core.id
    }

    /// Non-owning handle for observers and UI code.
    pub fn control(&self) -> SessionControl {
        SessionControl {
            id: self.core.id,
            core: Arc::downgrade(&self.core),
        }
    }

    /// `Idle -> Active`. No-op when already `Starting` or `Active`.
    pub fn start(&self) -> Result<(), SessionError> {
        self.core.start()
    }

    /// Cancel the in-flight request and stop admitting frames. Idempotent.
    pub fn pause(&self) -> Result<(), SessionError> {
        self.core.pause()
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.core.resume()
    }

    /// Cancel everything and move to `Terminated`. Idempotent.
    pub fn terminate(&self) -> Result<(), SessionError> {
        self.core.terminate()
    }

    /// Offer a camera frame. Frames the gate refuses are reported as
    /// `Admission::Dropped`, which is not an error.
    pub fn submit_frame(&self, frame: Frame) -> Result<Admission, SessionError> {
        self.core.submit_frame(frame)
    }

    /// Recognize a still image now, preempting a continuous request.
    pub fn submit_image(&self, image: impl Into<Bytes>) -> Result<RequestId, SessionError> {
        self.core.submit_image(image.into())
    }

    pub fn set_mode(&self, mode: RecognitionMode) -> Result<(), SessionError> {
        self.core.set_mode(mode)
    }

    /// Replace pass-through options for requests dispatched from now on.
    pub fn set_options(&self, options: Option<Options>) -> Result<(), SessionError> {
        self.core.set_options(options)
    }

    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.core.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        self.core.lock().stats
    }

    pub(crate) fn core(&self) -> &SessionCore {
        &self.core
    }
}

impl fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("id", &self.core.id)
            .field("state", &self.core.state())
            .finish()
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        // Not deferred: the core may not outlive this handle.
        let _ = self.core.terminate_now();
    }
}

/// Non-owning session handle.
///
/// Safe to store inside an observer: it does not keep the session alive.
/// Control calls made from inside `on_result` take effect right after the
/// callback returns.
#[derive(Clone)]
pub struct SessionControl {
    id: SessionId,
    core: Weak<SessionCore>,
}

impl SessionControl {
    fn core(&self) -> Result<Arc<SessionCore>, SessionError> {
        self.core.upgrade().ok_or(SessionError::Terminated)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn start(&self) -> Result<(), SessionError> {
        self.core()?.start()
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.core()?.pause()
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.core()?.resume()
    }

    pub fn terminate(&self) -> Result<(), SessionError> {
        match self.core.upgrade() {
            Some(core) => core.terminate(),
            None => Ok(()),
        }
    }

    pub fn submit_frame(&self, frame: Frame) -> Result<Admission, SessionError> {
        self.core()?.submit_frame(frame)
    }

    pub fn submit_image(&self, image: impl Into<Bytes>) -> Result<RequestId, SessionError> {
        self.core()?.submit_image(image.into())
    }

    pub fn set_mode(&self, mode: RecognitionMode) -> Result<(), SessionError> {
        self.core()?.set_mode(mode)
    }

    pub fn set_options(&self, options: Option<Options>) -> Result<(), SessionError> {
        self.core()?.set_options(options)
    }

    pub fn state(&self) -> SessionState {
        self.core
            .upgrade()
            .map_or(SessionState::Terminated, |core| core.state())
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(self.core()?.snapshot())
    }
}

impl fmt::Debug for SessionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionControl").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;

    fn session(config: EngineConfig) -> RecognitionSession {
        RecognitionSession::new(config, Arc::new(LoopbackTransport::default())).unwrap()
    }

    #[test]
    fn new_outside_runtime_fails() {
        let err = RecognitionSession::new(
            EngineConfig::new("acme"),
            Arc::new(LoopbackTransport::default()),
        )
        .unwrap_err();
        assert_eq!(err, SessionError::NoRuntime);
    }

    #[tokio::test]
    async fn lifecycle_contract() {
        let session = session(EngineConfig::new("acme"));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(matches!(
            session.pause(),
            Err(SessionError::InvalidState { operation: "pause", .. })
        ));

        session.start().unwrap();
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Active);

        session.pause().unwrap();
        session.pause().unwrap();
        assert_eq!(session.state(), SessionState::Paused);
        assert!(matches!(session.start(), Err(SessionError::InvalidState { .. })));

        session.resume().unwrap();
        session.resume().unwrap();
        assert_eq!(session.state(), SessionState::Active);

        session.terminate().unwrap();
        session.terminate().unwrap();
        assert_eq!(session.start(), Err(SessionError::Terminated));
        assert_eq!(session.pause(), Err(SessionError::Terminated));
        assert_eq!(session.resume(), Err(SessionError::Terminated));
        assert_eq!(session.submit_image(vec![1u8]), Err(SessionError::Terminated));
        assert_eq!(
            session.submit_frame(Frame::new(1, Duration::ZERO, Vec::new())),
            Err(SessionError::Terminated)
        );
        assert_eq!(session.snapshot().stats.requests_dispatched, 0);
    }

    #[tokio::test]
    async fn empty_client_id_faults_on_start() {
        let session = session(EngineConfig::new(""));
        assert!(matches!(session.start(), Err(SessionError::Configuration(_))));
        assert_eq!(session.state(), SessionState::Error);
        assert!(matches!(session.resume(), Err(SessionError::InvalidState { .. })));
        session.terminate().unwrap();
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[tokio::test]
    async fn control_handle_does_not_keep_session_alive() {
        let session = session(EngineConfig::new("acme"));
        let control = session.control();
        control.start().unwrap();
        assert_eq!(control.state(), SessionState::Active);

        drop(session);
        assert_eq!(control.state(), SessionState::Terminated);
        assert_eq!(control.pause(), Err(SessionError::Terminated));
        assert_eq!(control.terminate(), Ok(()));
    }

    #[tokio::test]
    async fn submit_image_requires_active() {
        let session = session(EngineConfig::new("acme"));
        assert!(matches!(
            session.submit_image(vec![1u8]),
            Err(SessionError::InvalidState { operation: "submit_image", .. })
        ));
    }

    #[test]
    fn projection_of_deferred_ops() {
        assert_eq!(project(SessionState::Active, DeferredOp::Pause), SessionState::Paused);
        assert_eq!(project(SessionState::Paused, DeferredOp::Resume), SessionState::Active);
        assert_eq!(project(SessionState::Error, DeferredOp::Pause), SessionState::Error);
        assert_eq!(project(SessionState::Idle, DeferredOp::Terminate), SessionState::Terminated);
    }
}
