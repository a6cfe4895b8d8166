//! Request Dispatcher: runs one request's network exchange with retries.
//!
//! Each dispatched request gets its own task. The task owns the request,
//! takes the session's wire lock around every transport call, and reports
//! the final outcome through [`SessionCore::complete`]. Cancellation is
//! signalled through a [`CancellationToken`]; the canceller has already
//! delivered `Cancelled` by the time the task notices.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::session::SessionCore;
use crate::transport::TransportError;
use crate::types::{Payload, RecognitionMode, RecognitionRequest, RecognitionResult, RequestId};

/// Bookkeeping for the single in-flight request, kept under the session lock.
#[derive(Debug)]
pub(crate) struct ActiveRequest {
    pub(crate) id: RequestId,
    pub(crate) mode: RecognitionMode,
    pub(crate) attempt: u32,
    pub(crate) cancel: CancellationToken,
}

impl ActiveRequest {
    pub(crate) fn new(id: RequestId, mode: RecognitionMode, cancel: CancellationToken) -> Self {
        Self {
            id,
            mode,
            attempt: 1,
            cancel,
        }
    }
}

/// Spawn the exchange task for `request` on the session runtime.
pub(crate) fn spawn_exchange(
    core: Arc<SessionCore>,
    request: RecognitionRequest,
    cancel: CancellationToken,
) {
    let span = tracing::info_span!(
        "glimpse.request.exchange",
        session.id = %request.session_id,
        request.id = %request.id,
        request.mode = %request.mode,
    );
    let runtime = core.runtime().clone();
    runtime.spawn(run_exchange(core, request, cancel).instrument(span));
}

async fn run_exchange(core: Arc<SessionCore>, mut request: RecognitionRequest, cancel: CancellationToken) {
    let policy = core.retry_policy().clone();

    let outcome = loop {
        let Some(result) = attempt(&core, &request, &cancel).await else {
            tracing::debug!(request.attempt = request.attempt, "Exchange aborted");
            return;
        };

        let err = match result {
            Ok(payload) => break RecognitionResult::Success { payload },
            Err(err) => err,
        };

        let kind = err.kind();
        if cancel.is_cancelled() || !policy.should_retry(kind, request.attempt) {
            break RecognitionResult::failure(kind, err.to_string());
        }

        let delay = policy.backoff_for_retry(request.attempt);
        tracing::warn!(
            request.attempt = request.attempt,
            error = %err,
            backoff_ms = delay.as_millis() as u64,
            "Transient failure, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        request.attempt += 1;
        if !core.note_retry(request.id, request.attempt) {
            return;
        }
    };

    core.complete(request.id, outcome);
}

/// Run one attempt. `None` means the exchange was aborted by cancellation
/// and nothing should be reported.
async fn attempt(
    core: &SessionCore,
    request: &RecognitionRequest,
    cancel: &CancellationToken,
) -> Option<Result<Payload, TransportError>> {
    // Waiting for a preempted exchange to wind down is always abortable.
    let _wire = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        guard = core.wire().lock() => guard,
    };

    let transport = core.transport();
    let exchange = async {
        match tokio::time::timeout(core.request_timeout(), transport.recognize(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    };

    tracing::debug!(
        request.attempt = request.attempt,
        transport = transport.name(),
        "Sending recognition request"
    );

    if transport.abortable() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = exchange => Some(result),
        }
    } else {
        // The response still has to arrive; the session discards it as late.
        Some(exchange.await)
    }
}

/// Describe a finished exchange for logs.
pub(crate) fn outcome_label(result: &RecognitionResult) -> &'static str {
    match result {
        RecognitionResult::Success { .. } => "success",
        RecognitionResult::Failure { kind, .. } => kind.as_str(),
        RecognitionResult::Cancelled => "cancelled",
    }
}
