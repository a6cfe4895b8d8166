//! Shared helpers for session integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use glimpse::{
    BackoffKind, EngineConfig, Frame, Payload, RecognitionObserver, RecognitionRequest, RecognitionResult,
    RecognitionSession, RecognitionTransport, RequestId, RetryPolicy, TransportError,
};
use serde_json::json;
use tokio::sync::mpsc;

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub struct Step {
    pub after: Duration,
    pub reply: Result<Payload, TransportError>,
}

impl Step {
    pub fn ok(after_ms: u64, payload: Payload) -> Self {
        Self {
            after: Duration::from_millis(after_ms),
            reply: Ok(payload),
        }
    }

    pub fn err(after_ms: u64, err: TransportError) -> Self {
        Self {
            after: Duration::from_millis(after_ms),
            reply: Err(err),
        }
    }
}

/// Transport that plays back scripted steps and tracks concurrency.
///
/// Once the script runs out, every call answers `{"echo": <request id>}`
/// after `fallback_latency`.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback_latency: Duration,
    abortable: bool,
    calls: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    seen: Mutex<Vec<RecognitionRequest>>,
    started_at: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::build(steps, Duration::ZERO, true)
    }

    /// Same as `new`, but dropping a call does not abort it.
    pub fn unabortable(steps: Vec<Step>) -> Arc<Self> {
        Self::build(steps, Duration::ZERO, false)
    }

    pub fn echo(latency_ms: u64) -> Arc<Self> {
        Self::build(Vec::new(), Duration::from_millis(latency_ms), true)
    }

    pub fn echo_unabortable(latency_ms: u64) -> Arc<Self> {
        Self::build(Vec::new(), Duration::from_millis(latency_ms), false)
    }

    fn build(steps: Vec<Step>, fallback_latency: Duration, abortable: bool) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback_latency,
            abortable,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            started_at: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<RecognitionRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn started_at(&self) -> Vec<tokio::time::Instant> {
        self.started_at.lock().unwrap().clone()
    }
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecognitionTransport for ScriptedTransport {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Payload, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        self.started_at.lock().unwrap().push(tokio::time::Instant::now());

        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        let step = self.steps.lock().unwrap().pop_front();
        let step = step.unwrap_or_else(|| Step {
            after: self.fallback_latency,
            reply: Ok(json!({ "echo": request.id.0 })),
        });

        tokio::time::sleep(step.after).await;
        step.reply
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn abortable(&self) -> bool {
        self.abortable
    }
}

/// Observer that records every delivery and forwards it to a channel.
pub struct RecordingObserver {
    results: Mutex<Vec<(RequestId, RecognitionResult)>>,
    tx: mpsc::UnboundedSender<(RequestId, RecognitionResult)>,
}

impl RecordingObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(RequestId, RecognitionResult)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer = Arc::new(Self {
            results: Mutex::new(Vec::new()),
            tx,
        });
        (observer, rx)
    }

    pub fn results(&self) -> Vec<(RequestId, RecognitionResult)> {
        self.results.lock().unwrap().clone()
    }

    pub fn ids(&self) -> Vec<RequestId> {
        self.results().into_iter().map(|(id, _)| id).collect()
    }
}

impl RecognitionObserver for RecordingObserver {
    fn on_result(&self, request_id: RequestId, result: RecognitionResult) {
        self.results.lock().unwrap().push((request_id, result.clone()));
        let _ = self.tx.send((request_id, result));
    }
}

/// Config with fast, predictable timings for tests.
pub fn test_config() -> EngineConfig {
    EngineConfig::new("test-client")
        .with_debounce(Duration::from_millis(500))
        .with_request_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::default().with_backoff(
            BackoffKind::Exponential,
            Duration::from_millis(100),
            Duration::from_secs(1),
        ))
}

/// Started session wired to `transport` and a fresh recording observer.
pub fn active_session(
    config: EngineConfig,
    transport: Arc<ScriptedTransport>,
) -> (
    RecognitionSession,
    Arc<RecordingObserver>,
    mpsc::UnboundedReceiver<(RequestId, RecognitionResult)>,
) {
    let (observer, rx) = RecordingObserver::new();
    let session = RecognitionSession::new(config, transport)
        .expect("inside a runtime")
        .with_observer(&observer);
    session.start().expect("start");
    (session, observer, rx)
}

pub fn frame(sequence: u64, at_ms: u64) -> Frame {
    Frame::new(sequence, Duration::from_millis(at_ms), vec![0u8; 8])
}

/// Wait for the next delivery, failing the test if none arrives in 60s of
/// (virtual) time.
pub async fn next(
    rx: &mut mpsc::UnboundedReceiver<(RequestId, RecognitionResult)>,
) -> (RequestId, RecognitionResult) {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("delivery timed out")
        .expect("observer channel closed")
}

/// Let spawned tasks run without advancing time meaningfully.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
