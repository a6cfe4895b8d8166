//! Result Router: ordered, exactly-once delivery to a weakly held observer.
//!
//! Terminal outcomes are pushed onto an unbounded channel while the session
//! lock is held, so channel order is terminal order. A single delivery task
//! drains the channel and calls the observer outside every engine lock.
//!
//! Control calls (`pause`, `resume`, `terminate`) made by the observer from
//! inside `on_result` are validated immediately but applied only after the
//! callback returns, before the next delivery.

use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::session::SessionCore;
use crate::types::{RecognitionResult, RequestId, SessionId};

/// Receives the single terminal outcome of every request.
///
/// Called on the session's delivery task, never on the thread feeding
/// frames. Long-running work should be handed off elsewhere; while a
/// callback runs, later outcomes for the same session wait.
pub trait RecognitionObserver: Send + Sync {
    fn on_result(&self, request_id: RequestId, result: RecognitionResult);
}

/// Non-owning observer reference. A released observer turns delivery into
/// a silent no-op.
#[derive(Default)]
pub(crate) struct ObserverSlot {
    observer: RwLock<Option<Weak<dyn RecognitionObserver>>>,
}

impl ObserverSlot {
    pub(crate) fn set(&self, observer: Option<Weak<dyn RecognitionObserver>>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    fn get(&self) -> Option<Arc<dyn RecognitionObserver>> {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

/// Control operation issued from inside an observer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredOp {
    Pause,
    Resume,
    Terminate,
}

pub(crate) type DeferredQueue = VecDeque<DeferredOp>;

enum RouterMsg {
    Deliver {
        request_id: RequestId,
        result: RecognitionResult,
    },
    Shutdown,
}

thread_local! {
    static DELIVERING: Cell<Option<SessionId>> = const { Cell::new(None) };
}

/// True when the current thread is inside an observer callback for `session`.
pub(crate) fn in_delivery(session: SessionId) -> bool {
    DELIVERING.with(|d| d.get() == Some(session))
}

struct DeliveryScope {
    previous: Option<SessionId>,
}

impl DeliveryScope {
    fn enter(session: SessionId) -> Self {
        let previous = DELIVERING.with(|d| d.replace(Some(session)));
        Self { previous }
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|d| d.set(self.previous));
    }
}

/// Sending half of the router, owned by the session core.
pub(crate) struct ResultRouter {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<RouterMsg>,
    observer: Arc<ObserverSlot>,
}

/// Receiving half, consumed when the delivery task is spawned.
pub(crate) struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<RouterMsg>,
    observer: Arc<ObserverSlot>,
}

impl ResultRouter {
    pub(crate) fn new(session_id: SessionId) -> (Self, DeliveryQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer = Arc::new(ObserverSlot::default());
        let router = Self {
            session_id,
            tx,
            observer: Arc::clone(&observer),
        };
        (router, DeliveryQueue { rx, observer })
    }

    pub(crate) fn observer(&self) -> &ObserverSlot {
        &self.observer
    }

    /// Queue a terminal outcome. Must be called with the session lock held.
    pub(crate) fn deliver(&self, request_id: RequestId, result: RecognitionResult) {
        let msg = RouterMsg::Deliver { request_id, result };
        if self.tx.send(msg).is_err() {
            tracing::debug!(
                session.id = %self.session_id,
                request.id = %request_id,
                "Delivery task gone, dropping result"
            );
        }
    }

    /// Ask the delivery task to exit once everything queued so far is out.
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(RouterMsg::Shutdown);
    }
}

impl DeliveryQueue {
    pub(crate) fn spawn(self, runtime: &Handle, session_id: SessionId, core: Weak<SessionCore>) {
        runtime.spawn(self.run(session_id, core));
    }

    async fn run(mut self, session_id: SessionId, core: Weak<SessionCore>) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                RouterMsg::Deliver { request_id, result } => {
                    self.deliver_one(session_id, request_id, result);
                    if let Some(core) = core.upgrade() {
                        core.apply_deferred();
                    }
                }
                RouterMsg::Shutdown => break,
            }
        }
        tracing::debug!(session.id = %session_id, "Delivery task finished");
    }

    fn deliver_one(&self, session_id: SessionId, request_id: RequestId, result: RecognitionResult) {
        let Some(observer) = self.observer.get() else {
            tracing::debug!(
                session.id = %session_id,
                request.id = %request_id,
                "Observer released, dropping result"
            );
            return;
        };

        let _scope = DeliveryScope::enter(session_id);
        let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_result(request_id, result)));
        if outcome.is_err() {
            tracing::error!(
                session.id = %session_id,
                request.id = %request_id,
                "Observer panicked during delivery"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(RequestId, RecognitionResult)>>);

    impl RecognitionObserver for Collect {
        fn on_result(&self, request_id: RequestId, result: RecognitionResult) {
            self.0.lock().unwrap().push((request_id, result));
        }
    }

    #[tokio::test]
    async fn delivers_in_queue_order() {
        let session = SessionId::generate();
        let (router, queue) = ResultRouter::new(session);
        let observer = Arc::new(Collect::default());
        let weak = Arc::downgrade(&observer) as Weak<dyn RecognitionObserver>;
        router.observer().set(Some(weak));

        router.deliver(RequestId(2), RecognitionResult::Cancelled);
        router.deliver(RequestId(1), RecognitionResult::Cancelled);
        router.shutdown();

        queue.run(session, Weak::new()).await;

        let seen: Vec<_> = observer.0.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(seen, vec![RequestId(2), RequestId(1)]);
    }

    #[tokio::test]
    async fn released_observer_is_a_no_op() {
        let session = SessionId::generate();
        let (router, queue) = ResultRouter::new(session);
        {
            let observer: Arc<dyn RecognitionObserver> = Arc::new(Collect::default());
            router.observer().set(Some(Arc::downgrade(&observer)));
        }
        router.deliver(RequestId(1), RecognitionResult::Cancelled);
        router.shutdown();

        // completes without panicking
        queue.run(session, Weak::new()).await;
    }

    #[test]
    fn delivery_scope_marks_thread() {
        let session = SessionId::generate();
        assert!(!in_delivery(session));
        {
            let _scope = DeliveryScope::enter(session);
            assert!(in_delivery(session));
            assert!(!in_delivery(SessionId::generate()));
        }
        assert!(!in_delivery(session));
    }

    #[tokio::test]
    async fn panicking_observer_does_not_stop_delivery() {
        struct Flaky(Mutex<u32>);
        impl RecognitionObserver for Flaky {
            fn on_result(&self, request_id: RequestId, _result: RecognitionResult) {
                *self.0.lock().unwrap() += 1;
                if request_id == RequestId(1) {
                    panic!("observer bug");
                }
            }
        }

        let session = SessionId::generate();
        let (router, queue) = ResultRouter::new(session);
        let observer = Arc::new(Flaky(Mutex::new(0)));
        let weak = Arc::downgrade(&observer) as Weak<dyn RecognitionObserver>;
        router.observer().set(Some(weak));

        router.deliver(RequestId(1), RecognitionResult::Cancelled);
        router.deliver(RequestId(2), RecognitionResult::Cancelled);
        router.shutdown();
        queue.run(session, Weak::new()).await;

        assert_eq!(*observer.0.lock().unwrap(), 2);
    }
}
