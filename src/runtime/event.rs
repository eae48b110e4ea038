//! Engine events: the optional diagnostic sink for node, retry, and
//! run lifecycle signals. Logging stays with `tracing`; the event
//! channel is for callers that want structured observation of a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

/// Events emitted over the course of a run.
#[derive(Clone, Debug, Serialize)]
pub enum EngineEvent {
    RunStarted {
        run_id: String,
    },
    NodeStarted {
        run_id: String,
        node: String,
        kind: &'static str,
    },
    NodeSucceeded {
        run_id: String,
        node: String,
    },
    /// Branch chosen by a fork ("true"/"false") or case (the key).
    BranchSelected {
        run_id: String,
        node: String,
        branch: String,
    },
    NodeRetrying {
        run_id: String,
        node: String,
        attempt: usize,
        delay_ms: u64,
        error: String,
    },
    NodeFailed {
        run_id: String,
        node: String,
        error: String,
    },
    RunCompleted {
        run_id: String,
        exit_code: i32,
        steps: u64,
    },
    RunFailed {
        run_id: String,
        error: String,
    },
    RunAborted {
        run_id: String,
    },
}

/// Event receiver handed to the listener.
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Sender wrapper with an atomic active flag so that event emission can
/// be cheaply skipped when no listener is attached.
#[derive(Clone)]
pub struct EventEmitter {
    tx: Option<mpsc::UnboundedSender<EngineEvent>>,
    active: Arc<AtomicBool>,
}

impl EventEmitter {
    /// An emitter with no listener; every emit is a no-op.
    pub fn disabled() -> Self {
        EventEmitter {
            tx: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn emit(&self, event: EngineEvent) {
        if !self.is_active() {
            return;
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Create an active emitter/receiver pair.
pub fn create_event_channel() -> (EventEmitter, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventEmitter {
            tx: Some(tx),
            active: Arc::new(AtomicBool::new(true)),
        },
        rx,
    )
}
