use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    UserCancelled,
    TimerElapsed,
    Interrupted,
}

/// Lifecycle notifications pushed to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        session_id: String,
        /// `None` for an indefinite session.
        duration_secs: Option<u64>,
        sound_count: usize,
        background_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Tick { seconds_remaining: u64 },
    FadeOutBegan,
    #[serde(rename_all = "camelCase")]
    Finished {
        session_id: String,
        reason: FinishReason,
        /// Wall time since `Started`, interruptions included.
        elapsed_secs: u64,
    },
}

/// Observer list behind [`crate::session::SessionEngine::subscribe`].
///
/// Senders whose receiver was dropped are pruned on the next publish.
#[derive(Clone, Default)]
pub(crate) struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<SessionEvent>>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
