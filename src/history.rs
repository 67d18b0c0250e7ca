//! Sleep history: turns the engine's lifecycle events into session rows.

use chrono::Utc;
use log::{error, warn};
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};

use crate::{
    db::{Database, SessionRecord, SessionStatus},
    session::{FinishReason, SessionEvent},
};

impl From<FinishReason> for SessionStatus {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::TimerElapsed => SessionStatus::Completed,
            FinishReason::UserCancelled => SessionStatus::Cancelled,
            FinishReason::Interrupted => SessionStatus::Interrupted,
        }
    }
}

/// Record every session seen on `events`. The task ends when the engine
/// drops its side of the stream.
pub fn spawn_recorder(db: Database, mut events: UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut open: Option<String> = None;

        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Started {
                    session_id,
                    duration_secs,
                    sound_count,
                    ..
                } => {
                    let now = Utc::now();
                    let record = SessionRecord {
                        id: session_id.clone(),
                        started_at: now,
                        stopped_at: None,
                        status: SessionStatus::Running,
                        target_secs: duration_secs,
                        elapsed_secs: 0,
                        sound_count: u32::try_from(sound_count).unwrap_or(u32::MAX),
                        updated_at: now,
                    };
                    if let Err(err) = db.insert_session(&record).await {
                        error!("Failed to record session {session_id}: {err:#}");
                        continue;
                    }
                    open = Some(session_id);
                }
                SessionEvent::Finished {
                    session_id,
                    reason,
                    elapsed_secs,
                } => {
                    if open.take().as_deref() != Some(session_id.as_str()) {
                        warn!("Finish for unrecorded session {session_id}");
                        continue;
                    }
                    if let Err(err) = db
                        .mark_session_status(&session_id, reason.into(), elapsed_secs, Utc::now())
                        .await
                    {
                        error!("Failed to close session {session_id}: {err:#}");
                    }
                }
                SessionEvent::Tick { .. } | SessionEvent::FadeOutBegan => {}
            }
        }
    })
}
