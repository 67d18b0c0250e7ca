//! Session rows written from the engine's event stream.

mod common;

use std::time::Duration;

use common::{catalog, events_until_finished, RecordingAudio, RecordingDisplay};
use sleepmate_lib::{
    history, Database, SessionConfig, SessionEngine, SessionStatus, TimerDuration,
};

#[tokio::test(start_paused = true)]
async fn records_completed_and_cancelled_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("sleepmate.sqlite3")).unwrap();

    let engine = SessionEngine::new(
        catalog(&["rain", "wind"], &[]),
        RecordingAudio::new(),
        RecordingDisplay::new(),
    );
    let recorder = history::spawn_recorder(db.clone(), engine.subscribe());
    let mut events = engine.subscribe();

    let timed = SessionConfig {
        duration: TimerDuration::Finite(Duration::from_secs(120)),
        fade_out: Duration::from_secs(30),
        ..SessionConfig::default()
    };
    let completed = engine.start(timed).await.unwrap();
    events_until_finished(&mut events).await;

    let cancelled = engine
        .start(SessionConfig::default().with_duration(TimerDuration::Indefinite))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(engine.cancel().await);
    events_until_finished(&mut events).await;

    engine.shutdown().await;
    drop(engine);
    recorder.await.unwrap();

    let sessions = db.list_sessions(10).await.unwrap();
    assert_eq!(sessions.len(), 2);

    let first = sessions.iter().find(|s| s.id == completed).unwrap();
    assert_eq!(first.status, SessionStatus::Completed);
    assert_eq!(first.target_secs, Some(120));
    assert_eq!(first.elapsed_secs, 120);
    assert_eq!(first.sound_count, 2);

    let second = sessions.iter().find(|s| s.id == cancelled).unwrap();
    assert_eq!(second.status, SessionStatus::Cancelled);
    assert_eq!(second.target_secs, None);
    assert_eq!(second.elapsed_secs, 45);
}
