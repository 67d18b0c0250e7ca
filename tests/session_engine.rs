//! End-to-end behaviour of the session engine on a paused clock.

mod common;

use std::time::Duration;

use common::{catalog, events_until_finished, harness, next_event, wait_for_tick, RecordingAudio, RecordingDisplay};
use sleepmate_lib::{
    session::{BackgroundRotation, RotationOrder},
    FinishReason, InterruptionSignal, SessionConfig, SessionError, SessionEvent, SessionState,
    TimerDuration,
};
use tokio::{
    sync::mpsc::error::TryRecvError,
    time::{self, Instant},
};

fn timed(total_secs: u64, fade_secs: u64) -> SessionConfig {
    SessionConfig {
        duration: TimerDuration::Finite(Duration::from_secs(total_secs)),
        nature_volume: 0.5,
        fade_out: Duration::from_secs(fade_secs),
        brightness: 0.1,
        rotation: None,
    }
}

fn untimed() -> SessionConfig {
    SessionConfig {
        duration: TimerDuration::Indefinite,
        ..timed(60, 30)
    }
}

fn finish_reasons(events: &[SessionEvent]) -> Vec<FinishReason> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Finished { reason, .. } => Some(*reason),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn start_emits_one_started_and_plays_selection() {
    let mut h = harness(catalog(&["rain"], &["night"]), RecordingAudio::new(), RecordingDisplay::new());

    let id = h.engine.start(untimed()).await.unwrap();

    match next_event(&mut h.events).await {
        SessionEvent::Started {
            session_id,
            duration_secs,
            sound_count,
            background_id,
        } => {
            assert_eq!(session_id, id);
            assert_eq!(duration_secs, None);
            assert_eq!(sound_count, 1);
            assert_eq!(background_id.as_deref(), Some("night"));
        }
        other => panic!("expected Started, got {other:?}"),
    }
    assert_eq!(h.engine.state(), SessionState::Playing);
    assert_eq!(h.audio.log().loads, vec![vec!["rain".to_string()]]);
    assert_eq!(h.audio.log().volume, 0.5);
    assert_eq!(h.display.log().activations, vec![Some("night".to_string())]);
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn indefinite_session_never_ticks() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(untimed()).await.unwrap();
    assert!(matches!(next_event(&mut h.events).await, SessionEvent::Started { .. }));

    time::sleep(Duration::from_secs(8 * 3600)).await;
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.engine.state(), SessionState::Playing);

    assert!(h.engine.cancel().await);
    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::UserCancelled]);
}

#[tokio::test(start_paused = true)]
async fn fifteen_minute_session_fades_and_elapses() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    let started = Instant::now();
    h.engine.start(timed(15 * 60, 30)).await.unwrap();

    let mut ticks = Vec::new();
    let mut fade_at = Vec::new();
    let mut finished_at = None;
    loop {
        match next_event(&mut h.events).await {
            SessionEvent::Tick { seconds_remaining } => ticks.push(seconds_remaining),
            SessionEvent::FadeOutBegan => fade_at.push(started.elapsed()),
            SessionEvent::Finished { reason, .. } => {
                assert_eq!(reason, FinishReason::TimerElapsed);
                finished_at = Some(started.elapsed());
                break;
            }
            SessionEvent::Started { .. } => {}
        }
    }

    assert_eq!(fade_at, vec![Duration::from_secs(14 * 60 + 30)]);
    assert_eq!(finished_at, Some(Duration::from_secs(15 * 60)));
    assert_eq!(ticks.len(), 900);
    assert_eq!(ticks.first(), Some(&899));
    assert_eq!(ticks.last(), Some(&0));

    let audio = h.audio.log();
    assert_eq!(audio.stops, 1);
    assert_eq!(audio.volume_at_stop, Some(0.0));
    assert_eq!(h.display.log().restores, 1);
    assert_eq!(h.engine.state(), SessionState::Finished);
}

#[tokio::test(start_paused = true)]
async fn fade_ramps_volume_down_linearly() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(timed(60, 30)).await.unwrap();

    wait_for_tick(&mut h.events, 30).await;
    assert_eq!(h.engine.state(), SessionState::FadingOut);
    assert_eq!(next_event(&mut h.events).await, SessionEvent::FadeOutBegan);

    wait_for_tick(&mut h.events, 15).await;
    let volume = h.audio.log().volume;
    assert!((volume - 0.25).abs() < 0.01, "volume at half fade was {volume}");
}

#[tokio::test(start_paused = true)]
async fn fade_window_longer_than_timer_starts_fading_at_once() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(timed(10, 30)).await.unwrap();

    assert!(matches!(next_event(&mut h.events).await, SessionEvent::Started { .. }));
    assert_eq!(next_event(&mut h.events).await, SessionEvent::FadeOutBegan);
    assert_eq!(h.engine.state(), SessionState::FadingOut);

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::TimerElapsed]);
    assert!(!events.contains(&SessionEvent::FadeOutBegan));
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_fade_releases_resources_once() {
    let mut h = harness(catalog(&["rain"], &["night"]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(timed(40, 30)).await.unwrap();
    wait_for_tick(&mut h.events, 25).await;
    assert_eq!(h.engine.state(), SessionState::FadingOut);

    assert!(h.engine.cancel().await);
    assert!(!h.engine.cancel().await);
    assert_eq!(h.audio.log().stops, 1);
    assert_eq!(h.display.log().restores, 1);

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::UserCancelled]);

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.audio.log().stops, 1);
    assert_eq!(h.display.log().restores, 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_when_idle_is_a_no_op() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    assert!(!h.engine.cancel().await);
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.display.log().restores, 0);
}

#[tokio::test(start_paused = true)]
async fn interruption_resume_keeps_fade_position() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    let mut state = h.engine.watch_state();
    h.engine.start(timed(60, 30)).await.unwrap();
    wait_for_tick(&mut h.events, 12).await;

    h.audio.interrupt(InterruptionSignal::Began);
    h.audio.interrupt(InterruptionSignal::Began);
    state
        .wait_for(|s| *s == SessionState::Interrupted)
        .await
        .unwrap();

    time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.audio.log().pauses, 1);

    h.audio.interrupt(InterruptionSignal::Ended { resumable: true });
    state.wait_for(|s| *s == SessionState::FadingOut).await.unwrap();
    let resumed_at = Instant::now();

    let resumes = h.audio.log().resumes.clone();
    assert_eq!(resumes.len(), 1);
    assert!((resumes[0] - 0.2).abs() < 1e-3, "resumed at {}", resumes[0]);

    assert_eq!(
        next_event(&mut h.events).await,
        SessionEvent::Tick { seconds_remaining: 11 }
    );
    assert_eq!(resumed_at.elapsed(), Duration::from_secs(1));

    // A second "ended" while already playing changes nothing.
    h.audio.interrupt(InterruptionSignal::Ended { resumable: true });
    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::TimerElapsed]);
    assert_eq!(h.audio.log().resumes.len(), 1);
    assert!(!events.contains(&SessionEvent::FadeOutBegan));
}

#[tokio::test(start_paused = true)]
async fn interruption_resume_returns_to_playing_at_full_volume() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    let mut state = h.engine.watch_state();
    h.engine.start(timed(300, 30)).await.unwrap();
    wait_for_tick(&mut h.events, 250).await;

    h.audio.interrupt(InterruptionSignal::Began);
    state
        .wait_for(|s| *s == SessionState::Interrupted)
        .await
        .unwrap();

    time::sleep(Duration::from_secs(1000)).await;
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));

    h.audio.interrupt(InterruptionSignal::Ended { resumable: true });
    state.wait_for(|s| *s == SessionState::Playing).await.unwrap();
    let resumed_at = Instant::now();
    assert_eq!(h.audio.log().resumes, vec![0.5_f32]);
    assert_eq!(h.audio.log().volume, 0.5);

    assert_eq!(
        next_event(&mut h.events).await,
        SessionEvent::Tick { seconds_remaining: 249 }
    );
    assert_eq!(resumed_at.elapsed(), Duration::from_secs(1));

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(
        events.iter().filter(|e| **e == SessionEvent::FadeOutBegan).count(),
        1
    );
    assert_eq!(finish_reasons(&events), vec![FinishReason::TimerElapsed]);
}

#[tokio::test(start_paused = true)]
async fn interruption_without_resume_finishes_session() {
    let mut h = harness(catalog(&["rain"], &["night"]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(timed(600, 30)).await.unwrap();
    wait_for_tick(&mut h.events, 590).await;

    h.audio.interrupt(InterruptionSignal::Began);
    h.audio.interrupt(InterruptionSignal::Ended { resumable: false });

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::Interrupted]);
    assert_eq!(h.audio.log().stops, 1);
    assert_eq!(h.display.log().restores, 1);
    assert_eq!(h.engine.state(), SessionState::Finished);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_interrupted_counts_as_user_cancel() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    let mut state = h.engine.watch_state();
    h.engine.start(untimed()).await.unwrap();

    h.audio.interrupt(InterruptionSignal::Began);
    state
        .wait_for(|s| *s == SessionState::Interrupted)
        .await
        .unwrap();
    assert!(h.engine.cancel().await);

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::UserCancelled]);
    assert_eq!(h.audio.log().stops, 1);
}

#[tokio::test(start_paused = true)]
async fn nothing_selected_is_rejected_without_side_effects() {
    let mut h = harness(catalog(&[], &[]), RecordingAudio::new(), RecordingDisplay::new());

    assert_eq!(h.engine.start(timed(60, 30)).await, Err(SessionError::NoAssetSelected));
    assert_eq!(h.engine.state(), SessionState::Idle);
    assert!(h.audio.log().loads.is_empty());
    assert!(h.display.log().activations.is_empty());
    assert_eq!(h.display.log().restores, 0);
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn audio_failure_leaves_engine_idle() {
    let mut h = harness(catalog(&["rain"], &["night"]), RecordingAudio::unavailable(), RecordingDisplay::new());

    let result = h.engine.start(timed(60, 30)).await;
    assert!(matches!(result, Err(SessionError::AudioUnavailable(_))));
    assert_eq!(h.engine.state(), SessionState::Idle);
    assert!(h.display.log().activations.is_empty());
    assert_eq!(h.events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn display_failure_does_not_stop_the_session() {
    let mut h = harness(catalog(&["rain"], &["night"]), RecordingAudio::new(), RecordingDisplay::denied());

    h.engine.start(timed(60, 30)).await.unwrap();
    assert!(matches!(next_event(&mut h.events).await, SessionEvent::Started { .. }));
    assert_eq!(h.engine.state(), SessionState::Playing);

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::TimerElapsed]);
    assert_eq!(h.display.log().restores, 1);
}

#[tokio::test(start_paused = true)]
async fn only_one_session_at_a_time() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    let first = h.engine.start(untimed()).await.unwrap();

    assert_eq!(h.engine.start(untimed()).await, Err(SessionError::SessionAlreadyActive));
    assert_eq!(h.audio.log().loads.len(), 1);

    assert!(h.engine.cancel().await);
    events_until_finished(&mut h.events).await;

    let second = h.engine.start(untimed()).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(h.engine.state(), SessionState::Playing);
}

#[tokio::test(start_paused = true)]
async fn invalid_config_is_rejected() {
    let h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    let config = SessionConfig {
        nature_volume: 2.0,
        ..timed(60, 30)
    };
    assert!(matches!(
        h.engine.start(config).await,
        Err(SessionError::InvalidConfig(_))
    ));
    assert!(h.audio.log().loads.is_empty());
}

#[tokio::test(start_paused = true)]
async fn background_only_session_runs_the_nightlight() {
    let mut h = harness(catalog(&[], &["night"]), RecordingAudio::new(), RecordingDisplay::new());

    h.engine.start(timed(5, 0)).await.unwrap();
    let events = events_until_finished(&mut h.events).await;

    assert_eq!(finish_reasons(&events), vec![FinishReason::TimerElapsed]);
    assert!(h.audio.log().loads.is_empty());
    assert_eq!(h.audio.log().stops, 0);
    assert_eq!(h.display.log().activations, vec![Some("night".to_string())]);
    assert_eq!(h.display.log().restores, 1);
}

#[tokio::test(start_paused = true)]
async fn extend_adds_time_only_while_playing() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(timed(120, 30)).await.unwrap();
    wait_for_tick(&mut h.events, 100).await;

    assert_eq!(h.engine.extend(Duration::from_secs(60)).await, Ok(160));
    assert_eq!(
        next_event(&mut h.events).await,
        SessionEvent::Tick { seconds_remaining: 159 }
    );

    wait_for_tick(&mut h.events, 20).await;
    assert_eq!(
        h.engine.extend(Duration::from_secs(60)).await,
        Err(SessionError::NotExtendable)
    );

    assert!(h.engine.cancel().await);
    events_until_finished(&mut h.events).await;
    h.engine.start(untimed()).await.unwrap();
    assert_eq!(
        h.engine.extend(Duration::from_secs(60)).await,
        Err(SessionError::NotExtendable)
    );
}

#[tokio::test(start_paused = true)]
async fn backgrounds_rotate_in_title_order() {
    let mut h = harness(
        catalog(&["rain"], &["amber", "blue"]),
        RecordingAudio::new(),
        RecordingDisplay::new(),
    );
    let config = SessionConfig {
        rotation: Some(BackgroundRotation {
            interval_secs: 60,
            order: RotationOrder::Sequential,
        }),
        ..untimed()
    };
    h.engine.start(config).await.unwrap();

    time::sleep(Duration::from_secs(130)).await;
    assert_eq!(
        h.display.log().activations,
        vec![
            Some("amber".to_string()),
            Some("blue".to_string()),
            Some("amber".to_string())
        ]
    );

    assert!(h.engine.cancel().await);
    time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.display.log().activations.len(), 3);
    assert!(matches!(next_event(&mut h.events).await, SessionEvent::Started { .. }));
}

#[tokio::test(start_paused = true)]
async fn rotation_holds_while_interrupted() {
    let mut h = harness(
        catalog(&["rain"], &["amber", "blue"]),
        RecordingAudio::new(),
        RecordingDisplay::new(),
    );
    let mut state = h.engine.watch_state();
    let config = SessionConfig {
        rotation: Some(BackgroundRotation {
            interval_secs: 60,
            order: RotationOrder::Sequential,
        }),
        ..timed(300, 30)
    };
    h.engine.start(config).await.unwrap();
    wait_for_tick(&mut h.events, 250).await;

    h.audio.interrupt(InterruptionSignal::Began);
    state
        .wait_for(|s| *s == SessionState::Interrupted)
        .await
        .unwrap();
    time::sleep(Duration::from_secs(1000)).await;
    assert_eq!(h.display.log().activations, vec![Some("amber".to_string())]);

    // 50 of the 60 seconds were used before the interruption.
    h.audio.interrupt(InterruptionSignal::Ended { resumable: true });
    state.wait_for(|s| *s == SessionState::Playing).await.unwrap();
    time::sleep(Duration::from_secs(9)).await;
    assert_eq!(h.display.log().activations.len(), 1);

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        h.display.log().activations,
        vec![Some("amber".to_string()), Some("blue".to_string())]
    );
    assert_eq!(h.display.log().restores, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_active_session() {
    let mut h = harness(catalog(&["rain"], &[]), RecordingAudio::new(), RecordingDisplay::new());
    h.engine.start(untimed()).await.unwrap();

    h.engine.shutdown().await;

    let events = events_until_finished(&mut h.events).await;
    assert_eq!(finish_reasons(&events), vec![FinishReason::Interrupted]);
    assert_eq!(h.audio.log().stops, 1);
    assert_eq!(h.display.log().restores, 1);
    assert_eq!(h.engine.start(untimed()).await, Err(SessionError::EngineStopped));
    assert!(!h.engine.cancel().await);
}
