//! Recording test doubles for the engine's collaborators.

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use sleepmate_lib::{
    AssetCatalog, AudioError, AudioOutput, BackgroundAsset, DisplayControl, DisplayError,
    InterruptionSignal, OutputHandle, SelectionPolicy, SessionEngine, SessionEvent, SoundAsset,
    Tint,
};
use tokio::sync::{broadcast, mpsc::UnboundedReceiver};

#[derive(Debug, Default)]
pub struct AudioLog {
    pub loads: Vec<Vec<String>>,
    pub volume: f32,
    pub volume_at_stop: Option<f32>,
    pub pauses: usize,
    pub resumes: Vec<f32>,
    pub stops: usize,
}

pub struct RecordingAudio {
    log: Mutex<AudioLog>,
    fail_load: AtomicBool,
    next_handle: AtomicU64,
    interruptions: broadcast::Sender<InterruptionSignal>,
}

impl RecordingAudio {
    pub fn new() -> Arc<Self> {
        let (interruptions, _) = broadcast::channel(16);
        Arc::new(Self {
            log: Mutex::new(AudioLog::default()),
            fail_load: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
            interruptions,
        })
    }

    pub fn unavailable() -> Arc<Self> {
        let audio = Self::new();
        audio.fail_load.store(true, Ordering::SeqCst);
        audio
    }

    pub fn interrupt(&self, signal: InterruptionSignal) {
        self.interruptions
            .send(signal)
            .expect("engine subscribed to interruptions");
    }

    pub fn log(&self) -> MutexGuard<'_, AudioLog> {
        self.log.lock().unwrap()
    }
}

impl AudioOutput for RecordingAudio {
    fn load(&self, sounds: &[SoundAsset], volume: f32) -> Result<OutputHandle, AudioError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(AudioError::Unavailable("no audio session".into()));
        }
        let mut log = self.log();
        log.loads.push(sounds.iter().map(|s| s.id.clone()).collect());
        log.volume = volume;
        Ok(OutputHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    fn set_volume(&self, _handle: OutputHandle, level: f32) -> Result<(), AudioError> {
        self.log().volume = level;
        Ok(())
    }

    fn pause(&self, _handle: OutputHandle) -> Result<(), AudioError> {
        self.log().pauses += 1;
        Ok(())
    }

    fn resume(&self, _handle: OutputHandle, volume: f32) -> Result<(), AudioError> {
        let mut log = self.log();
        log.resumes.push(volume);
        log.volume = volume;
        Ok(())
    }

    fn stop(&self, _handle: OutputHandle) -> Result<(), AudioError> {
        let mut log = self.log();
        log.stops += 1;
        log.volume_at_stop = Some(log.volume);
        Ok(())
    }

    fn interruptions(&self) -> broadcast::Receiver<InterruptionSignal> {
        self.interruptions.subscribe()
    }
}

#[derive(Debug, Default)]
pub struct DisplayLog {
    /// Background id per activation, `None` for a plain nightlight.
    pub activations: Vec<Option<String>>,
    pub restores: usize,
}

pub struct RecordingDisplay {
    log: Mutex<DisplayLog>,
    fail: bool,
}

impl RecordingDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(DisplayLog::default()),
            fail: false,
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(DisplayLog::default()),
            fail: true,
        })
    }

    pub fn log(&self) -> MutexGuard<'_, DisplayLog> {
        self.log.lock().unwrap()
    }
}

impl DisplayControl for RecordingDisplay {
    fn activate(&self, background: Option<&BackgroundAsset>, _tint: Tint) -> Result<(), DisplayError> {
        self.log()
            .activations
            .push(background.map(|b| b.id.clone()));
        if self.fail {
            return Err(DisplayError::ControlFailed("brightness denied".into()));
        }
        Ok(())
    }

    fn restore(&self) -> Result<(), DisplayError> {
        self.log().restores += 1;
        Ok(())
    }
}

/// Catalog with the given sound and background ids selected.
pub fn catalog(sounds: &[&str], backgrounds: &[&str]) -> Arc<AssetCatalog> {
    let sounds = sounds
        .iter()
        .map(|id| {
            let mut sound = SoundAsset::new(*id, *id, format!("synth:{id}"));
            sound.is_selected = true;
            sound
        })
        .collect();
    let backgrounds = backgrounds
        .iter()
        .map(|id| {
            let mut bg = BackgroundAsset::solid(*id, *id, "blueColor");
            bg.is_selected = true;
            bg
        })
        .collect();
    Arc::new(AssetCatalog::new(
        sounds,
        backgrounds,
        SelectionPolicy::Multiple,
        SelectionPolicy::Multiple,
    ))
}

pub struct Harness {
    pub engine: SessionEngine,
    pub audio: Arc<RecordingAudio>,
    pub display: Arc<RecordingDisplay>,
    pub events: UnboundedReceiver<SessionEvent>,
}

pub fn harness(
    catalog: Arc<AssetCatalog>,
    audio: Arc<RecordingAudio>,
    display: Arc<RecordingDisplay>,
) -> Harness {
    let engine = SessionEngine::new(catalog, audio.clone(), display.clone());
    let events = engine.subscribe();
    Harness {
        engine,
        audio,
        display,
        events,
    }
}

/// Next event, failing the test if none arrives within a (virtual) day.
pub async fn next_event(events: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(24 * 3600), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event stream closed")
}

pub async fn events_until_finished(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(events).await;
        let done = matches!(event, SessionEvent::Finished { .. });
        seen.push(event);
        if done {
            return seen;
        }
    }
}

pub async fn wait_for_tick(events: &mut UnboundedReceiver<SessionEvent>, remaining: u64) {
    loop {
        if let SessionEvent::Tick { seconds_remaining } = next_event(events).await {
            if seconds_remaining == remaining {
                return;
            }
        }
    }
}
