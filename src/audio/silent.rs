use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

use log::debug;
use tokio::sync::broadcast;

use crate::db::models::SoundAsset;

use super::{AudioError, AudioOutput, InterruptionSignal, OutputHandle, INTERRUPTION_CAPACITY};

#[derive(Debug, Clone, Copy)]
struct Channel {
    volume: f32,
    paused: bool,
}

/// Output without a device: tracks volume and pause state per handle.
///
/// Used for nightlight-only builds and headless runs.
pub struct SilentOutput {
    next_handle: AtomicU64,
    channels: Mutex<HashMap<OutputHandle, Channel>>,
    interruptions: broadcast::Sender<InterruptionSignal>,
}

impl Default for SilentOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl SilentOutput {
    pub fn new() -> Self {
        let (interruptions, _) = broadcast::channel(INTERRUPTION_CAPACITY);
        Self {
            next_handle: AtomicU64::new(1),
            channels: Mutex::new(HashMap::new()),
            interruptions,
        }
    }

    /// Inject a platform interruption.
    pub fn notify_interruption(&self, signal: InterruptionSignal) {
        let _ = self.interruptions.send(signal);
    }

    pub fn volume(&self, handle: OutputHandle) -> Option<f32> {
        self.channels().get(&handle).map(|c| c.volume)
    }

    pub fn is_paused(&self, handle: OutputHandle) -> Option<bool> {
        self.channels().get(&handle).map(|c| c.paused)
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<OutputHandle, Channel>> {
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_channel(
        &self,
        handle: OutputHandle,
        f: impl FnOnce(&mut Channel),
    ) -> Result<(), AudioError> {
        let mut channels = self.channels();
        let channel = channels
            .get_mut(&handle)
            .ok_or(AudioError::UnknownHandle(handle))?;
        f(channel);
        Ok(())
    }
}

impl AudioOutput for SilentOutput {
    fn load(&self, sounds: &[SoundAsset], volume: f32) -> Result<OutputHandle, AudioError> {
        let handle = OutputHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        debug!("silent output {handle}: {} sounds at {volume:.2}", sounds.len());
        self.channels().insert(
            handle,
            Channel {
                volume: volume.clamp(0.0, 1.0),
                paused: false,
            },
        );
        Ok(handle)
    }

    fn set_volume(&self, handle: OutputHandle, level: f32) -> Result<(), AudioError> {
        self.with_channel(handle, |c| c.volume = level.clamp(0.0, 1.0))
    }

    fn pause(&self, handle: OutputHandle) -> Result<(), AudioError> {
        self.with_channel(handle, |c| c.paused = true)
    }

    fn resume(&self, handle: OutputHandle, volume: f32) -> Result<(), AudioError> {
        self.with_channel(handle, |c| {
            c.paused = false;
            c.volume = volume.clamp(0.0, 1.0);
        })
    }

    fn stop(&self, handle: OutputHandle) -> Result<(), AudioError> {
        self.channels().remove(&handle);
        Ok(())
    }

    fn interruptions(&self) -> broadcast::Receiver<InterruptionSignal> {
        self.interruptions.subscribe()
    }
}
