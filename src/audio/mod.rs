//! Looping audio output with volume control and interruption notices.

pub mod fade;
#[cfg(feature = "playback")]
pub mod rodio_output;
pub mod silent;
pub mod synth;

use std::{
    fmt,
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{runtime::RuntimeFlavor, sync::broadcast};

use crate::db::models::SoundAsset;

pub use fade::{FadeRamp, FADE_STEP};
#[cfg(feature = "playback")]
pub use rodio_output::RodioOutput;
pub use silent::SilentOutput;

/// Identifies one `load` call's set of players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputHandle(pub u64);

impl fmt::Display for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Platform preemption of audio (phone call, another app, route change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum InterruptionSignal {
    Began,
    Ended { resumable: bool },
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio session unavailable: {0}")]
    Unavailable(String),

    #[error("unknown audio handle {0}")]
    UnknownHandle(OutputHandle),

    #[error("audio device error: {0}")]
    Device(String),
}

/// Capacity of the interruption broadcast; signals are rare.
pub(crate) const INTERRUPTION_CAPACITY: usize = 16;

/// Wait for a device thread's reply. On a multi-threaded runtime the wait is
/// moved off the worker so other tasks keep running; a current-thread
/// runtime has no spare worker and simply blocks.
pub(crate) fn wait_for_device<T>(
    reply: &Receiver<T>,
    timeout: Duration,
) -> Result<T, RecvTimeoutError> {
    let wait = || reply.recv_timeout(timeout);
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(wait)
        }
        _ => wait(),
    }
}

/// Looping players for the sounds of one session.
///
/// Calls return promptly; implementations that drive a device do so from
/// their own thread.
pub trait AudioOutput: Send + Sync {
    /// Start every sound looping at `volume`. Fails with
    /// [`AudioError::Unavailable`] when the device cannot be opened.
    fn load(&self, sounds: &[SoundAsset], volume: f32) -> Result<OutputHandle, AudioError>;

    fn set_volume(&self, handle: OutputHandle, level: f32) -> Result<(), AudioError>;

    fn pause(&self, handle: OutputHandle) -> Result<(), AudioError>;

    fn resume(&self, handle: OutputHandle, volume: f32) -> Result<(), AudioError>;

    /// Release every resource behind `handle`. Stopping an unknown or already
    /// stopped handle is a no-op.
    fn stop(&self, handle: OutputHandle) -> Result<(), AudioError>;

    /// New receiver for interruption signals.
    fn interruptions(&self) -> broadcast::Receiver<InterruptionSignal>;
}
