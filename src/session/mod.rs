//! The sleep session engine: countdown, fade-out, interruption recovery and
//! the lifecycle events the presentation layer listens to.

mod config;
mod controller;
mod error;
mod events;
mod rotation;
mod state;

pub use config::{BackgroundRotation, RotationOrder, SessionConfig, TimerDuration, TimerPreset};
pub use controller::SessionEngine;
pub use error::SessionError;
pub use events::{FinishReason, SessionEvent};
pub use state::SessionState;
