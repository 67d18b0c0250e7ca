//! Screen brightness, tint and wake control for the nightlight.

pub mod nightlight;
pub mod screen;
pub mod tint;

use thiserror::Error;

use crate::db::models::BackgroundAsset;

pub use nightlight::{Nightlight, Scene};
pub use screen::{Screen, SysfsScreen};
pub use tint::{Rgb, Tint};

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("display control failed: {0}")]
    ControlFailed(String),

    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait DisplayControl: Send + Sync {
    /// Keep the screen awake and show `background` under `tint`. The first
    /// call after a restore remembers the brightness to go back to; later
    /// calls only change what is shown.
    fn activate(&self, background: Option<&BackgroundAsset>, tint: Tint) -> Result<(), DisplayError>;

    /// Undo [`DisplayControl::activate`]. A restore without a prior
    /// activation does nothing.
    fn restore(&self) -> Result<(), DisplayError>;
}
