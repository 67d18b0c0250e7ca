pub mod assets;
pub mod audio;
mod cli;
pub mod db;
pub mod display;
pub mod history;
pub mod session;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

pub use assets::{AssetCatalog, AssetError, AssetStore, SelectionPolicy};
pub use audio::{AudioError, AudioOutput, InterruptionSignal, OutputHandle, SilentOutput};
pub use db::{BackgroundAsset, Database, SessionRecord, SessionStatus, SoundAsset};
pub use display::{DisplayControl, DisplayError, Nightlight, Tint};
pub use session::{
    FinishReason, SessionConfig, SessionEngine, SessionError, SessionEvent, SessionState,
    TimerDuration, TimerPreset,
};
pub use settings::{SettingsStore, UserSettings};

/// `SLEEPMATE_DATA_DIR`, else the platform data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("SLEEPMATE_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("sleepmate"))
        .ok_or_else(|| anyhow!("no data directory for this platform; set SLEEPMATE_DATA_DIR"))
}

#[cfg(feature = "playback")]
fn audio_output(data_dir: &std::path::Path) -> Arc<dyn AudioOutput> {
    Arc::new(audio::RodioOutput::new(data_dir.to_path_buf()))
}

#[cfg(not(feature = "playback"))]
fn audio_output(_data_dir: &std::path::Path) -> Arc<dyn AudioOutput> {
    log::warn!("Built without the `playback` feature; sessions run silently");
    Arc::new(SilentOutput::new())
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let data_dir = data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let audio = audio_output(&data_dir);
        let app = cli::App::open(data_dir, audio).await?;
        cli::dispatch(&app, cli.command).await
    })
}
