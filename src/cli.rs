use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::warn;

use crate::{
    assets::{AssetCatalog, AssetStore, SelectionPolicy},
    audio::AudioOutput,
    db::Database,
    display::{Nightlight, SysfsScreen},
    history,
    session::{SessionConfig, SessionEngine, SessionEvent, TimerDuration, TimerPreset},
    settings::SettingsStore,
};

#[derive(Parser)]
#[command(name = "sleepmate", version, about = "Ambient sounds, a nightlight and a sleep timer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Play the selected sounds until the timer runs out or Ctrl-C
    Play {
        /// Timer length in minutes
        #[arg(long, conflicts_with = "preset")]
        minutes: Option<u64>,
        /// Timer preset: off, 15, 30, 60 or 90
        #[arg(long)]
        preset: Option<TimerPreset>,
        /// Fade-out length in seconds
        #[arg(long)]
        fade: Option<u64>,
        /// Sound volume, 0.0 to 1.0
        #[arg(long)]
        volume: Option<f32>,
    },
    /// List sounds
    Sounds,
    /// List backgrounds
    Backgrounds,
    /// Toggle whether a sound or background is selected
    Select { id: String },
    /// Toggle a favourite
    Favorite { id: String },
    /// Show recent sessions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Remove downloaded backgrounds that are not favourites
    Prune,
    /// Show or change settings
    Settings {
        #[arg(long)]
        fade: Option<u64>,
        #[arg(long)]
        timer: Option<TimerPreset>,
        #[arg(long)]
        volume: Option<f32>,
        #[arg(long)]
        brightness: Option<f32>,
        #[arg(long)]
        auto_brightness: Option<bool>,
        #[arg(long)]
        multiple_sounds: Option<bool>,
        #[arg(long)]
        multiple_backgrounds: Option<bool>,
    },
}

/// Process-scoped services the commands run against.
pub struct App {
    pub data_dir: PathBuf,
    pub db: Database,
    pub settings: SettingsStore,
    pub catalog: Arc<AssetCatalog>,
    pub audio: Arc<dyn AudioOutput>,
}

impl App {
    pub async fn open(data_dir: PathBuf, audio: Arc<dyn AudioOutput>) -> Result<Self> {
        let db = Database::new(data_dir.join("sleepmate.sqlite3"))?;

        let recovered = db.recover_incomplete_sessions(chrono::Utc::now()).await?;
        if !recovered.is_empty() {
            warn!("Marked {} unfinished sessions as interrupted", recovered.len());
        }
        db.seed_defaults().await?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let prefs = settings.get();
        let catalog = AssetCatalog::load(
            db.clone(),
            SelectionPolicy::from_flag(prefs.multiple_sounds),
            SelectionPolicy::from_flag(prefs.multiple_backgrounds),
        )
        .await?;

        Ok(Self {
            data_dir,
            db,
            settings,
            catalog: Arc::new(catalog),
            audio,
        })
    }

    fn nightlight(&self) -> Nightlight {
        match SysfsScreen::discover() {
            Ok(screen) => Nightlight::new(Box::new(screen), self.settings.get().auto_brightness),
            Err(err) => {
                warn!("No controllable backlight, nightlight limited to scene changes: {err}");
                Nightlight::without_screen()
            }
        }
    }
}

pub async fn dispatch(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Play {
            minutes,
            preset,
            fade,
            volume,
        } => {
            let mut config = SessionConfig::from_settings(&app.settings.get());
            if let Some(minutes) = minutes {
                config.duration = TimerDuration::minutes(minutes);
            } else if let Some(preset) = preset {
                config.duration = preset.duration();
            }
            if let Some(fade) = fade {
                config.fade_out = std::time::Duration::from_secs(fade);
            }
            if let Some(volume) = volume {
                config.nature_volume = volume;
            }
            play(app, config).await
        }
        Command::Sounds => {
            for sound in app.catalog.sounds() {
                println!(
                    "{} {} {:<24} {}",
                    mark(sound.is_selected, "[x]", "[ ]"),
                    mark(sound.is_favorite, "*", " "),
                    sound.id,
                    sound.title
                );
            }
            Ok(())
        }
        Command::Backgrounds => {
            for bg in app.catalog.backgrounds() {
                let look = if bg.is_image {
                    bg.full_size_url.unwrap_or_default()
                } else {
                    bg.color.unwrap_or_default()
                };
                println!(
                    "{} {} {:<24} {:<16} {}",
                    mark(bg.is_selected, "[x]", "[ ]"),
                    mark(bg.is_favorite, "*", " "),
                    bg.id,
                    bg.title,
                    look
                );
            }
            Ok(())
        }
        Command::Select { id } => {
            let selected = app.catalog.toggle_selected(&id)?;
            println!("{id}: {}", if selected { "selected" } else { "deselected" });
            Ok(())
        }
        Command::Favorite { id } => {
            let favorite = app.catalog.toggle_favorite(&id)?;
            println!("{id}: {}", if favorite { "favourite" } else { "not a favourite" });
            Ok(())
        }
        Command::History { limit } => {
            for session in app.db.list_sessions(limit).await? {
                let target = session
                    .target_secs
                    .map(|s| format!("{}m", s / 60))
                    .unwrap_or_else(|| "off".into());
                println!(
                    "{}  {:<11} timer={:<4} played={}m sounds={}",
                    session.started_at.format("%Y-%m-%d %H:%M"),
                    session.status.as_str(),
                    target,
                    session.elapsed_secs / 60,
                    session.sound_count
                );
            }
            Ok(())
        }
        Command::Prune => {
            let removed = app.db.delete_unfavorited_backgrounds().await?;
            println!("Removed {removed} backgrounds");
            Ok(())
        }
        Command::Settings {
            fade,
            timer,
            volume,
            brightness,
            auto_brightness,
            multiple_sounds,
            multiple_backgrounds,
        } => {
            let updated = app.settings.update(|s| {
                if let Some(fade) = fade {
                    s.fade_out_secs = fade;
                }
                if let Some(timer) = timer {
                    s.default_timer = timer;
                }
                if let Some(volume) = volume {
                    s.nature_volume = volume;
                }
                if let Some(brightness) = brightness {
                    s.sleep_brightness = brightness;
                }
                if let Some(auto) = auto_brightness {
                    s.auto_brightness = auto;
                }
                if let Some(multiple) = multiple_sounds {
                    s.multiple_sounds = multiple;
                }
                if let Some(multiple) = multiple_backgrounds {
                    s.multiple_backgrounds = multiple;
                }
            })?;
            app.catalog
                .set_sound_policy(SelectionPolicy::from_flag(updated.multiple_sounds));
            app.catalog
                .set_background_policy(SelectionPolicy::from_flag(updated.multiple_backgrounds));
            println!("{}", serde_json::to_string_pretty(&updated)?);
            Ok(())
        }
    }
}

async fn play(app: &App, config: SessionConfig) -> Result<()> {
    let engine = SessionEngine::new(
        app.catalog.clone(),
        app.audio.clone(),
        Arc::new(app.nightlight()),
    );
    let recorder = history::spawn_recorder(app.db.clone(), engine.subscribe());
    let mut events = engine.subscribe();

    if let Err(err) = engine.start(config).await {
        engine.shutdown().await;
        bail!("could not start session: {err}");
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Finished { reason, .. }) => {
                    println!("Finished: {reason:?}");
                    break;
                }
                Some(event) => report(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if !engine.state().is_active() {
                    break;
                }
                engine.cancel().await;
            }
        }
    }

    engine.shutdown().await;
    drop(engine);
    if let Err(err) = recorder.await {
        warn!("History recorder stopped abnormally: {err}");
    }
    Ok(())
}

fn report(event: &SessionEvent) {
    match event {
        SessionEvent::Started {
            duration_secs,
            sound_count,
            ..
        } => match duration_secs {
            Some(secs) => println!("Playing {sound_count} sounds for {}m", secs / 60),
            None => println!("Playing {sound_count} sounds, no timer (Ctrl-C to stop)"),
        },
        SessionEvent::Tick { seconds_remaining } => {
            if seconds_remaining % 60 == 0 || *seconds_remaining <= 10 {
                println!("{}:{:02} remaining", seconds_remaining / 60, seconds_remaining % 60);
            }
        }
        SessionEvent::FadeOutBegan => println!("Fading out"),
        SessionEvent::Finished { .. } => {}
    }
}

fn mark(on: bool, yes: &'static str, no: &'static str) -> &'static str {
    if on {
        yes
    } else {
        no
    }
}
