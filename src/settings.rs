use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    display::tint::MIN_BRIGHTNESS,
    session::{BackgroundRotation, TimerPreset},
};

/// Everything the user can change between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub fade_out_secs: u64,
    pub default_timer: TimerPreset,
    pub nature_volume: f32,
    pub auto_brightness: bool,
    pub sleep_brightness: f32,
    pub multiple_sounds: bool,
    pub multiple_backgrounds: bool,
    pub background_rotation: Option<BackgroundRotation>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            fade_out_secs: 30,
            default_timer: TimerPreset::ThirtyMinutes,
            nature_volume: 0.5,
            auto_brightness: true,
            sleep_brightness: 0.1,
            multiple_sounds: false,
            multiple_backgrounds: false,
            background_rotation: None,
        }
    }
}

impl UserSettings {
    fn normalized(mut self) -> Self {
        self.nature_volume = if self.nature_volume.is_finite() {
            self.nature_volume.clamp(0.0, 1.0)
        } else {
            Self::default().nature_volume
        };
        self.sleep_brightness = if self.sleep_brightness.is_finite() {
            self.sleep_brightness.clamp(MIN_BRIGHTNESS, 1.0)
        } else {
            Self::default().sleep_brightness
        };
        self
    }
}

/// JSON-backed settings at `<data_dir>/settings.json`.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    /// Apply `change` and write the result to disk.
    pub fn update(&self, change: impl FnOnce(&mut UserSettings)) -> Result<UserSettings> {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        let next = next.normalized();
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_settings(path: &Path) -> Result<UserSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let data = serde_json::from_str::<UserSettings>(&contents).unwrap_or_else(|err| {
        warn!("Ignoring malformed settings at {}: {err}", path.display());
        UserSettings::default()
    });
    Ok(data.normalized())
}
