use std::sync::{Mutex, MutexGuard};

use log::info;
use serde::Serialize;

use crate::db::models::BackgroundAsset;

use super::{DisplayControl, DisplayError, Screen, Tint};

/// What the presentation layer should draw while the nightlight is on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub background: Option<BackgroundAsset>,
    pub tint: Tint,
}

#[derive(Default)]
struct NightlightState {
    active: bool,
    saved_brightness: Option<f32>,
    scene: Option<Scene>,
}

/// [`DisplayControl`] over an optional [`Screen`].
///
/// Without a screen (or with auto-brightness off) only the scene is tracked;
/// a missing screen still reports `ControlFailed` so callers can log it.
pub struct Nightlight {
    screen: Option<Box<dyn Screen>>,
    auto_brightness: bool,
    state: Mutex<NightlightState>,
}

impl Nightlight {
    pub fn new(screen: Box<dyn Screen>, auto_brightness: bool) -> Self {
        Self {
            screen: Some(screen),
            auto_brightness,
            state: Mutex::new(NightlightState::default()),
        }
    }

    pub fn without_screen() -> Self {
        Self {
            screen: None,
            auto_brightness: false,
            state: Mutex::new(NightlightState::default()),
        }
    }

    pub fn scene(&self) -> Option<Scene> {
        self.lock().scene.clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    fn lock(&self) -> MutexGuard<'_, NightlightState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplayControl for Nightlight {
    fn activate(&self, background: Option<&BackgroundAsset>, tint: Tint) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.scene = Some(Scene {
            background: background.cloned(),
            tint,
        });
        let first = !state.active;
        state.active = true;

        let Some(screen) = self.screen.as_deref() else {
            return Err(DisplayError::ControlFailed("no controllable screen".into()));
        };

        if first {
            screen.set_keep_awake(true)?;
            if self.auto_brightness {
                state.saved_brightness = Some(screen.brightness()?);
            }
        }
        if self.auto_brightness {
            screen.set_brightness(tint.brightness)?;
            if first {
                info!("Nightlight dimmed to {}%", (tint.brightness * 100.0).round());
            }
        }
        Ok(())
    }

    fn restore(&self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if !state.active {
            return Ok(());
        }
        state.active = false;
        state.scene = None;
        let saved = state.saved_brightness.take();

        let Some(screen) = self.screen.as_deref() else {
            return Ok(());
        };
        screen.set_keep_awake(false)?;
        if let Some(level) = saved {
            screen.set_brightness(level)?;
            info!("Nightlight restored brightness to {}%", (level * 100.0).round());
        }
        Ok(())
    }
}
