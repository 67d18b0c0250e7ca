use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{display::tint::MIN_BRIGHTNESS, settings::UserSettings};

use super::SessionError;

/// How long a session plays before it fades out and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "secs")]
pub enum TimerDuration {
    /// No countdown; plays until cancelled.
    Indefinite,
    Finite(#[serde(with = "secs")] Duration),
}

impl TimerDuration {
    /// Saturates instead of overflowing on absurd minute counts.
    pub fn minutes(minutes: u64) -> Self {
        TimerDuration::Finite(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn as_secs(&self) -> Option<u64> {
        match self {
            TimerDuration::Indefinite => None,
            TimerDuration::Finite(d) => Some(d.as_secs()),
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Timer choices offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPreset {
    Off,
    FifteenMinutes,
    #[default]
    ThirtyMinutes,
    SixtyMinutes,
    NinetyMinutes,
}

impl TimerPreset {
    pub const ALL: [TimerPreset; 5] = [
        TimerPreset::Off,
        TimerPreset::FifteenMinutes,
        TimerPreset::ThirtyMinutes,
        TimerPreset::SixtyMinutes,
        TimerPreset::NinetyMinutes,
    ];

    pub fn duration(self) -> TimerDuration {
        match self {
            TimerPreset::Off => TimerDuration::Indefinite,
            TimerPreset::FifteenMinutes => TimerDuration::minutes(15),
            TimerPreset::ThirtyMinutes => TimerDuration::minutes(30),
            TimerPreset::SixtyMinutes => TimerDuration::minutes(60),
            TimerPreset::NinetyMinutes => TimerDuration::minutes(90),
        }
    }
}

impl fmt::Display for TimerPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerPreset::Off => "off",
            TimerPreset::FifteenMinutes => "15",
            TimerPreset::ThirtyMinutes => "30",
            TimerPreset::SixtyMinutes => "60",
            TimerPreset::NinetyMinutes => "90",
        };
        f.write_str(label)
    }
}

impl FromStr for TimerPreset {
    type Err = String;

    /// Accepts `off` or a minute count (`15`, `30m`, `60min`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "off" || s == "none" {
            return Ok(TimerPreset::Off);
        }
        let minutes = s.trim_end_matches("min").trim_end_matches('m');
        TimerPreset::ALL
            .into_iter()
            .find(|preset| preset.to_string() == minutes)
            .ok_or_else(|| format!("unknown timer preset '{s}' (expected off, 15, 30, 60 or 90)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationOrder {
    Sequential,
    Shuffled,
}

/// Cycles the nightlight through the selected backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundRotation {
    pub interval_secs: u64,
    pub order: RotationOrder,
}

impl BackgroundRotation {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Parameters for one session. Fixed once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub duration: TimerDuration,
    pub nature_volume: f32,
    /// Zero disables the fade; the session then cuts to silence at the end.
    #[serde(with = "secs")]
    pub fade_out: Duration,
    pub brightness: f32,
    pub rotation: Option<BackgroundRotation>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&UserSettings::default())
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &UserSettings) -> Self {
        Self {
            duration: settings.default_timer.duration(),
            nature_volume: settings.nature_volume,
            fade_out: Duration::from_secs(settings.fade_out_secs),
            brightness: settings.sleep_brightness,
            rotation: settings.background_rotation,
        }
    }

    pub fn with_duration(mut self, duration: TimerDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.nature_volume.is_finite() || !(0.0..=1.0).contains(&self.nature_volume) {
            return Err(SessionError::InvalidConfig(format!(
                "nature volume {} outside 0.0..=1.0",
                self.nature_volume
            )));
        }
        if !self.brightness.is_finite() || !(MIN_BRIGHTNESS..=1.0).contains(&self.brightness) {
            return Err(SessionError::InvalidConfig(format!(
                "brightness {} outside {MIN_BRIGHTNESS}..=1.0",
                self.brightness
            )));
        }
        if let TimerDuration::Finite(d) = self.duration {
            if d.as_secs() == 0 {
                return Err(SessionError::InvalidConfig(
                    "timer must run for at least one second".into(),
                ));
            }
        }
        if matches!(self.rotation, Some(r) if r.interval_secs == 0) {
            return Err(SessionError::InvalidConfig(
                "background rotation interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Fade window in whole seconds, never longer than the timer itself.
    pub fn effective_fade_secs(&self) -> u64 {
        let fade = self.fade_out.as_secs();
        match self.duration.as_secs() {
            Some(total) => fade.min(total),
            None => fade,
        }
    }
}
