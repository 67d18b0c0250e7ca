use std::time::Duration;

/// Fade steps per second; above the ~10/s where a stepped ramp stops being
/// audible.
pub const FADE_STEP: Duration = Duration::from_millis(50);

/// Linear ramp from `from` down to silence over `window`.
///
/// The ramp is keyed on the time left in the window rather than on elapsed
/// wall time, so a paused countdown freezes the ramp at the same point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRamp {
    from: f32,
    window: Duration,
}

impl FadeRamp {
    pub fn new(from: f32, window: Duration) -> Self {
        Self {
            from: from.clamp(0.0, 1.0),
            window,
        }
    }

    /// Volume with `remaining` left until the end of the window.
    pub fn volume_at(&self, remaining: Duration) -> f32 {
        if self.window.is_zero() || remaining.is_zero() {
            return 0.0;
        }
        if remaining >= self.window {
            return self.from;
        }
        self.from * (remaining.as_secs_f32() / self.window.as_secs_f32())
    }

    /// Fraction of the ramp already played, `0.0..=1.0`.
    pub fn progress_at(&self, remaining: Duration) -> f32 {
        if self.window.is_zero() {
            return 1.0;
        }
        1.0 - (remaining.min(self.window).as_secs_f32() / self.window.as_secs_f32())
    }
}
