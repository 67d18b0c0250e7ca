use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

const SECOND: Duration = Duration::from_secs(1);

/// Engine state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Playing,
    FadingOut,
    Interrupted,
    Finished,
}

impl SessionState {
    /// A session holds audio and display resources.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Playing | SessionState::FadingOut | SessionState::Interrupted
        )
    }
}

/// A recurring deadline that can be frozen and picked up again with the same
/// time left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Clock {
    Running { next: Instant },
    Paused { left: Duration },
}

impl Clock {
    pub(crate) fn starting(now: Instant, period: Duration) -> Self {
        Clock::Running { next: now + period }
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        match self {
            Clock::Running { next } => Some(*next),
            Clock::Paused { .. } => None,
        }
    }

    /// Time until the next deadline, as of `now`.
    pub(crate) fn left(&self, now: Instant) -> Duration {
        match self {
            Clock::Running { next } => next.saturating_duration_since(now),
            Clock::Paused { left } => *left,
        }
    }

    /// Push a running deadline on by `period`, keeping the cadence anchored.
    pub(crate) fn advance(&mut self, period: Duration) {
        if let Clock::Running { next } = self {
            *next += period;
        }
    }

    pub(crate) fn pause(&mut self, now: Instant) {
        if let Clock::Running { next } = *self {
            *self = Clock::Paused {
                left: next.saturating_duration_since(now),
            };
        }
    }

    pub(crate) fn resume(&mut self, now: Instant) {
        if let Clock::Paused { left } = *self {
            *self = Clock::Running { next: now + left };
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    /// Remaining time just reached the fade window.
    FadeBegins,
    Elapsed,
}

/// Whole-second countdown with a trailing fade window.
#[derive(Debug, Clone)]
pub(crate) struct Countdown {
    remaining: u64,
    fade_secs: u64,
    clock: Clock,
}

impl Countdown {
    pub(crate) fn start(total_secs: u64, fade_secs: u64, now: Instant) -> Self {
        Self {
            remaining: total_secs,
            fade_secs: fade_secs.min(total_secs),
            clock: Clock::starting(now, SECOND),
        }
    }

    pub(crate) fn remaining_secs(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn fade_window(&self) -> Duration {
        Duration::from_secs(self.fade_secs)
    }

    pub(crate) fn next_tick(&self) -> Option<Instant> {
        self.clock.deadline()
    }

    /// Already inside the fade window (a timer no longer than its fade).
    pub(crate) fn in_fade(&self) -> bool {
        self.fade_secs > 0 && self.remaining <= self.fade_secs
    }

    pub(crate) fn tick(&mut self) -> TickOutcome {
        self.remaining = self.remaining.saturating_sub(1);
        self.clock.advance(SECOND);
        if self.remaining == 0 {
            TickOutcome::Elapsed
        } else if self.remaining == self.fade_secs {
            TickOutcome::FadeBegins
        } else {
            TickOutcome::Continue
        }
    }

    /// Sub-second time left, for smooth fades between ticks.
    pub(crate) fn precise_remaining(&self, now: Instant) -> Duration {
        if self.remaining == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(self.remaining - 1) + self.clock.left(now).min(SECOND)
    }

    pub(crate) fn extend(&mut self, extra_secs: u64) -> u64 {
        self.remaining = self.remaining.saturating_add(extra_secs);
        self.remaining
    }

    pub(crate) fn pause(&mut self, now: Instant) {
        self.clock.pause(now);
    }

    pub(crate) fn resume(&mut self, now: Instant) {
        self.clock.resume(now);
    }
}
