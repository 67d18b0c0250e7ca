use rand::{seq::SliceRandom, Rng};
use tokio::time::Instant;

use crate::db::models::BackgroundAsset;

use super::{state::Clock, BackgroundRotation, RotationOrder};

/// Walks the selected backgrounds on a fixed interval.
pub(crate) struct Rotation {
    backgrounds: Vec<BackgroundAsset>,
    order: RotationOrder,
    queue: Vec<usize>,
    current: usize,
    clock: Clock,
    config: BackgroundRotation,
}

impl Rotation {
    /// `None` unless there is more than one background to cycle through.
    /// The first background is the one already on screen.
    pub(crate) fn new(
        backgrounds: Vec<BackgroundAsset>,
        config: BackgroundRotation,
        now: Instant,
    ) -> Option<Self> {
        if backgrounds.len() < 2 {
            return None;
        }
        Some(Self {
            backgrounds,
            order: config.order,
            queue: Vec::new(),
            current: 0,
            clock: Clock::starting(now, config.interval()),
            config,
        })
    }

    pub(crate) fn current(&self) -> &BackgroundAsset {
        &self.backgrounds[self.current]
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.clock.deadline()
    }

    pub(crate) fn pause(&mut self, now: Instant) {
        self.clock.pause(now);
    }

    pub(crate) fn resume(&mut self, now: Instant) {
        self.clock.resume(now);
    }

    pub(crate) fn advance(&mut self) -> &BackgroundAsset {
        self.advance_with(&mut rand::thread_rng())
    }

    pub(crate) fn advance_with(&mut self, rng: &mut impl Rng) -> &BackgroundAsset {
        self.clock.advance(self.config.interval());
        self.current = match self.order {
            RotationOrder::Sequential => (self.current + 1) % self.backgrounds.len(),
            RotationOrder::Shuffled => {
                if self.queue.is_empty() {
                    self.refill(rng);
                }
                self.queue.pop().unwrap_or(0)
            }
        };
        self.current()
    }

    /// Every background once per round, never showing the same one twice in
    /// a row across a round boundary.
    fn refill(&mut self, rng: &mut impl Rng) {
        let mut round: Vec<usize> = (0..self.backgrounds.len()).collect();
        round.shuffle(rng);
        // `pop` takes from the back.
        if round.last() == Some(&self.current) {
            round.swap(0, self.backgrounds.len() - 1);
        }
        self.queue = round;
    }
}
