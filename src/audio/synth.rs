//! Procedurally generated ambience loops.
//!
//! Every generator starts from the same brownian walk and shapes it: rain is
//! band-passed with a slow shimmer, waves swell on an eight second cycle and
//! wind gusts on two detuned slow oscillators.

use std::f32::consts::TAU;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SYNTH_PREFIX: &str = "synth:";
const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambience {
    BrownNoise,
    Rain,
    Waves,
    Wind,
}

impl FromStr for Ambience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brown-noise" => Ok(Ambience::BrownNoise),
            "rain" => Ok(Ambience::Rain),
            "waves" => Ok(Ambience::Waves),
            "wind" => Ok(Ambience::Wind),
            other => Err(format!("unknown generated ambience '{other}'")),
        }
    }
}

impl Ambience {
    /// `Some` for `synth:<kind>` locators, `None` for anything else.
    pub fn from_locator(locator: &str) -> Option<Result<Self, String>> {
        locator.strip_prefix(SYNTH_PREFIX).map(str::parse)
    }
}

/// Direct-form biquad, coefficients fixed at construction.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn new(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        Self { b0, b1, b2, a1, a2, x1: 0.0, x2: 0.0, y1: 0.0, y2: 0.0 }
    }

    /// Rough band-pass around 3 kHz.
    fn rain_band() -> Self {
        Self::new(0.1, 0.0, -0.1, -1.8, 0.85)
    }

    /// Gentle one-pole-ish low-pass used for surf and wind bodies.
    fn low_pass() -> Self {
        Self::new(0.02, 0.04, 0.02, -1.6, 0.68)
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Infinite mono sample stream for one [`Ambience`].
pub struct AmbienceSource {
    kind: Ambience,
    rng: StdRng,
    brown: f32,
    filter: Biquad,
    phase: f32,
    phase_alt: f32,
}

impl AmbienceSource {
    pub fn new(kind: Ambience) -> Self {
        Self::with_rng(kind, StdRng::from_entropy())
    }

    pub fn seeded(kind: Ambience, seed: u64) -> Self {
        Self::with_rng(kind, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kind: Ambience, rng: StdRng) -> Self {
        let filter = match kind {
            Ambience::Rain => Biquad::rain_band(),
            Ambience::BrownNoise | Ambience::Waves | Ambience::Wind => Biquad::low_pass(),
        };
        Self {
            kind,
            rng,
            brown: 0.0,
            filter,
            phase: 0.0,
            phase_alt: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn next_brown(&mut self) -> f32 {
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        self.brown = ((self.brown + white * 0.02).clamp(-1.0, 1.0)) * 0.9999;
        self.brown
    }

    fn advance(phase: &mut f32, hz: f32) -> f32 {
        *phase += TAU * hz / SAMPLE_RATE as f32;
        if *phase > TAU {
            *phase -= TAU;
        }
        *phase
    }
}

impl Iterator for AmbienceSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let brown = self.next_brown();
        let sample = match self.kind {
            Ambience::BrownNoise => brown * 0.3,
            Ambience::Rain => {
                let filtered = self.filter.process(brown);
                let shimmer = 0.7 + 0.3 * Self::advance(&mut self.phase, 0.3).sin();
                (filtered * 0.8 + brown * 0.2) * shimmer * 0.4
            }
            Ambience::Waves => {
                let body = self.filter.process(brown);
                let swell = 0.5 - 0.5 * Self::advance(&mut self.phase, 0.125).cos();
                (body * 2.0 + brown * 0.1) * (0.15 + 0.85 * swell) * 0.35
            }
            Ambience::Wind => {
                let body = self.filter.process(brown);
                let gust = 0.6
                    + 0.25 * Self::advance(&mut self.phase, 0.07).sin()
                    + 0.15 * Self::advance(&mut self.phase_alt, 0.13).sin();
                body * 2.5 * gust * 0.3
            }
        };
        Some(sample.clamp(-1.0, 1.0))
    }
}

#[cfg(feature = "playback")]
impl rodio::Source for AmbienceSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}
