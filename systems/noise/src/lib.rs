#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic randomness shared by the director's systems.
//!
//! Gap sizing draws from a [`RandomnessSource`]. Two implementations exist:
//! [`NoiseCursor`] walks a one-dimensional [`SmoothNoise`] field so that
//! successive draws drift rather than jump, and [`UniformSource`] produces
//! independent draws. [`SpacingSource`] picks one of them from the session's
//! [`RandomnessStrategy`]. Every other decision (category rolls, cluster
//! coins, jitter factors) goes through [`Dice`].
//!
//! Seeds are derived with SHA-256 so that a session can be replayed from its
//! base seed alone.

use std::time::Duration;

use ember_run_core::{RandomnessStrategy, RandomnessTuning};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Stream label for the gap-sizing randomness source.
pub const RNG_STREAM_SPACING: &str = "spacing";

/// Stream label for category rolls, coins and jitter factors.
pub const RNG_STREAM_ROLLS: &str = "rolls";

const LATTICE_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// Capability that yields values inside a caller-supplied range.
pub trait RandomnessSource {
    /// Returns a value in `[min, max]`. A degenerate range yields `min`.
    fn sample_range(&mut self, min: f64, max: f64) -> f64;
}

/// Seeded one-dimensional value noise with quintic interpolation.
///
/// Every integer lattice point carries a pseudo-random gradient in `[-1, 1]`
/// derived from the seed. Samples between lattice points blend the two
/// neighbouring gradients with `6t^5 - 15t^4 + 10t^3`, so the field is
/// continuous and its first two derivatives vanish at the lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmoothNoise {
    seed: u64,
}

impl SmoothNoise {
    /// Creates a noise field for the provided seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Samples the field at `x`. The result always lies in `[-1, 1]`.
    #[must_use]
    pub fn sample(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return self.gradient(0);
        }

        let lattice = x.floor();
        let t = x - lattice;
        let left_index = lattice as i64;
        let left = self.gradient(left_index);
        let right = self.gradient(left_index.wrapping_add(1));
        let blended = left + (right - left) * quintic_fade(t);
        blended.clamp(-1.0, 1.0)
    }

    fn gradient(&self, lattice: i64) -> f64 {
        const SCALE: f64 = 1.0 / ((1u64 << 53) as f64);
        let hashed = mix64(self.seed ^ (lattice as u64).wrapping_mul(LATTICE_STRIDE));
        let unit = ((hashed >> 11) as f64) * SCALE;
        unit * 2.0 - 1.0
    }
}

fn quintic_fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn mix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(LATTICE_STRIDE);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn scale_into(unit: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    (min + unit * (max - min)).clamp(min, max)
}

/// Walks a [`SmoothNoise`] field, advancing a fixed step after every draw.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseCursor {
    noise: SmoothNoise,
    position: f64,
    step: f64,
}

impl NoiseCursor {
    /// Creates a cursor at position zero of the field seeded with `seed`.
    #[must_use]
    pub const fn new(seed: u64, step: f64) -> Self {
        Self {
            noise: SmoothNoise::new(seed),
            position: 0.0,
            step,
        }
    }

    /// Position that the next draw will sample.
    #[must_use]
    pub const fn position(&self) -> f64 {
        self.position
    }
}

impl RandomnessSource for NoiseCursor {
    fn sample_range(&mut self, min: f64, max: f64) -> f64 {
        let value = self.noise.sample(self.position);
        self.position += self.step;
        scale_into((value + 1.0) * 0.5, min, max)
    }
}

/// Independent uniform draws from a seeded ChaCha stream.
#[derive(Clone, Debug)]
pub struct UniformSource {
    rng: ChaCha8Rng,
}

impl UniformSource {
    /// Creates a uniform source for the provided seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomnessSource for UniformSource {
    fn sample_range(&mut self, min: f64, max: f64) -> f64 {
        let unit: f64 = self.rng.gen();
        scale_into(unit, min, max)
    }
}

/// Gap-sizing source chosen once per session.
#[derive(Clone, Debug)]
pub enum SpacingSource {
    /// Smooth noise walked by a cursor.
    Smooth(NoiseCursor),
    /// Independent uniform draws.
    Uniform(UniformSource),
}

impl SpacingSource {
    /// Builds the source requested by the tuning.
    #[must_use]
    pub fn from_tuning(tuning: &RandomnessTuning, seed: u64) -> Self {
        match tuning.strategy {
            RandomnessStrategy::SmoothNoise => {
                Self::Smooth(NoiseCursor::new(seed, tuning.noise_step))
            }
            RandomnessStrategy::Uniform => Self::Uniform(UniformSource::new(seed)),
        }
    }

    /// Strategy backing this source.
    #[must_use]
    pub const fn strategy(&self) -> RandomnessStrategy {
        match self {
            Self::Smooth(_) => RandomnessStrategy::SmoothNoise,
            Self::Uniform(_) => RandomnessStrategy::Uniform,
        }
    }
}

impl RandomnessSource for SpacingSource {
    fn sample_range(&mut self, min: f64, max: f64) -> f64 {
        match self {
            Self::Smooth(cursor) => cursor.sample_range(min, max),
            Self::Uniform(uniform) => uniform.sample_range(min, max),
        }
    }
}

/// Uniform dice used for every non-spacing decision.
#[derive(Clone, Debug)]
pub struct Dice {
    rng: ChaCha8Rng,
}

impl Dice {
    /// Creates dice for the provided seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draws a value in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Returns `true` with the given probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }

    /// Draws a value in `[min, max]`.
    pub fn factor(&mut self, min: f64, max: f64) -> f64 {
        let unit = self.unit();
        scale_into(unit, min, max)
    }

    /// Draws an integer in `[min, max]`. An inverted range yields `min`.
    pub fn count(&mut self, min: u8, max: u8) -> u8 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

/// Derives the base seed of a session that was started without one.
#[must_use]
pub fn derive_session_seed(started_at: Duration, ordinal: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(started_at.as_nanos().to_le_bytes());
    hasher.update(ordinal.to_le_bytes());
    finalize_seed(hasher)
}

/// Derives an independent stream seed from a base seed and a label.
#[must_use]
pub fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quintic_fade_pins_endpoints_and_midpoint() {
        assert_eq!(quintic_fade(0.0), 0.0);
        assert!((quintic_fade(1.0) - 1.0).abs() < 1e-12);
        assert!((quintic_fade(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn lattice_points_return_their_gradient() {
        let noise = SmoothNoise::new(7);
        for lattice in -5..5 {
            assert_eq!(noise.sample(lattice as f64), noise.gradient(lattice));
        }
    }

    #[test]
    fn non_finite_input_stays_in_range() {
        let noise = SmoothNoise::new(3);
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let value = noise.sample(x);
            assert!((-1.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn degenerate_ranges_collapse_to_min() {
        assert_eq!(scale_into(0.7, 3.0, 3.0), 3.0);
        assert_eq!(scale_into(0.7, 4.0, 2.0), 4.0);
        let mut dice = Dice::new(1);
        assert_eq!(dice.count(3, 2), 3);
    }

    #[test]
    fn labeled_seeds_differ_per_label() {
        let base = 42;
        assert_ne!(
            derive_labeled_seed(base, RNG_STREAM_SPACING),
            derive_labeled_seed(base, RNG_STREAM_ROLLS)
        );
        assert_eq!(
            derive_labeled_seed(base, RNG_STREAM_SPACING),
            derive_labeled_seed(base, RNG_STREAM_SPACING)
        );
    }

    #[test]
    fn session_seed_depends_on_ordinal() {
        let at = Duration::from_millis(1_500);
        assert_ne!(derive_session_seed(at, 0), derive_session_seed(at, 1));
    }
}
