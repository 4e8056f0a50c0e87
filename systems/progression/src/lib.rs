#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Progression tracker deriving the difficulty phase of a session.
//!
//! Counters only ever grow (apart from the run of small fires since the last
//! larger one), so the phase derived from them moves forward through
//! [`Phase::Initial`], [`Phase::RampUp`] and [`Phase::FullChallenge`] and never
//! back. Play time drives the two escalations: multiplicative speed bumps and
//! spacing widening steps.

use std::time::Duration;

use ember_run_core::{Category, Phase, ProgressionTuning};

/// Escalations that became due while advancing the session clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockAdvance {
    /// Number of speed bumps applied.
    pub speed_increases: u32,
    /// Number of spacing widening steps that became due.
    pub spacing_steps: u32,
}

impl ClockAdvance {
    /// Reports whether nothing escalated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.speed_increases == 0 && self.spacing_steps == 0
    }
}

/// Pure system owning the progression counters of a session.
#[derive(Clone, Debug)]
pub struct Progression {
    tuning: ProgressionTuning,
    widen_interval: Duration,
    small_count: u32,
    medium_cleared: u32,
    large_cleared: u32,
    small_since_non_small: u32,
    obstacles_passed: u32,
    score: u64,
    speed: f64,
    elapsed: Duration,
    last_speed_increase: Duration,
    last_spacing_increase: Duration,
}

impl Progression {
    /// Creates a tracker in its session-start state.
    #[must_use]
    pub fn new(tuning: ProgressionTuning, widen_interval: Duration) -> Self {
        Self {
            speed: tuning.initial_speed,
            tuning,
            widen_interval,
            small_count: 0,
            medium_cleared: 0,
            large_cleared: 0,
            small_since_non_small: 0,
            obstacles_passed: 0,
            score: 0,
            elapsed: Duration::ZERO,
            last_speed_increase: Duration::ZERO,
            last_spacing_increase: Duration::ZERO,
        }
    }

    /// Difficulty phase implied by the counters.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.small_count < self.tuning.initial_phase_smalls {
            Phase::Initial
        } else if self.medium_cleared < self.tuning.ramp_up_mediums {
            Phase::RampUp
        } else {
            Phase::FullChallenge
        }
    }

    /// Current forward scroll rate.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Play time since the session started.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Play time since the most recent speed bump, or since the start.
    #[must_use]
    pub fn since_speed_increase(&self) -> Duration {
        self.elapsed.saturating_sub(self.last_speed_increase)
    }

    /// Number of small fires chosen so far.
    #[must_use]
    pub const fn small_count(&self) -> u32 {
        self.small_count
    }

    /// Number of medium fires the player has passed.
    #[must_use]
    pub const fn medium_cleared(&self) -> u32 {
        self.medium_cleared
    }

    /// Number of large fires the player has passed.
    #[must_use]
    pub const fn large_cleared(&self) -> u32 {
        self.large_cleared
    }

    /// Small fires chosen since the last non-small one.
    #[must_use]
    pub const fn small_since_non_small(&self) -> u32 {
        self.small_since_non_small
    }

    /// Total obstacles the player has passed.
    #[must_use]
    pub const fn obstacles_passed(&self) -> u32 {
        self.obstacles_passed
    }

    /// Points accumulated from passes.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Reports whether extra large fires may be drawn.
    #[must_use]
    pub const fn extra_large_unlocked(&self) -> bool {
        self.large_cleared >= self.tuning.extra_large_unlock_larges
    }

    /// Records the category picked for the next spawn.
    pub fn record_chosen(&mut self, category: Category) {
        if category.is_small() {
            self.small_count = self.small_count.saturating_add(1);
            self.small_since_non_small = self.small_since_non_small.saturating_add(1);
        } else {
            self.small_since_non_small = 0;
        }
    }

    /// Records that the player passed a fire, returning the updated score.
    pub fn record_obstacle_passed(&mut self, category: Category) -> u64 {
        match category {
            Category::Medium => self.medium_cleared = self.medium_cleared.saturating_add(1),
            Category::Large => self.large_cleared = self.large_cleared.saturating_add(1),
            Category::Small | Category::ExtraLarge => {}
        }
        self.obstacles_passed = self.obstacles_passed.saturating_add(1);
        self.score = self.score.saturating_add(self.tuning.points_per_obstacle);
        self.score
    }

    /// Moves play time forward to `elapsed` and applies due escalations.
    ///
    /// Escalation timers advance by whole intervals so that a long frame
    /// applies every bump that fell inside it.
    pub fn advance_clock(&mut self, elapsed: Duration) -> ClockAdvance {
        debug_assert!(elapsed >= self.elapsed, "play time must not run backwards");
        self.elapsed = self.elapsed.max(elapsed);

        let mut advance = ClockAdvance::default();
        let speed_interval = self.tuning.speed_increase_interval;
        if !speed_interval.is_zero() {
            while self.elapsed.saturating_sub(self.last_speed_increase) >= speed_interval {
                self.last_speed_increase += speed_interval;
                self.speed *= self.tuning.speed_multiplier;
                advance.speed_increases += 1;
            }
        }

        if !self.widen_interval.is_zero() {
            while self.elapsed.saturating_sub(self.last_spacing_increase) >= self.widen_interval {
                self.last_spacing_increase += self.widen_interval;
                advance.spacing_steps += 1;
            }
        }

        if advance.speed_increases > 0 {
            log::info!("speed increased to {:.3} at {:?}", self.speed, self.elapsed);
        }
        advance
    }
}
