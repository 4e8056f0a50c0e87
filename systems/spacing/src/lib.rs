#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spacing calculator that sizes the gap in front of each new fire.
//!
//! A gap starts as a draw from the session's [`RandomnessSource`] inside a
//! per-category range scaled by the progression-driven multiplier. Two
//! one-shot adjustments follow, in this order: a jitter factor once the
//! rhythm has repeated itself too often, then a relief factor after the
//! player visibly struggled. The result never drops below the jumpable floor.

use ember_run_core::{Category, Gap, GapRange, SpacingTuning};
use ember_run_system_noise::{Dice, RandomnessSource};

/// Pure system owning the spacing sub-state of a session.
#[derive(Clone, Debug)]
pub struct Spacing {
    tuning: SpacingTuning,
    multiplier: f64,
    consecutive_identical_gaps: u32,
    missed_last_jump: bool,
    previous_single_gap: Option<f64>,
}

impl Spacing {
    /// Creates a calculator in its session-start state.
    #[must_use]
    pub fn new(tuning: SpacingTuning) -> Self {
        Self {
            tuning,
            multiplier: 1.0,
            consecutive_identical_gaps: 0,
            missed_last_jump: false,
            previous_single_gap: None,
        }
    }

    /// Current scale applied to every base range.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Number of consecutive single fires whose gaps matched within tolerance.
    #[must_use]
    pub const fn consecutive_identical_gaps(&self) -> u32 {
        self.consecutive_identical_gaps
    }

    /// Reports whether the next gap will receive missed-jump relief.
    #[must_use]
    pub const fn missed_last_jump(&self) -> bool {
        self.missed_last_jump
    }

    /// Flags the next gap for relief. Repeated reports coalesce.
    pub fn record_missed_jump(&mut self) {
        self.missed_last_jump = true;
    }

    /// Grows the multiplier by one step, returning the new value when it changed.
    pub fn widen(&mut self) -> Option<f64> {
        let widened = (self.multiplier + self.tuning.widen_step).min(self.tuning.max_multiplier);
        if widened <= self.multiplier {
            return None;
        }
        self.multiplier = widened;
        Some(widened)
    }

    /// Base width-unit range for a category before scaling.
    #[must_use]
    pub fn base_range(&self, category: Category) -> GapRange {
        match category {
            Category::Small => self.tuning.small,
            Category::Medium => self.tuning.medium,
            Category::Large => self.tuning.large,
            Category::ExtraLarge => self.tuning.fallback,
        }
    }

    /// Computes the gap in front of a fire of the given category.
    ///
    /// Consumes one draw from `source`, plus one from `dice` when the
    /// repetition correction fires. Clears the missed-jump flag.
    pub fn calculate_gap<S>(&mut self, category: Category, source: &mut S, dice: &mut Dice) -> Gap
    where
        S: RandomnessSource + ?Sized,
    {
        let range = self.base_range(category);
        let max = (range.max * self.multiplier).min(self.tuning.max_gap);
        let min = (range.min * self.multiplier).min(max);

        let mut gap = source.sample_range(min, max);

        if self.consecutive_identical_gaps >= self.tuning.identical_gap_limit {
            let factor = dice.factor(self.tuning.variation.min, self.tuning.variation.max);
            log::debug!(
                "breaking repeated rhythm after {} identical gaps: {gap:.3} x {factor:.3}",
                self.consecutive_identical_gaps
            );
            gap *= factor;
            self.consecutive_identical_gaps = 0;
        }

        if self.missed_last_jump {
            gap *= self.tuning.missed_jump_relief;
            self.missed_last_jump = false;
        }

        let gap = gap.max(self.tuning.min_gap);
        Gap::from_width_units(gap, self.tuning.presentation_units_per_width_unit)
    }

    /// Compares the gap of a freshly emitted single fire against its predecessor.
    pub fn record_single_gap(&mut self, gap: Gap) {
        let current = gap.width_units();
        if let Some(previous) = self.previous_single_gap {
            if (previous - current).abs() < self.tuning.identical_gap_tolerance {
                self.consecutive_identical_gaps = self.consecutive_identical_gaps.saturating_add(1);
            } else {
                self.consecutive_identical_gaps = 0;
            }
        }
        self.previous_single_gap = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_stops_at_cap() {
        let mut spacing = Spacing::new(SpacingTuning::default());
        let mut steps = 0;
        while spacing.widen().is_some() {
            steps += 1;
            assert!(steps <= 20, "multiplier never reached its cap");
        }
        assert!((spacing.multiplier() - 2.0).abs() < 1e-9);
        assert_eq!(spacing.widen(), None);
    }

    #[test]
    fn extra_large_uses_fallback_range() {
        let spacing = Spacing::new(SpacingTuning::default());
        assert_eq!(spacing.base_range(Category::ExtraLarge), GapRange::new(3.0, 4.0));
    }

    #[test]
    fn first_single_gap_only_sets_reference() {
        let mut spacing = Spacing::new(SpacingTuning::default());
        spacing.record_single_gap(Gap::from_width_units(2.5, 6.0));
        assert_eq!(spacing.consecutive_identical_gaps(), 0);
        spacing.record_single_gap(Gap::from_width_units(2.6, 6.0));
        assert_eq!(spacing.consecutive_identical_gaps(), 1);
        spacing.record_single_gap(Gap::from_width_units(3.5, 6.0));
        assert_eq!(spacing.consecutive_identical_gaps(), 0);
    }
}
