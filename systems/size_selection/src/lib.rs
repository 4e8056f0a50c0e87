#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Size selector choosing the category of the next fire.

use ember_run_core::{Category, CategoryWeights, Phase, SelectionTuning};
use ember_run_system_noise::Dice;
use ember_run_system_progression::Progression;

/// Pure system applying the phase rules to pick a category.
#[derive(Clone, Debug)]
pub struct SizeSelector {
    tuning: SelectionTuning,
}

impl SizeSelector {
    /// Creates a selector from the provided rules.
    #[must_use]
    pub fn new(tuning: SelectionTuning) -> Self {
        Self { tuning }
    }

    /// Picks the category of the next fire and records it in `progression`.
    ///
    /// Not idempotent: each call draws afresh and advances the counters, so it
    /// must run exactly once per spawn decision.
    pub fn choose_category(&self, progression: &mut Progression, dice: &mut Dice) -> Category {
        let category = match progression.phase() {
            Phase::Initial => Category::Small,
            _ if progression.small_since_non_small() < self.tuning.min_smalls_between => {
                Category::Small
            }
            Phase::RampUp => {
                if dice.chance(self.tuning.ramp_up_medium_chance) {
                    Category::Medium
                } else {
                    Category::Small
                }
            }
            Phase::FullChallenge => {
                let drawn = weighted_draw(&self.tuning.full_challenge, dice.unit());
                if drawn == Category::ExtraLarge && !progression.extra_large_unlocked() {
                    log::debug!(
                        "extra large locked at {} large passes, re-rolled as large",
                        progression.large_cleared()
                    );
                    Category::Large
                } else {
                    drawn
                }
            }
        };

        progression.record_chosen(category);
        category
    }
}

fn weighted_draw(weights: &CategoryWeights, unit: f64) -> Category {
    let mut remaining = unit * weights.total();
    for (category, weight) in [
        (Category::Small, weights.small),
        (Category::Medium, weights.medium),
        (Category::Large, weights.large),
    ] {
        if remaining < weight {
            return category;
        }
        remaining -= weight;
    }
    Category::ExtraLarge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_draw_partitions_unit_interval() {
        let weights = CategoryWeights::default();
        assert_eq!(weighted_draw(&weights, 0.0), Category::Small);
        assert_eq!(weighted_draw(&weights, 0.39), Category::Small);
        assert_eq!(weighted_draw(&weights, 0.41), Category::Medium);
        assert_eq!(weighted_draw(&weights, 0.66), Category::Large);
        assert_eq!(weighted_draw(&weights, 0.86), Category::ExtraLarge);
        assert_eq!(weighted_draw(&weights, 0.999), Category::ExtraLarge);
    }
}
