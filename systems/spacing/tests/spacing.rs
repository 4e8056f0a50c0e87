use ember_run_core::{Category, SpacingTuning, GOLDEN_RATIO_CONJUGATE};
use ember_run_system_noise::{Dice, NoiseCursor, RandomnessSource, UniformSource};
use ember_run_system_spacing::Spacing;
use proptest::prelude::*;

/// Source that always lands on the same point of the requested range.
struct FixedSource {
    unit: f64,
}

impl RandomnessSource for FixedSource {
    fn sample_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.unit * (max - min)
    }
}

fn widened(steps: usize) -> Spacing {
    let mut spacing = Spacing::new(SpacingTuning::default());
    for _ in 0..steps {
        let _ = spacing.widen();
    }
    spacing
}

#[test]
fn gaps_fall_inside_category_ranges() {
    let mut spacing = Spacing::new(SpacingTuning::default());
    let mut source = UniformSource::new(1);
    let mut dice = Dice::new(2);

    for (category, min, max) in [
        (Category::Small, 2.0, 3.0),
        (Category::Medium, 3.0, 4.0),
        (Category::Large, 4.0, 5.0),
        (Category::ExtraLarge, 3.0, 4.0),
    ] {
        for _ in 0..50 {
            let gap = spacing.calculate_gap(category, &mut source, &mut dice);
            assert!(
                gap.width_units() >= min && gap.width_units() <= max,
                "{category:?} gap {} outside [{min}, {max}]",
                gap.width_units()
            );
            assert!((gap.presentation_units() - gap.width_units() * 6.0).abs() < 1e-9);
        }
    }
}

#[test]
fn seeded_smooth_noise_reproduces_small_gaps() {
    let draw = || {
        let mut spacing = Spacing::new(SpacingTuning::default());
        let mut source = NoiseCursor::new(42, GOLDEN_RATIO_CONJUGATE);
        let mut dice = Dice::new(42);
        (0..10)
            .map(|_| {
                let gap = spacing.calculate_gap(Category::Small, &mut source, &mut dice);
                spacing.record_single_gap(gap);
                gap
            })
            .collect::<Vec<_>>()
    };

    let first = draw();
    assert_eq!(first, draw());
    assert!(first.windows(2).any(|pair| pair[0] != pair[1]));
}

#[test]
fn widened_ranges_never_exceed_hard_cap() {
    let mut spacing = widened(10);
    let mut source = FixedSource { unit: 1.0 };
    let mut dice = Dice::new(0);

    let gap = spacing.calculate_gap(Category::Large, &mut source, &mut dice);

    assert!((gap.width_units() - 6.0).abs() < 1e-9);
}

#[test]
fn missed_jump_relief_shrinks_gap_once() {
    let mut relieved = Spacing::new(SpacingTuning::default());
    let mut plain = Spacing::new(SpacingTuning::default());
    relieved.record_missed_jump();
    relieved.record_missed_jump();

    let mut relieved_source = NoiseCursor::new(42, GOLDEN_RATIO_CONJUGATE);
    let mut plain_source = NoiseCursor::new(42, GOLDEN_RATIO_CONJUGATE);
    let mut dice = Dice::new(0);

    let eased = relieved.calculate_gap(Category::Medium, &mut relieved_source, &mut dice);
    let baseline = plain.calculate_gap(Category::Medium, &mut plain_source, &mut dice);

    assert!(eased.width_units() <= baseline.width_units());
    assert!((eased.width_units() - baseline.width_units() * 0.9).abs() < 1e-9);
    assert!(!relieved.missed_last_jump());

    let next_eased = relieved.calculate_gap(Category::Medium, &mut relieved_source, &mut dice);
    let next_baseline = plain.calculate_gap(Category::Medium, &mut plain_source, &mut dice);
    assert_eq!(next_eased, next_baseline);
}

#[test]
fn repeated_rhythm_triggers_variation_and_resets_counter() {
    let mut spacing = Spacing::new(SpacingTuning::default());
    let mut source = FixedSource { unit: 0.5 };
    let mut dice = Dice::new(9);

    for _ in 0..3 {
        let gap = spacing.calculate_gap(Category::Medium, &mut source, &mut dice);
        assert!((gap.width_units() - 3.5).abs() < 1e-9);
        spacing.record_single_gap(gap);
    }
    assert_eq!(spacing.consecutive_identical_gaps(), 2);

    let varied = spacing.calculate_gap(Category::Medium, &mut source, &mut dice);
    let factor = varied.width_units() / 3.5;

    assert!((0.85..=1.15).contains(&factor), "factor {factor}");
    assert_eq!(spacing.consecutive_identical_gaps(), 0);
}

#[test]
fn variation_applies_before_relief() {
    let mut spacing = Spacing::new(SpacingTuning::default());
    let mut source = FixedSource { unit: 0.0 };
    let mut dice = Dice::new(4);
    for _ in 0..3 {
        let gap = spacing.calculate_gap(Category::Large, &mut source, &mut dice);
        spacing.record_single_gap(gap);
    }
    spacing.record_missed_jump();

    let gap = spacing.calculate_gap(Category::Large, &mut source, &mut dice);
    let ratio = gap.width_units() / 4.0;

    assert!((0.85 * 0.9 - 1e-9..=1.15 * 0.9 + 1e-9).contains(&ratio), "ratio {ratio}");
    assert_eq!(spacing.consecutive_identical_gaps(), 0);
    assert!(!spacing.missed_last_jump());
}

proptest! {
    #[test]
    fn gap_never_drops_below_jumpable_floor(
        seed in any::<u64>(),
        widen_steps in 0usize..=10,
        category_index in 0usize..4,
        missed in any::<bool>(),
    ) {
        let mut spacing = widened(widen_steps);
        prop_assert!(spacing.multiplier() >= 1.0 && spacing.multiplier() <= 2.0 + 1e-9);
        let mut source = UniformSource::new(seed);
        let mut dice = Dice::new(seed.rotate_left(17));
        let category = Category::ALL[category_index];

        for _ in 0..16 {
            if missed {
                spacing.record_missed_jump();
            }
            let gap = spacing.calculate_gap(category, &mut source, &mut dice);
            spacing.record_single_gap(gap);
            prop_assert!(gap.width_units() >= 1.5);
            prop_assert!(gap.presentation_units() >= 1.5 * 6.0);
            prop_assert!(spacing.consecutive_identical_gaps() <= 2);
        }
    }
}
