//! Tuning surface controlling every adjustable aspect of the director.
//!
//! Every struct deserialises with `#[serde(default)]`, so a TOML document only
//! needs to name the knobs it overrides. Durations are written in whole
//! milliseconds under keys suffixed with `_ms`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Golden-ratio conjugate used to advance the noise cursor without short cycles.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_9;

/// Aggregated tuning knobs for one director.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorTuning {
    /// Speed escalation, phase thresholds and scoring.
    pub progression: ProgressionTuning,
    /// Category selection rules applied after the initial phase.
    pub selection: SelectionTuning,
    /// Gap ranges, corrections and spacing escalation.
    pub spacing: SpacingTuning,
    /// Minimum time between spawn decisions.
    pub cooldown: CooldownTuning,
    /// Cluster unlock and eligibility rules.
    pub clusters: ClusterTuning,
    /// Bundle spawn parameters.
    pub bundle: BundleTuning,
    /// Source of spacing randomness.
    pub randomness: RandomnessTuning,
}

impl DirectorTuning {
    /// Parses and validates a TOML tuning document.
    pub fn from_toml_str(contents: &str) -> Result<Self, TuningError> {
        let tuning: Self = toml::from_str(contents)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Rejects values that would break the director's invariants.
    ///
    /// The runtime formulas are floored regardless, so a tuning that skips
    /// validation degrades to minimum cooldowns and gaps instead of failing.
    pub fn validate(&self) -> Result<(), TuningError> {
        let progression = &self.progression;
        positive("progression.initial_speed", progression.initial_speed)?;
        within(
            "progression.speed_multiplier",
            progression.speed_multiplier,
            1.0,
            f64::MAX,
        )?;
        positive_duration(
            "progression.speed_increase_interval_ms",
            progression.speed_increase_interval,
        )?;

        let selection = &self.selection;
        within(
            "selection.ramp_up_medium_chance",
            selection.ramp_up_medium_chance,
            0.0,
            1.0,
        )?;
        selection.full_challenge.validate("selection.full_challenge")?;

        let spacing = &self.spacing;
        spacing.small.validate("spacing.small")?;
        spacing.medium.validate("spacing.medium")?;
        spacing.large.validate("spacing.large")?;
        spacing.fallback.validate("spacing.fallback")?;
        positive("spacing.min_gap", spacing.min_gap)?;
        positive("spacing.max_gap", spacing.max_gap)?;
        positive(
            "spacing.presentation_units_per_width_unit",
            spacing.presentation_units_per_width_unit,
        )?;
        spacing.variation.validate("spacing.variation")?;
        within(
            "spacing.missed_jump_relief",
            spacing.missed_jump_relief,
            0.0,
            1.0,
        )?;
        within(
            "spacing.max_multiplier",
            spacing.max_multiplier,
            1.0,
            f64::MAX,
        )?;

        let cooldown = &self.cooldown;
        positive_duration("cooldown.floor_ms", cooldown.floor)?;
        positive("cooldown.reference_speed", cooldown.reference_speed)?;

        let clusters = &self.clusters;
        within("clusters.chance", clusters.chance, 0.0, 1.0)?;
        if clusters.min_members > clusters.max_members {
            return Err(TuningError::InvertedRange {
                field: "clusters.members",
                min: f64::from(clusters.min_members),
                max: f64::from(clusters.max_members),
            });
        }
        positive("clusters.min_members", f64::from(clusters.min_members))?;

        positive("randomness.noise_step", self.randomness.noise_step)?;
        Ok(())
    }
}

/// Speed escalation, phase thresholds and scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    /// Scroll speed at session start.
    pub initial_speed: f64,
    /// Factor applied to the speed at every escalation step.
    pub speed_multiplier: f64,
    /// Play time between two speed escalations.
    #[serde(rename = "speed_increase_interval_ms", with = "millis")]
    pub speed_increase_interval: Duration,
    /// Number of small fires making up the initial phase.
    pub initial_phase_smalls: u32,
    /// Medium clears required to leave the ramp-up phase.
    pub ramp_up_mediums: u32,
    /// Large clears required before extra large bundles may appear.
    pub extra_large_unlock_larges: u32,
    /// Points credited per cleared obstacle.
    pub points_per_obstacle: u64,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            initial_speed: 5.75,
            speed_multiplier: 1.05,
            speed_increase_interval: Duration::from_secs(30),
            initial_phase_smalls: 10,
            ramp_up_mediums: 5,
            extra_large_unlock_larges: 5,
            points_per_obstacle: 10,
        }
    }
}

/// Category selection rules applied after the initial phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionTuning {
    /// Small fires that must separate two non-small ones.
    pub min_smalls_between: u32,
    /// Probability of a medium fire during ramp-up once the separation gate opens.
    pub ramp_up_medium_chance: f64,
    /// Weighted draw used during the full challenge phase.
    pub full_challenge: CategoryWeights,
}

impl Default for SelectionTuning {
    fn default() -> Self {
        Self {
            min_smalls_between: 2,
            ramp_up_medium_chance: 0.25,
            full_challenge: CategoryWeights::default(),
        }
    }
}

/// Relative weights of every category in a weighted draw.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    /// Weight of small fires.
    pub small: f64,
    /// Weight of medium fires.
    pub medium: f64,
    /// Weight of large fires.
    pub large: f64,
    /// Weight of extra large bundles.
    pub extra_large: f64,
}

impl CategoryWeights {
    /// Sum of every weight.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.small + self.medium + self.large + self.extra_large
    }

    fn validate(&self, field: &'static str) -> Result<(), TuningError> {
        for weight in [self.small, self.medium, self.large, self.extra_large] {
            within(field, weight, 0.0, f64::MAX)?;
        }
        positive(field, self.total())
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            small: 0.40,
            medium: 0.25,
            large: 0.20,
            extra_large: 0.15,
        }
    }
}

/// Inclusive range of base gaps measured in width-units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapRange {
    /// Shortest base gap.
    pub min: f64,
    /// Longest base gap.
    pub max: f64,
}

impl GapRange {
    /// Creates a new gap range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn validate(&self, field: &'static str) -> Result<(), TuningError> {
        positive(field, self.min)?;
        ordered(field, self.min, self.max)
    }
}

/// Inclusive range of multiplicative factors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorRange {
    /// Smallest factor.
    pub min: f64,
    /// Largest factor.
    pub max: f64,
}

impl FactorRange {
    fn validate(&self, field: &'static str) -> Result<(), TuningError> {
        positive(field, self.min)?;
        ordered(field, self.min, self.max)
    }
}

/// Gap ranges, corrections and spacing escalation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingTuning {
    /// Cap applied to the scaled upper bound.
    pub max_gap: f64,
    /// Absolute floor of every gap; the shortest physically jumpable distance.
    pub min_gap: f64,
    /// Conversion from width-units to presentation units.
    pub presentation_units_per_width_unit: f64,
    /// Two gaps closer than this are considered identical.
    pub identical_gap_tolerance: f64,
    /// Identical gaps tolerated in a row before a variation is forced.
    pub identical_gap_limit: u32,
    /// Factor applied once after a reported near miss.
    pub missed_jump_relief: f64,
    /// Play time between two spacing multiplier increases.
    #[serde(rename = "widen_interval_ms", with = "millis")]
    pub widen_interval: Duration,
    /// Amount added to the spacing multiplier at each increase.
    pub widen_step: f64,
    /// Largest spacing multiplier.
    pub max_multiplier: f64,
    /// Base range before small fires.
    pub small: GapRange,
    /// Base range before medium fires.
    pub medium: GapRange,
    /// Base range before large fires.
    pub large: GapRange,
    /// Base range for every other category.
    pub fallback: GapRange,
    /// Factor range of the forced variation.
    pub variation: FactorRange,
}

impl Default for SpacingTuning {
    fn default() -> Self {
        Self {
            small: GapRange::new(2.0, 3.0),
            medium: GapRange::new(3.0, 4.0),
            large: GapRange::new(4.0, 5.0),
            fallback: GapRange::new(3.0, 4.0),
            max_gap: 6.0,
            min_gap: 1.5,
            presentation_units_per_width_unit: 6.0,
            identical_gap_tolerance: 0.5,
            identical_gap_limit: 2,
            variation: FactorRange {
                min: 0.85,
                max: 1.15,
            },
            missed_jump_relief: 0.9,
            widen_interval: Duration::from_secs(60),
            widen_step: 0.1,
            max_multiplier: 2.0,
        }
    }
}

/// Minimum time between spawn decisions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownTuning {
    /// Cooldown in force until the first spawn.
    #[serde(rename = "initial_ms", with = "millis")]
    pub initial: Duration,
    /// Cooldown at the reference speed.
    #[serde(rename = "base_ms", with = "millis")]
    pub base: Duration,
    /// Shortest cooldown regardless of speed.
    #[serde(rename = "floor_ms", with = "millis")]
    pub floor: Duration,
    /// Speed at which the cooldown equals `base`.
    pub reference_speed: f64,
}

impl Default for CooldownTuning {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(2_000),
            base: Duration::from_millis(2_000),
            floor: Duration::from_millis(500),
            reference_speed: 5.0,
        }
    }
}

/// Moment the cluster unlock timer is measured from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterUnlockAnchor {
    /// Time since the most recent speed escalation (or session start before the first one).
    #[default]
    LastSpeedIncrease,
    /// Time since session start.
    SessionStart,
}

/// Cluster unlock and eligibility rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTuning {
    /// Time after the anchor at which clusters unlock.
    #[serde(rename = "unlock_after_ms", with = "millis")]
    pub unlock_after: Duration,
    /// Moment the unlock timer is measured from.
    pub unlock_anchor: ClusterUnlockAnchor,
    /// Single obstacles required between two clusters.
    pub min_obstacles_between: u32,
    /// Probability of a cluster once every other condition holds.
    pub chance: f64,
    /// Minimum time separating two clusters.
    #[serde(rename = "min_interval_ms", with = "millis")]
    pub min_interval: Duration,
    /// Cluster suppression window opened by a near miss.
    #[serde(rename = "penalty_after_near_miss_ms", with = "millis")]
    pub penalty_after_near_miss: Duration,
    /// Fewest fires in a cluster.
    pub min_members: u8,
    /// Most fires in a cluster.
    pub max_members: u8,
    /// Distance between cluster members in presentation units.
    pub member_spacing: f64,
}

impl Default for ClusterTuning {
    fn default() -> Self {
        Self {
            unlock_after: Duration::from_secs(45),
            unlock_anchor: ClusterUnlockAnchor::LastSpeedIncrease,
            min_obstacles_between: 5,
            chance: 0.3,
            min_interval: Duration::from_millis(5_000),
            penalty_after_near_miss: Duration::from_millis(10_000),
            min_members: 2,
            max_members: 3,
            member_spacing: 15.0,
        }
    }
}

/// Bundle spawn parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleTuning {
    /// Cooldown following a bundle.
    #[serde(rename = "cooldown_ms", with = "millis")]
    pub cooldown: Duration,
    /// Whether bundles ask the Presentation Layer for a telegraph effect.
    pub warning: bool,
}

impl Default for BundleTuning {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(3_000),
            warning: true,
        }
    }
}

/// Implementation backing the spacing randomness capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomnessStrategy {
    /// Continuous value noise; consecutive gaps drift smoothly.
    #[default]
    SmoothNoise,
    /// Independent uniform draws; no continuity between gaps.
    Uniform,
}

/// Source of spacing randomness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomnessTuning {
    /// Implementation selected at session start.
    pub strategy: RandomnessStrategy,
    /// Cursor increment between two noise samples.
    pub noise_step: f64,
}

impl Default for RandomnessTuning {
    fn default() -> Self {
        Self {
            strategy: RandomnessStrategy::SmoothNoise,
            noise_step: GOLDEN_RATIO_CONJUGATE,
        }
    }
}

/// Errors reported while loading or validating a tuning document.
#[derive(Debug, Error)]
pub enum TuningError {
    /// The document is not valid TOML or does not match the tuning layout.
    #[error("could not parse tuning document: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value that must be strictly positive is not.
    #[error("`{field}` must be positive, got {value}")]
    NonPositive {
        /// Dotted path of the offending knob.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A value lies outside its permitted range.
    #[error("`{field}` must lie within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Dotted path of the offending knob.
        field: &'static str,
        /// Rejected value.
        value: f64,
        /// Smallest permitted value.
        min: f64,
        /// Largest permitted value.
        max: f64,
    },
    /// A range has its bounds swapped.
    #[error("`{field}` has min {min} greater than max {max}")]
    InvertedRange {
        /// Dotted path of the offending range.
        field: &'static str,
        /// Lower bound as configured.
        min: f64,
        /// Upper bound as configured.
        max: f64,
    },
}

fn positive(field: &'static str, value: f64) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TuningError::NonPositive { field, value })
    }
}

fn positive_duration(field: &'static str, value: Duration) -> Result<(), TuningError> {
    if value.is_zero() {
        Err(TuningError::NonPositive {
            field,
            value: 0.0,
        })
    } else {
        Ok(())
    }
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), TuningError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn ordered(field: &'static str, min: f64, max: f64) -> Result<(), TuningError> {
    if min <= max {
        Ok(())
    } else {
        Err(TuningError::InvertedRange { field, min, max })
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        DirectorTuning::default()
            .validate()
            .expect("default tuning must be valid");
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let tuning = DirectorTuning::from_toml_str(
            r#"
            [progression]
            speed_increase_interval_ms = 60000

            [clusters]
            unlock_anchor = "session_start"
            chance = 0.5

            [randomness]
            strategy = "uniform"
            "#,
        )
        .expect("tuning parses");

        assert_eq!(
            tuning.progression.speed_increase_interval,
            Duration::from_secs(60)
        );
        assert!((tuning.progression.initial_speed - 5.75).abs() < f64::EPSILON);
        assert_eq!(tuning.clusters.unlock_anchor, ClusterUnlockAnchor::SessionStart);
        assert!((tuning.clusters.chance - 0.5).abs() < f64::EPSILON);
        assert_eq!(tuning.clusters.min_interval, Duration::from_millis(5_000));
        assert_eq!(tuning.randomness.strategy, RandomnessStrategy::Uniform);
    }

    #[test]
    fn rejects_shrinking_speed_multiplier() {
        let error = DirectorTuning::from_toml_str(
            r#"
            [progression]
            speed_multiplier = 0.5
            "#,
        )
        .expect_err("multiplier below one must be rejected");

        assert!(matches!(
            error,
            TuningError::OutOfRange {
                field: "progression.speed_multiplier",
                ..
            }
        ));
    }

    #[test]
    fn rejects_inverted_gap_range() {
        let mut tuning = DirectorTuning::default();
        tuning.spacing.medium = GapRange::new(5.0, 3.0);

        assert!(matches!(
            tuning.validate(),
            Err(TuningError::InvertedRange {
                field: "spacing.medium",
                ..
            })
        ));
    }

    #[test]
    fn rejects_malformed_documents() {
        let error = DirectorTuning::from_toml_str("progression = 3")
            .expect_err("scalar progression must not parse");
        assert!(matches!(error, TuningError::Parse(_)));
    }

    #[test]
    fn serialised_tuning_parses_back() {
        let tuning = DirectorTuning::default();
        let document = toml::to_string(&tuning).expect("tuning serialises");
        let restored = DirectorTuning::from_toml_str(&document).expect("tuning parses");
        assert_eq!(restored, tuning);
    }
}
