#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Ember Run difficulty director.
//!
//! The Presentation Layer drives the director exclusively through [`Command`]
//! values. The director applies each command to the session it owns and
//! answers with [`Event`] values, the most important of which carries a
//! [`SpawnDecision`] describing what to put on the track next. Nothing in this
//! crate refers to rendered entities: every type is plain, copyable data that
//! can be consumed once and dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod tuning;

pub use tuning::{
    BundleTuning, CategoryWeights, ClusterTuning, ClusterUnlockAnchor, CooldownTuning,
    DirectorTuning, FactorRange, GapRange, ProgressionTuning, RandomnessStrategy,
    RandomnessTuning, SelectionTuning, SpacingTuning, TuningError, GOLDEN_RATIO_CONJUGATE,
};

/// Sub-fires composing a bundle, in the order they appear on the track.
pub const BUNDLE_PARTS: [Category; 3] = [Category::Small, Category::Large, Category::Medium];

/// Closed size classification of fire obstacles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Low fire that can be cleared with a single jump.
    Small,
    /// Medium fire that needs a well-timed jump.
    Medium,
    /// Giant fire surrounded by sparks.
    Large,
    /// Rare bundle of three fires sharing one collision envelope.
    ExtraLarge,
}

impl Category {
    /// Every category in ascending size order.
    pub const ALL: [Category; 4] = [
        Category::Small,
        Category::Medium,
        Category::Large,
        Category::ExtraLarge,
    ];

    /// Reports whether the category is [`Category::Small`].
    #[must_use]
    pub const fn is_small(self) -> bool {
        matches!(self, Self::Small)
    }

    /// Nominal on-screen footprint used by the Presentation Layer.
    ///
    /// The extra large footprint spans the three bundle parts placed side by
    /// side and takes the height of the tallest one.
    #[must_use]
    pub const fn footprint(self) -> Footprint {
        match self {
            Self::Small => Footprint::new(30, 60, 48, Intensity::Glow),
            Self::Medium => Footprint::new(40, 80, 64, Intensity::Glow),
            Self::Large => Footprint::new(60, 120, 96, Intensity::Giant),
            Self::ExtraLarge => Footprint::new(130, 120, 96, Intensity::Inferno),
        }
    }
}

/// Visual treatment applied to a fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    /// Regular fire with a pulsing glow.
    Glow,
    /// Giant fire emitting sparks.
    Giant,
    /// Bundle announced by a telegraph effect.
    Inferno,
}

/// Nominal presentation size of a fire, measured in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    width_px: u32,
    height_px: u32,
    glyph_px: u32,
    intensity: Intensity,
}

impl Footprint {
    const fn new(width_px: u32, height_px: u32, glyph_px: u32, intensity: Intensity) -> Self {
        Self {
            width_px,
            height_px,
            glyph_px,
            intensity,
        }
    }

    /// Width of the collision envelope.
    #[must_use]
    pub const fn width_px(&self) -> u32 {
        self.width_px
    }

    /// Height of the collision envelope.
    #[must_use]
    pub const fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Font size of the fire glyph.
    #[must_use]
    pub const fn glyph_px(&self) -> u32 {
        self.glyph_px
    }

    /// Visual treatment of the fire.
    #[must_use]
    pub const fn intensity(&self) -> Intensity {
        self.intensity
    }
}

/// Session-lifetime difficulty stage.
///
/// Phases are ordered so that `Initial < RampUp < FullChallenge`; a session
/// only ever moves forward through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Warm-up stretch made exclusively of small fires.
    Initial,
    /// Medium fires are mixed in between runs of small ones.
    RampUp,
    /// Every category may appear.
    FullChallenge,
}

/// Horizontal distance reserved before the next obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    width_units: f64,
    presentation_units: f64,
}

impl Gap {
    /// Creates a gap from a width-unit distance and the presentation scale.
    #[must_use]
    pub fn from_width_units(width_units: f64, presentation_per_width_unit: f64) -> Self {
        Self {
            width_units,
            presentation_units: width_units * presentation_per_width_unit,
        }
    }

    /// Distance expressed in nominal obstacle widths.
    #[must_use]
    pub const fn width_units(&self) -> f64 {
        self.width_units
    }

    /// Distance expressed in the Presentation Layer's spatial unit.
    #[must_use]
    pub const fn presentation_units(&self) -> f64 {
        self.presentation_units
    }
}

/// Shape of a single spawn event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpawnKind {
    /// One fire of the given category.
    Single {
        /// Size of the fire.
        category: Category,
    },
    /// A short run of small fires scheduled as one decision.
    Cluster {
        /// Number of fires in the run.
        members: u8,
        /// Distance between consecutive members in presentation units.
        member_spacing: f64,
    },
    /// Three fixed fires sharing one collision envelope.
    Bundle {
        /// Sub-fires in track order.
        parts: [Category; 3],
        /// Whether the Presentation Layer should telegraph the bundle.
        warning: bool,
    },
}

/// Immutable description of one spawn event, consumed once by the Presentation Layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDecision {
    kind: SpawnKind,
    gap: Gap,
}

impl SpawnDecision {
    /// Creates a new spawn decision.
    #[must_use]
    pub const fn new(kind: SpawnKind, gap: Gap) -> Self {
        Self { kind, gap }
    }

    /// Shape of the spawn.
    #[must_use]
    pub const fn kind(&self) -> SpawnKind {
        self.kind
    }

    /// Gap reserved before the spawned obstacle.
    #[must_use]
    pub const fn gap(&self) -> Gap {
        self.gap
    }

    /// Category driving the visual scale of the spawn.
    ///
    /// Cluster members are always small fires and bundles report
    /// [`Category::ExtraLarge`].
    #[must_use]
    pub const fn category(&self) -> Category {
        match self.kind {
            SpawnKind::Single { category } => category,
            SpawnKind::Cluster { .. } => Category::Small,
            SpawnKind::Bundle { .. } => Category::ExtraLarge,
        }
    }

    /// Number of fires produced by a cluster or bundle, `None` for singles.
    #[must_use]
    pub const fn member_count(&self) -> Option<u8> {
        match self.kind {
            SpawnKind::Single { .. } => None,
            SpawnKind::Cluster { members, .. } => Some(members),
            SpawnKind::Bundle { parts, .. } => Some(parts.len() as u8),
        }
    }

    /// Reports whether the Presentation Layer should show a telegraph effect.
    #[must_use]
    pub const fn is_telegraphed(&self) -> bool {
        matches!(self.kind, SpawnKind::Bundle { warning: true, .. })
    }
}

/// Commands that express every input the Presentation Layer may send.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Discards any running session and starts a fresh one.
    StartSession {
        /// Presentation clock reading at session start.
        now: Duration,
        /// Seed for every random stream; derived from `now` when absent.
        seed: Option<u64>,
    },
    /// Stops the running session and freezes its clock.
    EndSession {
        /// Presentation clock reading at game over.
        now: Duration,
    },
    /// Advances the running session to the provided clock reading.
    Tick {
        /// Presentation clock reading for this frame. Must never decrease.
        now: Duration,
    },
    /// Reports that the player cleared a previously spawned obstacle.
    ReportObstaclePassed {
        /// Category of the cleared obstacle.
        category: Category,
    },
    /// Reports that the player only narrowly avoided an obstacle.
    ReportNearMiss,
}

/// Events broadcast by the director after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new session started with the provided seed.
    SessionStarted {
        /// Seed feeding every random stream of the session.
        seed: u64,
    },
    /// The scheduler decided to spawn something.
    SpawnDecided {
        /// What to spawn and how far ahead.
        decision: SpawnDecision,
    },
    /// The scroll speed escalated.
    SpeedIncreased {
        /// Scroll speed after the increase.
        speed: f64,
    },
    /// The spacing multiplier grew.
    SpacingWidened {
        /// Spacing multiplier after the increase.
        multiplier: f64,
    },
    /// The difficulty phase advanced.
    PhaseChanged {
        /// Phase before the transition.
        from: Phase,
        /// Phase after the transition.
        to: Phase,
    },
    /// Cluster spawns became available for the rest of the session.
    ClustersUnlocked,
    /// A reported pass was credited.
    ObstacleCleared {
        /// Category of the cleared obstacle.
        category: Category,
        /// Score after crediting the pass.
        score: u64,
    },
    /// A near miss was recorded and will ease the next gap.
    NearMissRecorded,
    /// The session ended.
    SessionEnded {
        /// Total play time of the session.
        elapsed: Duration,
        /// Final score.
        score: u64,
    },
}

/// Read-only session summary intended for HUD display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    /// Current difficulty phase.
    pub phase: Phase,
    /// Current scroll speed.
    pub speed: f64,
    /// Play time elapsed since session start.
    pub elapsed: Duration,
    /// Points earned from cleared obstacles.
    pub score: u64,
    /// Number of obstacles reported as cleared.
    pub obstacles_passed: u32,
    /// Number of small fires chosen so far.
    pub small_count: u32,
    /// Number of medium fires cleared.
    pub medium_cleared: u32,
    /// Number of large fires cleared.
    pub large_cleared: u32,
    /// Multiplier applied to every spacing range.
    pub spacing_multiplier: f64,
    /// Whether clusters may be scheduled.
    pub clusters_unlocked: bool,
    /// Whether the session is still running.
    pub playing: bool,
}

#[cfg(test)]
mod tests {
    use super::{
        Category, Command, Gap, Intensity, Phase, SpawnDecision, SpawnKind, BUNDLE_PARTS,
    };
    use serde::{de::DeserializeOwned, Serialize};
    use std::time::Duration;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn gap_converts_to_presentation_units() {
        let gap = Gap::from_width_units(2.5, 6.0);
        assert!((gap.width_units() - 2.5).abs() < f64::EPSILON);
        assert!((gap.presentation_units() - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Initial < Phase::RampUp);
        assert!(Phase::RampUp < Phase::FullChallenge);
    }

    #[test]
    fn large_fires_are_giant() {
        assert_eq!(Category::Large.footprint().intensity(), Intensity::Giant);
        assert_eq!(Category::Small.footprint().width_px(), 30);
        assert_eq!(Category::Medium.footprint().height_px(), 80);
        let glyphs: Vec<u32> = Category::ALL
            .iter()
            .map(|category| category.footprint().glyph_px())
            .collect();
        assert_eq!(glyphs, vec![48, 64, 96, 96]);
    }

    #[test]
    fn extra_large_footprint_spans_bundle_parts() {
        let width: u32 = BUNDLE_PARTS
            .iter()
            .map(|part| part.footprint().width_px())
            .sum();
        assert_eq!(Category::ExtraLarge.footprint().width_px(), width);
    }

    #[test]
    fn bundle_decision_reports_members_and_warning() {
        let decision = SpawnDecision::new(
            SpawnKind::Bundle {
                parts: BUNDLE_PARTS,
                warning: true,
            },
            Gap::from_width_units(3.0, 6.0),
        );
        assert_eq!(decision.category(), Category::ExtraLarge);
        assert_eq!(decision.member_count(), Some(3));
        assert!(decision.is_telegraphed());
    }

    #[test]
    fn single_decision_has_no_members() {
        let decision = SpawnDecision::new(
            SpawnKind::Single {
                category: Category::Medium,
            },
            Gap::from_width_units(3.5, 6.0),
        );
        assert_eq!(decision.category(), Category::Medium);
        assert_eq!(decision.member_count(), None);
        assert!(!decision.is_telegraphed());
    }

    #[test]
    fn spawn_decision_round_trips_through_bincode() {
        let decision = SpawnDecision::new(
            SpawnKind::Cluster {
                members: 3,
                member_spacing: 15.0,
            },
            Gap::from_width_units(2.25, 6.0),
        );
        assert_round_trip(&decision);
    }

    #[test]
    fn command_round_trips_through_bincode() {
        assert_round_trip(&Command::StartSession {
            now: Duration::from_millis(1_500),
            seed: Some(42),
        });
        assert_round_trip(&Command::ReportObstaclePassed {
            category: Category::Large,
        });
    }
}
