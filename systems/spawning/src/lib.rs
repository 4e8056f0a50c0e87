#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawn scheduler deciding what appears on the track next.
//!
//! Each tick the scheduler either stays quiet because its cooldown has not
//! elapsed, or produces exactly one [`SpawnDecision`]: a cluster of small
//! fires when every cluster rule allows it, a telegraphed bundle when the
//! size selector draws an extra large fire, or a single fire otherwise.

use std::time::Duration;

use ember_run_core::{
    BundleTuning, Category, ClusterTuning, ClusterUnlockAnchor, CooldownTuning, DirectorTuning,
    SpawnDecision, SpawnKind, BUNDLE_PARTS,
};
use ember_run_system_noise::{Dice, RandomnessSource};
use ember_run_system_progression::Progression;
use ember_run_system_size_selection::SizeSelector;
use ember_run_system_spacing::Spacing;

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Debug)]
pub struct Config {
    cooldown: CooldownTuning,
    clusters: ClusterTuning,
    bundle: BundleTuning,
}

impl Config {
    /// Creates a configuration from the individual rule groups.
    #[must_use]
    pub const fn new(
        cooldown: CooldownTuning,
        clusters: ClusterTuning,
        bundle: BundleTuning,
    ) -> Self {
        Self {
            cooldown,
            clusters,
            bundle,
        }
    }

    /// Extracts the scheduler's rule groups from a full tuning.
    #[must_use]
    pub fn from_tuning(tuning: &DirectorTuning) -> Self {
        Self::new(
            tuning.cooldown.clone(),
            tuning.clusters.clone(),
            tuning.bundle.clone(),
        )
    }
}

/// Mutable collaborators the scheduler consults while deciding a spawn.
#[derive(Debug)]
pub struct Collaborators<'a, S: ?Sized> {
    /// Category rules.
    pub selector: &'a SizeSelector,
    /// Session counters, updated by category choices.
    pub progression: &'a mut Progression,
    /// Gap sizing state.
    pub spacing: &'a mut Spacing,
    /// Randomness consumed by gap sizing.
    pub source: &'a mut S,
    /// Randomness consumed by every other roll.
    pub dice: &'a mut Dice,
}

/// Pure system that turns ticks into spawn decisions.
#[derive(Clone, Debug)]
pub struct SpawnScheduler {
    config: Config,
    last_spawn: Option<Duration>,
    cooldown: Duration,
    cluster_unlocked: bool,
    obstacles_since_cluster: u32,
    last_cluster: Option<Duration>,
    penalty_until: Option<Duration>,
    last_category: Option<Category>,
}

impl SpawnScheduler {
    /// Creates a scheduler in its session-start state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            cooldown: config.cooldown.initial,
            config,
            last_spawn: None,
            cluster_unlocked: false,
            obstacles_since_cluster: 0,
            last_cluster: None,
            penalty_until: None,
            last_category: None,
        }
    }

    /// Minimum time between the last spawn and the next one.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Reports whether clusters have been unlocked this session.
    #[must_use]
    pub const fn clusters_unlocked(&self) -> bool {
        self.cluster_unlocked
    }

    /// Play time until which clusters stay suppressed.
    #[must_use]
    pub const fn penalty_until(&self) -> Option<Duration> {
        self.penalty_until
    }

    /// Suppresses clusters for a while after the player nearly failed at `now`.
    pub fn record_near_miss(&mut self, now: Duration) {
        self.penalty_until = Some(now.saturating_add(self.config.clusters.penalty_after_near_miss));
    }

    /// Polls the scheduler once for the tick at play time `now`.
    pub fn on_tick<S>(
        &mut self,
        now: Duration,
        collaborators: Collaborators<'_, S>,
    ) -> Option<SpawnDecision>
    where
        S: RandomnessSource + ?Sized,
    {
        if let Some(last) = self.last_spawn {
            debug_assert!(now >= last, "ticks must be monotonic");
            if now.saturating_sub(last) < self.cooldown {
                return None;
            }
        }

        let Collaborators {
            selector,
            progression,
            spacing,
            source,
            dice,
        } = collaborators;

        self.update_cluster_latch(progression);

        let decision = if self.cluster_eligible(now, dice) {
            let rules = &self.config.clusters;
            let (members, member_spacing) = (
                dice.count(rules.min_members, rules.max_members),
                rules.member_spacing,
            );
            let gap = spacing.calculate_gap(Category::Small, source, dice);
            self.obstacles_since_cluster = 0;
            self.last_cluster = Some(now);
            self.cooldown = self.regular_cooldown(progression.speed());
            SpawnDecision::new(
                SpawnKind::Cluster {
                    members,
                    member_spacing,
                },
                gap,
            )
        } else {
            let category = selector.choose_category(progression, dice);
            let gap = spacing.calculate_gap(category, source, dice);
            if category == Category::ExtraLarge {
                let regular = self.regular_cooldown(progression.speed());
                self.cooldown = self.config.bundle.cooldown.max(regular);
                SpawnDecision::new(
                    SpawnKind::Bundle {
                        parts: BUNDLE_PARTS,
                        warning: self.config.bundle.warning,
                    },
                    gap,
                )
            } else {
                spacing.record_single_gap(gap);
                self.obstacles_since_cluster = self.obstacles_since_cluster.saturating_add(1);
                self.last_category = Some(category);
                self.cooldown = self.regular_cooldown(progression.speed());
                SpawnDecision::new(SpawnKind::Single { category }, gap)
            }
        };

        self.last_spawn = Some(now);
        log::debug!(
            "spawned {:?} at {now:?}, gap {:.2}, next cooldown {:?}",
            decision.kind(),
            decision.gap().width_units(),
            self.cooldown
        );
        Some(decision)
    }

    /// Cooldown implied by `speed`, never below the configured floor.
    #[must_use]
    pub fn regular_cooldown(&self, speed: f64) -> Duration {
        let floor = self.config.cooldown.floor;
        if speed <= 0.0 || !speed.is_finite() {
            return floor;
        }

        let rules = &self.config.cooldown;
        let seconds = rules.base.as_secs_f64() / (speed / rules.reference_speed);
        match Duration::try_from_secs_f64(seconds) {
            Ok(cooldown) => cooldown.max(floor),
            Err(_) => floor,
        }
    }

    fn update_cluster_latch(&mut self, progression: &Progression) {
        if self.cluster_unlocked {
            return;
        }

        let measured = match self.config.clusters.unlock_anchor {
            ClusterUnlockAnchor::LastSpeedIncrease => progression.since_speed_increase(),
            ClusterUnlockAnchor::SessionStart => progression.elapsed(),
        };
        if measured >= self.config.clusters.unlock_after {
            self.cluster_unlocked = true;
            log::info!("clusters unlocked at {:?}", progression.elapsed());
        }
    }

    fn cluster_eligible(&self, now: Duration, dice: &mut Dice) -> bool {
        let rules = &self.config.clusters;
        self.cluster_unlocked
            && self.obstacles_since_cluster >= rules.min_obstacles_between
            && dice.chance(rules.chance)
            && self
                .last_cluster
                .map_or(true, |last| now.saturating_sub(last) > rules.min_interval)
            && self.last_category != Some(Category::Large)
            && self.penalty_until.map_or(true, |until| now > until)
    }
}
