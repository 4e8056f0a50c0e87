#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for the Ember Run difficulty director.
//!
//! A [`Director`] owns at most one running [`SessionState`]. Every input from
//! the Presentation Layer arrives as a [`Command`] through [`apply`], which
//! mutates the session deterministically and reports what happened as
//! [`Event`] values. The [`query`] module exposes read-only views for HUD
//! display.

use std::time::Duration;

use ember_run_core::{Category, Command, DirectorTuning, Event, Phase, SpawnDecision};
use ember_run_system_noise::{
    derive_labeled_seed, derive_session_seed, Dice, SpacingSource, RNG_STREAM_ROLLS,
    RNG_STREAM_SPACING,
};
use ember_run_system_progression::Progression;
use ember_run_system_size_selection::SizeSelector;
use ember_run_system_spacing::Spacing;
use ember_run_system_spawning::{Collaborators, Config, SpawnScheduler};

/// Everything that belongs to one play session.
///
/// Created by [`Command::StartSession`] and discarded wholesale by the next
/// one. Nothing outside the owning [`Director`] can reach it mutably.
#[derive(Debug)]
pub struct SessionState {
    seed: u64,
    started_at: Duration,
    last_tick: Duration,
    playing: bool,
    phase: Phase,
    progression: Progression,
    selector: SizeSelector,
    spacing: Spacing,
    scheduler: SpawnScheduler,
    source: SpacingSource,
    dice: Dice,
}

impl SessionState {
    fn new(tuning: &DirectorTuning, seed: u64, started_at: Duration) -> Self {
        let progression =
            Progression::new(tuning.progression.clone(), tuning.spacing.widen_interval);
        Self {
            seed,
            started_at,
            last_tick: started_at,
            playing: true,
            phase: progression.phase(),
            progression,
            selector: SizeSelector::new(tuning.selection.clone()),
            spacing: Spacing::new(tuning.spacing.clone()),
            scheduler: SpawnScheduler::new(Config::from_tuning(tuning)),
            source: SpacingSource::from_tuning(
                &tuning.randomness,
                derive_labeled_seed(seed, RNG_STREAM_SPACING),
            ),
            dice: Dice::new(derive_labeled_seed(seed, RNG_STREAM_ROLLS)),
        }
    }

    fn advance_to(&mut self, now: Duration, out_events: &mut Vec<Event>) {
        debug_assert!(now >= self.last_tick, "ticks must be monotonic");
        self.last_tick = self.last_tick.max(now);

        let elapsed = self.last_tick.saturating_sub(self.started_at);
        let advance = self.progression.advance_clock(elapsed);
        if advance.speed_increases > 0 {
            out_events.push(Event::SpeedIncreased {
                speed: self.progression.speed(),
            });
        }
        for _ in 0..advance.spacing_steps {
            if let Some(multiplier) = self.spacing.widen() {
                log::info!("spacing multiplier widened to {multiplier:.2}");
                out_events.push(Event::SpacingWidened { multiplier });
            }
        }
    }

    fn poll_scheduler(&mut self, out_events: &mut Vec<Event>) {
        let unlocked_before = self.scheduler.clusters_unlocked();
        let decision = self.scheduler.on_tick(
            self.progression.elapsed(),
            Collaborators {
                selector: &self.selector,
                progression: &mut self.progression,
                spacing: &mut self.spacing,
                source: &mut self.source,
                dice: &mut self.dice,
            },
        );

        if !unlocked_before && self.scheduler.clusters_unlocked() {
            out_events.push(Event::ClustersUnlocked);
        }
        if let Some(decision) = decision {
            out_events.push(Event::SpawnDecided { decision });
        }
    }

    fn sync_phase(&mut self, out_events: &mut Vec<Event>) {
        let current = self.progression.phase();
        if current != self.phase {
            log::info!("phase advanced from {:?} to {current:?}", self.phase);
            out_events.push(Event::PhaseChanged {
                from: self.phase,
                to: current,
            });
            self.phase = current;
        }
    }
}

/// Owner of the current session and the tuning every session starts from.
#[derive(Debug)]
pub struct Director {
    tuning: DirectorTuning,
    sessions_started: u64,
    session: Option<SessionState>,
}

impl Default for Director {
    fn default() -> Self {
        Self::new(DirectorTuning::default())
    }
}

impl Director {
    /// Creates an idle director. The tuning is expected to be validated.
    #[must_use]
    pub fn new(tuning: DirectorTuning) -> Self {
        Self {
            tuning,
            sessions_started: 0,
            session: None,
        }
    }

    /// Starts a fresh session, returning the seed it runs on.
    pub fn start_session(&mut self, now: Duration, seed: Option<u64>) -> u64 {
        let mut events = Vec::new();
        apply(self, Command::StartSession { now, seed }, &mut events);
        events
            .iter()
            .find_map(|event| match event {
                Event::SessionStarted { seed } => Some(*seed),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Ends the running session at `now`.
    pub fn end_session(&mut self, now: Duration) {
        let mut events = Vec::new();
        apply(self, Command::EndSession { now }, &mut events);
    }

    /// Advances the running session and returns the spawn it decided on, if any.
    pub fn tick(&mut self, now: Duration) -> Option<SpawnDecision> {
        let mut events = Vec::new();
        apply(self, Command::Tick { now }, &mut events);
        events.into_iter().find_map(|event| match event {
            Event::SpawnDecided { decision } => Some(decision),
            _ => None,
        })
    }

    /// Credits a pass of a previously spawned fire.
    pub fn report_obstacle_passed(&mut self, category: Category) {
        let mut events = Vec::new();
        apply(self, Command::ReportObstaclePassed { category }, &mut events);
    }

    /// Records a near miss, easing the next gap and pausing clusters.
    pub fn report_near_miss(&mut self) {
        let mut events = Vec::new();
        apply(self, Command::ReportNearMiss, &mut events);
    }

    fn playing_session(&mut self) -> Option<&mut SessionState> {
        self.session.as_mut().filter(|session| session.playing)
    }
}

/// Applies the provided command to the director, mutating state deterministically.
pub fn apply(director: &mut Director, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartSession { now, seed } => {
            let ordinal = director.sessions_started;
            director.sessions_started = director.sessions_started.saturating_add(1);
            let seed = seed.unwrap_or_else(|| derive_session_seed(now, ordinal));
            log::info!("session {ordinal} started with seed {seed:#018x}");
            director.session = Some(SessionState::new(&director.tuning, seed, now));
            out_events.push(Event::SessionStarted { seed });
        }
        Command::EndSession { now } => {
            let Some(session) = director.playing_session() else {
                return;
            };
            session.advance_to(now, out_events);
            session.playing = false;
            let elapsed = session.progression.elapsed();
            let score = session.progression.score();
            log::info!("session ended after {elapsed:?} with score {score}");
            out_events.push(Event::SessionEnded { elapsed, score });
        }
        Command::Tick { now } => {
            let Some(session) = director.playing_session() else {
                return;
            };
            session.advance_to(now, out_events);
            session.poll_scheduler(out_events);
            session.sync_phase(out_events);
        }
        Command::ReportObstaclePassed { category } => {
            let Some(session) = director.playing_session() else {
                return;
            };
            let score = session.progression.record_obstacle_passed(category);
            out_events.push(Event::ObstacleCleared { category, score });
            session.sync_phase(out_events);
        }
        Command::ReportNearMiss => {
            let Some(session) = director.playing_session() else {
                return;
            };
            session.spacing.record_missed_jump();
            session.scheduler.record_near_miss(session.progression.elapsed());
            out_events.push(Event::NearMissRecorded);
        }
    }
}

/// Query functions that provide read-only access to the director state.
pub mod query {
    use std::time::Duration;

    use super::{Director, SessionState};
    use ember_run_core::{DirectorTuning, HudSnapshot, Phase};

    /// Provides the tuning new sessions start from.
    #[must_use]
    pub fn tuning(director: &Director) -> &DirectorTuning {
        &director.tuning
    }

    /// Reports whether a session is currently running.
    #[must_use]
    pub fn is_playing(director: &Director) -> bool {
        director.session.as_ref().is_some_and(|session| session.playing)
    }

    /// Seed of the most recent session.
    #[must_use]
    pub fn seed(director: &Director) -> Option<u64> {
        director.session.as_ref().map(|session| session.seed)
    }

    /// Difficulty phase of the most recent session.
    #[must_use]
    pub fn phase(director: &Director) -> Option<Phase> {
        director.session.as_ref().map(|session| session.progression.phase())
    }

    /// Scroll speed of the most recent session.
    #[must_use]
    pub fn speed(director: &Director) -> Option<f64> {
        director.session.as_ref().map(|session| session.progression.speed())
    }

    /// Current spawn cooldown of the most recent session.
    #[must_use]
    pub fn spawn_cooldown(director: &Director) -> Option<Duration> {
        director.session.as_ref().map(|session| session.scheduler.cooldown())
    }

    /// Number of consecutive near-identical gaps in the most recent session.
    #[must_use]
    pub fn consecutive_identical_gaps(director: &Director) -> Option<u32> {
        director
            .session
            .as_ref()
            .map(|session| session.spacing.consecutive_identical_gaps())
    }

    /// Builds a HUD summary of the most recent session.
    #[must_use]
    pub fn snapshot(director: &Director) -> Option<HudSnapshot> {
        director.session.as_ref().map(hud)
    }

    fn hud(session: &SessionState) -> HudSnapshot {
        let progression = &session.progression;
        HudSnapshot {
            phase: progression.phase(),
            speed: progression.speed(),
            elapsed: progression.elapsed(),
            score: progression.score(),
            obstacles_passed: progression.obstacles_passed(),
            small_count: progression.small_count(),
            medium_cleared: progression.medium_cleared(),
            large_cleared: progression.large_cleared(),
            spacing_multiplier: session.spacing.multiplier(),
            clusters_unlocked: session.scheduler.clusters_unlocked(),
            playing: session.playing,
        }
    }
}
