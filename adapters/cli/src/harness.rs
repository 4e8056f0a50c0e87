//! Scripted bot that plays a session against the director without rendering.

use std::{collections::VecDeque, fmt, time::Duration};

use ember_run_core::{Category, Command, DirectorTuning, Event, HudSnapshot, Phase, SpawnKind};
use ember_run_director::{self as director, query, Director};
use serde::Serialize;

/// Parameters of one scripted run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BotScript {
    pub(crate) seed: Option<u64>,
    pub(crate) duration: Duration,
    pub(crate) frame: Duration,
    pub(crate) travel_time: Duration,
    pub(crate) miss_every: u32,
}

/// Tally of spawns per category for single fires.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub(crate) struct SingleCounts {
    small: u32,
    medium: u32,
    large: u32,
}

impl SingleCounts {
    pub(crate) const fn small(&self) -> u32 {
        self.small
    }

    pub(crate) const fn medium(&self) -> u32 {
        self.medium
    }

    pub(crate) const fn large(&self) -> u32 {
        self.large
    }
}

/// Distribution of gaps in width units.
#[derive(Clone, Copy, Debug, Serialize)]
pub(crate) struct GapStats {
    min: f64,
    mean: f64,
    max: f64,
}

impl GapStats {
    pub(crate) const fn min(&self) -> f64 {
        self.min
    }

    pub(crate) const fn mean(&self) -> f64 {
        self.mean
    }

    pub(crate) const fn max(&self) -> f64 {
        self.max
    }
}

/// Moment the session moved to a harder phase.
#[derive(Clone, Copy, Debug, Serialize)]
pub(crate) struct PhaseChange {
    at_ms: u128,
    from: Phase,
    to: Phase,
}

impl fmt::Display for PhaseChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?} at {} ms", self.from, self.to, self.at_ms)
    }
}

/// Summary printed after a run.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct SessionReport {
    pub(crate) seed: u64,
    pub(crate) spawns: u32,
    pub(crate) singles: SingleCounts,
    pub(crate) clusters: u32,
    pub(crate) cluster_members: u32,
    pub(crate) bundles: u32,
    pub(crate) near_misses: u32,
    pub(crate) clusters_unlocked_at_ms: Option<u128>,
    pub(crate) gaps: Option<GapStats>,
    pub(crate) phase_changes: Vec<PhaseChange>,
    pub(crate) hud: Option<HudSnapshot>,
}

#[derive(Debug, Default)]
struct GapAccumulator {
    count: u32,
    sum: f64,
    min: f64,
    max: f64,
}

impl GapAccumulator {
    fn push(&mut self, width_units: f64) {
        if self.count == 0 {
            self.min = width_units;
            self.max = width_units;
        } else {
            self.min = self.min.min(width_units);
            self.max = self.max.max(width_units);
        }
        self.count += 1;
        self.sum += width_units;
    }

    fn finish(&self) -> Option<GapStats> {
        (self.count > 0).then(|| GapStats {
            min: self.min,
            mean: self.sum / f64::from(self.count),
            max: self.max,
        })
    }
}

/// Plays `script` against a fresh director built from `tuning`.
pub(crate) fn run(tuning: DirectorTuning, script: BotScript) -> SessionReport {
    let mut director = Director::new(tuning);
    let mut in_flight: VecDeque<(Duration, Category)> = VecDeque::new();
    let mut gaps = GapAccumulator::default();
    let mut report = SessionReport {
        seed: 0,
        spawns: 0,
        singles: SingleCounts::default(),
        clusters: 0,
        cluster_members: 0,
        bundles: 0,
        near_misses: 0,
        clusters_unlocked_at_ms: None,
        gaps: None,
        phase_changes: Vec::new(),
        hud: None,
    };
    let mut passes: u32 = 0;
    let mut events = Vec::new();

    director::apply(
        &mut director,
        Command::StartSession {
            now: Duration::ZERO,
            seed: script.seed,
        },
        &mut events,
    );

    let mut now = Duration::ZERO;
    while now <= script.duration {
        while in_flight.front().is_some_and(|(due, _)| *due <= now) {
            let Some((_, category)) = in_flight.pop_front() else {
                break;
            };
            director::apply(
                &mut director,
                Command::ReportObstaclePassed { category },
                &mut events,
            );
            passes += 1;
            if script.miss_every > 0 && passes % script.miss_every == 0 {
                director::apply(&mut director, Command::ReportNearMiss, &mut events);
            }
        }

        director::apply(&mut director, Command::Tick { now }, &mut events);

        for event in events.drain(..) {
            match event {
                Event::SessionStarted { seed } => report.seed = seed,
                Event::SpawnDecided { decision } => {
                    report.spawns += 1;
                    gaps.push(decision.gap().width_units());
                    match decision.kind() {
                        SpawnKind::Single { category } => match category {
                            Category::Small => report.singles.small += 1,
                            Category::Medium => report.singles.medium += 1,
                            Category::Large => report.singles.large += 1,
                            Category::ExtraLarge => {}
                        },
                        SpawnKind::Cluster { members, .. } => {
                            report.clusters += 1;
                            report.cluster_members += u32::from(members);
                        }
                        SpawnKind::Bundle { .. } => report.bundles += 1,
                    }
                    in_flight.push_back((now + script.travel_time, decision.category()));
                }
                Event::PhaseChanged { from, to } => report.phase_changes.push(PhaseChange {
                    at_ms: now.as_millis(),
                    from,
                    to,
                }),
                Event::ClustersUnlocked => report.clusters_unlocked_at_ms = Some(now.as_millis()),
                Event::NearMissRecorded => report.near_misses += 1,
                Event::SpeedIncreased { speed } => log::debug!("speed {speed:.3} at {now:?}"),
                Event::SpacingWidened { multiplier } => {
                    log::debug!("spacing multiplier {multiplier:.2} at {now:?}");
                }
                Event::ObstacleCleared { .. } | Event::SessionEnded { .. } => {}
            }
        }

        now += script.frame;
    }

    director::apply(&mut director, Command::EndSession { now }, &mut events);
    events.clear();

    report.gaps = gaps.finish();
    report.hud = query::snapshot(&director);
    report
}
