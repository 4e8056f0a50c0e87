use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use ember_run_core::{Command, Event, Phase, SpawnKind};
use ember_run_director::{self as director, query, Director};

const FRAME: Duration = Duration::from_millis(16);
const TRAVEL_TIME: Duration = Duration::from_millis(2_400);

#[test]
fn deterministic_replay_produces_identical_log() {
    let first = replay(42);
    let second = replay(42);

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first.spawns > 50, "expected a busy session, got {}", first.spawns);
    assert_ne!(first.fingerprint, replay(7).fingerprint);
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    fingerprint: u64,
    spawns: usize,
    final_score: u64,
}

/// Plays three minutes with a bot that clears everything after a fixed
/// travel time and stumbles on every fifth obstacle.
fn replay(seed: u64) -> ReplayOutcome {
    let mut director = Director::default();
    let mut log = Vec::new();
    let mut in_flight = Vec::new();
    let mut spawns = 0;
    let mut passes = 0;

    let start = Duration::from_secs(10);
    let _ = execute(
        &mut director,
        Command::StartSession {
            now: start,
            seed: Some(seed),
        },
        &mut log,
    );

    let mut now = start;
    while now <= start + Duration::from_secs(180) {
        while let Some(&(due, category)) = in_flight.first() {
            if due > now {
                break;
            }
            let _ = in_flight.remove(0);
            let _ = execute(&mut director, Command::ReportObstaclePassed { category }, &mut log);
            passes += 1;
            if passes % 5 == 0 {
                let _ = execute(&mut director, Command::ReportNearMiss, &mut log);
            }
        }

        for event in execute(&mut director, Command::Tick { now }, &mut log) {
            if let Event::SpawnDecided { decision } = event {
                spawns += 1;
                in_flight.push((now + TRAVEL_TIME, decision.category()));
            }
        }
        now += FRAME;
    }

    let final_events = execute(&mut director, Command::EndSession { now }, &mut log);
    let final_score = final_events
        .iter()
        .find_map(|event| match event {
            Event::SessionEnded { score, .. } => Some(*score),
            _ => None,
        })
        .expect("session end reported");

    let mut hasher = DefaultHasher::new();
    for record in &log {
        record.hash(&mut hasher);
    }

    ReplayOutcome {
        fingerprint: hasher.finish(),
        spawns,
        final_score,
    }
}

fn execute(director: &mut Director, command: Command, log: &mut Vec<String>) -> Vec<Event> {
    let mut events = Vec::new();
    director::apply(director, command, &mut events);
    log.extend(events.iter().map(|event| format!("{event:?}")));
    events
}

#[test]
fn replay_reaches_full_challenge_with_every_spawn_kind_in_range() {
    let mut director = Director::default();
    let _ = director.start_session(Duration::ZERO, Some(1_234));
    let mut in_flight = Vec::new();

    let mut now = Duration::ZERO;
    while now <= Duration::from_secs(240) {
        while let Some(&(due, category)) = in_flight.first() {
            if due > now {
                break;
            }
            let _ = in_flight.remove(0);
            director.report_obstacle_passed(category);
        }
        if let Some(decision) = director.tick(now) {
            assert!(decision.gap().width_units() >= 1.5);
            if let SpawnKind::Cluster { members, .. } = decision.kind() {
                assert!((2..=3).contains(&members));
            }
            in_flight.push((now + TRAVEL_TIME, decision.category()));
        }
        now += FRAME;
    }

    let snapshot = query::snapshot(&director).expect("session running");
    assert_eq!(snapshot.phase, Phase::FullChallenge);
    assert!(snapshot.spacing_multiplier > 1.0);
    assert!(snapshot.speed > 5.75);
}
