#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line harness that plays scripted Ember Run sessions headlessly.

mod harness;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use ember_run_core::DirectorTuning;

use self::harness::{BotScript, SessionReport};

#[derive(Debug, Parser)]
#[command(
    name = "ember-run",
    version,
    about = "Plays a scripted session against the difficulty director and reports what it spawned"
)]
struct Args {
    /// Session seed; derived from the start time when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Length of the simulated session in seconds.
    #[arg(long, default_value_t = 300)]
    duration_secs: u64,
    /// Simulated frame length in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Time between a spawn and the bot clearing it, in milliseconds.
    #[arg(long, default_value_t = 2_400)]
    travel_ms: u64,
    /// Report a near miss after every N-th cleared obstacle; 0 disables.
    #[arg(long, default_value_t = 7)]
    miss_every: u32,
    /// TOML file overriding the default tuning.
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Ember Run command-line harness.
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.frame_ms == 0 {
        bail!("--frame-ms must be at least 1");
    }

    let tuning = load_tuning(args.tuning.as_ref())?;
    let report = harness::run(
        tuning,
        BotScript {
            seed: args.seed,
            duration: Duration::from_secs(args.duration_secs),
            frame: Duration::from_millis(args.frame_ms),
            travel_time: Duration::from_millis(args.travel_ms),
            miss_every: args.miss_every,
        },
    );

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialise session report")?;
        println!("{rendered}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn load_tuning(path: Option<&PathBuf>) -> Result<DirectorTuning> {
    let Some(path) = path else {
        return Ok(DirectorTuning::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file {}", path.display()))?;
    let tuning = DirectorTuning::from_toml_str(&contents)
        .with_context(|| format!("invalid tuning in {}", path.display()))?;
    log::info!("loaded tuning from {}", path.display());
    Ok(tuning)
}

fn print_report(report: &SessionReport) {
    println!("seed             {:#018x}", report.seed);
    println!("spawns           {}", report.spawns);
    println!(
        "singles          small {} / medium {} / large {}",
        report.singles.small(),
        report.singles.medium(),
        report.singles.large()
    );
    println!(
        "clusters         {} ({} fires)",
        report.clusters, report.cluster_members
    );
    println!("bundles          {}", report.bundles);
    println!("near misses      {}", report.near_misses);
    match report.clusters_unlocked_at_ms {
        Some(at_ms) => println!("clusters unlock  {at_ms} ms"),
        None => println!("clusters unlock  never"),
    }
    if let Some(gaps) = report.gaps {
        println!(
            "gaps (widths)    min {:.2} / mean {:.2} / max {:.2}",
            gaps.min(),
            gaps.mean(),
            gaps.max()
        );
    }
    for change in &report.phase_changes {
        println!("phase            {change}");
    }
    if let Some(hud) = report.hud {
        println!(
            "final            {:?} at speed {:.2}, score {}, spacing x{:.2}, {:.1} s",
            hud.phase,
            hud.speed,
            hud.score,
            hud.spacing_multiplier,
            hud.elapsed.as_secs_f64()
        );
    }
}
