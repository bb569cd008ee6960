//! Headless map authoring: batch-generate solvable water-sort maps and write
//! the CSV rows the editor consumes.

mod rows;
mod worker;

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use watersort_core::{GenOptions, Generator, Params, Rng};
use worker::TemplateRequest;

#[derive(Parser)]
#[command(name = "watersort-cli")]
#[command(about = "Generate solvable water-sort maps with difficulty scores")]
struct Cli {
    /// Palette size (1..=18)
    #[arg(long, default_value_t = 6)]
    colors: usize,
    /// Total bottle count
    #[arg(long, default_value_t = 8)]
    bottles: usize,
    /// Slots per bottle (3..=50)
    #[arg(long, default_value_t = 4)]
    capacity: usize,
    /// Maps to generate
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// RNG seed; omitted means a fresh entropy seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path
    #[arg(long)]
    out: Option<PathBuf>,
    /// Append to an existing CSV instead of truncating
    #[arg(long)]
    append: bool,
    /// Print each map as a JSON line instead of the plain summary
    #[arg(long)]
    json: bool,

    /// Scramble down from a goal arrangement instead of dealing mixed
    #[arg(long)]
    scramble: bool,
    /// Reverse-scramble length range (with --scramble)
    #[arg(long, default_value_t = 60)]
    mix_min: usize,
    #[arg(long, default_value_t = 180)]
    mix_max: usize,

    /// Cloth gimmicks in the auto template
    #[arg(long, default_value_t = 0)]
    cloth: usize,
    /// Vine gimmicks in the auto template
    #[arg(long, default_value_t = 0)]
    vine: usize,
    /// Bush gimmicks in the auto template
    #[arg(long, default_value_t = 0)]
    bush: usize,
    /// Hidden slots in the auto template
    #[arg(long, default_value_t = 0)]
    questions: usize,
    /// Per-bottle cap on hidden slots
    #[arg(long)]
    questions_per_bottle: Option<usize>,
    /// Draw template heights randomly instead of filling left to right
    #[arg(long)]
    randomize_heights: bool,

    /// Solver budget per attempt, in milliseconds
    #[arg(long, default_value_t = 2500)]
    solve_ms: u64,
    /// Generation attempts per map
    #[arg(long, default_value_t = 30)]
    tries: usize,
    /// Bottles left empty when no template dictates heights
    #[arg(long, default_value_t = 2)]
    reserved_empty: usize,
    /// Longest same-color run allowed while dealing (0 = unlimited)
    #[arg(long, default_value_t = 2)]
    max_run: usize,
    /// Worker threads; each derives its own seed from --seed
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let params = Params::new(cli.colors, cli.bottles, cli.capacity);
    if !params.is_valid() {
        eprintln!(
            "invalid dimensions: {} colors / {} bottles / capacity {}",
            cli.colors, cli.bottles, cli.capacity
        );
        return ExitCode::from(2);
    }
    if cli.mix_min > cli.mix_max {
        eprintln!("--mix-min must not exceed --mix-max");
        return ExitCode::from(2);
    }

    let seed = cli.seed.unwrap_or_else(|| Rng::from_entropy().next_u64());
    let opt = GenOptions {
        mix_min: cli.mix_min,
        mix_max: cli.mix_max,
        seed,
        gimmick_placement_tries: cli.tries,
        solve_time_ms: cli.solve_ms,
        start_mixed: !cli.scramble,
        reserved_empty: cli.reserved_empty,
        max_run_per_bottle: cli.max_run,
        randomize_heights: cli.randomize_heights,
    };

    let template = TemplateRequest {
        cloth: cli.cloth,
        vine: cli.vine,
        bush: cli.bush,
        questions: cli.questions,
        questions_per_bottle: cli.questions_per_bottle,
    };
    let template = (!template.is_empty()).then_some(template);

    // Surface impossible template requests before any thread spawns.
    if let Some(req) = template {
        let mut probe = Generator::new(params, opt.clone());
        if let Err(reason) = probe.build_random_template(
            req.cloth,
            req.vine,
            req.bush,
            req.questions,
            req.questions_per_bottle,
        ) {
            eprintln!("template rejected: {reason}");
            return ExitCode::from(2);
        }
    }

    let report = worker::generate_batch(params, &opt, template, cli.count, cli.workers);

    if let Err(err) = emit(&cli, &report) {
        eprintln!("write failed: {err}");
        return ExitCode::from(1);
    }

    eprintln!(
        "generated {} of {} map(s), {} attempt(s) exhausted (seed {seed:#018x})",
        report.completed, cli.count, report.failed
    );
    if report.produced.is_empty() {
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn emit(cli: &Cli, report: &worker::BatchReport) -> io::Result<()> {
    if let Some(path) = &cli.out {
        let mut encoded = Vec::with_capacity(report.produced.len());
        for (index, g) in report.produced.iter().enumerate() {
            match rows::encode(index, g) {
                Ok(row) => encoded.push(row),
                Err(err) => eprintln!("map {index} not written: {err}"),
            }
        }
        rows::save(path, &encoded, cli.append)?;
    }

    for (index, g) in report.produced.iter().enumerate() {
        if cli.json {
            match serde_json::to_string(g) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("map {index} not serialized: {err}"),
            }
        } else {
            println!(
                "#{index}: {} moves, score {:.1} ({}), mix {}",
                g.min_moves, g.diff_score, g.diff_label, g.mix_count
            );
        }
    }
    Ok(())
}
