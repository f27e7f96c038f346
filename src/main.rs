use std::{
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use log::{error, info};

use deltalap::{
    ComparisonEngine, ComparisonOutcome, DeltaLapError, EngineConfig, LapSelector, loader,
    writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align two laps and compare them
    Compare {
        #[arg(long)]
        session1: PathBuf,

        #[arg(long)]
        session2: PathBuf,

        /// Lap of the first session, defaults to its fastest lap
        #[arg(long)]
        lap1: Option<u32>,

        /// Lap of the second session, defaults to its fastest lap
        #[arg(long)]
        lap2: Option<u32>,

        /// Use the first lap instead of the fastest one when no lap number is given
        #[arg(long, default_value_t = false)]
        first_lap: bool,

        /// Number of sectors, overrides the config file
        #[arg(long)]
        sectors: Option<usize>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include every aligned comparison point in the report
        #[arg(long, default_value_t = false)]
        include_points: bool,
    },
    /// List the laps of a session file
    Laps {
        #[arg(short, long)]
        input: PathBuf,
    },
}

struct CompareOptions {
    session1: PathBuf,
    session2: PathBuf,
    lap1: LapSelector,
    lap2: LapSelector,
    sectors: Option<usize>,
    config: Option<PathBuf>,
    include_points: bool,
}

fn compare(options: &CompareOptions) -> Result<ComparisonOutcome, DeltaLapError> {
    let mut config = EngineConfig::resolve(options.config.as_deref())?;
    if let Some(sectors) = options.sectors {
        config.sector_count = sectors;
    }
    let engine = ComparisonEngine::new(config)?;

    let session1 = loader::load_session_jsonl(&options.session1)?;
    let session2 = loader::load_session_jsonl(&options.session2)?;

    let outcome = engine.compare_outcome(&session1, &session2, options.lap1, options.lap2);
    Ok(match outcome {
        ComparisonOutcome::Success(report) if !options.include_points => {
            ComparisonOutcome::Success(Box::new(report.without_points()))
        }
        outcome => outcome,
    })
}

fn laps(input: &Path) -> Result<(), DeltaLapError> {
    let session = loader::load_session_jsonl(input)?;
    println!(
        "{} ({} laps)",
        session.driver_name_or("unknown driver"),
        session.laps.len()
    );
    for lap in &session.laps {
        println!(
            "  lap {:>3}  {:>9.3}s  {:>5} samples{}",
            lap.lap_number,
            lap.lap_time,
            lap.samples.len(),
            if lap.is_fastest { "  (fastest)" } else { "" }
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    colog::init();

    let cli = Args::parse();
    match cli.command {
        Commands::Compare {
            session1,
            session2,
            lap1,
            lap2,
            first_lap,
            sectors,
            config,
            output,
            include_points,
        } => {
            let options = CompareOptions {
                session1,
                session2,
                lap1: LapSelector::from_options(lap1, !first_lap),
                lap2: LapSelector::from_options(lap2, !first_lap),
                sectors,
                config,
                include_points,
            };
            // input and config problems are reported the same way as comparison failures
            let outcome = compare(&options).unwrap_or_else(|e| {
                error!("{}", e);
                ComparisonOutcome::failure(&e)
            });

            let written = match &output {
                Some(path) => writer::write_report(path, &outcome),
                None => writer::write_outcome(&mut io::stdout().lock(), &outcome),
            };
            if let Err(e) = written {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
            if let Some(report) = outcome.report() {
                info!(
                    "{} faster by {:.3}s over {:.0}m",
                    report.overall.faster_driver_name,
                    report.overall.total_time_delta.abs(),
                    report.overall.total_distance
                );
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Laps { input } => match laps(&input) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Error while listing laps: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
