use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::info;

use football_elo::accuracy;
use football_elo::calibration;
use football_elo::dataset;
use football_elo::export;
use football_elo::params::EloParams;
use football_elo::pipeline::{self, SeasonReport};

#[derive(Parser)]
#[command(
    name = "football-elo",
    version,
    about = "Contextual Elo ratings and match forecasts for football leagues"
)]
struct Cli {
    /// Parameter bundle (JSON); defaults to ELO_PARAMS_PATH, then built-in values
    #[arg(short, long, global = true, env = "ELO_PARAMS_PATH", value_name = "FILE")]
    params: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"],
        help = "Sets the logging verbosity when RUST_LOG is unset"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parameter bundle in use as JSON
    Params,
    /// Derive baseline statistics from a completed reference season
    Calibrate {
        #[arg(long, value_name = "FILE")]
        reference: PathBuf,
    },
    /// Rate the reference and current seasons and forecast pending matches
    Run {
        #[arg(long, value_name = "FILE")]
        reference: PathBuf,
        #[arg(long, value_name = "FILE")]
        current: PathBuf,
        #[arg(long, value_name = "FILE", help = "Write the season report as JSON")]
        out: Option<PathBuf>,
        #[arg(long, value_name = "FILE", help = "Also export an xlsx workbook")]
        xlsx: Option<PathBuf>,
    },
    /// Score a saved season report's forecasts against played results
    Accuracy {
        #[arg(long, value_name = "FILE")]
        report: PathBuf,
        #[arg(long, value_name = "FILE")]
        results: PathBuf,
    },
}

fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    Ok(())
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let params = match &cli.params {
        Some(path) => EloParams::load(path)?,
        None => EloParams::shared_default().clone(),
    };

    match cli.command {
        Command::Params => {
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::Calibrate { reference } => {
            let rows = dataset::load_matches(&reference)?;
            let baseline = calibration::calibrate(&rows, &params.calibration)
                .with_context(|| format!("calibrate {}", reference.display()))?;
            println!("{}", serde_json::to_string_pretty(&baseline)?);
        }
        Command::Run {
            reference,
            current,
            out,
            xlsx,
        } => {
            let reference_rows = dataset::load_matches(&reference)?;
            let current_rows = dataset::load_matches(&current)?;
            let report = pipeline::run_season(&reference_rows, &current_rows, &params)?;
            print_summary(&report);

            if let Some(path) = out {
                write_json(&path, &report)?;
                info!(path = %path.display(), "wrote season report");
            }
            if let Some(path) = xlsx {
                let written = export::export_season_xlsx(&path, &report)?;
                info!(
                    path = %path.display(),
                    ratings = written.ratings,
                    ledger = written.ledger,
                    forecasts = written.forecasts,
                    "exported workbook"
                );
            }
        }
        Command::Accuracy { report, results } => {
            let raw = fs::read_to_string(&report)
                .with_context(|| format!("read season report {}", report.display()))?;
            let season: SeasonReport =
                serde_json::from_str(&raw).context("parse season report")?;
            let played = dataset::load_matches(&results)?;
            let scored = accuracy::evaluate(&season.forecasts, &played);

            println!(
                "Overall: {}/{} ({:.1}%)",
                scored.overall.correct,
                scored.overall.total,
                scored.overall.rate() * 100.0
            );
            for (league, hit) in &scored.by_league {
                println!(
                    "  {league:30} {}/{} ({:.1}%)",
                    hit.correct,
                    hit.total,
                    hit.rate() * 100.0
                );
            }
            println!(
                "Brier {:.4} | Log loss {:.4} | Arg-max accuracy {:.1}%",
                scored.metrics.brier,
                scored.metrics.log_loss,
                scored.metrics.accuracy * 100.0
            );
        }
    }
    Ok(())
}

fn print_summary(report: &SeasonReport) {
    println!(
        "Baseline: draw {:.2}% | home {:.2}% | away {:.2}% | home advantage {:.1}",
        report.baseline.draw_rate * 100.0,
        report.baseline.home_win_rate * 100.0,
        report.baseline.away_win_rate * 100.0,
        report.baseline.avg_home_advantage
    );
    if !report.promoted.is_empty() {
        println!("Promoted: {}", report.promoted.join(", "));
    }
    println!("Top 10:");
    for (rank, (team, rating)) in report.rankings().iter().take(10).enumerate() {
        println!("  {:2}. {team:30} {rating:.1}", rank + 1);
    }
    println!("Forecasts: {}", report.forecasts.len());
    for f in report.forecasts.iter().take(5) {
        let p = &f.forecast;
        println!(
            "  {} {} vs {} | H {:.1}% D {:.1}% A {:.1}% | {} ({:.1}%, {})",
            f.date.format("%Y-%m-%d"),
            f.home,
            f.away,
            p.home * 100.0,
            p.draw * 100.0,
            p.away * 100.0,
            p.recommended,
            p.recommended_prob * 100.0,
            p.confidence
        );
    }
}

fn write_json(path: &Path, report: &SeasonReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(report).context("serialize season report")?;
    fs::write(&tmp, json).context("write season report")?;
    fs::rename(&tmp, path).context("swap season report")?;
    Ok(())
}
