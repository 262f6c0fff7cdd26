use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use formfill::config::{FillerConfig, NavigationMethod, Preset, SubmissionMethod};
use formfill::console::{self, ConsoleReporter};
use formfill::input::{EnigoInput, InputChannel};
use formfill::sequencer::Sequencer;
use formfill::{AbortWatch, load_records, logging};

#[derive(Parser)]
#[command(name = "formfill", about = "Fill on-screen forms from CSV rows")]
struct Cli {
    /// Config file (defaults to ./formfill.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Timing preset: fast, slow, web or desktop
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill one form per CSV record
    Run {
        /// CSV file with a header row naming the fields
        csv: PathBuf,

        /// Field names in the form's tab order (defaults to the CSV header order)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// Zero-based record index to start from
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Maximum records to process, at least 1 (overrides max_records_per_session)
        #[arg(long)]
        max_records: Option<NonZeroUsize>,

        /// Seconds to wait before typing starts
        #[arg(long, default_value_t = 5)]
        countdown: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print screen size and pointer position
    ScreenInfo,
    /// Print the effective configuration after validation
    CheckConfig,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let preset = cli.preset.as_deref().map(str::parse::<Preset>).transpose()?;
    let config =
        FillerConfig::load(cli.config.as_deref(), preset).context("Invalid configuration")?;
    let _log_guard = logging::init(config.log_level, config.log_file.as_deref());

    match cli.command {
        Command::Run {
            csv,
            fields,
            start,
            max_records,
            countdown,
            yes,
        } => run(config, csv, fields, start, max_records, countdown, yes),
        Command::ScreenInfo => {
            let input = EnigoInput::new(config.pause_between_actions())?;
            console::print_screen_info(&input.screen_info()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(
    config: FillerConfig,
    csv: PathBuf,
    fields: Option<Vec<String>>,
    start: usize,
    max_records: Option<NonZeroUsize>,
    countdown: u64,
    yes: bool,
) -> Result<ExitCode> {
    let data = load_records(&csv, &config.encoding)
        .with_context(|| format!("Failed to load {}", csv.display()))?;

    let field_order = fields.unwrap_or_else(|| data.headers.clone());
    if field_order.is_empty() {
        bail!("No fields to fill");
    }
    for name in &field_order {
        if !data.headers.contains(name) {
            warn!("Field '{}' is not a column of {}", name, csv.display());
        }
    }

    let max_records =
        max_records.or_else(|| config.max_records_per_session.and_then(NonZeroUsize::new));
    info!(
        "Field order: {} ({} records, start {})",
        field_order.join(", "),
        data.len(),
        start
    );

    let input = EnigoInput::new(config.pause_between_actions())?;
    match input.screen_info() {
        Ok(info) => console::print_screen_info(&info),
        Err(e) => warn!("Could not read screen info: {}", e),
    }

    if config.navigation_method == NavigationMethod::Click {
        console::warn("navigation_method 'click' is not supported; the run will stop at the first field");
    }
    if config.submission_method == SubmissionMethod::Click {
        console::warn("submission_method 'click' is not supported; the run will stop at the first submit");
    }

    if config.confirmation_required && !yes {
        let question = format!(
            "Fill {} field(s) for up to {} record(s)?",
            field_order.len(),
            data.len().saturating_sub(start).min(max_records.map_or(usize::MAX, NonZeroUsize::get))
        );
        if !console::confirm(&question)? {
            println!("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let abort = AbortWatch::new(config.use_failsafe);
    abort
        .install_ctrlc_handler()
        .context("Failed to install Ctrl+C handler")?;

    if !console::countdown(countdown, &abort) {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }
    println!("Started at {}", chrono::Local::now().format("%H:%M:%S"));

    let mut sequencer = Sequencer::new(config, input)
        .with_abort(abort)
        .with_reporter(Box::new(ConsoleReporter));
    let report = sequencer.run(&data.records, &field_order, start, max_records);

    Ok(if report.outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("formfill").chain(args.iter().copied()))
    }

    #[test]
    fn test_max_records_must_be_positive() {
        assert!(parse(&["run", "people.csv", "--max-records", "0"]).is_err());
        assert!(parse(&["run", "people.csv", "--max-records", "-1"]).is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = parse(&[
            "run",
            "people.csv",
            "--fields",
            "name,email",
            "--start",
            "3",
            "--max-records",
            "2",
            "--yes",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                fields,
                start,
                max_records,
                countdown,
                yes,
                ..
            } => {
                assert_eq!(fields, Some(vec!["name".to_string(), "email".to_string()]));
                assert_eq!(start, 3);
                assert_eq!(max_records, NonZeroUsize::new(2));
                assert_eq!(countdown, 5);
                assert!(yes);
            }
            _ => panic!("expected run"),
        }
    }
}
