#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aditivo_engines::date_span::months_between_text;
use aditivo_engines::locale_text::{BrDateText, DateText, IsoDateText};
use aditivo_os::EngineConfig;
use aditivo_storage::ContractStore;
use aditivo_tools::{Scenario, ScenarioRunner};

/// Contract and amendment ledger tools.
#[derive(Debug, Parser)]
#[command(name = "aditivo", version)]
struct Cli {
    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a JSON scenario against an empty in-memory ledger.
    Run {
        scenario: PathBuf,
        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Whole months between two dates (dd/mm/yyyy unless --iso).
    MonthsBetween {
        start: String,
        end: String,
        #[arg(long)]
        iso: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
        None => EngineConfig::mvp_v1(),
    };

    match cli.cmd {
        Command::Run { scenario, json } => {
            let scenario = Scenario::load(&scenario).map_err(|e| e.to_string())?;
            let runner = ScenarioRunner::new(config).map_err(|e| e.to_string())?;
            let mut store = ContractStore::new_in_memory();
            let report = runner
                .run(&scenario, &mut store)
                .map_err(|e| e.to_string())?;
            if json {
                let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
                println!("{text}");
            } else {
                print!("{}", report.render_text());
            }
            match report.mismatches() {
                0 => Ok(()),
                n => Err(format!("{n} step(s) did not behave as declared")),
            }
        }
        Command::MonthsBetween { start, end, iso } => {
            let codec: &dyn DateText = if iso { &IsoDateText } else { &BrDateText };
            let months = months_between_text(codec, &start, &end).map_err(|e| e.to_string())?;
            println!("{months}");
            Ok(())
        }
    }
}
