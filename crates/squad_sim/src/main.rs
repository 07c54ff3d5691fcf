//! squad_sim CLI
//!
//! 시나리오 실행 / 스냅샷 저장 / 스냅샷 조회

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "squad_sim")]
#[command(about = "Run squad tactic scenarios and inspect snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print outbound signals as JSON lines
    Run {
        /// Scenario file (.yaml or .json)
        scenario: PathBuf,

        /// Exit with an error when an assertion fails
        #[arg(long, default_value = "false")]
        strict: bool,
    },

    /// Run a scenario and save the final squad state
    Snapshot {
        /// Scenario file (.yaml or .json)
        scenario: PathBuf,

        /// Output snapshot path
        #[arg(long)]
        out: PathBuf,
    },

    /// Print a snapshot as JSON
    Inspect {
        /// Snapshot path
        snapshot: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario, strict } => {
            let report = squad_sim::run_file(&scenario)?;
            let stdout = std::io::stdout();
            squad_sim::write_report(&report, &mut stdout.lock())?;
            if !report.passed() {
                for failure in &report.assertion_failures {
                    log::warn!("assertion failed: {}", failure);
                }
                if strict {
                    anyhow::bail!(
                        "{} assertion(s) failed in '{}'",
                        report.assertion_failures.len(),
                        report.id
                    );
                }
            }
        }
        Commands::Snapshot { scenario, out } => {
            let summary = squad_sim::snapshot_file(&scenario, &out)?;
            println!("Snapshot written: {}", out.display());
            println!("   Scenario:     {}", summary.scenario);
            println!("   Frames:       {}", summary.frames_run);
            println!("   Units:        {}", summary.units);
            println!("   Live actions: {}", summary.live_actions);
            println!("   Size:         {} bytes", summary.size_bytes);
        }
        Commands::Inspect { snapshot } => {
            println!("{}", squad_sim::inspect_file(&snapshot)?);
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("squad_sim CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
