//! Half-Commissioning CLI
//!
//! Sorting and analysis of simulated half-commissioning events.

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "hc_tools")]
#[command(version, about = "Half-commissioning event sorting and analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct RunArgs {
    /// Input event files (.jsonl, .json, .hcz)
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Maximum number of events read from each input file
    #[arg(short, long)]
    number: Option<usize>,

    /// Run configuration (YAML, or JSON with a .json extension)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Selection profile (commissioning, half_zone_<n>)
    #[arg(long)]
    profile: Option<String>,

    /// Debug logging
    #[arg(short, long, default_value = "false")]
    debug: bool,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Keep the events touching the selected region
    Sort {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Sort, classify and fill the run histograms
    Analyze {
        #[command(flatten)]
        run: RunArgs,

        /// Calorimeter energy threshold in keV
        #[arg(long)]
        calo_threshold: Option<f64>,

        /// Calorimeter selector rule file
        #[arg(long)]
        calo_rules: Option<PathBuf>,

        /// Tracker selector rule file
        #[arg(long)]
        tracker_rules: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        profile: Option<String>,
    },
}

#[cfg(feature = "cli")]
impl Commands {
    fn debug(&self) -> bool {
        match self {
            Commands::Sort { run } | Commands::Analyze { run, .. } => run.debug,
            Commands::Config { .. } => false,
        }
    }
}

#[cfg(feature = "cli")]
fn run_options(run: &RunArgs) -> hc_tools::RunOptions {
    let mut options = hc_tools::RunOptions::new(run.input.clone(), &run.output);
    options.max_events_per_file = run.number;
    options
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sort { run } => {
            let config = hc_tools::load_config(run.config.as_deref(), run.profile.as_deref())?;
            let summary = hc_tools::sort(&config, &run_options(&run))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Analyze {
            run,
            calo_threshold,
            calo_rules,
            tracker_rules,
        } => {
            let mut config =
                hc_tools::load_config(run.config.as_deref(), run.profile.as_deref())?;
            if let Some(threshold) = calo_threshold {
                config.calo_threshold_kev = threshold;
            }
            let rules = hc_tools::RuleFiles {
                calo: calo_rules,
                tracker: tracker_rules,
            };
            let outputs = hc_tools::analyze(&config, &run_options(&run), &rules)?;
            println!("{}", serde_json::to_string_pretty(&outputs.summary)?);
            println!("Histograms: {}", outputs.histogram_path.display());
            println!("Summary:    {}", outputs.summary_path.display());
        }

        Commands::Config { config, profile } => {
            let config = hc_tools::load_config(config.as_deref(), profile.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    hc_tools::init_logging(cli.command.debug());

    match run(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) if hc_tools::is_startup_error(&e) => {
            tracing::error!("Run not started: {:#}", e);
            std::process::ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("hc_tools CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
