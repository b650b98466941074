//! cogbattery CLI — runs the battery in a terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cogbattery", version, about = "Timed cognitive-testing battery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session interactively
    Run {
        /// Participant ID (digits only); prompted for when omitted
        #[arg(long)]
        participant: Option<String>,

        /// Week number; prompted for when omitted
        #[arg(long)]
        week: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for the results file (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the completion lock of a participant and week
    Status {
        /// Participant ID
        #[arg(long)]
        participant: String,

        /// Week number
        #[arg(long)]
        week: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the summary of a saved results file
    Show {
        /// Results JSON written by `run`
        #[arg(long)]
        results: PathBuf,
    },

    /// Create a starter config
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cogbattery=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            participant,
            week,
            config,
            output,
        } => commands::run::execute(participant, week, config, output).await,
        Commands::Status {
            participant,
            week,
            config,
        } => commands::status::execute(participant, week, config),
        Commands::Show { results } => commands::show::execute(results),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
