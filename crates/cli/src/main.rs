//! textpilot CLI, the main entry point.
//!
//! Commands:
//! - `serve` : Start the webhook server
//! - `ping`  : Run one scheduled check-in (for cron)
//! - `ask`   : Run the agent once on a question and print the reply

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod wiring;

#[derive(Parser)]
#[command(
    name = "textpilot",
    about = "textpilot: an SMS agent that answers texts and runs scheduled check-ins",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.textpilot/config.toml)
    #[arg(long, global = true, env = "TEXTPILOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP webhook server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one scheduled check-in and exit
    Ping {
        /// Refuse side-effecting tools (texts, sheet writes)
        #[arg(short, long)]
        dry_run: bool,

        /// Pretend it is this Eastern time: "YYYY-MM-DD,HH:MM" or "YYYY-MM-DD"
        #[arg(short = 't', long, value_name = "TIME")]
        simulate_time: Option<String>,
    },

    /// Ask the agent a question from the terminal
    Ask {
        /// The question
        #[arg(required = true)]
        query: Vec<String>,

        /// Refuse side-effecting tools
        #[arg(short, long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve { port } => commands::serve::run(cli.config.as_deref(), port).await,
        Commands::Ping { dry_run, simulate_time } => {
            let options = textpilot_agent::PingOptions { dry_run, simulate_time };
            return commands::ping::run(cli.config.as_deref(), options).await;
        }
        Commands::Ask { query, dry_run } => {
            commands::ask::run(cli.config.as_deref(), &query.join(" "), dry_run).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
