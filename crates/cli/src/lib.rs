pub mod commands;

use circle_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::Level;

use commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "circle",
    about = "Circle operator CLI",
    long_about = "Operate Circle migrations, demo data, config inspection, readiness checks, and ad-hoc recommendations.",
    after_help = "Examples:\n  circle doctor --json\n  circle seed\n  circle recommend --query \"desk lamp\" --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset and rebuild event vectors")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, embedding readiness, database schema, and demo data")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Rank products from friend activity and print the response payload")]
    Recommend {
        #[arg(long, short, help = "Free-text query; omit for social ranking")]
        query: Option<String>,
        #[arg(long, short, help = "Only return products in this category")]
        category: Option<String>,
        #[arg(long, short, help = "Maximum number of items (1-50)")]
        limit: Option<usize>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Recommend { query, category, limit } => {
            commands::recommend::run(RecommendArgs { query, category, limit })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Subscriber setup from `logging.level` and `logging.format`, writing to stderr since stdout
/// carries the command outcome. A config that fails to load logs warnings only; the command
/// itself reports the config error.
pub fn init_logging() {
    let config = AppConfig::load(LoadOptions::default()).ok();
    let (level, format) = logging_settings(config.as_ref());
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(level);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn logging_settings(config: Option<&AppConfig>) -> (Level, LogFormat) {
    match config {
        Some(config) => (
            config.logging.level.parse::<Level>().unwrap_or(Level::INFO),
            config.logging.format,
        ),
        None => (Level::WARN, LogFormat::Compact),
    }
}
