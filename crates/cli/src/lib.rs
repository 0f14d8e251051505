pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "rfqdesk",
    about = "rfqdesk operator CLI",
    long_about = "Operate rfqdesk storage, demo data, config inspection, and RFQ summaries.",
    after_help = "Examples:\n  rfqdesk migrate\n  rfqdesk config\n  rfqdesk summary RFQ-2026-0001"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo projects, suppliers and catalog materials")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Render the supplier invitation text for a stored RFQ")]
    Summary {
        #[arg(help = "RFQ identifier, e.g. RFQ-2026-0001")]
        rfq_id: String,
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
        Command::Summary { rfq_id } => commands::summary::run(&rfq_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
