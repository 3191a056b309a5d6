pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tenderdesk_core::access::Role;
use tenderdesk_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "tenderdesk",
    about = "Tenderdesk operator CLI",
    long_about = "Operate the subcontractor tender approval workflow: migrations, \
                  submissions, reviews, and decisions.",
    after_help = "Examples:\n  tenderdesk migrate\n  tenderdesk submit request.json --actor qs@site.co.uk --roles submitter\n  tenderdesk decide <id> approve --actor lead@site.co.uk --roles approver"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Submit an approval request described by a JSON file")]
    Submit {
        #[arg(help = "Path to a JSON submit command")]
        file: PathBuf,
        #[arg(long, help = "Authenticated caller email")]
        actor: String,
        #[arg(long, value_delimiter = ',', help = "Caller roles (submitter,approver)")]
        roles: Vec<Role>,
    },
    #[command(about = "List all approval requests, newest first")]
    List {
        #[arg(long, help = "Authenticated caller email")]
        actor: String,
        #[arg(long, value_delimiter = ',', default_value = "submitter")]
        roles: Vec<Role>,
    },
    #[command(about = "Show one approval request with its bid comparison and history")]
    Show {
        id: String,
        #[arg(long, help = "Authenticated caller email")]
        actor: String,
        #[arg(long, value_delimiter = ',', default_value = "submitter")]
        roles: Vec<Role>,
    },
    #[command(about = "Approve or reject a pending approval request")]
    Decide {
        id: String,
        #[arg(value_enum)]
        action: commands::decide::DecisionArg,
        #[arg(long, help = "Optional decision notes")]
        notes: Option<String>,
        #[arg(long, help = "Authenticated caller email")]
        actor: String,
        #[arg(long, value_delimiter = ',', default_value = "approver")]
        roles: Vec<Role>,
    },
    #[command(about = "Inspect effective configuration with secrets redacted")]
    Config,
}

fn init_logging(config: &AppConfig) {
    use tenderdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let result = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };
    // Re-initialization only happens in-process during tests.
    let _ = result;
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&AppConfig::load(LoadOptions::default()).unwrap_or_default());

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Submit { file, actor, roles } => commands::submit::run(&file, &actor, roles),
        Command::List { actor, roles } => commands::list::run(&actor, roles),
        Command::Show { id, actor, roles } => commands::show::run(&id, &actor, roles),
        Command::Decide { id, action, notes, actor, roles } => {
            commands::decide::run(&id, action, notes, &actor, roles)
        }
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
