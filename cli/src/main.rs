use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod util;

use commands::journal::JournalCommands;

#[derive(Parser)]
#[command(name = "moodlog", version, about = "Moodlog CLI for journal entries and mood analysis")]
struct Cli {
    /// API base URL
    #[arg(long, env = "MOODLOG_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// User ID sent as the x-user-id header
    #[arg(long, env = "MOODLOG_USER_ID")]
    user_id: Option<String>,

    /// Print diagnostics to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Journal entry operations
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },
    /// Ask for a narrative insight over mood counts
    Insight(commands::insight::InsightArgs),
    /// Extract and normalize an analysis from raw model output, offline
    Analyze(commands::analyze::AnalyzeArgs),
    /// Analyze a draft on the server without storing it
    Preview(commands::preview::PreviewArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Journal { command } => {
            let user_id = util::require_user_id(cli.user_id.as_deref());
            commands::journal::run(&cli.api_url, &user_id, command).await
        }
        Commands::Insight(args) => {
            let user_id = util::require_user_id(cli.user_id.as_deref());
            commands::insight::run(&cli.api_url, &user_id, args).await
        }
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Preview(args) => {
            let user_id = util::require_user_id(cli.user_id.as_deref());
            commands::preview::run(&cli.api_url, &user_id, args).await
        }
    };

    std::process::exit(code);
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "moodlog=info",
        _ => "moodlog=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MOODLOG_LOG").unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
