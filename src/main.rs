//! tg_accounts CLI - main entry point
//!
//! Runs the configured accounts and the helper tools around them.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tg_accounts::commands;
use tg_accounts::input::StdinPrompt;

#[derive(Parser)]
#[command(name = "tg_accounts")]
#[command(about = "Multi-account Telegram manager with LLM auto-replies and media forwarding", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: config.yml, then config.json)
    #[arg(short, long, global = true, env = "TG_ACCOUNTS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every configured account (default)
    Run,

    /// Create a config file interactively
    Setup {
        /// Where to write the config
        #[arg(short, long, default_value = "config.yml")]
        output: PathBuf,
    },

    /// Log an account in and save its session under sessions/
    Login {
        /// Account name
        account: String,
    },

    /// Connect an account and show the authorized user
    Check {
        /// Account name (default: first account)
        account: Option<String>,
    },

    /// List dialogs with their ids and write them to chat_ids.json
    ChatIds {
        /// Account name (default: first account)
        account: Option<String>,

        /// Maximum number of dialogs
        #[arg(short, long, default_value_t = commands::chat_ids::DEFAULT_LIMIT)]
        limit: usize,

        /// Output file
        #[arg(short, long, default_value = tg_accounts::chat::CHAT_IDS_FILE)]
        output: PathBuf,
    },

    /// Send a test request to an LLM endpoint
    LlmCheck {
        /// Endpoint URL
        #[arg(default_value = tg_accounts::config::DEFAULT_LLM_API_URL)]
        url: String,

        /// Bearer token
        #[arg(long, env = "LLM_API_KEY")]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tg_accounts=info".parse()?))
        .init();

    let cli = Cli::parse();

    let metrics_running = cli
        .metrics_addr
        .as_deref()
        .map(commands::run::start_metrics)
        .unwrap_or(false);

    let config = cli.config.as_deref();
    let mut prompt = StdinPrompt;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            commands::run::run(config, metrics_running).await?;
        }
        Commands::Setup { output } => {
            commands::setup::run(&output, &mut prompt)?;
        }
        Commands::Login { account } => {
            commands::login::run(config, &account, &mut prompt).await?;
        }
        Commands::Check { account } => {
            commands::check::run(config, account.as_deref(), &mut prompt).await?;
        }
        Commands::ChatIds {
            account,
            limit,
            output,
        } => {
            commands::chat_ids::run(config, account.as_deref(), limit, &output, &mut prompt)
                .await?;
        }
        Commands::LlmCheck { url, api_key } => {
            commands::llm_check::run(&url, api_key).await?;
        }
    }

    Ok(())
}
