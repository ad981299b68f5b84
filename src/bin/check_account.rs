//! Account check binary.

use std::path::PathBuf;

use clap::Parser;
use tg_accounts::commands::check;
use tg_accounts::input::StdinPrompt;

#[derive(Parser)]
#[command(about = "Connect a Telegram account and show the authorized user")]
struct Args {
    /// Account name (default: first account in the config)
    account: Option<String>,

    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    check::run(args.config.as_deref(), args.account.as_deref(), &mut StdinPrompt).await?;
    Ok(())
}
