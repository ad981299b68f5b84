//! Session initialization binary.

use std::path::PathBuf;

use clap::Parser;
use tg_accounts::commands::login;
use tg_accounts::input::StdinPrompt;

#[derive(Parser)]
#[command(about = "Log a Telegram account in and save its session")]
struct Args {
    /// Account name; the session is saved as sessions/<account>.session
    account: String,

    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    login::run(args.config.as_deref(), &args.account, &mut StdinPrompt).await?;
    Ok(())
}
