//! Runs every configured account side by side until Ctrl+C
//!
//! Accounts are initialized one at a time (logins may prompt), then each
//! account listens for updates in its own future. One account failing
//! never stops the others.

use std::sync::Arc;

use futures::future::join_all;
use grammers_client::client::UpdatesConfiguration;
use grammers_client::types::update::Update;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::{AccountConfig, ApiCredentials, AppConfig};
use crate::error::{Error, Result};
use crate::handlers::AccountHandlers;
use crate::input::Prompt;
use crate::metrics;
use crate::session::{initialize_account, TelegramClient};

/// A connected, authorized account with its handlers
pub struct RunningAccount {
    pub name: String,
    pub client: TelegramClient,
    pub handlers: Arc<AccountHandlers>,
}

pub struct AccountManager {
    config: AppConfig,
}

impl AccountManager {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Connect every configured account; failures are logged and skipped.
    pub async fn initialize(
        &self,
        creds: &ApiCredentials,
        prompt: &mut dyn Prompt,
    ) -> Vec<RunningAccount> {
        let mut running = Vec::new();

        for account in &self.config.accounts {
            info!(account = %account.name, "Initializing account");
            match start_account(account, creds, prompt).await {
                Ok(started) => running.push(started),
                Err(e) => error!(
                    account = %account.name,
                    "Account skipped: {}",
                    describe_init_error(&e)
                ),
            }
        }

        running
    }

    /// Initialize all accounts and process updates until Ctrl+C.
    ///
    /// The Ctrl+C handler is installed only once every account is up, so an
    /// interrupt during a login prompt still ends the process.
    pub async fn run_all(&self, prompt: &mut dyn Prompt) -> Result<()> {
        let accounts = self.start(prompt).await?;
        self.serve(accounts, shutdown_on_ctrl_c()).await;
        Ok(())
    }

    /// Like [`run_all`](Self::run_all) with an external shutdown signal.
    pub async fn run_until(
        &self,
        prompt: &mut dyn Prompt,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let accounts = self.start(prompt).await?;
        self.serve(accounts, shutdown).await;
        Ok(())
    }

    /// Resolve credentials and connect every account; at least one must start.
    pub async fn start(&self, prompt: &mut dyn Prompt) -> Result<Vec<RunningAccount>> {
        if self.config.accounts.is_empty() {
            return Err(Error::Config("no accounts configured".to_string()));
        }

        let creds = self.config.api_credentials(prompt)?;
        let accounts = self.initialize(&creds, prompt).await;

        if accounts.is_empty() {
            return Err(Error::NoAccounts);
        }
        Ok(accounts)
    }

    /// Listen on every started account until `shutdown` flips, then disconnect.
    pub async fn serve(
        &self,
        mut accounts: Vec<RunningAccount>,
        shutdown: watch::Receiver<bool>,
    ) {
        info!(
            "{} of {} accounts running, press Ctrl+C to stop",
            accounts.len(),
            self.config.accounts.len()
        );
        metrics::set_active_accounts(accounts.len());

        join_all(
            accounts
                .iter_mut()
                .map(|account| listen(account, shutdown.clone())),
        )
        .await;

        for account in accounts {
            info!(account = %account.name, "Disconnecting");
            account.client.disconnect();
        }
        metrics::set_active_accounts(0);
    }
}

/// Shutdown signal that flips on the first Ctrl+C
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });
    shutdown_rx
}

async fn start_account(
    account: &AccountConfig,
    creds: &ApiCredentials,
    prompt: &mut dyn Prompt,
) -> Result<RunningAccount> {
    let handlers = AccountHandlers::from_config(account)?;
    if handlers.is_idle() {
        warn!(account = %account.name, "No handlers enabled, account will only stay online");
    }

    let client = initialize_account(account, creds, prompt).await?;
    let me = client.get_me().await?;
    info!(
        account = %account.name,
        user_id = me.raw.id(),
        username = me.username().unwrap_or("-"),
        "Account ready"
    );

    Ok(RunningAccount {
        name: account.name.clone(),
        client,
        handlers: Arc::new(handlers),
    })
}

/// Receive updates for one account until shutdown or a stream error.
async fn listen(account: &mut RunningAccount, mut shutdown: watch::Receiver<bool>) {
    let Some(updates_rx) = account.client.take_updates() else {
        warn!(account = %account.name, "Updates stream already taken");
        return;
    };

    let mut updates = account.client.stream_updates(
        updates_rx,
        UpdatesConfiguration {
            catch_up: false,
            ..Default::default()
        },
    );

    info!(account = %account.name, "Listening for messages");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            update = updates.next() => {
                match update {
                    Ok(Update::NewMessage(msg)) => {
                        let client = account.client.client.clone();
                        let handlers = Arc::clone(&account.handlers);
                        tokio::spawn(async move {
                            handlers.dispatch(&client, &msg).await;
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(account = %account.name, "Update stream failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    updates.sync_update_state();
    info!(account = %account.name, "Stopped listening");
}

/// Human-readable reason an account could not start.
pub fn describe_init_error(err: &Error) -> String {
    match err {
        Error::SessionNotFound(path) => format!(
            "session file {} not found; run `login` or fix session_file",
            path
        ),
        Error::SessionLocked(path) => {
            format!("session {} is used by another process", path)
        }
        Error::Unauthorized(detail) => format!("session is not authorized ({})", detail),
        Error::InvalidApiCredentials => {
            "api_id/api_hash rejected by Telegram, check my.telegram.org".to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedPrompt;
    use std::time::Duration;

    #[test]
    fn init_errors_get_actionable_hints() {
        let msg = describe_init_error(&Error::SessionNotFound("sessions/a.session".into()));
        assert!(msg.contains("sessions/a.session"));
        assert!(msg.contains("login"));

        let msg = describe_init_error(&Error::InvalidApiCredentials);
        assert!(msg.contains("my.telegram.org"));

        let msg = describe_init_error(&Error::TelegramError("FLOOD_WAIT".into()));
        assert!(msg.contains("FLOOD_WAIT"));
    }

    #[tokio::test]
    async fn run_without_accounts_is_a_config_error() {
        let manager = AccountManager::new(AppConfig::default());
        let (_tx, rx) = watch::channel(false);
        let mut prompt = ScriptedPrompt::default();

        let err = manager.run_until(&mut prompt, rx).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(prompt.asked.is_empty());
    }

    #[tokio::test]
    async fn accounts_without_login_method_are_skipped() {
        let config = AppConfig::parse(
            r#"
telegram:
  api_id: 12345
  api_hash: abcdef0123456789
accounts:
  - name: first
  - name: second
"#,
        )
        .unwrap();
        let manager = AccountManager::new(config);
        let (_tx, rx) = watch::channel(false);
        let mut prompt = ScriptedPrompt::default();

        let err = manager.run_until(&mut prompt, rx).await.unwrap_err();
        assert!(matches!(err, Error::NoAccounts));
    }

    #[tokio::test]
    async fn start_without_accounts_is_a_config_error() {
        let manager = AccountManager::new(AppConfig::default());
        let mut prompt = ScriptedPrompt::default();

        assert!(matches!(manager.start(&mut prompt).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn serve_without_accounts_returns_immediately() {
        let manager = AccountManager::new(AppConfig::default());
        let (_tx, rx) = watch::channel(false);

        tokio::time::timeout(Duration::from_secs(1), manager.serve(Vec::new(), rx))
            .await
            .unwrap();
    }
}
