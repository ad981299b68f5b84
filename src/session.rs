//! Session management for Telegram accounts
//!
//! Provides:
//! - Per-session file locking so two processes never drive the same account
//! - Session file validation, loading and export
//! - Client creation and interactive authorization

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::types::User;
use grammers_client::{Client, SignInError};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{AccountConfig, ApiCredentials};
use crate::error::{Error, Result};
use crate::input::Prompt;

/// Lock file guarding a session: `<session>.lock`
pub fn lock_path(session_path: &Path) -> PathBuf {
    session_path.with_extension("lock")
}

/// Session lock guard that ensures exclusive access to one Telegram session.
#[derive(Debug)]
pub struct SessionLock {
    lock_file: Option<File>,
    path: PathBuf,
}

impl SessionLock {
    /// Acquire an exclusive lock for the given session file.
    pub fn acquire(session_path: &Path) -> Result<Self> {
        let path = lock_path(session_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: Some(lock_file),
                path,
            }),
            Err(_) => Err(Error::SessionLocked(session_path.display().to_string())),
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Check if the session file exists.
pub fn check_session_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::SessionNotFound(path.display().to_string()));
    }
    Ok(())
}

/// Load an existing session from file.
pub fn load_session(path: &Path) -> Result<Arc<SqliteSession>> {
    check_session_exists(path)?;
    let session = SqliteSession::open(path)
        .map_err(|e| Error::SessionNotFound(format!("Failed to load session: {}", e)))?;
    Ok(Arc::new(session))
}

/// Open or create a session file (used for phone login).
pub fn create_session(path: &Path) -> Result<Arc<SqliteSession>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let session = SqliteSession::open(path)
        .map_err(|e| Error::SessionNotFound(format!("Failed to create session: {}", e)))?;
    Ok(Arc::new(session))
}

/// Copy a session file to a new location, creating parent directories.
pub fn export_session(from: &Path, to: &Path) -> Result<PathBuf> {
    check_session_exists(from)?;
    if from == to {
        return Ok(to.to_path_buf());
    }
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    info!(from = %from.display(), to = %to.display(), "Session exported");
    Ok(to.to_path_buf())
}

/// Holder for SenderPool components and Client
pub struct TelegramClient {
    pub client: Client,
    pub handle: SenderPoolHandle,
    updates: Option<mpsc::UnboundedReceiver<UpdatesLike>>,
    runner_handle: tokio::task::JoinHandle<()>,
    _lock: Option<SessionLock>,
}

impl TelegramClient {
    /// Create a new TelegramClient from session
    pub async fn connect(session: Arc<SqliteSession>, api_id: i32) -> Result<Self> {
        let pool = SenderPool::new(session, api_id);
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner_handle = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle,
            updates: Some(updates),
            runner_handle,
            _lock: None,
        })
    }

    /// Keep the session lock alive for as long as the client.
    pub fn hold_lock(&mut self, lock: SessionLock) {
        self._lock = Some(lock);
    }

    /// Take ownership of the updates receiver to build an UpdateStream.
    /// Returns None if updates were already taken.
    pub fn take_updates(&mut self) -> Option<mpsc::UnboundedReceiver<UpdatesLike>> {
        self.updates.take()
    }

    /// Stop the network runner and release the session lock.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl Drop for TelegramClient {
    fn drop(&mut self) {
        self.runner_handle.abort();
    }
}

impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Log in with a phone number: request a code, sign in, handle 2FA.
pub async fn sign_in_with_phone(
    client: &Client,
    phone: &str,
    api_hash: &str,
    prompt: &mut dyn Prompt,
) -> Result<User> {
    println!("Sending login code to {}...", phone);
    let token = client
        .request_login_code(phone, api_hash)
        .await
        .map_err(|e| Error::TelegramError(format!("Failed to request code: {}", e)))?;

    let code = prompt.read_line("Enter the code from Telegram: ")?;

    match client.sign_in(&token, &code).await {
        Ok(user) => {
            println!("✓ Signed in");
            Ok(user)
        }
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("no hint").to_string();
            let password = prompt.read_line(&format!("Enter your 2FA password (hint: {}): ", hint))?;
            let user = client
                .check_password(password_token, password.trim())
                .await
                .map_err(|e| Error::TelegramError(format!("2FA check failed: {}", e)))?;
            println!("✓ Signed in (2FA)");
            Ok(user)
        }
        Err(SignInError::InvalidCode) => {
            Err(Error::InvalidArgument("invalid login code".to_string()))
        }
        Err(e) => Err(Error::TelegramError(format!("Failed to sign in: {}", e))),
    }
}

/// Connect an account from its ready-made session file. The session must be authorized.
pub async fn connect_from_session_file(path: &Path, api_id: i32) -> Result<TelegramClient> {
    let lock = SessionLock::acquire(path)?;
    let session = load_session(path)?;
    let mut client = TelegramClient::connect(session, api_id).await?;
    client.hold_lock(lock);

    if !client.is_authorized().await? {
        client.disconnect();
        return Err(Error::Unauthorized(format!(
            "{}: delete the session file and log in again",
            path.display()
        )));
    }

    info!(session = %path.display(), "Session loaded");
    Ok(client)
}

/// Connect an account by phone, reusing the saved session when already authorized.
pub async fn connect_with_phone(
    session_path: &Path,
    phone: &str,
    creds: &ApiCredentials,
    prompt: &mut dyn Prompt,
) -> Result<TelegramClient> {
    let lock = SessionLock::acquire(session_path)?;
    let session = create_session(session_path)?;
    let mut client = TelegramClient::connect(session, creds.api_id).await?;
    client.hold_lock(lock);

    let authorized = match client.is_authorized().await {
        Ok(authorized) => authorized,
        Err(e) => {
            client.disconnect();
            return Err(e.into());
        }
    };

    if authorized {
        info!(session = %session_path.display(), "Account already authorized from saved session");
        return Ok(client);
    }

    if let Err(e) = sign_in_with_phone(&client, phone, &creds.api_hash, prompt).await {
        client.disconnect();
        return Err(e);
    }

    Ok(client)
}

/// Connect and authorize one configured account.
///
/// A configured `session_file` wins over `phone`; an account with neither
/// cannot be started.
pub async fn initialize_account(
    account: &AccountConfig,
    creds: &ApiCredentials,
    prompt: &mut dyn Prompt,
) -> Result<TelegramClient> {
    if let Some(path) = &account.session_file {
        return connect_from_session_file(path, creds.api_id).await;
    }

    match account.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(phone) => connect_with_phone(&account.session_path(), phone, creds, prompt).await,
        None => {
            warn!(account = %account.name, "Neither session_file nor phone configured");
            Err(Error::InvalidArgument(format!(
                "account '{}' needs a session_file or a phone number",
                account.name
            )))
        }
    }
}
