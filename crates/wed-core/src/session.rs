use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

/// Who is signed in right now, as reported by the auth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub is_valid: bool,
    pub email: Option<String>,
}

impl SessionUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_valid: true,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Account ids issued by the auth backend are UUIDs; older installs used
    /// plain numeric ids that the backend never saw.
    pub fn is_durable_account(&self) -> bool {
        Uuid::parse_str(&self.user_id).is_ok()
    }
}

/// Answers "who is the current user, and is their session valid".
/// Implementations must not retry or block on the network.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    async fn current_user(&self) -> Option<SessionUser>;
}

/// Session held in memory and switched explicitly by the app shell
#[derive(Debug, Default)]
pub struct SwitchableSession {
    current: RwLock<Option<SessionUser>>,
}

impl SwitchableSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: SessionUser) -> Self {
        Self {
            current: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: SessionUser) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Keep the user but mark the session expired
    pub fn invalidate(&self) {
        if let Some(user) = self
            .current
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            user.is_valid = false;
        }
    }
}

#[async_trait]
impl SessionProbe for SwitchableSession {
    async fn current_user(&self) -> Option<SessionUser> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Machine-local auth state written by the sign-in flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub auth: AuthState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthState {
    /// Authenticated account id
    pub user_id: Option<String>,

    /// Account email address
    pub email: Option<String>,

    /// Expiration timestamp of the session
    pub expires_at: Option<DateTime<Utc>>,
}

impl State {
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize state")?;
        std::fs::write(path, toml_str).context("Failed to write state file")?;
        Ok(())
    }
}

/// Session read from the `[auth]` table of the state file on every probe
#[derive(Debug, Clone)]
pub struct StateFileSession {
    path: PathBuf,
}

impl StateFileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionProbe for StateFileSession {
    async fn current_user(&self) -> Option<SessionUser> {
        let path = self.path.clone();
        let state = match tokio::task::spawn_blocking(move || State::load_from(&path)).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                tracing::warn!("Ignoring unreadable session state: {:#}", e);
                return None;
            }
            Err(e) => {
                tracing::warn!("Session state reader failed: {}", e);
                return None;
            }
        };
        let user_id = state.auth.user_id.filter(|id| !id.trim().is_empty())?;
        let is_valid = state
            .auth
            .expires_at
            .map(|expires| expires > Utc::now())
            .unwrap_or(true);
        Some(SessionUser {
            user_id,
            is_valid,
            email: state.auth.email,
        })
    }
}
