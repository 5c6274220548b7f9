use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the wed client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding event documents (defaults to ~/.config/wed/wed.db)
    pub database_path: Option<PathBuf>,
}

/// Event backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the backend, e.g. "https://project.supabase.co"
    pub base_url: String,

    /// Public API key sent as the `apikey` header
    pub anon_key: String,

    /// Bearer token of the signed-in user, if the backend requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Machine-local auth state (defaults to ~/.config/wed/state.toml)
    pub state_path: Option<PathBuf>,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn config_dir() -> Result<PathBuf> {
    // Always use ~/.config/wed/ regardless of platform
    let home_dir = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home_dir.join(".config").join("wed"))
}

impl Config {
    /// Load configuration from `WED_CONFIG` or the default location,
    /// writing a default file on first run
    pub fn load() -> Result<Self> {
        if let Ok(custom_path) = std::env::var("WED_CONFIG") {
            return Self::load_from(&PathBuf::from(custom_path));
        }
        let config_dir = config_dir()?;
        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
            let default_config = Self::default();
            let toml_str = toml::to_string_pretty(&default_config)
                .context("Failed to serialize default config")?;
            fs::write(&config_path, format!("# wed configuration\n\n{}", toml_str))
                .context("Failed to write default config file")?;
            return Ok(default_config);
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(expand_home(path)),
            None => Ok(config_dir()?.join("wed.db")),
        }
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.session.state_path {
            Some(path) => Ok(expand_home(path)),
            None => Ok(config_dir()?.join("state.toml")),
        }
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[storage]
database_path = "/tmp/wed-test.db"

[remote]
base_url = "https://example.supabase.co"
anon_key = "anon"

[session]
state_path = "/tmp/wed-state.toml"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/wed-test.db")
        );
        let remote = config.remote.unwrap();
        assert_eq!(remote.timeout_seconds, 30);
        assert_eq!(remote.access_token, None);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.remote.is_none());
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn tilde_paths_expand() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/wed/wed.db")),
                home.join("wed").join("wed.db")
            );
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
