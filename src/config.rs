//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Archiver configuration, passed explicitly into every component
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Root folder under which `{type}/{name} - id {id}` directories are created
    pub destination_root: PathBuf,

    /// Civitai API token, raises rate limits and unlocks gated models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Rewrite metadata.json for models that are already archived
    pub update_metadata: bool,
    /// Copy the previous metadata.json into metadata_backup/ before rewriting
    pub backup_metadata: bool,

    pub skip_duplicate_models: bool,
    /// Save model files under a `files` subfolder
    pub use_subfolder: bool,

    pub skip_duplicate_images: bool,
    /// Redownload previews whose existing copy is empty
    pub redownload_corrupted: bool,

    pub api_base_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    pub show_progress: bool,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            destination_root: default_destination_root(),
            auth_token: None,
            update_metadata: true,
            backup_metadata: true,
            skip_duplicate_models: true,
            use_subfolder: false,
            skip_duplicate_images: true,
            redownload_corrupted: false,
            api_base_url: default_api_base_url(),
            request_timeout_secs: None,
            show_progress: true,
        }
    }
}

impl ArchiverConfig {
    /// Load configuration from file with environment variable overrides
    ///
    /// Without an explicit path, `$XDG_CONFIG_HOME/civitai-archiver/config.toml`
    /// is used when it exists.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(|| default_config_path().filter(|p| p.exists()));

        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        if let Ok(root) = std::env::var("CIVITAI_ARCHIVER_ROOT") {
            config.destination_root = PathBuf::from(root);
        }
        if let Ok(token) = std::env::var("CIVITAI_TOKEN") {
            config.auth_token = Some(token);
        }
        if let Ok(base) = std::env::var("CIVITAI_API_BASE") {
            config.api_base_url = base;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.destination_root.as_os_str().is_empty() {
            anyhow::bail!("destination_root cannot be empty");
        }

        if let Some(token) = &self.auth_token
            && token.trim().is_empty()
        {
            anyhow::bail!("auth_token is set but empty");
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            anyhow::bail!(
                "api_base_url must be an http(s) URL (got {:?})",
                self.api_base_url
            );
        }

        if self.request_timeout_secs == Some(0) {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

/// Location of the per-user config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("civitai-archiver").join("config.toml"))
}

fn default_destination_root() -> PathBuf {
    PathBuf::from("models")
}
fn default_api_base_url() -> String {
    "https://civitai.com".to_string()
}
