//! This module provides functionality for loading the service configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults ([`ServiceConfig::default`]),
//! 2. a YAML file (`--config <path>`, or `config.yaml` in the per-platform
//!    config directory when it exists),
//! 3. environment variables and command line flags ([`ConfigOverrides`]).
//!
//! The API key is optional. Without it the service still starts; style guide
//! management and validation work, and the completion endpoints report that
//! the client is not initialized.
//!
//! # Examples
//!
//! ```no_run
//! use markdown_stylist::config::load_config;
//!
//! let config = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{api::LlmSettings, error::ConfigError};

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Represents the service configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    /// Key used to authenticate against the completion API.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI compatible API.
    pub api_base: String,

    /// Model used for every completion request.
    pub model: String,

    /// Directory holding `<name>.md` style guides.
    pub style_guides_dir: PathBuf,

    /// Optional directory with `rewrite.yaml` / `analyze.yaml` prompt overrides.
    pub templates_dir: Option<PathBuf>,

    /// Address the HTTP server binds to.
    pub host: String,

    pub port: u16,

    /// Upper bound on one round trip to the completion API.
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            style_guides_dir: PathBuf::from("style_guides"),
            templates_dir: None,
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 120,
        }
    }
}

/// Values that override the config file, taken from flags or the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// API key for the completion provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI compatible API.
    #[arg(long, env = "OPENAI_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Model identifier.
    #[arg(long, env = "OPENAI_MODEL", global = true)]
    pub model: Option<String>,

    /// Directory holding style guides.
    #[arg(long, env = "STYLE_GUIDES_DIR", global = true)]
    pub style_guides_dir: Option<PathBuf>,

    /// Directory holding prompt template overrides.
    #[arg(long, env = "STYLIST_TEMPLATES_DIR", global = true)]
    pub templates_dir: Option<PathBuf>,

    #[arg(long, env = "STYLIST_HOST", global = true)]
    pub host: Option<String>,

    #[arg(long, env = "STYLIST_PORT", global = true)]
    pub port: Option<u16>,
}

impl ServiceConfig {
    /// Layer `overrides` on top of this config.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.api_key {
            self.api_key = Some(api_key);
        }
        if let Some(api_base) = overrides.api_base {
            self.api_base = api_base;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(dir) = overrides.style_guides_dir {
            self.style_guides_dir = dir;
        }
        if let Some(dir) = overrides.templates_dir {
            self.templates_dir = Some(dir);
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
    }

    /// Provider settings, or `None` when no usable API key is configured.
    pub fn llm_settings(&self) -> Option<LlmSettings> {
        let api_key = self.api_key.as_deref().map(str::trim).unwrap_or_default();
        if api_key.is_empty() {
            return None;
        }
        Some(LlmSettings {
            api_key: api_key.to_string(),
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            request_timeout_secs: self.request_timeout_secs,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads the configuration from a YAML file.
///
/// Keys missing from the file keep their defaults.
///
/// # Errors
///
/// - [`ConfigError::Read`] if the file cannot be read.
/// - [`ConfigError::Parse`] if it is not valid configuration YAML.
pub fn load_config(file: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = file.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Resolve the file layer: an explicit path must exist, while the default
/// location is optional.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    if let Some(path) = explicit {
        debug!("Loading config from: {}", path.display());
        return load_config(path);
    }

    let default_path = crate::config_dir()?.join(CONFIG_FILE_NAME);
    if default_path.is_file() {
        debug!("Loading config from: {}", default_path.display());
        load_config(&default_path)
    } else {
        debug!("No config file at {}, using defaults", default_path.display());
        Ok(ServiceConfig::default())
    }
}
