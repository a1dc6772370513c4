//! # Markdown Stylist (library root)
//!
//! A small web service that conforms markdown to a named style guide, or
//! scores how well it already does, by handing both to an OpenAI compatible
//! chat-completions API.
//!
//! The crate is split into:
//! - Style guide storage on local disk (`store`).
//! - Heuristic markdown linting (`validate`) and markdown to safe HTML
//!   rendering (`sanitize`).
//! - Prompt templates and the completion adapter (`template`, `api`).
//! - The HTTP service (`server`) and its error envelope (`error`).
//! - Configuration and the command line (`config`, `commands`).
//!
//! ## Config directory
//! The optional `config.yaml` lives in the per-platform config directory
//! returned by [`config_dir`], e.g.:
//!
//! - macOS: `~/Library/Application Support/com.awful-sec.stylist`
//! - Linux (XDG): `~/.config/stylist`
//! - Windows: `C:\Users\<you>\AppData\Roaming\awful-sec\stylist\config`
//!
//! ## Modules
//! - [`api`], [`commands`], [`config`], [`error`], [`sanitize`], [`server`],
//!   [`store`], [`template`], [`validate`]

use directories::ProjectDirs;

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod sanitize;
pub mod server;
pub mod store;
pub mod template;
pub mod validate;

use error::ConfigError;

/// Return the per-platform configuration directory used by the service.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "awful-sec", "stylist")`. The directory is **not** created by
/// this function.
///
/// # Errors
/// Returns [`ConfigError::NoConfigDir`] if the platform configuration
/// directory cannot be determined (rare, but possible in sandboxes with no
/// home directory).
///
/// # Examples
/// ```no_run
/// let cfg = markdown_stylist::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("com", "awful-sec", "stylist").ok_or(ConfigError::NoConfigDir)?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
