//! Startup context shared by every verb: merged configuration plus the
//! command metadata registry built from the configured catalog.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yaml::Value;
use tracing::debug;

use crate::config::ConfigStore;
use crate::registry::CommandMetadataRegistry;

/// Setting: shell-style command line of the local application.
pub const COMMAND_SETTING: &str = "command";
/// Setting: path of the YAML command catalog (registry export format).
pub const CATALOG_SETTING: &str = "catalog";
/// Setting: routing token used when none is given.
pub const DEFAULT_ALIAS_SETTING: &str = "default_alias";
/// Environment fallback for the routing token.
pub const ALIAS_ENV: &str = "RELAY_ALIAS";
/// Local application command when `command` is unset.
pub const DEFAULT_COMMAND: &str = "app";

pub struct AppContext {
    pub config: ConfigStore,
    pub registry: CommandMetadataRegistry,
}

impl AppContext {
    /// Load configuration from the standard locations, then the catalog it
    /// points at (relative paths resolve against the working directory).
    pub fn load() -> Result<Self> {
        let config = ConfigStore::load().context("Failed to load configuration")?;
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Self::from_config(config, &cwd)
    }

    pub fn from_config(config: ConfigStore, base_dir: &Path) -> Result<Self> {
        let mut registry = CommandMetadataRegistry::new();
        if let Some(path) = catalog_path(&config, base_dir) {
            load_catalog(&mut registry, &path)?;
        }
        Ok(Self { config, registry })
    }

    /// Routing token precedence: command line > `RELAY_ALIAS` > `default_alias`.
    pub fn effective_token(&self, cli_token: Option<String>) -> Option<String> {
        let env_token = std::env::var(ALIAS_ENV).ok();
        pick_token(
            cli_token,
            env_token,
            self.config.get_str(DEFAULT_ALIAS_SETTING).map(str::to_string),
        )
    }

    /// Local application command line (`command` setting or `app`).
    pub fn local_command(&self) -> &str {
        self.config
            .get_str(COMMAND_SETTING)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_COMMAND)
    }
}

fn pick_token(
    cli: Option<String>,
    env: Option<String>,
    configured: Option<String>,
) -> Option<String> {
    [cli, env, configured]
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
}

fn catalog_path(config: &ConfigStore, base_dir: &Path) -> Option<PathBuf> {
    let raw = config.get_str(CATALOG_SETTING)?.trim();
    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    Some(if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    })
}

/// Read a YAML catalog and register every entry.
pub fn load_catalog(registry: &mut CommandMetadataRegistry, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read command catalog: {}", path.display()))?;
    let data: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse command catalog: {}", path.display()))?;
    let count = registry
        .load(&data)
        .with_context(|| format!("Invalid command catalog: {}", path.display()))?;
    debug!(path = %path.display(), count, "command catalog loaded");
    Ok(count)
}
