//! Layered configuration (user scope + project scope).
//!
//! ConfigStore::load -> merged, read-only view of both YAML documents.
//! Keys starting with `@` are routing aliases; everything else is an
//! ordinary setting.
//!
//! Load order (later wins, whole value replaced on collision):
//!   1. `$RELAY_CONFIG_PATH`, or `~/.relay/config.yml`
//!   2. `./relay.yml`

mod error;

pub use error::ConfigError;

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

/// Leading character that marks a routing alias key / token.
pub const ALIAS_SIGIL: char = '@';

/// Directory under the home directory holding the user-scope config.
pub const USER_CONFIG_DIR: &str = ".relay";

/// File name of the user-scope config inside [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.yml";

/// File name of the project-scope config in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "relay.yml";

/// Environment variable overriding the user-scope config location.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG_PATH";

/// Merged configuration for one process invocation.
///
/// Built once by [`ConfigStore::load`] (or [`ConfigStore::load_from`]) and
/// never mutated afterwards. Key order follows the user document first, then
/// any keys the project document introduces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    values: Mapping,
    sources: Vec<PathBuf>,
}

impl ConfigStore {
    /// An empty store (no files consulted).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the user-scope and project-scope documents from their
    /// well-known locations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file exists but cannot be read or parsed.
    /// Missing files are treated as empty documents.
    pub fn load() -> Result<Self, ConfigError> {
        let user = user_config_path();
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        let project = cwd.join(PROJECT_CONFIG_FILE);
        Self::load_from(user.as_deref(), Some(&project))
    }

    /// Load from explicit paths. `None` skips that scope entirely.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigStore::load`].
    pub fn load_from(user: Option<&Path>, project: Option<&Path>) -> Result<Self, ConfigError> {
        let mut sources = Vec::new();

        let user_doc = match user {
            Some(path) => read_document(path, &mut sources)?,
            None => Mapping::new(),
        };
        let project_doc = match project {
            Some(path) => read_document(path, &mut sources)?,
            None => Mapping::new(),
        };

        let mut store = Self::from_documents(user_doc, project_doc);
        store.sources = sources;
        debug!(
            keys = store.values.len(),
            sources = ?store.sources,
            "configuration loaded"
        );
        Ok(store)
    }

    /// Merge two already-parsed documents, project over user.
    ///
    /// The merge is shallow: a colliding key takes the project value as a
    /// whole, nested mappings are not combined.
    pub fn from_documents(user: Mapping, project: Mapping) -> Self {
        let mut values = user;
        for (key, value) in project {
            if values.contains_key(&key) {
                trace!(key = ?key, "project config overrides user config");
            }
            values.insert(key, value);
        }
        Self {
            values,
            sources: Vec::new(),
        }
    }

    /// Parse a YAML document into a top-level mapping.
    ///
    /// An empty document is an empty mapping. `path` only feeds error
    /// messages.
    pub fn parse_document(source: &str, path: &Path) -> Result<Mapping, ConfigError> {
        if source.trim().is_empty() {
            return Ok(Mapping::new());
        }
        let value: Value =
            serde_yaml::from_str(source).map_err(|e| ConfigError::parse(path, e))?;
        let mapping = match value {
            Value::Null => return Ok(Mapping::new()),
            Value::Mapping(m) => m,
            _ => {
                return Err(ConfigError::NotAMapping {
                    path: path.to_path_buf(),
                });
            }
        };
        if let Some(bad) = mapping.keys().find(|k| !k.is_string()) {
            return Err(ConfigError::NonStringKey {
                path: path.to_path_buf(),
                key: render_key(bad),
            });
        }
        Ok(mapping)
    }

    /// Merged value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Merged value for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// String setting shortcut; non-string values read as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Raw definition stored under `@name` (the sigil is added here).
    pub fn get_alias_definition(&self, name: &str) -> Option<&Value> {
        let key = format!("{ALIAS_SIGIL}{name}");
        self.values.get(key.as_str())
    }

    /// Every alias name (sigil stripped), in document order.
    pub fn list_alias_names(&self) -> Vec<&str> {
        self.values
            .keys()
            .filter_map(Value::as_str)
            .filter_map(|k| k.strip_prefix(ALIAS_SIGIL))
            .collect()
    }

    /// Files that actually existed and were merged, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// User-scope config path: `$RELAY_CONFIG_PATH`, else `~/.relay/config.yml`.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(custom) = std::env::var(CONFIG_PATH_ENV)
        && !custom.trim().is_empty()
    {
        return Some(PathBuf::from(custom));
    }
    dirs::home_dir().map(|home| home.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
}

fn read_document(path: &Path, sources: &mut Vec<PathBuf>) -> Result<Mapping, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not present, skipping");
            return Ok(Mapping::new());
        }
        Err(e) => return Err(ConfigError::read_file(path, e)),
    };
    let doc = ConfigStore::parse_document(&content, path)?;
    sources.push(path.to_path_buf());
    Ok(doc)
}

fn render_key(key: &Value) -> String {
    serde_yaml::to_string(key)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| format!("{key:?}"))
}
