//! Routing alias resolution.
//!
//! A routing token is `@name`. Its configuration value is either a target
//! definition (a mapping with a `connection` field) or a group definition
//! (a list of other routing tokens). Raw values are parsed once into
//! [`AliasDefinition`]; full expansion walks groups depth-first and refuses
//! cycles.

use std::collections::HashSet;

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ALIAS_SIGIL, ConfigStore};
use crate::target::{ConnectionError, ResolvedTarget, Route, parse_connection};

/// Field whose presence makes an alias value a single target.
pub const CONNECTION_FIELD: &str = "connection";

/// Upper bound on group nesting during full expansion.
pub const MAX_EXPANSION_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum AliasError {
    /// `resolve` was called with a token that has no sigil.
    #[error("'{token}' is not an alias (aliases start with '@')")]
    NotAnAlias { token: String },

    #[error("alias not found: {token}")]
    NotFound { token: String },

    /// The value is neither a target mapping nor a list of aliases.
    #[error("alias @{alias} is malformed: {reason}")]
    Malformed { alias: String, reason: String },

    /// `expand_group` on something that is not a group.
    #[error("alias definition is not a group")]
    NotAGroup,

    #[error("circular alias: {path}")]
    Circular { path: String },

    #[error("alias @{alias} exceeds maximum group nesting depth of {max}")]
    TooDeep { alias: String, max: usize },

    #[error("alias @{alias} has an invalid connection: {source}")]
    InvalidConnection {
        alias: String,
        #[source]
        source: ConnectionError,
    },
}

/// Single-target alias value.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefinition {
    pub connection: String,
    /// Every field except `connection`, in document order.
    pub options: Mapping,
}

/// Group alias value: member routing tokens, unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupDefinition {
    pub members: Vec<String>,
}

/// Parsed alias value.
#[derive(Debug, Clone, PartialEq)]
pub enum AliasDefinition {
    Target(TargetDefinition),
    Group(GroupDefinition),
}

impl AliasDefinition {
    /// Classify a raw configuration value for alias `alias` (no sigil).
    ///
    /// A mapping with `connection` is a target no matter what else it holds;
    /// a sequence of strings is a group; anything else is rejected.
    pub fn parse(alias: &str, value: &Value) -> Result<Self, AliasError> {
        let malformed = |reason: &str| AliasError::Malformed {
            alias: alias.to_string(),
            reason: reason.to_string(),
        };

        match value {
            Value::Mapping(map) => {
                let Some(conn) = map.get(CONNECTION_FIELD) else {
                    return Err(malformed(
                        "mapping has no `connection` field and is not a list of aliases",
                    ));
                };
                let connection = conn
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| malformed("`connection` must be a non-empty string"))?;
                let options: Mapping = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != Some(CONNECTION_FIELD))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(AliasDefinition::Target(TargetDefinition {
                    connection: connection.to_string(),
                    options,
                }))
            }
            Value::Sequence(items) => {
                let members = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| malformed("group members must be strings"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AliasDefinition::Group(GroupDefinition { members }))
            }
            _ => Err(malformed(
                "expected a mapping with a `connection` field or a list of aliases",
            )),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, AliasDefinition::Group(_))
    }
}

/// Strip the sigil from a routing token; `None` if it is not one.
pub fn alias_name(token: &str) -> Option<&str> {
    token.strip_prefix(ALIAS_SIGIL)
}

/// Resolves routing tokens against a [`ConfigStore`].
///
/// Stateless apart from the borrowed config; construct one whenever needed.
#[derive(Debug, Clone, Copy)]
pub struct AliasResolver<'a> {
    config: &'a ConfigStore,
}

impl<'a> AliasResolver<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        Self { config }
    }

    /// True iff `token` starts with the routing sigil. `""` is not an alias.
    pub fn is_alias(token: &str) -> bool {
        token.starts_with(ALIAS_SIGIL)
    }

    /// Look up the raw definition behind `token` (`@name`).
    ///
    /// # Errors
    ///
    /// [`AliasError::NotAnAlias`] if the token lacks the sigil,
    /// [`AliasError::NotFound`] if no such alias is configured.
    pub fn resolve(&self, token: &str) -> Result<&'a Value, AliasError> {
        let name = alias_name(token).ok_or_else(|| AliasError::NotAnAlias {
            token: token.to_string(),
        })?;
        self.config
            .get_alias_definition(name)
            .ok_or_else(|| AliasError::NotFound {
                token: token.to_string(),
            })
    }

    /// Resolve and classify in one step.
    pub fn definition(&self, token: &str) -> Result<AliasDefinition, AliasError> {
        let raw = self.resolve(token)?;
        let name = alias_name(token).unwrap_or(token);
        AliasDefinition::parse(name, raw)
    }

    /// Raw shape test: a sequence is a group; a mapping (with or without
    /// `connection`) never is.
    pub fn is_group(definition: &Value) -> bool {
        definition.is_sequence()
    }

    /// Member tokens of a raw group definition, unchanged. One level only.
    ///
    /// # Errors
    ///
    /// [`AliasError::NotAGroup`] for non-sequences, [`AliasError::Malformed`]
    /// for non-string members.
    pub fn expand_group(definition: &Value) -> Result<Vec<String>, AliasError> {
        let Some(items) = definition.as_sequence() else {
            return Err(AliasError::NotAGroup);
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AliasError::Malformed {
                        alias: "<group>".to_string(),
                        reason: "group members must be strings".to_string(),
                    })
            })
            .collect()
    }

    /// Fully expand `token` to concrete targets.
    ///
    /// Groups are walked depth-first in member order. A target reached
    /// through several branches appears once, at its first position. An
    /// alias that reappears on the current expansion path fails with
    /// [`AliasError::Circular`] carrying the path.
    pub fn resolve_targets(&self, token: &str) -> Result<Vec<ResolvedTarget>, AliasError> {
        let mut walk = Expansion::default();
        self.expand_into(token, &mut walk)?;
        debug!(token, count = walk.targets.len(), "alias expanded");
        Ok(walk.targets)
    }

    /// Classify an invocation's routing token into a [`Route`].
    ///
    /// `None` means local execution. A token without the sigil is
    /// [`AliasError::NotAnAlias`], never a silent local run.
    pub fn route(&self, token: Option<&str>) -> Result<Route, AliasError> {
        let Some(token) = token else {
            return Ok(Route::Local);
        };
        if !Self::is_alias(token) {
            return Err(AliasError::NotAnAlias {
                token: token.to_string(),
            });
        }
        match self.definition(token)? {
            AliasDefinition::Target(def) => {
                let name = alias_name(token).unwrap_or(token);
                Ok(Route::Single(build_target(name, def)?))
            }
            AliasDefinition::Group(_) => Ok(Route::Group {
                alias: alias_name(token).unwrap_or(token).to_string(),
                targets: self.resolve_targets(token)?,
            }),
        }
    }

    fn expand_into(&self, token: &str, walk: &mut Expansion) -> Result<(), AliasError> {
        let name = alias_name(token).ok_or_else(|| AliasError::Malformed {
            alias: walk.path.last().cloned().unwrap_or_default(),
            reason: format!("group member '{token}' is not an alias"),
        })?;

        if walk.path.iter().any(|p| p == name) {
            let mut cycle: Vec<String> = walk.path.iter().map(|p| format!("@{p}")).collect();
            cycle.push(format!("@{name}"));
            return Err(AliasError::Circular {
                path: cycle.join(" -> "),
            });
        }
        if walk.path.len() >= MAX_EXPANSION_DEPTH {
            return Err(AliasError::TooDeep {
                alias: name.to_string(),
                max: MAX_EXPANSION_DEPTH,
            });
        }
        // fully expanded groups contribute nothing new
        if walk.finished.contains(name) {
            trace!(alias = name, "group already expanded, skipping");
            return Ok(());
        }

        match self.definition(token)? {
            AliasDefinition::Target(def) => {
                if walk.emitted.insert(name.to_string()) {
                    walk.targets.push(build_target(name, def)?);
                } else {
                    trace!(alias = name, "target already expanded, skipping");
                }
            }
            AliasDefinition::Group(group) => {
                walk.path.push(name.to_string());
                for member in &group.members {
                    self.expand_into(member, walk)?;
                }
                walk.path.pop();
                walk.finished.insert(name.to_string());
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Expansion {
    path: Vec<String>,
    emitted: HashSet<String>,
    /// Groups whose members were all walked without error.
    finished: HashSet<String>,
    targets: Vec<ResolvedTarget>,
}

fn build_target(name: &str, def: TargetDefinition) -> Result<ResolvedTarget, AliasError> {
    let connection =
        parse_connection(&def.connection).map_err(|source| AliasError::InvalidConnection {
            alias: name.to_string(),
            source,
        })?;
    Ok(ResolvedTarget {
        alias: name.to_string(),
        connection,
        options: def.options,
    })
}
