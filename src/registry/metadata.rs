//! Command descriptor type and its raw (mapping) form.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::RegistryError;

/// Category assigned when registration data leaves it unset.
pub const DEFAULT_CATEGORY: &str = "general";

/// Metadata for one operation, independent of its implementation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMetadata {
    pub name: String,
    pub category: String,
    pub tags: Vec<String>,
    pub min_version: Option<String>,
    /// Alternate invocation names for this operation (not routing aliases).
    pub aliases: Vec<String>,
    pub description: String,
    pub related_commands: Vec<String>,
    pub custom: Mapping,
}

/// Wire shape accepted by `register_raw` and produced by `export`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawMetadata {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    min_version: Option<String>,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    related_commands: Option<Vec<String>>,
    #[serde(default)]
    custom: Option<Mapping>,
}

impl CommandMetadata {
    /// Descriptor with every field at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            min_version: None,
            aliases: Vec::new(),
            description: String::new(),
            related_commands: Vec::new(),
            custom: Mapping::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_related(mut self, command: impl Into<String>) -> Self {
        self.related_commands.push(command.into());
        self
    }

    pub fn with_min_version(mut self, version: impl Into<String>) -> Self {
        self.min_version = Some(version.into());
        self
    }

    /// Build from raw registration data. `Value::Null` means "all defaults".
    pub(super) fn from_raw(name: &str, raw: &Value) -> Result<Self, RegistryError> {
        let parsed: RawMetadata = match raw {
            Value::Null => RawMetadata::default(),
            Value::Mapping(_) => {
                serde_yaml::from_value(raw.clone()).map_err(|source| {
                    RegistryError::InvalidField {
                        name: name.to_string(),
                        source,
                    }
                })?
            }
            _ => {
                return Err(RegistryError::NotAMapping {
                    name: name.to_string(),
                });
            }
        };

        Ok(Self {
            name: name.to_string(),
            category: parsed.category.unwrap_or_default(),
            tags: parsed.tags.unwrap_or_default(),
            min_version: parsed.min_version,
            aliases: parsed.aliases.unwrap_or_default(),
            description: parsed.description.unwrap_or_default(),
            related_commands: parsed.related_commands.unwrap_or_default(),
            custom: parsed.custom.unwrap_or_default(),
        }
        .normalized())
    }

    /// Raw mapping form (inverse of `from_raw`); empty collections omitted.
    pub fn to_raw(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("category".into(), self.category.clone().into());
        if !self.tags.is_empty() {
            map.insert("tags".into(), string_seq(&self.tags));
        }
        if let Some(v) = &self.min_version {
            map.insert("minVersion".into(), v.clone().into());
        }
        if !self.aliases.is_empty() {
            map.insert("aliases".into(), string_seq(&self.aliases));
        }
        if !self.description.is_empty() {
            map.insert("description".into(), self.description.clone().into());
        }
        if !self.related_commands.is_empty() {
            map.insert("relatedCommands".into(), string_seq(&self.related_commands));
        }
        if !self.custom.is_empty() {
            map.insert("custom".into(), Value::Mapping(self.custom.clone()));
        }
        Value::Mapping(map)
    }

    /// Apply defaults and collapse duplicate set members (first wins).
    pub(super) fn normalized(mut self) -> Self {
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.to_string();
        }
        dedup_in_place(&mut self.tags);
        dedup_in_place(&mut self.aliases);
        dedup_in_place(&mut self.related_commands);
        self
    }
}

fn string_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().cloned().map(Value::from).collect())
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| !item.is_empty() && seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_fields_map_from_camel_case() {
        let raw: Value = serde_yaml::from_str(
            "minVersion: '2.4'\nrelatedCommands: ['cache:warm']\ncustom:\n  danger: true\n",
        )
        .unwrap();
        let meta = CommandMetadata::from_raw("cache:flush", &raw).unwrap();
        assert_eq!(meta.min_version.as_deref(), Some("2.4"));
        assert_eq!(meta.related_commands, vec!["cache:warm"]);
        assert_eq!(meta.custom.get("danger"), Some(&Value::Bool(true)));
        assert_eq!(meta.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn duplicates_collapse() {
        let meta = CommandMetadata::new("x")
            .with_tag("a")
            .with_tag("b")
            .with_tag("a")
            .with_category("")
            .normalized();
        assert_eq!(meta.tags, vec!["a", "b"]);
        assert_eq!(meta.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn to_raw_round_trips() {
        let meta = CommandMetadata::new("deploy")
            .with_category("ops")
            .with_alias("d")
            .with_related("rollback")
            .with_min_version("1.0")
            .with_description("Ship it");
        let back = CommandMetadata::from_raw("deploy", &meta.to_raw()).unwrap();
        assert_eq!(back, meta);
    }
}
