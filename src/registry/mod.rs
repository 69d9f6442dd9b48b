/*!
Command metadata registry.

Catalog of operation descriptors keyed by canonical name, with three derived
indices kept in lock-step with the primary store:

  category        -> names (registration order)
  tag             -> names (registration order)
  operation alias -> name

Lookups never fail: misses are `None` or an empty `Vec`, so discovery code
can explore freely ("is `cache` a category?"). Registration of malformed raw
data is the only error path.

The registry is an ordinary value. Whoever builds the dispatcher owns one;
there is no process-wide instance.
*/

mod metadata;

pub use metadata::{CommandMetadata, DEFAULT_CATEGORY};

use std::collections::{BTreeMap, HashMap};

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command name must not be empty")]
    EmptyName,

    /// Raw registration data was not a mapping.
    #[error("metadata for '{name}' must be a mapping")]
    NotAMapping { name: String },

    /// A field had the wrong type, or an unknown field was present.
    #[error("invalid metadata for '{name}': {source}")]
    InvalidField {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// `load` input was not a mapping of name -> metadata.
    #[error("registry data must be a mapping of command name to metadata")]
    InvalidExport,

    #[error("registry data has a non-string command name: {key}")]
    NonStringName { key: String },
}

/// Process-scoped catalog of [`CommandMetadata`].
#[derive(Debug, Clone, Default)]
pub struct CommandMetadataRegistry {
    entries: HashMap<String, CommandMetadata>,
    order: Vec<String>,
    by_category: BTreeMap<String, Vec<String>>,
    by_tag: BTreeMap<String, Vec<String>>,
    by_alias: BTreeMap<String, String>,
}

impl CommandMetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the descriptor for `name`.
    ///
    /// A replaced entry is first removed from every index, then the new
    /// descriptor is indexed, so the registry position moves to the end.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        metadata: CommandMetadata,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let mut metadata = metadata.normalized();
        metadata.name = name.clone();

        if self.entries.contains_key(&name) {
            debug!(command = %name, "re-registering command");
            self.unindex(&name);
        }
        self.index(&metadata);
        self.entries.insert(name, metadata);
        Ok(())
    }

    /// Register from raw mapping data (`category`, `tags`, `minVersion`,
    /// `aliases`, `description`, `relatedCommands`, `custom`).
    ///
    /// A null value registers a descriptor with all defaults.
    pub fn register_raw(&mut self, name: &str, raw: &Value) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let metadata = CommandMetadata::from_raw(name, raw)?;
        self.register(name, metadata)
    }

    pub fn get(&self, name: &str) -> Option<&CommandMetadata> {
        self.entries.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Canonical name, or the target of an operation alias.
    pub fn lookup(&self, name_or_alias: &str) -> Option<&CommandMetadata> {
        self.get(name_or_alias).or_else(|| {
            self.find_by_alias(name_or_alias)
                .and_then(|canonical| self.get(canonical))
        })
    }

    pub fn get_by_category(&self, category: &str) -> Vec<&CommandMetadata> {
        self.collect(self.by_category.get(category))
    }

    pub fn get_by_tag(&self, tag: &str) -> Vec<&CommandMetadata> {
        self.collect(self.by_tag.get(tag))
    }

    /// Canonical name registered under an operation alias.
    pub fn find_by_alias(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(String::as_str)
    }

    /// Case-insensitive substring search over name, description and tags.
    ///
    /// Each descriptor appears at most once; results follow registration
    /// order.
    pub fn search(&self, query: &str) -> Vec<&CommandMetadata> {
        let needle = query.to_lowercase();
        self.iter()
            .filter(|meta| {
                meta.name.to_lowercase().contains(&needle)
                    || meta.description.to_lowercase().contains(&needle)
                    || meta
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.by_category.keys().map(String::as_str).collect()
    }

    /// Distinct tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.by_tag.keys().map(String::as_str).collect()
    }

    /// Operation alias -> canonical name pairs, sorted by alias.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_alias
            .iter()
            .map(|(a, n)| (a.as_str(), n.as_str()))
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandMetadata> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every descriptor and every index entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.by_category.clear();
        self.by_tag.clear();
        self.by_alias.clear();
    }

    /// Plain mapping `name -> raw metadata`, in registration order.
    pub fn export(&self) -> Value {
        let mut out = Mapping::new();
        for meta in self.iter() {
            out.insert(Value::from(meta.name.clone()), meta.to_raw());
        }
        Value::Mapping(out)
    }

    /// Register every entry of an [`export`](Self::export)-shaped mapping.
    ///
    /// Existing entries are kept (and replaced on name collision). Returns
    /// the number of entries registered. Stops at the first malformed entry.
    pub fn load(&mut self, data: &Value) -> Result<usize, RegistryError> {
        let map = match data {
            Value::Null => return Ok(0),
            Value::Mapping(m) => m,
            _ => return Err(RegistryError::InvalidExport),
        };
        let mut count = 0;
        for (key, raw) in map {
            let name = key.as_str().ok_or_else(|| RegistryError::NonStringName {
                key: format!("{key:?}"),
            })?;
            self.register_raw(name, raw)?;
            count += 1;
        }
        debug!(count, "registry loaded");
        Ok(count)
    }

    fn collect(&self, names: Option<&Vec<String>>) -> Vec<&CommandMetadata> {
        names
            .map(|names| names.iter().filter_map(|n| self.entries.get(n)).collect())
            .unwrap_or_default()
    }

    fn index(&mut self, meta: &CommandMetadata) {
        self.order.push(meta.name.clone());
        self.by_category
            .entry(meta.category.clone())
            .or_default()
            .push(meta.name.clone());
        for tag in &meta.tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .push(meta.name.clone());
        }
        for alias in &meta.aliases {
            if let Some(previous) = self.by_alias.get(alias)
                && previous != &meta.name
            {
                warn!(
                    alias = %alias,
                    previous = %previous,
                    command = %meta.name,
                    "operation alias reassigned"
                );
            }
            self.by_alias.insert(alias.clone(), meta.name.clone());
        }
    }

    fn unindex(&mut self, name: &str) {
        let Some(old) = self.entries.remove(name) else {
            return;
        };
        self.order.retain(|n| n != name);
        remove_from_bucket(&mut self.by_category, &old.category, name);
        for tag in &old.tags {
            remove_from_bucket(&mut self.by_tag, tag, name);
        }
        for alias in &old.aliases {
            if self.by_alias.get(alias).map(String::as_str) != Some(name) {
                continue;
            }
            // Hand the alias back to the latest other command declaring it.
            let fallback = self
                .order
                .iter()
                .rev()
                .find(|n| {
                    self.entries
                        .get(*n)
                        .is_some_and(|m| m.aliases.contains(alias))
                })
                .cloned();
            match fallback {
                Some(other) => {
                    self.by_alias.insert(alias.clone(), other);
                }
                None => {
                    self.by_alias.remove(alias);
                }
            }
        }
    }
}

fn remove_from_bucket(index: &mut BTreeMap<String, Vec<String>>, key: &str, name: &str) {
    if let Some(bucket) = index.get_mut(key) {
        bucket.retain(|n| n != name);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn sample() -> CommandMetadataRegistry {
        let mut reg = CommandMetadataRegistry::new();
        reg.register_raw(
            "system:log:clear",
            &raw("category: system\ntags: [logging, maintenance]\naliases: ['log:clear']\ndescription: Truncate application logs\n"),
        )
        .unwrap();
        reg.register_raw(
            "ns:create",
            &raw("category: namespace\ndescription: Create a namespace\naliases: [nsc]\n"),
        )
        .unwrap();
        reg.register_raw(
            "cache:flush",
            &raw("category: system\ntags: [maintenance]\ndescription: Flush caches\n"),
        )
        .unwrap();
        reg
    }

    fn names(list: Vec<&CommandMetadata>) -> Vec<&str> {
        list.into_iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn defaults_applied() {
        let mut reg = CommandMetadataRegistry::new();
        reg.register_raw("plain", &Value::Null).unwrap();
        let meta = reg.get("plain").unwrap();
        assert_eq!(meta.category, DEFAULT_CATEGORY);
        assert!(meta.tags.is_empty() && meta.aliases.is_empty());
        assert!(meta.related_commands.is_empty());
        assert_eq!(names(reg.get_by_category(DEFAULT_CATEGORY)), vec!["plain"]);
    }

    #[test]
    fn category_and_tag_indices_keep_order() {
        let reg = sample();
        assert_eq!(
            names(reg.get_by_category("system")),
            vec!["system:log:clear", "cache:flush"]
        );
        assert_eq!(
            names(reg.get_by_tag("maintenance")),
            vec!["system:log:clear", "cache:flush"]
        );
        assert_eq!(reg.categories(), vec!["namespace", "system"]);
        assert_eq!(reg.tags(), vec!["logging", "maintenance"]);
    }

    #[test]
    fn misses_are_empty_not_errors() {
        let reg = sample();
        assert!(reg.get("nope").is_none());
        assert!(!reg.has("nope"));
        assert!(reg.get_by_category("nope").is_empty());
        assert!(reg.get_by_tag("nope").is_empty());
        assert!(reg.find_by_alias("nope").is_none());
    }

    #[test]
    fn alias_lookup() {
        let reg = sample();
        assert_eq!(reg.find_by_alias("nsc"), Some("ns:create"));
        assert_eq!(reg.lookup("log:clear").unwrap().name, "system:log:clear");
        assert_eq!(reg.lookup("cache:flush").unwrap().name, "cache:flush");
    }

    #[test]
    fn reregistration_moves_category() {
        let mut reg = CommandMetadataRegistry::new();
        reg.register_raw("job", &raw("category: old\ntags: [a]\naliases: [j]\n"))
            .unwrap();
        reg.register_raw("job", &raw("category: new\n")).unwrap();

        assert_eq!(reg.len(), 1);
        assert!(reg.get_by_category("old").is_empty());
        assert_eq!(names(reg.get_by_category("new")), vec!["job"]);
        assert!(reg.get_by_tag("a").is_empty());
        assert!(reg.find_by_alias("j").is_none());
        assert_eq!(reg.categories(), vec!["new"]);
        assert!(reg.tags().is_empty());
    }

    #[test]
    fn reregistration_same_category_no_duplicates() {
        let mut reg = CommandMetadataRegistry::new();
        reg.register_raw("job", &raw("category: c\n")).unwrap();
        reg.register_raw("job", &raw("category: c\n")).unwrap();
        assert_eq!(reg.get_by_category("c").len(), 1);
    }

    #[test]
    fn shared_alias_falls_back_to_other_owner() {
        let mut reg = CommandMetadataRegistry::new();
        reg.register_raw("a", &raw("aliases: [x]\n")).unwrap();
        reg.register_raw("b", &raw("aliases: [x]\n")).unwrap();
        assert_eq!(reg.find_by_alias("x"), Some("b"));
        reg.register_raw("b", &Value::Null).unwrap();
        assert_eq!(reg.find_by_alias("x"), Some("a"));
    }

    #[test]
    fn search_matches_first_field_once() {
        let reg = sample();
        assert_eq!(names(reg.search("log")), vec!["system:log:clear"]);
        // "maintenance" hits tags of two entries; "LOGS" hits description case-insensitively.
        assert_eq!(
            names(reg.search("MAINT")),
            vec!["system:log:clear", "cache:flush"]
        );
        assert_eq!(names(reg.search("logs")), vec!["system:log:clear"]);
        assert!(reg.search("zzz").is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut reg = sample();
        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.get("ns:create").is_none());
        assert!(reg.get_by_category("system").is_empty());
        assert!(reg.search("").is_empty());
        assert!(reg.categories().is_empty());
        assert!(reg.find_by_alias("nsc").is_none());
    }

    #[test]
    fn export_load_round_trip() {
        let reg = sample();
        let exported = reg.export();

        let mut copy = CommandMetadataRegistry::new();
        assert_eq!(copy.load(&exported).unwrap(), 3);

        assert_eq!(
            reg.iter().collect::<Vec<_>>(),
            copy.iter().collect::<Vec<_>>()
        );
        assert_eq!(reg.categories(), copy.categories());
        assert_eq!(reg.tags(), copy.tags());
        for cat in reg.categories() {
            assert_eq!(
                names(reg.get_by_category(cat)),
                names(copy.get_by_category(cat))
            );
        }
        assert_eq!(
            reg.aliases().collect::<Vec<_>>(),
            copy.aliases().collect::<Vec<_>>()
        );
        assert_eq!(copy.export(), exported);
    }

    #[test]
    fn malformed_registration_fails_loudly() {
        let mut reg = CommandMetadataRegistry::new();
        assert!(matches!(
            reg.register_raw("x", &raw("[1, 2]")),
            Err(RegistryError::NotAMapping { .. })
        ));
        assert!(matches!(
            reg.register_raw("x", &raw("tags: not-a-list\n")),
            Err(RegistryError::InvalidField { .. })
        ));
        assert!(matches!(
            reg.register_raw("x", &raw("tag: [typo]\n")),
            Err(RegistryError::InvalidField { .. })
        ));
        assert!(matches!(
            reg.register_raw(" ", &Value::Null),
            Err(RegistryError::EmptyName)
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn load_rejects_non_mapping() {
        let mut reg = CommandMetadataRegistry::new();
        assert!(matches!(
            reg.load(&raw("- a\n")),
            Err(RegistryError::InvalidExport)
        ));
        assert_eq!(reg.load(&Value::Null).unwrap(), 0);
    }
}
