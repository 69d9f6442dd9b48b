//! Relay - run application commands locally or against aliased remote targets.
//!
//! Routing aliases live in YAML configuration under keys starting with `@`.
//! An alias is either a single target (`connection` plus options) or a
//! group: a list of other aliases, expanded recursively with cycle
//! detection. Command metadata (categories, tags, operation aliases) comes
//! from a catalog and powers lookup, listing and search.
//!
//! ## Layers
//!
//! - [`config`]: user + project YAML merged into one read-only store
//! - [`alias`]: routing token resolution and group expansion
//! - [`target`]: connection strings and resolved routes
//! - [`registry`]: command metadata with category / tag / alias indices
//! - [`exec`]: executor boundary and concurrent per-target dispatch
//! - [`cmd`]: the `list`, `get`, `search` and `exec` verbs

pub mod alias;
pub mod cmd;
pub mod config;
pub mod context;
pub mod exec;
pub mod registry;
pub mod target;
pub mod utils;
