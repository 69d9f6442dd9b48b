/*!
shared.rs - helpers used by several verbs.

  - command_json / target_json / route_json: JSON views for --json output
  - command_rows: table rows for a list of descriptors
  - print_json: every --json document goes through here (pretty-printed)
  - print_error / fail: `{"status":"error"}` or plain stderr reporting
*/

use serde_json::{Value as Json, json};
use thiserror::Error;

use crate::registry::CommandMetadata;
use crate::target::{ResolvedTarget, Route};

use super::format::truncate_ellipsis;

/// JSON view of one descriptor.
pub fn command_json(meta: &CommandMetadata) -> Json {
    serde_json::to_value(meta).unwrap_or_else(|_| json!({ "name": meta.name }))
}

pub fn target_json(target: &ResolvedTarget) -> Json {
    let options = serde_json::to_value(&target.options).unwrap_or(Json::Null);
    json!({
        "alias": target.alias,
        "connection": target.connection.original(),
        "user": target.connection.user,
        "host": target.connection.host,
        "port": target.connection.port,
        "path": target.connection.path,
        "options": options,
    })
}

pub fn route_json(route: &Route) -> Json {
    match route {
        Route::Local => json!({ "kind": "local", "targets": [] }),
        Route::Single(t) => json!({ "kind": "single", "targets": [target_json(t)] }),
        Route::Group { alias, targets } => json!({
            "kind": "group",
            "alias": alias,
            "targets": targets.iter().map(target_json).collect::<Vec<_>>(),
        }),
    }
}

/// Rows: #, NAME, CATEGORY, TAGS, DESCRIPTION.
pub fn command_rows(list: &[&CommandMetadata]) -> Vec<Vec<String>> {
    list.iter()
        .enumerate()
        .map(|(idx, meta)| {
            let tags = if meta.tags.is_empty() {
                "-".to_string()
            } else {
                meta.tags.join(", ")
            };
            vec![
                (idx + 1).to_string(),
                meta.name.clone(),
                meta.category.clone(),
                tags,
                truncate_ellipsis(&meta.description.replace('\n', " "), 90),
            ]
        })
        .collect()
}

pub const COMMAND_HEADERS: [&str; 5] = ["#", "NAME", "CATEGORY", "TAGS", "DESCRIPTION"];

/// Marker error: the failure was already printed in the requested output
/// mode; `main` only has to set the exit status.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Reported(pub String);

/// Pretty-printed rendering of a JSON document.
pub fn render_json(body: &Json) -> String {
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}

/// Pretty-print a JSON document on stdout.
pub fn print_json(body: &Json) {
    println!("{}", render_json(body));
}

/// Report an error in the requested output mode.
pub fn print_error(json: bool, msg: &str) {
    if json {
        print_json(&json!({ "status": "error", "error": msg }));
    } else {
        eprintln!("Error: {msg}");
    }
}

/// Print `msg` and return it as a [`Reported`] failure.
pub fn fail(json: bool, msg: impl Into<String>) -> anyhow::Result<()> {
    let msg = msg.into();
    print_error(json, &msg);
    Err(Reported(msg).into())
}
