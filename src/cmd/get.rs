/*!
`get.rs`

Implements `relay get <subject> NAME`.

  - command NAME   : one descriptor, looked up by name or operation alias.
                     Misses print the closest search hits as suggestions.
  - category NAME  : commands in one category
  - tag NAME       : commands carrying one tag
  - alias NAME     : one routing alias (`@` optional), its raw definition
                     and its full expansion

Plural subjects are accepted and mean the same as the singular.

JSON Error Output:
{
  "status": "error",
  "error": "message"
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::alias::{AliasDefinition, AliasResolver, alias_name};
use crate::cmd::format::{Role, StyleOptions, color, header, table};
use crate::cmd::shared::{COMMAND_HEADERS, command_json, command_rows, fail, print_json, route_json};
use crate::cmd::subject::Subject;
use crate::config::ALIAS_SIGIL;
use crate::context::AppContext;
use crate::registry::{CommandMetadata, CommandMetadataRegistry};

/// Suggestions shown when a command lookup misses.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Subject (command|category|tag|alias)
    pub subject: Subject,

    /// Command name / alias, category, tag, or routing alias
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_get(ctx: &AppContext, args: GetArgs) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return fail(args.json, "name cannot be empty");
    }

    match args.subject.singular() {
        Subject::Command => get_command(&ctx.registry, name, args.json),
        Subject::Category => {
            let list = ctx.registry.get_by_category(name);
            print_group("category", name, list, args.json)
        }
        Subject::Tag => {
            let list = ctx.registry.get_by_tag(name);
            print_group("tag", name, list, args.json)
        }
        _ => get_alias(ctx, name, args.json),
    }
}

/// Names of the best search hits for `query`.
pub fn suggestions(registry: &CommandMetadataRegistry, query: &str) -> Vec<String> {
    registry
        .search(query)
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|m| m.name.clone())
        .collect()
}

/// "Unknown X 'y'" plus a "did you mean" tail when there are hits.
pub fn not_found_message(kind: &str, name: &str, hints: &[String]) -> String {
    if hints.is_empty() {
        format!("unknown {kind} '{name}'")
    } else {
        format!(
            "unknown {kind} '{name}' (did you mean: {}?)",
            hints.join(", ")
        )
    }
}

fn get_command(registry: &CommandMetadataRegistry, name: &str, json: bool) -> Result<()> {
    let Some(meta) = registry.lookup(name) else {
        let hints = suggestions(registry, name);
        return fail(json, not_found_message("command", name, &hints));
    };

    if json {
        let mut body = command_json(meta);
        if let Some(obj) = body.as_object_mut() {
            obj.insert("status".into(), json!("ok"));
            obj.insert("resolvedFrom".into(), json!(name));
        }
        print_json(&body);
        return Ok(());
    }

    let style = StyleOptions::detect();
    let sub = (meta.name != name).then(|| format!("via alias '{name}'"));
    println!("{}", header(&meta.name, sub.as_deref(), &style));
    for (label, value) in detail_lines(registry, meta) {
        println!("{} {value}", color(Role::Accent, format!("{label:<10}"), &style));
    }
    Ok(())
}

/// `(label, value)` pairs for the human detail view.
pub fn detail_lines(
    registry: &CommandMetadataRegistry,
    meta: &CommandMetadata,
) -> Vec<(&'static str, String)> {
    let join_or_dash = |items: &[String]| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };

    let mut lines = vec![
        ("category", meta.category.clone()),
        ("tags", join_or_dash(&meta.tags)),
        ("aliases", join_or_dash(&meta.aliases)),
    ];
    if let Some(v) = &meta.min_version {
        lines.push(("since", v.clone()));
    }
    if !meta.description.is_empty() {
        lines.push(("about", meta.description.clone()));
    }
    if !meta.related_commands.is_empty() {
        // unregistered related commands are still shown, flagged
        let related: Vec<String> = meta
            .related_commands
            .iter()
            .map(|r| {
                if registry.has(r) {
                    r.clone()
                } else {
                    format!("{r} (unregistered)")
                }
            })
            .collect();
        lines.push(("related", related.join(", ")));
    }
    for (k, v) in &meta.custom {
        if let Some(key) = k.as_str() {
            let value = serde_yaml::to_string(v)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default();
            lines.push(("custom", format!("{key}: {value}")));
        }
    }
    lines
}

fn print_group(kind: &str, name: &str, list: Vec<&CommandMetadata>, json: bool) -> Result<()> {
    if list.is_empty() {
        return fail(json, format!("unknown {kind} '{name}'"));
    }

    if json {
        print_json(&json!({
            "status": "ok",
            "subject": kind,
            "name": name,
            "count": list.len(),
            "commands": list.iter().map(|m| command_json(m)).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        header(format!("{kind} {name} ({})", list.len()), None, &style)
    );
    println!("{}", table(&COMMAND_HEADERS, &command_rows(&list), &style));
    Ok(())
}

fn get_alias(ctx: &AppContext, name: &str, json: bool) -> Result<()> {
    let token = if name.starts_with(ALIAS_SIGIL) {
        name.to_string()
    } else {
        format!("{ALIAS_SIGIL}{name}")
    };
    let resolver = AliasResolver::new(&ctx.config);

    let raw = match resolver.resolve(&token) {
        Ok(raw) => raw,
        Err(e) => return fail(json, e.to_string()),
    };
    let kind = match AliasDefinition::parse(alias_name(&token).unwrap_or(&token), raw) {
        Ok(def) if def.is_group() => "group",
        Ok(_) => "target",
        Err(e) => return fail(json, e.to_string()),
    };
    let route = match resolver.route(Some(&token)) {
        Ok(route) => route,
        Err(e) => return fail(json, e.to_string()),
    };

    if json {
        let definition = serde_json::to_value(raw).unwrap_or(serde_json::Value::Null);
        print_json(&json!({
            "status": "ok",
            "subject": "alias",
            "alias": token,
            "kind": kind,
            "definition": definition,
            "route": route_json(&route),
        }));
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!("{}", header(&token, Some(kind), &style));
    let rendered = serde_yaml::to_string(raw).unwrap_or_default();
    for line in rendered.lines() {
        println!("  {}", color(Role::Dim, line, &style));
    }

    let targets = route.targets();
    if targets.is_empty() {
        println!("\n{}", color(Role::Warning, "(expands to no targets)", &style));
        return Ok(());
    }
    let rows: Vec<Vec<String>> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| {
            vec![
                (i + 1).to_string(),
                format!("{ALIAS_SIGIL}{}", t.alias),
                t.connection.host.clone(),
                t.connection.to_string(),
            ]
        })
        .collect();
    println!();
    println!(
        "{}",
        table(&["#", "TARGET", "HOST", "CONNECTION"], &rows, &style)
    );
    Ok(())
}
