/*!
`list.rs`

Implements `relay list <subject>`.

Subjects (plural and singular forms behave the same here):
  - commands    : registered operations, optionally filtered with
                  --category / --tag (both filters combine)
  - categories  : distinct categories with command counts
  - tags        : distinct tags with command counts
  - aliases     : routing aliases from configuration, classified as
                  target / group / invalid

JSON output shape (commands):
{
  "status": "ok",
  "subject": "commands",
  "count": 2,
  "commands": [ { "name": "...", "category": "...", ... } ]
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::alias::{AliasDefinition, AliasResolver};
use crate::cmd::format::{Role, StyleOptions, color, header, table};
use crate::cmd::shared::{COMMAND_HEADERS, command_json, command_rows, print_json};
use crate::cmd::subject::Subject;
use crate::context::AppContext;
use crate::registry::{CommandMetadata, CommandMetadataRegistry};

/// CLI arguments for `relay list <subject>`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Subject to list (commands|categories|tags|aliases)
    pub subject: Subject,

    /// Only commands in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only commands carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the list subcommand.
pub fn execute_list(ctx: &AppContext, args: ListArgs) -> Result<()> {
    match args.subject.plural() {
        Subject::Categories => {
            let rows = category_counts(&ctx.registry);
            print_counts(Subject::Categories, rows, args.json);
        }
        Subject::Tags => {
            let rows = tag_counts(&ctx.registry);
            print_counts(Subject::Tags, rows, args.json);
        }
        Subject::Aliases => list_aliases(ctx, args.json),
        _ => list_commands(&ctx.registry, &args),
    }
    Ok(())
}

/// Descriptors matching the optional category / tag filters, in
/// registration order.
pub fn filter_commands<'a>(
    registry: &'a CommandMetadataRegistry,
    category: Option<&str>,
    tag: Option<&str>,
) -> Vec<&'a CommandMetadata> {
    let base = match (category, tag) {
        (Some(c), _) => registry.get_by_category(c),
        (None, Some(t)) => registry.get_by_tag(t),
        (None, None) => registry.iter().collect(),
    };
    match (category, tag) {
        (Some(_), Some(t)) => base
            .into_iter()
            .filter(|m| m.tags.iter().any(|x| x == t))
            .collect(),
        _ => base,
    }
}

fn list_commands(registry: &CommandMetadataRegistry, args: &ListArgs) {
    let list = filter_commands(registry, args.category.as_deref(), args.tag.as_deref());

    if args.json {
        print_json(&json!({
            "status": "ok",
            "subject": "commands",
            "category": args.category,
            "tag": args.tag,
            "count": list.len(),
            "commands": list.iter().map(|m| command_json(m)).collect::<Vec<_>>(),
        }));
        return;
    }

    let style = StyleOptions::detect();
    let mut filters = Vec::new();
    if let Some(c) = &args.category {
        filters.push(format!("category={c}"));
    }
    if let Some(t) = &args.tag {
        filters.push(format!("tag={t}"));
    }
    let sub = (!filters.is_empty()).then(|| filters.join(" • "));
    println!(
        "{}",
        header(format!("Commands ({})", list.len()), sub.as_deref(), &style)
    );

    if list.is_empty() {
        println!("{}", color(Role::Dim, "(none)", &style));
        return;
    }
    println!("{}", table(&COMMAND_HEADERS, &command_rows(&list), &style));
    println!(
        "\n{}",
        color(
            Role::Dim,
            "Use `relay get command <name>` for details on a single command",
            &style
        )
    );
}

fn category_counts(registry: &CommandMetadataRegistry) -> Vec<(String, usize)> {
    registry
        .categories()
        .into_iter()
        .map(|c| (c.to_string(), registry.get_by_category(c).len()))
        .collect()
}

fn tag_counts(registry: &CommandMetadataRegistry) -> Vec<(String, usize)> {
    registry
        .tags()
        .into_iter()
        .map(|t| (t.to_string(), registry.get_by_tag(t).len()))
        .collect()
}

fn print_counts(subject: Subject, rows: Vec<(String, usize)>, json: bool) {
    let subject = subject.to_string();
    if json {
        let items: Vec<_> = rows
            .iter()
            .map(|(name, count)| json!({ "name": name, "count": count }))
            .collect();
        print_json(&json!({
            "status": "ok",
            "subject": subject,
            "count": items.len(),
            subject.as_str(): items,
        }));
        return;
    }

    let style = StyleOptions::detect();
    let mut title = subject;
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    println!(
        "{}",
        header(format!("{title} ({})", rows.len()), None, &style)
    );
    if rows.is_empty() {
        println!("{}", color(Role::Dim, "(none)", &style));
        return;
    }
    let table_rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|(name, count)| vec![name, count.to_string()])
        .collect();
    println!("{}", table(&["NAME", "COMMANDS"], &table_rows, &style));
}

/// One row per routing alias: (name, kind, detail).
pub fn alias_rows(ctx: &AppContext) -> Vec<(String, &'static str, String)> {
    let resolver = AliasResolver::new(&ctx.config);
    ctx.config
        .list_alias_names()
        .into_iter()
        .map(|name| {
            let token = format!("@{name}");
            match resolver.definition(&token) {
                Ok(AliasDefinition::Target(t)) => (name.to_string(), "target", t.connection),
                Ok(AliasDefinition::Group(g)) => {
                    let detail = if g.members.is_empty() {
                        "(empty)".to_string()
                    } else {
                        g.members.join(", ")
                    };
                    (name.to_string(), "group", detail)
                }
                Err(e) => (name.to_string(), "invalid", e.to_string()),
            }
        })
        .collect()
}

fn list_aliases(ctx: &AppContext, json: bool) {
    let rows = alias_rows(ctx);

    if json {
        let items: Vec<_> = rows
            .iter()
            .map(|(name, kind, detail)| json!({ "alias": format!("@{name}"), "kind": kind, "detail": detail }))
            .collect();
        print_json(&json!({
            "status": "ok",
            "subject": "aliases",
            "count": items.len(),
            "aliases": items,
        }));
        return;
    }

    let style = StyleOptions::detect();
    let sources: Vec<String> = ctx
        .config
        .sources()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let sub = (!sources.is_empty()).then(|| sources.join(", "));
    println!(
        "{}",
        header(format!("Aliases ({})", rows.len()), sub.as_deref(), &style)
    );
    if rows.is_empty() {
        println!("{}", color(Role::Dim, "(none)", &style));
        return;
    }
    let table_rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|(name, kind, detail)| {
            let kind = match kind {
                "invalid" => color(Role::Error, kind, &style),
                "group" => color(Role::Accent, kind, &style),
                _ => kind.to_string(),
            };
            vec![format!("@{name}"), kind, detail]
        })
        .collect();
    println!("{}", table(&["ALIAS", "KIND", "DETAIL"], &table_rows, &style));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use clap::Parser;
    use serde_yaml::Mapping;
    use std::path::Path;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TestSub,
    }

    #[derive(clap::Subcommand, Debug)]
    enum TestSub {
        List(ListArgs),
    }

    fn registry() -> CommandMetadataRegistry {
        let mut reg = CommandMetadataRegistry::new();
        reg.register(
            "cache:flush",
            CommandMetadata::new("")
                .with_category("cache")
                .with_tag("maintenance"),
        )
        .unwrap();
        reg.register("cache:warm", CommandMetadata::new("").with_category("cache"))
            .unwrap();
        reg.register(
            "log:clear",
            CommandMetadata::new("")
                .with_category("system")
                .with_tag("maintenance"),
        )
        .unwrap();
        reg
    }

    fn names(list: Vec<&CommandMetadata>) -> Vec<&str> {
        list.into_iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn clap_parses_list_with_filters() {
        let cli =
            TestCli::try_parse_from(["t", "list", "commands", "--category", "cache", "--json"])
                .unwrap();
        match cli.cmd {
            TestSub::List(a) => {
                assert_eq!(a.subject, Subject::Commands);
                assert_eq!(a.category.as_deref(), Some("cache"));
                assert!(a.json);
            }
        }
    }

    #[test]
    fn filters_combine() {
        let reg = registry();
        assert_eq!(
            names(filter_commands(&reg, Some("cache"), None)),
            vec!["cache:flush", "cache:warm"]
        );
        assert_eq!(
            names(filter_commands(&reg, None, Some("maintenance"))),
            vec!["cache:flush", "log:clear"]
        );
        assert_eq!(
            names(filter_commands(&reg, Some("cache"), Some("maintenance"))),
            vec!["cache:flush"]
        );
        assert!(filter_commands(&reg, Some("nope"), None).is_empty());
        assert_eq!(filter_commands(&reg, None, None).len(), 3);
    }

    #[test]
    fn counts_per_category() {
        let reg = registry();
        assert_eq!(
            category_counts(&reg),
            vec![("cache".to_string(), 2), ("system".to_string(), 1)]
        );
        assert_eq!(tag_counts(&reg), vec![("maintenance".to_string(), 2)]);
    }

    #[test]
    fn alias_rows_classify() {
        let doc = ConfigStore::parse_document(
            "\"@web1\":\n  connection: web1:/srv\n\"@all\": [\"@web1\"]\n\"@bad\":\n  env: x\n",
            Path::new("t.yml"),
        )
        .unwrap();
        let ctx = AppContext {
            config: ConfigStore::from_documents(doc, Mapping::new()),
            registry: CommandMetadataRegistry::new(),
        };
        let rows = alias_rows(&ctx);
        let kinds: Vec<_> = rows.iter().map(|(n, k, _)| (n.as_str(), *k)).collect();
        assert_eq!(
            kinds,
            vec![("web1", "target"), ("all", "group"), ("bad", "invalid")]
        );
        assert_eq!(rows[0].2, "web1:/srv");
    }
}
