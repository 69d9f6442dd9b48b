/*!
`search.rs`

Implements `relay search QUERY`: case-insensitive substring match over
command names, descriptions and tags, in registration order.
*/

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::cmd::format::{Role, StyleOptions, color, header, table};
use crate::cmd::shared::{COMMAND_HEADERS, command_json, command_rows, print_json};
use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for (empty matches everything)
    #[arg(value_name = "QUERY", default_value = "")]
    pub query: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_search(ctx: &AppContext, args: SearchArgs) -> Result<()> {
    let hits = ctx.registry.search(&args.query);

    if args.json {
        print_json(&json!({
            "status": "ok",
            "query": args.query,
            "count": hits.len(),
            "commands": hits.iter().map(|m| command_json(m)).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    let style = StyleOptions::detect();
    let sub = format!("query \"{}\"", args.query);
    println!(
        "{}",
        header(format!("Matches ({})", hits.len()), Some(&sub), &style)
    );
    if hits.is_empty() {
        println!("{}", color(Role::Dim, "(no matches)", &style));
        return Ok(());
    }
    println!("{}", table(&COMMAND_HEADERS, &command_rows(&hits), &style));
    Ok(())
}
