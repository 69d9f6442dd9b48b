use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use relay_cli::cmd::{self, ExecArgs, GetArgs, ListArgs, SearchArgs};
use relay_cli::context::AppContext;
use relay_cli::utils;

/// Relay - run application commands locally or on aliased remote targets.
///
/// Command layout:
///   relay list <commands|categories|tags|aliases> [--category C] [--tag T] [--json]
///   relay get  <command|category|tag|alias> NAME [--json]
///   relay search QUERY [--json]
///   relay [@alias] exec OPERATION [ARGS...] [--json] [--dry-run]
///
/// Routing:
///   A leading `@alias` argument (global flags may come before it) routes
///   `exec` to that alias: a single target or a group (expanded
///   recursively). Without one, RELAY_ALIAS and then the `default_alias`
///   setting are consulted; otherwise the command runs locally. A token
///   without the `@` sigil is an error, never a local run.
///
/// Configuration (YAML, project overrides user, key by key):
///   ~/.relay/config.yml  (or $RELAY_CONFIG_PATH)
///   ./relay.yml
///
/// Global flags:
///   -v / -vv        Increase verbosity (RUST_LOG overrides)
///   -q / --quiet    Errors only
///
/// Examples:
///   relay list commands --category cache
///   relay get alias @production
///   relay @production exec cache:flush --json
///   relay @web exec --dry-run log:clear
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    author,
    about = "Relay - application command runner with aliased remote targets",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List commands, categories, tags or routing aliases
    List(ListArgs),

    /// Show one command, category, tag or routing alias
    Get(GetArgs),

    /// Search command names, descriptions and tags
    Search(SearchArgs),

    /// Execute an operation locally or on a routing alias
    Exec(ExecArgs),
}

fn main() -> ExitCode {
    let (token, argv) = utils::split_routing_token(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match run(cli, token) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<cmd::Reported>() => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, token: Option<String>) -> Result<()> {
    let ctx = AppContext::load()?;

    if let Some(t) = &token
        && !matches!(cli.command, Commands::Exec(_))
    {
        warn!(token = %t, "routing alias only applies to exec; ignored");
    }

    match cli.command {
        Commands::List(args) => cmd::execute_list(&ctx, args),
        Commands::Get(args) => cmd::execute_get(&ctx, args),
        Commands::Search(args) => cmd::execute_search(&ctx, args),
        Commands::Exec(args) => {
            let token = ctx.effective_token(token);
            cmd::execute_exec(&ctx, args, token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn routing_token_is_removed_before_parsing() {
        let argv: Vec<String> = ["relay", "@web", "-v", "exec", "cache:flush"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (token, rest) = utils::split_routing_token(argv);
        assert_eq!(token.as_deref(), Some("@web"));
        let cli = Cli::try_parse_from(rest).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Exec(ref a) if a.operation == "cache:flush"));
    }
}
