//! Utilities: logging setup (verbosity flags -> tracing level) and the
//! routing token split performed before clap sees the arguments.
//!
//! Key items:
//!   init_logging / derive_level
//!   split_routing_token

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::alias::AliasResolver;

/// Logging helpers.
pub mod logging {
    use super::*;

    /// Map `-v` count / `-q` to a level. Quiet wins.
    pub fn derive_level(verbose: u8, quiet: bool) -> Level {
        if quiet {
            return Level::ERROR;
        }
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Install the global subscriber (stderr, compact). `RUST_LOG` directives
    /// take precedence over the flag-derived default.
    ///
    /// Safe to call more than once; later calls are ignored.
    pub fn init_logging(level: Level) {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// True for the global flags clap accepts ahead of the subcommand:
/// `--verbose`, `--quiet` and short clusters of `v` / `q` (`-v`, `-vv`, `-qv`).
fn is_global_flag(arg: &str) -> bool {
    if arg == "--verbose" || arg == "--quiet" {
        return true;
    }
    match arg.strip_prefix('-') {
        Some(cluster) if !cluster.is_empty() && !cluster.starts_with('-') => {
            cluster.chars().all(|c| c == 'v' || c == 'q')
        }
        _ => false,
    }
}

/// Remove the routing token (`@alias`) from a raw argv.
///
/// The token is the first argument after the program name once any leading
/// global flags are skipped, so `relay @prod exec status` and
/// `relay -v @prod exec status` both route, while `relay exec status @prod`
/// leaves `@prod` as an ordinary operation argument.
pub fn split_routing_token(mut argv: Vec<String>) -> (Option<String>, Vec<String>) {
    let first = argv
        .iter()
        .skip(1)
        .position(|a| !is_global_flag(a))
        .map(|i| i + 1);
    if let Some(i) = first
        && AliasResolver::is_alias(&argv[i])
    {
        let token = argv.remove(i);
        return (Some(token), argv);
    }
    (None, argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn level_mapping() {
        assert_eq!(derive_level(0, false), Level::INFO);
        assert_eq!(derive_level(1, false), Level::DEBUG);
        assert_eq!(derive_level(5, false), Level::TRACE);
        assert_eq!(derive_level(2, true), Level::ERROR);
    }

    #[test]
    fn leading_token_is_split() {
        let (token, rest) = split_routing_token(args(&["relay", "@prod", "exec", "status"]));
        assert_eq!(token.as_deref(), Some("@prod"));
        assert_eq!(rest, args(&["relay", "exec", "status"]));
    }

    #[test]
    fn later_tokens_untouched() {
        let input = args(&["relay", "exec", "status", "@prod"]);
        let (token, rest) = split_routing_token(input.clone());
        assert!(token.is_none());
        assert_eq!(rest, input);
    }

    #[test]
    fn bare_program_untouched() {
        let (token, rest) = split_routing_token(args(&["relay"]));
        assert!(token.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn token_after_global_flags_is_split() {
        let (token, rest) =
            split_routing_token(args(&["relay", "-v", "--quiet", "@web", "exec", "x"]));
        assert_eq!(token.as_deref(), Some("@web"));
        assert_eq!(rest, args(&["relay", "-v", "--quiet", "exec", "x"]));

        let (token, rest) = split_routing_token(args(&["relay", "-vv", "@web", "exec", "x"]));
        assert_eq!(token.as_deref(), Some("@web"));
        assert_eq!(rest, args(&["relay", "-vv", "exec", "x"]));
    }

    #[test]
    fn flags_without_token_untouched() {
        let input = args(&["relay", "-v", "exec", "x", "@web"]);
        let (token, rest) = split_routing_token(input.clone());
        assert!(token.is_none());
        assert_eq!(rest, input);

        // only flags: nothing to route
        let input = args(&["relay", "-q"]);
        assert_eq!(split_routing_token(input.clone()), (None, input));
    }

    #[test]
    fn global_flag_recognition() {
        for f in ["-v", "-vv", "-q", "-vq", "--verbose", "--quiet"] {
            assert!(is_global_flag(f), "{f}");
        }
        for f in ["-", "--", "-x", "-vx", "--json", "exec", "@web"] {
            assert!(!is_global_flag(f), "{f}");
        }
    }
}
