//! Connection descriptors and resolved targets.
//!
//! parse_connection -> Connection { scheme?, user?, host, port?, path? }
//! ResolvedTarget   -> alias name + parsed connection + auxiliary options
//! Route            -> Local | Single | Group (what an invocation runs against)
//!
use std::fmt;

use serde_yaml::Mapping;
use thiserror::Error;
use url::Url;

/// Errors produced while parsing a `connection` string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection string is empty")]
    Empty,
    #[error("invalid connection URL '{raw}': {reason}")]
    InvalidUrl { raw: String, reason: String },
    #[error("connection '{raw}' has no host")]
    MissingHost { raw: String },
    #[error("connection '{raw}' has an empty user before '@'")]
    EmptyUser { raw: String },
    #[error("connection '{raw}' has an invalid port '{port}'")]
    InvalidPort { raw: String, port: String },
}

/// Parsed view of a target's `connection` field.
///
/// Resolution treats the descriptor as opaque; this structure exists so the
/// front end and executors can show and use its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    original: String,
    pub scheme: Option<String>,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub path: Option<String>,
}

impl Connection {
    /// Returns the user-supplied form.
    pub fn original(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if let Some(path) = &self.path {
            if self.scheme.is_some() {
                f.write_str(path)?;
            } else {
                write!(f, ":{path}")?;
            }
        }
        Ok(())
    }
}

/// Parse a `connection` value into a structured [`Connection`].
///
/// Accepted forms:
/// - `scheme://[user@]host[:port][/path]` (anything containing `://`)
/// - `[user@]host[:port][:path]` or `[user@]host[/path]` (scp style)
///
/// Examples:
/// - "ssh://deploy@web1:2222/srv/app"
/// - "deploy@web1:/var/www"
/// - "web1:2222/srv/app"
pub fn parse_connection(raw: &str) -> Result<Connection, ConnectionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConnectionError::Empty);
    }

    if trimmed.contains("://") {
        return parse_url_form(raw, trimmed);
    }

    let (user, rest) = match trimmed.split_once('@') {
        Some((u, _)) if u.is_empty() => {
            return Err(ConnectionError::EmptyUser {
                raw: raw.to_string(),
            });
        }
        Some((u, r)) => (Some(u.to_string()), r),
        None => (None, trimmed),
    };

    let split_at = rest.find([':', '/']).unwrap_or(rest.len());
    let host = &rest[..split_at];
    if host.is_empty() {
        return Err(ConnectionError::MissingHost {
            raw: raw.to_string(),
        });
    }
    let tail = &rest[split_at..];

    let (port, path) = if let Some(after_colon) = tail.strip_prefix(':') {
        let digits_end = after_colon
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_colon.len());
        if digits_end == 0 {
            (None, non_empty(after_colon))
        } else {
            let port_str = &after_colon[..digits_end];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| ConnectionError::InvalidPort {
                    raw: raw.to_string(),
                    port: port_str.to_string(),
                })?;
            let remainder = &after_colon[digits_end..];
            let remainder = remainder.strip_prefix(':').unwrap_or(remainder);
            (Some(port), non_empty(remainder))
        }
    } else {
        (None, non_empty(tail))
    };

    Ok(Connection {
        original: raw.to_string(),
        scheme: None,
        user,
        host: host.to_string(),
        port,
        path,
    })
}

fn parse_url_form(raw: &str, trimmed: &str) -> Result<Connection, ConnectionError> {
    let url = Url::parse(trimmed).map_err(|e| ConnectionError::InvalidUrl {
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConnectionError::MissingHost {
            raw: raw.to_string(),
        })?;
    let user = Some(url.username())
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let path = Some(url.path()).filter(|p| !p.is_empty() && *p != "/");

    Ok(Connection {
        original: raw.to_string(),
        scheme: Some(url.scheme().to_string()),
        user,
        host: host.to_string(),
        port: url.port(),
        path: path.map(str::to_string),
    })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// A fully resolved single target, ready for an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    /// Alias name without the sigil.
    pub alias: String,
    pub connection: Connection,
    /// Auxiliary fields from the target definition (everything but `connection`).
    pub options: Mapping,
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} ({})", self.alias, self.connection)
    }
}

/// Where an invocation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// No routing token: the local application instance.
    Local,
    /// A routing token naming one target.
    Single(ResolvedTarget),
    /// A routing token naming a group, fully expanded (possibly empty).
    Group {
        alias: String,
        targets: Vec<ResolvedTarget>,
    },
}

impl Route {
    /// Targets this route fans out to; empty for [`Route::Local`].
    pub fn targets(&self) -> &[ResolvedTarget] {
        match self {
            Route::Local => &[],
            Route::Single(t) => std::slice::from_ref(t),
            Route::Group { targets, .. } => targets,
        }
    }

    /// Number of executions a dispatcher performs for this route.
    pub fn execution_count(&self) -> usize {
        match self {
            Route::Local => 1,
            other => other.targets().len(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Local => f.write_str("local"),
            Route::Single(t) => write!(f, "{t}"),
            Route::Group { alias, targets } => {
                write!(f, "@{alias} (group, {} target(s))", targets.len())
            }
        }
    }
}
