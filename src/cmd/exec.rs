/*!
`exec.rs`

Implements `relay [@alias] exec OPERATION [ARGS...]`.

Flow:
  1. OPERATION is resolved against the registry (canonical name or operation
     alias). An unknown operation is rejected with search suggestions; with
     an empty registry every operation passes through unchanged.
  2. The routing token (command line > RELAY_ALIAS > default_alias) is
     resolved to a Route: local, one target, or a fully expanded group.
  3. The invocation is dispatched once per target, concurrently. Each
     target reports on its own; the exit status is non-zero if any failed.

--dry-run prints the plan (canonical operation, argv, targets) and stops.

JSON Output:
{
  "status": "ok" | "error",
  "operation": "cache:flush",
  "route": { "kind": "group", "alias": "web", "targets": [ ... ] },
  "failed": 0,
  "results": [
    { "target": "@web1", "ok": true, "elapsed_ms": 12, "exit_status": 0,
      "stdout": "...", "stderr": "..." }
  ]
}
*/

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Value as Json, json};
use tracing::{debug, warn};

use crate::alias::AliasResolver;
use crate::cmd::format::{Role, StyleOptions, color, header};
use crate::cmd::get::{not_found_message, suggestions};
use crate::cmd::shared::{Reported, fail, print_json, route_json};
use crate::context::AppContext;
use crate::exec::{Invocation, LocalExecutor, TargetOutcome, dispatch};
use crate::target::Route;

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Operation name or operation alias
    #[arg(value_name = "OPERATION")]
    pub operation: String,

    /// Arguments passed through to the operation untouched
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Print what would run without running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Resolved operation plus where it runs.
#[derive(Debug)]
pub struct ExecPlan {
    /// Operation as typed.
    pub requested: String,
    pub invocation: Invocation,
    pub route: Route,
}

pub fn execute_exec(ctx: &AppContext, args: ExecArgs, token: Option<String>) -> Result<()> {
    let plan = match build_plan(ctx, &args, token.as_deref()) {
        Ok(plan) => plan,
        Err(e) => return fail(args.json, format!("{e:#}")),
    };
    debug!(
        operation = %plan.invocation.operation,
        route = %plan.route,
        "exec planned"
    );

    let executor = match LocalExecutor::from_command_line(ctx.local_command()) {
        Ok(executor) => executor,
        Err(e) => return fail(args.json, e.to_string()),
    };

    if args.dry_run {
        print_plan(&plan, &executor, args.json);
        return Ok(());
    }

    if plan.route.execution_count() == 0 {
        warn!(route = %plan.route, "group expands to no targets");
    }

    // main is sync; the runtime only lives for the dispatch
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let outcomes = rt.block_on(dispatch(
        Arc::new(executor),
        &plan.route,
        &plan.invocation,
    ));

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    debug!(total = outcomes.len(), failed, "exec finished");

    if args.json {
        let body = json!({
            "status": if failed == 0 { "ok" } else { "error" },
            "operation": plan.invocation.operation,
            "route": route_json(&plan.route),
            "failed": failed,
            "results": outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
        });
        print_json(&body);
    } else {
        print_outcomes(&plan, &outcomes);
    }

    if failed > 0 {
        return Err(Reported(format!(
            "{failed} of {} execution(s) failed",
            outcomes.len()
        ))
        .into());
    }
    Ok(())
}

/// Resolve the operation and the routing token without running anything.
pub fn build_plan(ctx: &AppContext, args: &ExecArgs, token: Option<&str>) -> Result<ExecPlan> {
    let requested = args.operation.trim();
    if requested.is_empty() {
        bail!("operation cannot be empty");
    }

    let operation = if ctx.registry.is_empty() {
        requested.to_string()
    } else {
        match ctx.registry.lookup(requested) {
            Some(meta) => meta.name.clone(),
            None => {
                let hints = suggestions(&ctx.registry, requested);
                bail!(not_found_message("operation", requested, &hints));
            }
        }
    };

    let route = AliasResolver::new(&ctx.config)
        .route(token)
        .with_context(|| format!("cannot route to {}", token.unwrap_or("local")))?;

    Ok(ExecPlan {
        requested: requested.to_string(),
        invocation: Invocation::new(operation, args.args.clone()),
        route,
    })
}

/// JSON view of one target's result.
pub fn outcome_json(outcome: &TargetOutcome) -> Json {
    let mut body = json!({
        "target": outcome.label(),
        "ok": outcome.succeeded(),
        "elapsed_ms": outcome.elapsed_ms,
    });
    if let Some(obj) = body.as_object_mut() {
        match &outcome.result {
            Ok(out) => {
                obj.insert("exit_status".into(), json!(out.status));
                obj.insert("stdout".into(), json!(out.stdout));
                obj.insert("stderr".into(), json!(out.stderr));
            }
            Err(e) => {
                obj.insert("error".into(), json!(e.to_string()));
            }
        }
    }
    body
}

fn print_plan(plan: &ExecPlan, executor: &LocalExecutor, json: bool) {
    let mut argv = vec![executor.program().to_string()];
    argv.extend(executor.argv(&plan.invocation));
    let command_line = shell_words::join(&argv);

    if json {
        print_json(&json!({
            "status": "ok",
            "dry_run": true,
            "operation": plan.invocation.operation,
            "requested": plan.requested,
            "command": command_line,
            "route": route_json(&plan.route),
        }));
        return;
    }

    let style = StyleOptions::detect();
    let sub = (plan.requested != plan.invocation.operation)
        .then(|| format!("via alias '{}'", plan.requested));
    println!(
        "{}",
        header(
            format!("Plan: {}", plan.invocation.operation),
            sub.as_deref(),
            &style
        )
    );
    println!("{} {command_line}", color(Role::Accent, "command", &style));
    match &plan.route {
        Route::Local => println!("{} local", color(Role::Accent, "route  ", &style)),
        route => {
            println!("{} {route}", color(Role::Accent, "route  ", &style));
            for t in route.targets() {
                println!("  - @{} {}", t.alias, color(Role::Dim, t.connection.to_string(), &style));
            }
        }
    }
}

fn print_outcomes(plan: &ExecPlan, outcomes: &[TargetOutcome]) {
    let style = StyleOptions::detect();

    // plain local run: behave like the application itself
    if let (Route::Local, [only]) = (&plan.route, outcomes) {
        match &only.result {
            Ok(out) => {
                print!("{}", out.stdout);
                eprint!("{}", out.stderr);
                if !out.success() {
                    eprintln!(
                        "{}",
                        color(Role::Error, format!("exit status {}", out.status), &style)
                    );
                }
            }
            Err(e) => eprintln!("{}", color(Role::Error, e.to_string(), &style)),
        }
        return;
    }

    if outcomes.is_empty() {
        println!(
            "{}",
            color(Role::Warning, format!("{} expands to no targets", plan.route), &style)
        );
        return;
    }

    for outcome in outcomes {
        let (mark, role) = if outcome.succeeded() {
            ("ok", Role::Success)
        } else {
            ("failed", Role::Error)
        };
        println!(
            "{} {} {}",
            color(Role::Primary, outcome.label(), &style),
            color(role, mark, &style),
            color(Role::Dim, format!("({} ms)", outcome.elapsed_ms), &style)
        );
        match &outcome.result {
            Ok(out) => {
                for line in out.stdout.lines() {
                    println!("  {line}");
                }
                for line in out.stderr.lines() {
                    println!("  {}", color(Role::Warning, line, &style));
                }
                if !out.success() {
                    println!("  {}", color(Role::Error, format!("exit status {}", out.status), &style));
                }
            }
            Err(e) => println!("  {}", color(Role::Error, e.to_string(), &style)),
        }
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    let summary = format!(
        "{} succeeded, {failed} failed",
        outcomes.len() - failed
    );
    let role = if failed == 0 { Role::Success } else { Role::Error };
    println!("\n{}", color(role, summary, &style));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::exec::{ExecError, ExecOutput};
    use crate::registry::{CommandMetadata, CommandMetadataRegistry};
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
        Exec(ExecArgs),
    }

    fn parse(argv: &[&str]) -> ExecArgs {
        match TestCli::try_parse_from(argv).unwrap().cmd {
            TestSub::Exec(a) => a,
        }
    }

    fn ctx(config_yaml: &str, registry: CommandMetadataRegistry) -> AppContext {
        let doc = ConfigStore::parse_document(config_yaml, Path::new("t.yml")).unwrap();
        AppContext {
            config: ConfigStore::from_documents(Mapping::new(), doc),
            registry,
        }
    }

    fn registry() -> CommandMetadataRegistry {
        let mut reg = CommandMetadataRegistry::new();
        reg.register(
            "cache:flush",
            CommandMetadata::new("").with_alias("cf").with_category("cache"),
        )
        .unwrap();
        reg
    }

    const CONFIG: &str = "\"@web1\":\n  connection: web1:/srv\n\"@web2\":\n  connection: web2:/srv\n\"@web\": [\"@web1\", \"@web2\"]\n";

    #[test]
    fn clap_passes_trailing_args_through() {
        let a = parse(&["t", "exec", "--json", "cache:flush", "--force", "x"]);
        assert_eq!(a.operation, "cache:flush");
        assert_eq!(a.args, vec!["--force", "x"]);
        assert!(a.json);
        assert!(!a.dry_run);
    }

    #[test]
    fn clap_plain_args() {
        let a = parse(&["t", "exec", "cache:flush", "a", "b"]);
        assert_eq!(a.args, vec!["a", "b"]);
    }

    #[test]
    fn plan_resolves_operation_alias() {
        let c = ctx(CONFIG, registry());
        let a = parse(&["t", "exec", "cf"]);
        let plan = build_plan(&c, &a, None).unwrap();
        assert_eq!(plan.invocation.operation, "cache:flush");
        assert_eq!(plan.requested, "cf");
        assert_eq!(plan.route, Route::Local);
    }

    #[test]
    fn plan_rejects_unknown_operation_with_hints() {
        let c = ctx(CONFIG, registry());
        let a = parse(&["t", "exec", "cache"]);
        let err = build_plan(&c, &a, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown operation 'cache' (did you mean: cache:flush?)"
        );
    }

    #[test]
    fn empty_registry_passes_operations_through() {
        let c = ctx(CONFIG, CommandMetadataRegistry::new());
        let a = parse(&["t", "exec", "anything:goes"]);
        let plan = build_plan(&c, &a, None).unwrap();
        assert_eq!(plan.invocation.operation, "anything:goes");
    }

    #[test]
    fn plan_expands_group_token() {
        let c = ctx(CONFIG, registry());
        let a = parse(&["t", "exec", "cache:flush"]);
        let plan = build_plan(&c, &a, Some("@web")).unwrap();
        let hosts: Vec<_> = plan
            .route
            .targets()
            .iter()
            .map(|t| t.connection.host.as_str())
            .collect();
        assert_eq!(hosts, vec!["web1", "web2"]);
    }

    #[test]
    fn plan_fails_on_unknown_alias() {
        let c = ctx(CONFIG, registry());
        let a = parse(&["t", "exec", "cache:flush"]);
        let err = build_plan(&c, &a, Some("@nope")).unwrap_err();
        assert!(format!("{err:#}").contains("alias not found: @nope"));
    }

    #[test]
    fn bare_routing_token_is_rejected() {
        let c = ctx(CONFIG, registry());
        let a = parse(&["t", "exec", "cache:flush"]);
        let err = build_plan(&c, &a, Some("web1")).unwrap_err();
        assert!(format!("{err:#}").contains("'web1' is not an alias"));
    }

    #[test]
    fn bare_default_alias_is_rejected() {
        let c = ctx(
            &format!("{CONFIG}default_alias: web1\n"),
            registry(),
        );
        if std::env::var(crate::context::ALIAS_ENV).is_ok() {
            return;
        }
        let a = parse(&["t", "exec", "cache:flush"]);
        // same path main takes: no command-line token
        let token = c.effective_token(None);
        assert_eq!(token.as_deref(), Some("web1"));
        assert!(build_plan(&c, &a, token.as_deref()).is_err());
    }

    #[test]
    fn outcome_json_shapes() {
        let ok = TargetOutcome {
            target: None,
            elapsed_ms: 3,
            result: Ok(ExecOutput {
                status: 0,
                stdout: "done\n".into(),
                stderr: String::new(),
            }),
        };
        let v = outcome_json(&ok);
        assert_eq!(v["target"], "local");
        assert_eq!(v["ok"], true);
        assert_eq!(v["exit_status"], 0);

        let err = TargetOutcome {
            target: None,
            elapsed_ms: 0,
            result: Err(ExecError::EmptyCommand),
        };
        let v = outcome_json(&err);
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"], "local command line is empty");
    }

    #[test]
    fn dry_run_does_not_execute() {
        let c = ctx("command: definitely-not-a-real-binary-xyz\n", registry());
        let a = parse(&["t", "exec", "--dry-run", "--json", "cf"]);
        assert!(execute_exec(&c, a, None).is_ok());
    }

    #[test]
    fn failing_local_spawn_is_reported() {
        let c = ctx("command: definitely-not-a-real-binary-xyz\n", registry());
        let a = parse(&["t", "exec", "--json", "cf"]);
        let err = execute_exec(&c, a, None).unwrap_err();
        assert!(err.is::<Reported>());
    }
}
