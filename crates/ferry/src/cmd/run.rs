//! Run command - Execute the function chain and deliver to Bulker
//!
//! Builds the configured functions, appends the Bulker destination and runs
//! the chain once per input event. Surviving events are printed to stdout as
//! JSON lines. Processing stops at the first failed invocation, whose
//! report is printed last.
//!
//! With `--dry-run` the Bulker destination is left out of the chain: the
//! rows it would send for each surviving event are printed instead.
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Every event processed |
//! | 1 | An invocation failed and must not be redelivered |
//! | 75 | An invocation failed and should be redelivered |
//!
//! # Usage
//!
//! ```bash
//! ferry run --config ferry.toml --event event.json
//! ferry run --config ferry.toml < events.ndjson
//! ferry run --config ferry.toml --dry-run --event event.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use ferry_config::Config;
use ferry_protocol::{AnalyticsEvent, MappedEvent};
use ferry_sinks::BulkerDestination;
use ferry_transform::{
    Chain, ChainError, ConnectionMeta, HttpFetch, InvocationContext, Step, default_registry,
};
use serde_json::json;
use tracing::{error, info};

use super::{print_lines, read_objects};

/// Exit code asking the host to redeliver (EX_TEMPFAIL)
const EXIT_REDELIVER: u8 = 75;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Event JSON file (object, array or JSON lines); reads stdin when omitted
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// Run the functions and print the rows Bulker would receive, without sending
    #[arg(long)]
    dry_run: bool,
}

/// Run the run command
pub async fn run(config: Config, args: RunArgs) -> Result<ExitCode> {
    let (mut steps, destination, ctx) = build(&config)?;

    let inputs = read_objects(args.event.as_deref())?;
    let events: Vec<AnalyticsEvent> = inputs.into_iter().map(AnalyticsEvent::from).collect();

    // a dry run maps what survives the functions instead of delivering it
    let preview = if args.dry_run {
        Some(destination)
    } else {
        steps.push(Box::new(destination));
        None
    };
    let chain = Chain::new(steps);
    info!(functions = ?chain.ids(), events = events.len(), dry_run = args.dry_run, "running chain");

    let mut exit = ExitCode::SUCCESS;
    for event in events {
        let message_id = event.message_id().unwrap_or_default().to_string();
        let outcome = match &preview {
            Some(destination) => dry_run_rows(&chain, destination, event, &ctx)
                .await
                .map(|rows| print_lines(rows)),
            None => chain
                .run(event, &ctx)
                .await
                .map(|output| print_lines(output.into_events())),
        };
        match outcome {
            Ok(printed) => printed?,
            Err(err) => {
                error!(message_id = %message_id, error = %err, "invocation failed");
                print_lines([failure_report(&err)])?;
                exit = if err.should_redeliver() {
                    ExitCode::from(EXIT_REDELIVER)
                } else {
                    ExitCode::FAILURE
                };
                break;
            }
        }
    }

    if let Err(e) = chain.close() {
        error!(error = %e, "failed to close functions");
    }

    Ok(exit)
}

/// User functions, the destination and one context for the whole run, so
/// functions share store state across events
fn build(config: &Config) -> Result<(Vec<Box<dyn Step>>, BulkerDestination, InvocationContext)> {
    let destination_config = config.require_destination()?;
    let destination_type = config.connection.destination_type.as_deref();

    let steps = default_registry()
        .build_steps(&config.functions)
        .context("failed to build functions")?;
    let destination = BulkerDestination::new(destination_config.clone(), destination_type)
        .context("invalid destination")?;

    let fetch = HttpFetch::new(destination_config.timeout).context("failed to build HTTP client")?;
    let connection = ConnectionMeta::from_config(&config.connection, &destination_config.destination_id);
    let ctx = InvocationContext::new(connection, Arc::new(fetch));

    Ok((steps, destination, ctx))
}

/// Rows the destination would send for one event once the user functions
/// have run
async fn dry_run_rows(
    chain: &Chain,
    destination: &BulkerDestination,
    event: AnalyticsEvent,
    ctx: &InvocationContext,
) -> Result<Vec<MappedEvent>, ChainError> {
    let output = chain.run(event, ctx).await?;
    Ok(output
        .into_events()
        .iter()
        .flat_map(|e| destination.rows(e, ctx))
        .collect())
}

/// JSON description of a failed invocation for the host
fn failure_report(err: &ChainError) -> serde_json::Value {
    match err {
        ChainError::Failed {
            function_id,
            error,
            retry_policy,
            ..
        } => json!({
            "functionId": function_id,
            "kind": error.kind().as_str(),
            "message": error.to_string(),
            "status": error.status(),
            "retryDelays": retry_policy.as_ref().map(|p| p.delays.clone()),
            "redeliver": err.should_redeliver(),
        }),
        ChainError::Multiplication { .. } => json!({
            "functionId": err.function_id(),
            "kind": "Multiplication",
            "message": err.to_string(),
            "redeliver": false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_config::RetryPolicy;
    use ferry_transform::FunctionError;
    use std::str::FromStr;

    const DROP_BOTS: &str = r#"
[destination]
bulker_endpoint = "http://127.0.0.1:9"
destination_id = "dst"
auth_token = "secret"
data_layout = "segment"

[[functions]]
id = "drop-bots"
type = "filter"
action = "drop"
field = "context.userAgent"
operator = "contains"
value = "bot"
"#;

    fn clicked(user_agent: &str) -> AnalyticsEvent {
        AnalyticsEvent::try_from(json!({
            "type": "track",
            "event": "Clicked",
            "messageId": "m1",
            "context": {"userAgent": user_agent}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_dry_run_runs_functions_before_mapping() {
        let config = Config::from_str(DROP_BOTS).unwrap();
        let (steps, destination, ctx) = build(&config).unwrap();
        let chain = Chain::new(steps);
        assert_eq!(chain.ids(), vec!["drop-bots"]);

        let rows = dry_run_rows(&chain, &destination, clicked("googlebot"), &ctx)
            .await
            .unwrap();
        assert!(rows.is_empty());

        let rows = dry_run_rows(&chain, &destination, clicked("Mozilla/5.0"), &ctx)
            .await
            .unwrap();
        let tables: Vec<String> = rows.into_iter().map(|r| r.into_parts().1).collect();
        assert_eq!(tables, vec!["tracks", "Clicked"]);
    }

    #[test]
    fn test_failure_report_retry() {
        let err = ChainError::Failed {
            function_id: "builtin.destination.bulker".into(),
            error: FunctionError::Http {
                status: 502,
                status_text: "Bad Gateway".into(),
                response: "upstream".into(),
            }
            .into_retry(),
            retry_policy: Some(RetryPolicy::new(vec![1, 10])),
            events: Vec::new(),
        };

        assert_eq!(
            failure_report(&err),
            json!({
                "functionId": "builtin.destination.bulker",
                "kind": "RetryError",
                "message": "HTTP Error: 502 Bad Gateway",
                "status": 502,
                "retryDelays": [1, 10],
                "redeliver": true,
            })
        );
    }

    #[test]
    fn test_failure_report_drop_and_retry() {
        let err = ChainError::Failed {
            function_id: "builtin.destination.bulker".into(),
            error: FunctionError::drop_and_retry("too big"),
            retry_policy: None,
            events: Vec::new(),
        };

        let report = failure_report(&err);
        assert_eq!(report["kind"], json!("Drop & RetryError"));
        assert_eq!(report["redeliver"], json!(false));
        assert_eq!(report["retryDelays"], json!(null));
    }
}
