//! Release command execution.
//!
//! Every invocation starts over from the repository's durable facts: the
//! resume state is derived, then the machine runs until it completes,
//! hands a manual step to the operator, or fails.

use super::helpers::{parse_release_version, system_context};
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::release::{RunOutcome, gather_facts, run_machine};
use crate::state::{release_table, resume};

/// Execute release command
pub(super) async fn execute_release(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Release {
        unit,
        bump_type,
        release_version,
        registry,
        ..
    } = &args.command
    else {
        unreachable!("execute_release called with non-Release command");
    };

    let table = release_table();
    table.validate()?;

    let flags = args.command.release_flags();
    let mut ctx = system_context(config, unit, registry.as_deref(), flags).await?;
    ctx.explicit_release_version = parse_release_version(release_version.as_deref())?;
    let mut ctx = ctx.with_bump_type(*bump_type);

    let facts = gather_facts(&ctx).await?;
    let start = resume(&facts);
    config.verbose_println(&format!("Starting at {start}"));
    if let Some(version) = &facts.release_version {
        config.println(&format!("📦 {} {version}", ctx.release_group_or_package));
    }

    let outcome = run_machine(&table, start, &mut ctx, config.output()).await?;
    match outcome {
        RunOutcome::Completed => {
            config.verbose_println("Every release check passed");
        }
        RunOutcome::AwaitingOperator(state) => {
            config.verbose_println(&format!("Waiting on the operator at {state}"));
        }
        RunOutcome::Exited(code) => {
            config.verbose_println(&format!("Release stopped with exit code {code}"));
        }
    }
    Ok(outcome.exit_code())
}
