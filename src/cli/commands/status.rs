//! Status command implementation.
//!
//! Displays the facts a release resumes from, without changing anything.

use super::helpers::system_context;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::release::{ReleaseFlags, gather_facts};
use crate::state::resume;

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Execute status command
pub(super) async fn execute_status(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let Command::Status {
        unit,
        bump_type,
        registry,
    } = &args.command
    else {
        unreachable!("execute_status called with non-Status command");
    };

    let flags = ReleaseFlags {
        interactive: false,
        ..ReleaseFlags::default()
    };
    let ctx = system_context(config, unit, registry.as_deref(), flags)
        .await?
        .with_bump_type(*bump_type);
    let facts = gather_facts(&ctx).await?;

    config.println(&format!("📊 {}", ctx.release_group_or_package));
    config.indent(&format!("Branch: {}", facts.current_branch));
    if !facts.unit_resolved {
        config.warning_println("Not a known release group or package with a consistent version");
        return Ok(());
    }

    if let Some(version) = &facts.on_disk_version {
        config.indent(&format!("On disk: {version}"));
    }
    if let Some(version) = &facts.release_version {
        config.indent(&format!("Releasing: {version}"));
    }
    if let Some(target) = &facts.bump_target {
        config.indent(&format!("Bump target: {target}"));
    }
    config.indent(&format!("Released: {}", yes_no(facts.released)));
    config.indent(&format!("Bumped: {}", yes_no(facts.bumped)));
    config.indent(&format!(
        "Type tests prepared: {}",
        yes_no(facts.type_tests_prepared)
    ));
    if let Some(branch) = &facts.release_branch {
        config.indent(&format!(
            "Release branch: {branch} ({})",
            if facts.release_branch_exists { "exists" } else { "missing" }
        ));
    }
    config.println(&format!("Next run starts at {}", resume(&facts)));
    Ok(())
}
