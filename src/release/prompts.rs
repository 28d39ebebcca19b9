//! Instructions for the manual steps of a release.
//!
//! Prompt handlers never fire an action. They describe exactly one manual
//! step and end the run; the operator re-runs the release afterwards.

use super::context::{Collaborators, ReleaseContext};
use super::naming::{
    bump_branch_name, bump_commit_message, deps_branch_name, deps_commit_message,
    release_branch_name, tag_name,
};
use crate::cli::OutputManager;
use crate::error::{MachineError, Result};
use crate::state::{Machine, State};
use crate::workspace::{ReleaseUnit, find_prerelease_dependencies};

/// One step of an instructional prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    /// Short heading
    pub title: String,
    /// What to do
    pub message: String,
    /// Commands to copy, one per line
    pub cmd: Option<String>,
}

impl PromptSection {
    /// Section without a command
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            cmd: None,
        }
    }

    /// Attach a command to copy
    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = Some(cmd.into());
        self
    }
}

/// A titled list of manual steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionalPrompt {
    /// Heading
    pub title: String,
    /// Steps, in order
    pub sections: Vec<PromptSection>,
}

impl InstructionalPrompt {
    /// Empty prompt with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    /// Append a step
    pub fn section(mut self, section: PromptSection) -> Self {
        self.sections.push(section);
        self
    }

    /// Print the prompt
    pub fn render(&self, log: &OutputManager) {
        log.section(&self.title);
        for (index, section) in self.sections.iter().enumerate() {
            log.step(index + 1, &section.title);
            log.indent(&section.message);
            if let Some(cmd) = &section.cmd {
                for line in cmd.lines() {
                    log.command(line);
                }
            }
        }
        log.println("");
    }
}

/// Command that continues this release
pub fn continue_command<C: Collaborators>(ctx: &ReleaseContext<C>) -> String {
    let selector = match &ctx.unit {
        Some(ReleaseUnit::Package(_)) => "-p",
        _ => "-g",
    };
    let mut command = format!("monorel release {selector} {}", ctx.release_group_or_package);
    if let Some(bump) = ctx.bump_type() {
        command.push_str(&format!(" -t {bump}"));
    }
    command
}

fn continue_section<C: Collaborators>(ctx: &ReleaseContext<C>) -> PromptSection {
    PromptSection::new(
        "Continue the release",
        "Once the step above is done, run the release again:",
    )
    .with_cmd(continue_command(ctx))
}

fn remote_name<C: Collaborators>(ctx: &ReleaseContext<C>) -> &str {
    ctx.remote.as_deref().unwrap_or("origin")
}

fn unit_command(unit: &ReleaseUnit, bump: Option<&str>) -> String {
    let mut command = match unit {
        ReleaseUnit::Group(name) => format!("monorel release -g {name}"),
        ReleaseUnit::Package(name) => format!("monorel release -p {name}"),
    };
    if let Some(bump) = bump {
        command.push_str(&format!(" -t {bump}"));
    }
    command
}

/// Release the prerelease dependencies first
pub async fn prompt_to_release_deps<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let deps = find_prerelease_dependencies(&ctx.repo, unit);
    let mut prompt = InstructionalPrompt::new(format!(
        "Release dependencies of {unit} before releasing it"
    ));
    for (name, version) in deps.units() {
        let dependency_unit = if deps.release_groups.contains_key(name) {
            ReleaseUnit::Group(name.to_string())
        } else {
            ReleaseUnit::Package(name.to_string())
        };
        prompt = prompt.section(
            PromptSection::new(
                format!("Release {name}"),
                format!("{unit} depends on the unreleased {name}@{version}."),
            )
            .with_cmd(unit_command(&dependency_unit, None)),
        );
    }
    prompt.section(continue_section(ctx)).render(log);
    Ok(true)
}

/// Commit the released-dependency updates
pub async fn prompt_to_commit_released_deps_bump<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    let branch = deps_branch_name(unit, version);
    InstructionalPrompt::new(format!("Commit the dependency updates for {unit}"))
        .section(
            PromptSection::new(
                "Commit on a new branch",
                "Dependencies were updated to released versions but not committed.",
            )
            .with_cmd(format!(
                "git checkout -b {branch}\ngit commit -am \"{}\"",
                deps_commit_message(unit)
            )),
        )
        .section(
            PromptSection::new("Open a pull request", "Push the branch and open a PR.")
                .with_cmd(format!("git push {} {branch}", remote_name(ctx))),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Open a PR for the committed dependency updates
pub async fn prompt_to_pr_released_deps_bump<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let branch = deps_branch_name(unit, ctx.release_version()?);
    InstructionalPrompt::new(format!("Merge the dependency updates for {unit}"))
        .section(
            PromptSection::new(
                "Open a pull request",
                format!("The updates were committed to {branch}. Push it and open a PR."),
            )
            .with_cmd(format!("git push {} {branch}", remote_name(ctx))),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Integrate `next` into `main` with a minor release first
pub async fn prompt_to_run_minor_release_command<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    InstructionalPrompt::new(format!("main and next are not integrated for {unit}"))
        .section(
            PromptSection::new(
                "Run a minor release",
                "A major release ships from next, which must contain everything on main. \
                 Release a minor from main and merge main into next first.",
            )
            .with_cmd(unit_command(unit, Some("minor"))),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Write the release notes file
pub async fn prompt_to_write_release_notes<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    let path = format!(
        "{}/{unit}_v{version}.md",
        ctx.repo.config().release_notes_dir
    );
    InstructionalPrompt::new(format!("Write release notes for {unit} {version}"))
        .section(
            PromptSection::new(
                "Write the notes",
                format!("Create {path} describing the changes in this release, then commit it."),
            )
            .with_cmd(format!("git add {path}\ngit commit -m \"Release notes for {unit} {version}\"")),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Generate and commit per-package changelogs
pub async fn prompt_to_generate_changelogs<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    InstructionalPrompt::new(format!("Generate changelogs for {unit} {version}"))
        .section(PromptSection::new(
            "Update CHANGELOG.md",
            format!("Each package of {unit} needs a CHANGELOG.md section for {version}. Commit the result."),
        ))
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Create and push the release branch
pub async fn prompt_to_create_release_branch<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    let branch = release_branch_name(unit, version);
    InstructionalPrompt::new(format!("Create the release branch for {unit} {version}"))
        .section(
            PromptSection::new(
                "Create and push the branch",
                format!("{branch} does not exist yet."),
            )
            .with_cmd(format!(
                "git checkout -b {branch}\ngit push {} {branch}",
                remote_name(ctx)
            )),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Queue the release build
pub async fn prompt_to_release<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    let branch = release_branch_name(unit, version);
    InstructionalPrompt::new(format!("Release {unit} {version}"))
        .section(PromptSection::new(
            "Queue a release build",
            format!("Queue a CI release build of {unit} from {branch} and publish the packages."),
        ))
        .section(
            PromptSection::new(
                "Tag the release",
                "Once the packages are published, tag the released commit.",
            )
            .with_cmd(format!(
                "git tag {}\ngit push {} --tags",
                tag_name(unit, version),
                remote_name(ctx)
            )),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Commit the version bump
pub async fn prompt_to_commit_bump<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let from = ctx.release_version()?;
    let to = ctx.repo.version_of(unit)?;
    let bump = ctx.bump_type().ok_or(MachineError::BumpTypeUnknown)?;
    let branch = bump_branch_name(unit, &to);
    InstructionalPrompt::new(format!("Commit the version bump of {unit}"))
        .section(
            PromptSection::new(
                "Commit on a new branch",
                format!("{unit} was bumped to {to} but not committed."),
            )
            .with_cmd(format!(
                "git checkout -b {branch}\ngit commit -am \"{}\"",
                bump_commit_message(unit, from, &to, bump)
            )),
        )
        .section(
            PromptSection::new("Open a pull request", "Push the branch and open a PR.")
                .with_cmd(format!("git push {} {branch}", remote_name(ctx))),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Open a PR for the committed version bump
pub async fn prompt_to_pr_bump<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let to = ctx.repo.version_of(unit)?;
    let branch = bump_branch_name(unit, &to);
    InstructionalPrompt::new(format!("Merge the version bump of {unit}"))
        .section(
            PromptSection::new(
                "Open a pull request",
                format!("The bump to {to} was committed to {branch}. Push it and open a PR."),
            )
            .with_cmd(format!("git push {} {branch}", remote_name(ctx))),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}

/// Regenerate the type test baselines
pub async fn prompt_to_run_type_tests<C: Collaborators>(
    _state: State,
    _machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    if test_mode {
        return Ok(true);
    }

    let unit = ctx.unit()?;
    let version = ctx.release_version()?;
    InstructionalPrompt::new(format!("Prepare type tests for {unit}"))
        .section(
            PromptSection::new(
                "Point type tests at the release",
                format!("The -previous devDependencies must reference {version}. Commit the result."),
            )
            .with_cmd(ctx.repo.config().commands.type_tests.clone()),
        )
        .section(continue_section(ctx))
        .render(log);
    Ok(true)
}
