//! Release handlers and the loop that drives them.
//!
//! A release is one walk through the transition table. Each state is
//! handled by a check, a do or a prompt handler; all of them share the
//! signature of [`dispatch`] and a mutable [`ReleaseContext`].

mod actions;
mod checks;
mod context;
mod dispatch;
mod facts;
mod naming;
mod prompts;
mod run;

pub use actions::{
    do_bump_released_dependencies, do_major_release, do_minor_release, do_patch_release,
    do_release_group_bump,
};
pub use checks::{
    check_assert_tagging, check_branch_name, check_branch_up_to_date, check_bump_type,
    check_changelogs, check_dependencies_installed, check_has_remote, check_main_next_integrated,
    check_no_prerelease_dependencies, check_policy, check_release_branch_exists,
    check_release_group_is_bumped, check_release_is_done, check_release_notes,
    check_should_commit_bump, check_should_commit_released_deps_bump, check_type_tests_prepared,
    check_valid_release_group,
};
pub use context::{
    Collaborators, EXIT_USAGE, ExitFunc, ReleaseContext, ReleaseFlags, SystemCollaborators,
};
pub use dispatch::{base_dispatch, dispatch};
pub use facts::{
    PREVIOUS_ALIAS_SUFFIX, bump_target, determine_release_version, gather_facts, is_released,
    released_versions, unprepared_type_tests,
};
pub use naming::{
    RELEASE_BRANCH_PREFIX, RELEASE_SOURCE_BRANCHES, branch_matches_convention, bump_branch_name,
    bump_commit_message, deps_branch_name, deps_commit_message, release_branch_name, tag_name,
    tag_prefix, version_from_tag,
};
pub use prompts::{InstructionalPrompt, PromptSection};
pub use run::{RunOutcome, run_machine};
