//! Maps each stage of the release graph to its handler.

use super::actions::*;
use super::checks::*;
use super::context::{Collaborators, ReleaseContext};
use super::prompts::*;
use crate::cli::OutputManager;
use crate::error::{MachineError, Result};
use crate::state::{Machine, Stage, State};

/// Run the handler for `state`.
///
/// Returns `true` when a handler took the state. With `test_mode` set,
/// every handler returns `true` without I/O or transitions, so the graph
/// can be exercised on its own.
pub async fn dispatch<C: Collaborators>(
    state: State,
    machine: &mut Machine<'_>,
    test_mode: bool,
    log: &OutputManager,
    ctx: &mut ReleaseContext<C>,
) -> Result<bool> {
    log::debug!("Dispatching {state}");
    match state.stage {
        Stage::Init | Stage::Failed | Stage::ReleaseComplete => {
            base_dispatch(state, machine, test_mode)
        }

        Stage::CheckValidReleaseGroup => {
            check_valid_release_group(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckPolicy => check_policy(state, machine, test_mode, log, ctx).await,
        Stage::CheckAssertTagging => check_assert_tagging(state, machine, test_mode, log, ctx).await,
        Stage::CheckHasRemote => check_has_remote(state, machine, test_mode, log, ctx).await,
        Stage::CheckBranchUpToDate => {
            check_branch_up_to_date(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckDependenciesInstalled => {
            check_dependencies_installed(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckNoPrereleaseDependencies => {
            check_no_prerelease_dependencies(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckShouldCommitReleasedDepsBump => {
            check_should_commit_released_deps_bump(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckBumpType => check_bump_type(state, machine, test_mode, log, ctx).await,
        Stage::CheckBranchName => check_branch_name(state, machine, test_mode, log, ctx).await,
        Stage::CheckMainNextIntegrated => {
            check_main_next_integrated(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckReleaseNotes => check_release_notes(state, machine, test_mode, log, ctx).await,
        Stage::CheckChangelogs => check_changelogs(state, machine, test_mode, log, ctx).await,
        Stage::CheckReleaseIsDone => check_release_is_done(state, machine, test_mode, log, ctx).await,
        Stage::CheckReleaseBranchExists => {
            check_release_branch_exists(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckReleaseGroupIsBumped => {
            check_release_group_is_bumped(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckTypeTestsPrepared => {
            check_type_tests_prepared(state, machine, test_mode, log, ctx).await
        }
        Stage::CheckShouldCommitBump => {
            check_should_commit_bump(state, machine, test_mode, log, ctx).await
        }

        Stage::DoBumpReleasedDependencies => {
            do_bump_released_dependencies(state, machine, test_mode, log, ctx).await
        }
        Stage::DoMajorRelease => do_major_release(state, machine, test_mode, log, ctx).await,
        Stage::DoMinorRelease => do_minor_release(state, machine, test_mode, log, ctx).await,
        Stage::DoPatchRelease => do_patch_release(state, machine, test_mode, log, ctx).await,
        Stage::DoReleaseGroupBump => do_release_group_bump(state, machine, test_mode, log, ctx).await,

        Stage::PromptToReleaseDeps => prompt_to_release_deps(state, machine, test_mode, log, ctx).await,
        Stage::PromptToCommitReleasedDepsBump => {
            prompt_to_commit_released_deps_bump(state, machine, test_mode, log, ctx).await
        }
        Stage::PromptToPRReleasedDepsBump => {
            prompt_to_pr_released_deps_bump(state, machine, test_mode, log, ctx).await
        }
        Stage::PromptToRunMinorReleaseCommand => {
            prompt_to_run_minor_release_command(state, machine, test_mode, log, ctx).await
        }
        Stage::PromptToWriteReleaseNotes => {
            prompt_to_write_release_notes(state, machine, test_mode, log, ctx).await
        }
        Stage::PromptToGenerateChangelogs => {
            prompt_to_generate_changelogs(state, machine, test_mode, log, ctx).await
        }
        Stage::PromptToCreateReleaseBranch => {
            prompt_to_create_release_branch(state, machine, test_mode, log, ctx).await
        }
        Stage::PromptToRelease => prompt_to_release(state, machine, test_mode, log, ctx).await,
        Stage::PromptToCommitBump => prompt_to_commit_bump(state, machine, test_mode, log, ctx).await,
        Stage::PromptToPRBump => prompt_to_pr_bump(state, machine, test_mode, log, ctx).await,
        Stage::PromptToRunTypeTests => {
            prompt_to_run_type_tests(state, machine, test_mode, log, ctx).await
        }
    }
}

/// Handles the states every graph shares.
///
/// `Init` moves on, `Failed` aborts the run. Anything else is unhandled.
pub fn base_dispatch(state: State, machine: &mut Machine<'_>, test_mode: bool) -> Result<bool> {
    match state.stage {
        Stage::Init => {
            if !test_mode {
                machine.signal_success()?;
            }
            Ok(true)
        }
        Stage::Failed => {
            if test_mode {
                return Ok(true);
            }
            Err(MachineError::ReachedFailed { state }.into())
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Lane, release_table};

    #[test]
    fn test_base_dispatch_init_moves_on() {
        let table = release_table();
        let mut machine = Machine::new(&table, State::init());
        assert!(base_dispatch(State::init(), &mut machine, false).unwrap());
        assert_eq!(
            machine.state(),
            State::new(Stage::CheckValidReleaseGroup, Lane::Preflight)
        );
    }

    #[test]
    fn test_base_dispatch_failed_aborts() {
        let table = release_table();
        let mut machine = Machine::new(&table, State::failed());
        let err = base_dispatch(State::failed(), &mut machine, false).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Machine(MachineError::ReachedFailed { .. })
        ));
        assert!(base_dispatch(State::failed(), &mut machine, true).unwrap());
    }

    #[test]
    fn test_base_dispatch_leaves_other_states_unhandled() {
        let table = release_table();
        let state = State::new(Stage::CheckPolicy, Lane::Preflight);
        let mut machine = Machine::new(&table, state);
        assert!(!base_dispatch(state, &mut machine, false).unwrap());
        assert!(!base_dispatch(State::complete(), &mut machine, true).unwrap());
        assert_eq!(machine.transition_count(), 0);
    }
}
