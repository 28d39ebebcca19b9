//! Drives a machine through the release graph, one handler at a time.

use super::context::{Collaborators, ReleaseContext};
use super::dispatch::dispatch;
use crate::cli::OutputManager;
use crate::error::{MachineError, Result};
use crate::state::{Machine, Stage, StageKind, State, TransitionTable};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The release reached `ReleaseComplete`
    Completed,
    /// A prompt asked the operator to act; re-run once they have
    AwaitingOperator(State),
    /// A handler requested process exit
    Exited(i32),
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed | RunOutcome::AwaitingOperator(_) => 0,
            RunOutcome::Exited(code) => *code,
        }
    }
}

/// Walk `table` from `start` until the release completes, a prompt hands
/// control to the operator, or a handler asks to exit.
///
/// Check, do and `Init` handlers must fire exactly one action; prompts
/// must fire none. Reaching `Failed` surfaces as
/// [`MachineError::ReachedFailed`].
pub async fn run_machine<C: Collaborators>(
    table: &TransitionTable,
    start: State,
    ctx: &mut ReleaseContext<C>,
    log: &OutputManager,
) -> Result<RunOutcome> {
    let mut machine = Machine::new(table, start);

    loop {
        let state = machine.state();
        if state.stage == Stage::ReleaseComplete {
            log.success("Release complete");
            return Ok(RunOutcome::Completed);
        }

        let before = machine.transition_count();
        if !dispatch(state, &mut machine, false, log, ctx).await? {
            return Err(MachineError::Unhandled { state }.into());
        }
        if let Some(code) = ctx.exit_code() {
            return Ok(RunOutcome::Exited(code));
        }

        let fired = machine.transition_count() - before;
        if state.kind() == StageKind::Prompt {
            if fired != 0 {
                return Err(MachineError::MultipleSignals {
                    state,
                    count: fired,
                }
                .into());
            }
            return Ok(RunOutcome::AwaitingOperator(state));
        }
        match fired {
            1 => log.verbose(&format!("{state} -> {}", machine.state())),
            0 => return Err(MachineError::Unresolved { state }.into()),
            count => return Err(MachineError::MultipleSignals { state, count }.into()),
        }
    }
}
