//! A single walk through a transition table.

use super::states::{Action, State};
use super::table::TransitionTable;
use crate::error::MachineError;

/// One fired action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State the action was fired in
    pub from: State,
    /// Action fired
    pub action: Action,
    /// Resulting state
    pub to: State,
}

/// Current position in a borrowed transition table
#[derive(Debug, Clone)]
pub struct Machine<'t> {
    table: &'t TransitionTable,
    current: State,
    history: Vec<Transition>,
}

impl<'t> Machine<'t> {
    /// Machine positioned at `start`
    pub fn new(table: &'t TransitionTable, start: State) -> Self {
        Self {
            table,
            current: start,
            history: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.current
    }

    /// Table being walked
    pub fn table(&self) -> &'t TransitionTable {
        self.table
    }

    /// Fire `action`; a missing edge is a programming error
    pub fn action(&mut self, action: Action) -> Result<State, MachineError> {
        let from = self.current;
        let to = self
            .table
            .next(from, action)
            .ok_or(MachineError::NoTransition {
                state: from,
                action,
            })?;
        log::debug!("{from} --{action}--> {to}");
        self.history.push(Transition { from, action, to });
        self.current = to;
        Ok(to)
    }

    /// Fire `success`
    pub fn signal_success(&mut self) -> Result<State, MachineError> {
        self.action(Action::Success)
    }

    /// Fire `failure`
    pub fn signal_failure(&mut self) -> Result<State, MachineError> {
        self.action(Action::Failure)
    }

    /// Every action fired so far
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Number of actions fired so far
    pub fn transition_count(&self) -> usize {
        self.history.len()
    }
}
