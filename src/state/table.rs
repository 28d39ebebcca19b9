//! The release transition table.
//!
//! The table is built once and shared immutably by every machine that walks
//! it; nothing about a release attempt is stored here.

use super::states::{Action, Lane, Stage, StageKind, State};
use crate::error::MachineError;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Immutable map of `state -> action -> next state`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTable {
    transitions: BTreeMap<State, BTreeMap<Action, State>>,
}

/// Builder for a [`TransitionTable`]
#[derive(Debug, Default)]
pub struct TransitionTableBuilder {
    transitions: BTreeMap<State, BTreeMap<Action, State>>,
}

impl TransitionTableBuilder {
    /// Add an edge `from --action--> to`
    pub fn on(&mut self, from: State, action: Action, to: State) -> &mut Self {
        self.transitions.entry(from).or_default().insert(action, to);
        self
    }

    /// Add both outcomes of a check or do state
    pub fn check(&mut self, from: State, success: State, failure: State) -> &mut Self {
        self.on(from, Action::Success, success)
            .on(from, Action::Failure, failure)
    }

    /// Finish the table
    pub fn build(&mut self) -> TransitionTable {
        TransitionTable {
            transitions: std::mem::take(&mut self.transitions),
        }
    }
}

impl TransitionTable {
    /// Start an empty table
    pub fn builder() -> TransitionTableBuilder {
        TransitionTableBuilder::default()
    }

    /// Next state for `action` fired in `from`
    pub fn next(&self, from: State, action: Action) -> Option<State> {
        self.transitions.get(&from)?.get(&action).copied()
    }

    /// Outgoing edges of `state`
    pub fn actions_from(&self, state: State) -> impl Iterator<Item = (Action, State)> + '_ {
        self.transitions
            .get(&state)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(a, s)| (*a, *s)))
    }

    /// Every edge, ordered by source state
    pub fn edges(&self) -> impl Iterator<Item = (State, Action, State)> + '_ {
        self.transitions
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(move |(a, to)| (*from, *a, *to)))
    }

    /// Every state appearing in the table
    pub fn states(&self) -> BTreeSet<State> {
        let mut states = BTreeSet::new();
        for (from, _, to) in self.edges() {
            states.insert(from);
            states.insert(to);
        }
        states
    }

    /// Whether `state` is part of the graph
    pub fn contains(&self, state: State) -> bool {
        self.transitions.contains_key(&state) || self.edges().any(|(_, _, to)| to == state)
    }

    fn graph(&self) -> (DiGraph<State, Action>, HashMap<State, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for state in self.states() {
            nodes.insert(state, graph.add_node(state));
        }
        for (from, action, to) in self.edges() {
            graph.add_edge(nodes[&from], nodes[&to], action);
        }
        (graph, nodes)
    }

    /// Check the structural contract of every state.
    ///
    /// Reports states missing a required outcome, prompt and terminal
    /// states with outgoing edges, states unreachable from `Init`, and
    /// reachable non-prompt states that cannot reach a terminal state.
    pub fn validate(&self) -> Result<(), MachineError> {
        let mut problems = Vec::new();

        for state in self.states() {
            let actions: BTreeSet<Action> = self.actions_from(state).map(|(a, _)| a).collect();
            let required: &[Action] = match state.kind() {
                StageKind::Start => &[Action::Success],
                StageKind::Check if state.stage == Stage::CheckBumpType => {
                    &[Action::Major, Action::Minor, Action::Patch, Action::Failure]
                }
                StageKind::Check | StageKind::Do => &[Action::Success, Action::Failure],
                StageKind::Prompt | StageKind::Terminal => &[],
            };
            for action in required {
                if !actions.contains(action) {
                    problems.push(format!("{state} has no '{action}' transition"));
                }
            }
            if required.is_empty() && !actions.is_empty() {
                problems.push(format!("{state} is a {:?} state with outgoing transitions", state.kind()));
            }
            for (action, to) in self.actions_from(state) {
                if to == state {
                    problems.push(format!("{state} loops to itself on '{action}'"));
                }
            }
        }

        let (graph, nodes) = self.graph();
        let Some(&init) = nodes.get(&State::init()) else {
            problems.push("table has no Init state".to_string());
            return Err(MachineError::InvalidTable(problems));
        };

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&graph, init);
        while let Some(node) = dfs.next(&graph) {
            reachable.insert(node);
        }

        let reversed = Reversed(&graph);
        let mut finishes = HashSet::new();
        for terminal in [State::complete(), State::failed()] {
            if let Some(&node) = nodes.get(&terminal) {
                let mut dfs = Dfs::new(reversed, node);
                while let Some(node) = dfs.next(reversed) {
                    finishes.insert(node);
                }
            }
        }

        for (state, node) in &nodes {
            if !reachable.contains(node) {
                problems.push(format!("{state} is unreachable from Init"));
            } else if state.kind() != StageKind::Prompt && !finishes.contains(node) {
                problems.push(format!("{state} cannot reach ReleaseComplete or Failed"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            problems.sort();
            Err(MachineError::InvalidTable(problems))
        }
    }

    /// Graphviz rendering of the table
    pub fn to_dot(&self) -> String {
        let (graph, _) = self.graph();
        format!("{}", Dot::new(&graph))
    }
}

/// The release flow: shared preflight checks, then one sub-flow per bump type
pub fn release_table() -> TransitionTable {
    use Stage::*;

    let p = State::preflight;
    let failed = State::failed();
    let mut table = TransitionTable::builder();

    table
        .on(State::init(), Action::Success, p(CheckValidReleaseGroup))
        .check(p(CheckValidReleaseGroup), p(CheckPolicy), failed)
        .check(p(CheckPolicy), p(CheckAssertTagging), failed)
        .check(p(CheckAssertTagging), p(CheckHasRemote), failed)
        .check(p(CheckHasRemote), p(CheckBranchUpToDate), failed)
        .check(p(CheckBranchUpToDate), p(CheckDependenciesInstalled), failed)
        .check(
            p(CheckDependenciesInstalled),
            p(CheckNoPrereleaseDependencies),
            failed,
        )
        .check(
            p(CheckNoPrereleaseDependencies),
            p(CheckBumpType),
            p(DoBumpReleasedDependencies),
        )
        .check(
            p(DoBumpReleasedDependencies),
            p(CheckShouldCommitReleasedDepsBump),
            p(PromptToReleaseDeps),
        )
        .check(
            p(CheckShouldCommitReleasedDepsBump),
            p(PromptToPRReleasedDepsBump),
            p(PromptToCommitReleasedDepsBump),
        )
        .on(p(CheckBumpType), Action::Major, p(DoMajorRelease))
        .on(p(CheckBumpType), Action::Minor, p(DoMinorRelease))
        .on(p(CheckBumpType), Action::Patch, p(DoPatchRelease))
        .on(p(CheckBumpType), Action::Failure, failed);

    for (entry, lane) in [
        (DoMajorRelease, Lane::Major),
        (DoMinorRelease, Lane::Minor),
        (DoPatchRelease, Lane::Patch),
    ] {
        let s = |stage| State::new(stage, lane);

        table.check(p(entry), s(CheckBranchName), failed);
        if lane == Lane::Major {
            table
                .check(s(CheckBranchName), s(CheckMainNextIntegrated), failed)
                .check(
                    s(CheckMainNextIntegrated),
                    s(CheckReleaseNotes),
                    s(PromptToRunMinorReleaseCommand),
                );
        } else {
            table.check(s(CheckBranchName), s(CheckReleaseNotes), failed);
        }

        table
            .check(s(CheckReleaseNotes), s(CheckChangelogs), s(PromptToWriteReleaseNotes))
            .check(s(CheckChangelogs), s(CheckReleaseIsDone), s(PromptToGenerateChangelogs))
            .check(
                s(CheckReleaseIsDone),
                s(CheckReleaseGroupIsBumped),
                s(CheckReleaseBranchExists),
            )
            .check(
                s(CheckReleaseBranchExists),
                s(PromptToRelease),
                s(PromptToCreateReleaseBranch),
            )
            .check(
                s(CheckReleaseGroupIsBumped),
                s(CheckTypeTestsPrepared),
                s(DoReleaseGroupBump),
            )
            .check(s(DoReleaseGroupBump), s(CheckShouldCommitBump), failed)
            .check(s(CheckShouldCommitBump), s(PromptToPRBump), s(PromptToCommitBump))
            .check(
                s(CheckTypeTestsPrepared),
                State::complete(),
                s(PromptToRunTypeTests),
            );
    }

    table.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_table_is_valid() {
        release_table().validate().unwrap();
    }

    #[test]
    fn test_every_reachable_non_prompt_state_can_finish() {
        let table = release_table();
        for state in table.states() {
            if matches!(state.kind(), StageKind::Prompt | StageKind::Terminal) {
                continue;
            }
            // Follow success/failure edges breadth-first until a terminal
            let mut frontier = vec![state];
            let mut seen = BTreeSet::new();
            let mut finished = false;
            while let Some(current) = frontier.pop() {
                if current == State::complete() || current == State::failed() {
                    finished = true;
                    break;
                }
                if seen.insert(current) {
                    frontier.extend(table.actions_from(current).map(|(_, to)| to));
                }
            }
            assert!(finished, "{state} cannot finish");
        }
    }

    #[test]
    fn test_only_major_lane_checks_main_next_integration() {
        let table = release_table();
        assert!(table.contains(State::new(Stage::CheckMainNextIntegrated, Lane::Major)));
        assert!(!table.contains(State::new(Stage::CheckMainNextIntegrated, Lane::Minor)));
        assert_eq!(
            table.next(
                State::new(Stage::CheckBranchName, Lane::Minor),
                Action::Success
            ),
            Some(State::new(Stage::CheckReleaseNotes, Lane::Minor))
        );
    }

    #[test]
    fn test_same_stage_in_every_lane() {
        let table = release_table();
        for lane in [Lane::Major, Lane::Minor, Lane::Patch] {
            assert!(table.contains(State::new(Stage::CheckBranchName, lane)));
            assert!(table.contains(State::new(Stage::DoReleaseGroupBump, lane)));
        }
    }

    #[test]
    fn test_validate_reports_missing_failure_edge() {
        let table = TransitionTable::builder()
            .on(State::init(), Action::Success, State::preflight(Stage::CheckPolicy))
            .on(State::preflight(Stage::CheckPolicy), Action::Success, State::complete())
            .build();
        let Err(MachineError::InvalidTable(problems)) = table.validate() else {
            panic!("expected an invalid table");
        };
        assert!(problems.iter().any(|p| p.contains("no 'failure' transition")));
    }

    #[test]
    fn test_validate_reports_dead_end() {
        let table = TransitionTable::builder()
            .on(State::init(), Action::Success, State::preflight(Stage::CheckPolicy))
            .check(
                State::preflight(Stage::CheckPolicy),
                State::preflight(Stage::CheckHasRemote),
                State::failed(),
            )
            .build();
        let Err(MachineError::InvalidTable(problems)) = table.validate() else {
            panic!("expected an invalid table");
        };
        assert!(problems.iter().any(|p| p.contains("CheckHasRemote")));
    }

    #[test]
    fn test_dot_output() {
        let dot = release_table().to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("CheckBranchName@major"));
        assert!(dot.contains("success"));
    }
}
