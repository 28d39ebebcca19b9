//! Release machine states and actions.

use crate::version::VersionBump;
use std::fmt;

/// Category of a stage, which fixes the contract its handler follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// `Init`: fires `success` and moves on
    Start,
    /// Reads facts, fires `success` or `failure`
    Check,
    /// Mutates the repository, fires `success` or `failure`
    Do,
    /// Prints instructions for a manual step; fires nothing
    Prompt,
    /// `ReleaseComplete` or `Failed`
    Terminal,
}

macro_rules! stages {
    ($($kind:ident => [$($stage:ident),+ $(,)?]),+ $(,)?) => {
        /// Handler identity of a state.
        ///
        /// The same stage may appear at several positions of the graph (in
        /// several lanes); it is always handled by the same function.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Stage {
            $($(
                #[allow(missing_docs)]
                $stage,
            )+)+
        }

        impl Stage {
            /// Every stage, in declaration order
            pub const ALL: &'static [Stage] = &[$($(Stage::$stage,)+)+];

            /// Stage name as printed in logs and graphs
            pub fn name(self) -> &'static str {
                match self {
                    $($(Stage::$stage => stringify!($stage),)+)+
                }
            }

            /// Contract category of the stage
            pub fn kind(self) -> StageKind {
                match self {
                    $($(Stage::$stage => StageKind::$kind,)+)+
                }
            }
        }
    };
}

stages! {
    Start => [Init],
    Terminal => [Failed, ReleaseComplete],
    Check => [
        CheckValidReleaseGroup,
        CheckPolicy,
        CheckAssertTagging,
        CheckHasRemote,
        CheckBranchUpToDate,
        CheckDependenciesInstalled,
        CheckNoPrereleaseDependencies,
        CheckShouldCommitReleasedDepsBump,
        CheckBumpType,
        CheckBranchName,
        CheckMainNextIntegrated,
        CheckReleaseNotes,
        CheckChangelogs,
        CheckReleaseIsDone,
        CheckReleaseBranchExists,
        CheckReleaseGroupIsBumped,
        CheckTypeTestsPrepared,
        CheckShouldCommitBump,
    ],
    Do => [
        DoBumpReleasedDependencies,
        DoMajorRelease,
        DoMinorRelease,
        DoPatchRelease,
        DoReleaseGroupBump,
    ],
    Prompt => [
        PromptToReleaseDeps,
        PromptToCommitReleasedDepsBump,
        PromptToPRReleasedDepsBump,
        PromptToRunMinorReleaseCommand,
        PromptToWriteReleaseNotes,
        PromptToGenerateChangelogs,
        PromptToCreateReleaseBranch,
        PromptToRelease,
        PromptToCommitBump,
        PromptToPRBump,
        PromptToRunTypeTests,
    ],
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a state in the graph: before the bump type is known, or in
/// one of the per-bump-type sub-flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    /// Shared checks before the bump type branches
    Preflight,
    /// Major release sub-flow
    Major,
    /// Minor release sub-flow
    Minor,
    /// Patch release sub-flow
    Patch,
}

impl Lane {
    /// Lane of the sub-flow for a bump type
    pub fn for_bump(bump: VersionBump) -> Self {
        match bump {
            VersionBump::Major => Lane::Major,
            VersionBump::Minor => Lane::Minor,
            VersionBump::Patch => Lane::Patch,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Preflight => write!(f, "preflight"),
            Lane::Major => write!(f, "major"),
            Lane::Minor => write!(f, "minor"),
            Lane::Patch => write!(f, "patch"),
        }
    }
}

/// A node of the transition graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    /// Handler identity
    pub stage: Stage,
    /// Graph position
    pub lane: Lane,
}

impl State {
    /// State for `stage` in `lane`
    pub const fn new(stage: Stage, lane: Lane) -> Self {
        Self { stage, lane }
    }

    /// State for `stage` in the preflight lane
    pub const fn preflight(stage: Stage) -> Self {
        Self::new(stage, Lane::Preflight)
    }

    /// Entry state
    pub const fn init() -> Self {
        Self::preflight(Stage::Init)
    }

    /// Fatal terminal state
    pub const fn failed() -> Self {
        Self::preflight(Stage::Failed)
    }

    /// Successful terminal state
    pub const fn complete() -> Self {
        Self::preflight(Stage::ReleaseComplete)
    }

    /// Contract category
    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lane {
            Lane::Preflight => write!(f, "{}", self.stage),
            lane => write!(f, "{}@{lane}", self.stage),
        }
    }
}

/// Named trigger moving the machine along an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Check passed or action completed
    Success,
    /// Check failed or action could not complete
    Failure,
    /// Take the major release sub-flow
    Major,
    /// Take the minor release sub-flow
    Minor,
    /// Take the patch release sub-flow
    Patch,
}

impl Action {
    /// Action selecting the sub-flow for a bump type
    pub fn for_bump(bump: VersionBump) -> Self {
        match bump {
            VersionBump::Major => Action::Major,
            VersionBump::Minor => Action::Minor,
            VersionBump::Patch => Action::Patch,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Success => write!(f, "success"),
            Action::Failure => write!(f, "failure"),
            Action::Major => write!(f, "major"),
            Action::Minor => write!(f, "minor"),
            Action::Patch => write!(f, "patch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kinds() {
        assert_eq!(Stage::Init.kind(), StageKind::Start);
        assert_eq!(Stage::CheckBranchName.kind(), StageKind::Check);
        assert_eq!(Stage::DoReleaseGroupBump.kind(), StageKind::Do);
        assert_eq!(Stage::PromptToPRBump.kind(), StageKind::Prompt);
        assert_eq!(Stage::Failed.kind(), StageKind::Terminal);
        assert_eq!(Stage::ALL.len(), 37);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(State::preflight(Stage::CheckPolicy).to_string(), "CheckPolicy");
        assert_eq!(
            State::new(Stage::CheckBranchName, Lane::Patch).to_string(),
            "CheckBranchName@patch"
        );
        assert_eq!(Action::for_bump(VersionBump::Minor).to_string(), "minor");
    }
}
