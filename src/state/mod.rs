//! The release state machine.
//!
//! States are plain data: a [`Stage`] naming the handler and a [`Lane`]
//! placing it in the graph. The [`TransitionTable`] is built once and
//! borrowed by each [`Machine`]; behaviour lives in the release handlers.

mod machine;
mod resume;
mod states;
mod table;

pub use machine::{Machine, Transition};
pub use resume::{ReleaseFacts, bumped_from, derive_release_version, infer_bump, resume};
pub use states::{Action, Lane, Stage, StageKind, State};
pub use table::{TransitionTable, TransitionTableBuilder, release_table};
