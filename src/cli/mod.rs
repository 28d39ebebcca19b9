//! Command line interface for monorel.
//!
//! Argument parsing, command execution and the coloured output every
//! release handler logs through.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig, UnitSelector};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}

/// Validate arguments without executing (for testing)
pub fn validate_args(args: &Args) -> std::result::Result<(), String> {
    args.validate()
}
