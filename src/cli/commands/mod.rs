//! Command execution functions.
//!
//! Each subcommand lives in its own module; this module validates the
//! arguments, runs the command and turns errors into exit codes.

mod bump;
mod graph;
mod helpers;
mod release;
mod status;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use bump::execute_bump;
use graph::execute_graph;
use release::execute_release;
use status::execute_status;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Create output for validation errors (never quiet)
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {validation_error}"));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Release { .. } => execute_release(&args, &config).await,
        Command::Status { .. } => execute_status(&args, &config).await.map(|()| 0),
        Command::Bump { .. } => execute_bump(&args, &config).await.map(|()| 0),
        Command::Graph { .. } => execute_graph(&args, &config).await.map(|()| 0),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {e}", args.command.name()));
            helpers::print_suggestions(&config, &e);
            Ok(1)
        }
    }
}
