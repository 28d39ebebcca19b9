//! Prints the release transition graph.

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::state::{StageKind, release_table};

/// Execute graph command
pub(super) async fn execute_graph(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let Command::Graph { dot } = &args.command else {
        unreachable!("execute_graph called with non-Graph command");
    };

    let table = release_table();
    table.validate()?;

    if *dot {
        println!("{}", table.to_dot());
        return Ok(());
    }

    for state in table.states() {
        let edges: Vec<String> = table
            .actions_from(state)
            .map(|(action, to)| format!("{action} -> {to}"))
            .collect();
        match state.kind() {
            StageKind::Prompt | StageKind::Terminal => config.println(&state.to_string()),
            _ => config.println(&format!("{state}: {}", edges.join(", "))),
        }
    }
    Ok(())
}
