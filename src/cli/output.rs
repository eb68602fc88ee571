//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::RunError;

/// Map run errors to a string for CLI output.
pub fn map_error(e: &RunError) -> String {
    match e {
        RunError::MissingBaseline { .. } => format!(
            "{}\nUsage: treeswap swap <ROOT> <WORKING> <BACKUP> <BASELINE>",
            e
        ),
        _ => e.to_string(),
    }
}
