//! CLI domain: parse, route, help, output, and presentation only.
//! No pipeline logic; the route table dispatches to [`crate::swap::Swapper`].

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, TreeArgs};
pub use presentation::{
    format_diff_json, format_diff_text, format_snapshot_summary, format_swap_json,
    format_swap_text, status_line,
};
pub use route::RunContext;
