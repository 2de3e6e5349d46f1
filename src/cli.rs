//! CLI domain: parse, route, output, and presentation only.
//! Orchestration lives in the batch runner and cascade; the route table only wires them up.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_batch_report, format_check_result, format_status_json, format_status_text,
    CheckView, ProviderRow, StatusView,
};
pub use route::{read_topics, RunContext};
