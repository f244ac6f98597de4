//! Library side of the `factcheck` binary: backend wiring and report formatting.

pub mod backend;
pub mod display;

pub use backend::{
    build_checker, prepare_checker, resolve_prompts, resolve_settings, CliError, Overrides,
};
pub use display::{
    failure_json, format_failure, format_header, format_outcome, json_record, outcome_json,
};
