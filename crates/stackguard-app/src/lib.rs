//! Use case orchestration for stackguard.
//!
//! This crate provides the application layer: use cases that coordinate the snapshot, settings,
//! domain, and render layers. It is intentionally thin and delegates heavy lifting to them.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod catalog;
mod check;
mod explain;
mod render;
mod report;

pub use catalog::{format_rule_list, list_rules};
pub use check::{CheckInput, CheckOutput, SnapshotSource, run_check, verdict_exit_code};
pub use explain::{ExplainOutput, format_explanation, format_not_found, run_explain};
pub use render::{render_annotations, render_markdown, render_text};
pub use report::{
    SchemaKind, parse_report_json, schema_json, serialize_report, to_renderable, write_report,
    write_text,
};
