//! Stable DTOs and IDs used across the stackguard workspace.
//!
//! This crate is intentionally boring:
//! - data types for the emitted violations and report
//! - stable string IDs for rules and categories
//! - resource references shared by the engine and renderers

#![forbid(unsafe_code)]

pub mod ids;
pub mod receipt;

pub use receipt::{
    EnforcementLevel, ReportEnvelope, ResourceRef, SCHEMA_REPORT_V1, Severity, StackguardData,
    StackguardReport, ToolMeta, Verdict, Violation, ViolationKind,
};
