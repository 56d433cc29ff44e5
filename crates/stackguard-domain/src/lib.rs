//! Pure policy evaluation (no IO).
//!
//! Input: a stack snapshot constructed elsewhere plus a rule registry.
//! Output: violations in registration order, finalized against an enforcement level.

#![forbid(unsafe_code)]

pub mod fingerprint;
pub mod model;
pub mod policy;
pub mod registry;
pub mod reporter;
pub mod rule;
pub mod rules;

mod engine;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use engine::{EvalOptions, RuleOverride, evaluate, evaluate_with};
