//! The `explain` use case: look up rule documentation.

use stackguard_domain::rule::RuleMeta;
use stackguard_domain::rules;

/// Output from the explain use case.
#[derive(Clone, Debug)]
pub enum ExplainOutput {
    /// Found the rule.
    Found(RuleMeta),
    /// Unknown identifier; includes the available rule ids in registration order.
    NotFound {
        identifier: String,
        available_rule_ids: Vec<String>,
    },
}

/// Look up the documentation of a built-in rule.
pub fn run_explain(identifier: &str) -> ExplainOutput {
    let catalog = rules::catalog();
    let wanted = identifier.trim();
    match catalog.iter().find(|m| m.id == wanted) {
        Some(meta) => ExplainOutput::Found(meta.clone()),
        None => ExplainOutput::NotFound {
            identifier: identifier.to_string(),
            available_rule_ids: catalog.into_iter().map(|m| m.id).collect(),
        },
    }
}

/// Format a rule explanation for terminal display.
pub fn format_explanation(meta: &RuleMeta) -> String {
    let mut out = String::new();

    out.push_str(&meta.id);
    out.push('\n');
    out.push_str(&"=".repeat(meta.id.len()));
    out.push_str("\n\n");
    out.push_str(&meta.description);
    out.push_str("\n\n");
    out.push_str(&format!("Category: {}\n", meta.category));
    out.push_str(&format!("Default severity: {}\n", meta.severity));
    if meta.opt_in {
        out.push_str("Opt-in: yes (enable it under [rules] or pick the strict profile)\n");
    }

    if let Some(remediation) = &meta.remediation {
        out.push_str("\nRemediation\n");
        out.push_str("-----------\n");
        out.push_str(remediation);
        out.push('\n');
    }

    out
}

/// Format the "not found" error message for terminal display.
pub fn format_not_found(identifier: &str, rule_ids: &[String]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Unknown rule id: {}\n\n", identifier));
    out.push_str("Available rule ids:\n");
    for id in rule_ids {
        out.push_str(&format!("  - {}\n", id));
    }

    out
}
