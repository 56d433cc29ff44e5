use crate::fingerprint::fingerprint_for_violation;
use crate::model::StackSnapshot;
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleError, RuleMeta};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use stackguard_types::{ResourceRef, Severity, Violation, ViolationKind};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Per-rule adjustments supplied by configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleOverride {
    pub severity: Option<Severity>,
    /// Resource-name glob patterns exempt from the rule.
    pub allow: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    /// Run rules on the rayon pool. Output order is unaffected.
    pub parallel: bool,
    pub overrides: BTreeMap<String, RuleOverride>,
}

/// Run every registered rule against the snapshot, sequentially, without overrides.
pub fn evaluate(snapshot: &StackSnapshot, registry: &RuleRegistry) -> Vec<Violation> {
    evaluate_with(snapshot, registry, &EvalOptions::default())
}

/// Run every registered rule against the snapshot.
///
/// Violations are ordered by rule registration order, then by the order each rule
/// discovered them. A rule invocation that fails yields one `RuleEvaluationError`
/// violation in place of its findings and never aborts the pass.
pub fn evaluate_with(
    snapshot: &StackSnapshot,
    registry: &RuleRegistry,
    options: &EvalOptions,
) -> Vec<Violation> {
    let prepared: Vec<PreparedRule<'_>> = registry
        .all_rules()
        .iter()
        .map(|rule| PreparedRule::new(rule, options.overrides.get(rule.id())))
        .collect();

    // Each rule fills its own slot; concatenating the slots restores registration order.
    let per_rule: Vec<Vec<Violation>> = if options.parallel {
        prepared.par_iter().map(|p| p.run(snapshot)).collect()
    } else {
        prepared.iter().map(|p| p.run(snapshot)).collect()
    };

    let violations: Vec<Violation> = per_rule.into_iter().flatten().collect();
    debug!(
        rules = prepared.len(),
        resources = snapshot.len(),
        violations = violations.len(),
        "evaluation finished"
    );
    violations
}

struct PreparedRule<'a> {
    rule: &'a Rule,
    severity: Severity,
    allow: Option<GlobSet>,
}

impl<'a> PreparedRule<'a> {
    fn new(rule: &'a Rule, over: Option<&RuleOverride>) -> Self {
        let meta = rule.meta();
        Self {
            rule,
            severity: over.and_then(|o| o.severity).unwrap_or(meta.severity),
            allow: over.and_then(|o| build_allowlist(&meta.id, &o.allow)),
        }
    }

    fn is_allowed(&self, name: &str) -> bool {
        self.allow
            .as_ref()
            .map(|set| set.is_match(name))
            .unwrap_or(false)
    }

    /// Resource rules are guarded per resource, so one resource the rule cannot
    /// evaluate does not hide findings on the others. Stack rules are guarded as a whole.
    fn run(&self, snapshot: &StackSnapshot) -> Vec<Violation> {
        let meta = self.rule.meta();
        let mut out = Vec::new();

        match self.rule {
            Rule::Resource(rule) => {
                for resource in snapshot.resources.iter().filter(|r| rule.matches(r)) {
                    if self.is_allowed(resource.name()) {
                        continue;
                    }
                    let reference = resource.reference();
                    match guarded(|| rule.check(resource, &snapshot.context)) {
                        Ok(messages) => out.extend(messages.into_iter().map(|message| {
                            policy_violation(meta, self.severity, Some(&reference), message)
                        })),
                        Err(error) => {
                            warn!(
                                rule = %meta.id,
                                resource = %reference,
                                %error,
                                "rule failed to evaluate"
                            );
                            out.push(evaluation_error(
                                meta,
                                self.severity,
                                Some(&reference),
                                &error,
                            ));
                        }
                    }
                }
            }
            Rule::Stack(rule) => match guarded(|| rule.check(snapshot)) {
                Ok(findings) => {
                    for finding in findings {
                        if let Some(r) = &finding.resource
                            && self.is_allowed(&r.name)
                        {
                            continue;
                        }
                        out.push(policy_violation(
                            meta,
                            self.severity,
                            finding.resource.as_ref(),
                            finding.message,
                        ));
                    }
                }
                Err(error) => {
                    warn!(rule = %meta.id, %error, "rule failed to evaluate");
                    out.push(evaluation_error(meta, self.severity, None, &error));
                }
            },
        }

        debug!(rule = %meta.id, violations = out.len(), "rule evaluated");
        out
    }
}

/// Run one rule invocation, turning a panic into a `RuleError`.
fn guarded<T>(check: impl FnOnce() -> Result<T, RuleError>) -> Result<T, RuleError> {
    panic::catch_unwind(AssertUnwindSafe(check))
        .unwrap_or_else(|payload| Err(RuleError::Panicked(panic_message(payload.as_ref()))))
}

fn policy_violation(
    meta: &RuleMeta,
    severity: Severity,
    resource: Option<&ResourceRef>,
    message: String,
) -> Violation {
    let mut v = Violation::new(meta.id.clone(), resource, message, severity);
    v.fingerprint = Some(fingerprint_for_violation(
        &v.rule_id,
        v.resource_type.as_deref(),
        v.resource_name.as_deref(),
        &v.message,
    ));
    v
}

fn evaluation_error(
    meta: &RuleMeta,
    severity: Severity,
    resource: Option<&ResourceRef>,
    error: &RuleError,
) -> Violation {
    let message = match resource {
        Some(r) => format!("rule '{}' failed to evaluate {}: {}", meta.id, r, error),
        None => format!("rule '{}' failed to evaluate: {}", meta.id, error),
    };
    let mut v = policy_violation(meta, severity, resource, message);
    v.kind = ViolationKind::RuleEvaluationError;
    v
}

fn build_allowlist(rule_id: &str, patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        // Patterns are validated during config resolution; anything left over is skipped.
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => warn!(rule = rule_id, %pattern, %err, "ignoring invalid allow pattern"),
        }
    }
    builder.build().ok()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
