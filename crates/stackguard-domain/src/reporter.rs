use stackguard_types::{EnforcementLevel, ResourceRef, Severity, Verdict, Violation};

/// Accumulates violations across one evaluation pass, preserving arrival order.
#[derive(Clone, Debug, Default)]
pub struct ViolationReporter {
    violations: Vec<Violation>,
}

impl ViolationReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Decide the outcome of the pass.
    ///
    /// Advisory enforcement always succeeds. Mandatory enforcement fails when any
    /// violation was reported, whatever its per-rule severity.
    pub fn finalize(self, level: EnforcementLevel) -> Outcome {
        let success = match level {
            EnforcementLevel::Advisory => true,
            EnforcementLevel::Mandatory => self.violations.is_empty(),
        };
        Outcome {
            success,
            level,
            violations: self.violations,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub advisory: u32,
    pub mandatory: u32,
    pub evaluation_errors: u32,
}

impl OutcomeCounts {
    pub fn total(&self) -> u32 {
        self.advisory + self.mandatory
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub level: EnforcementLevel,
    pub violations: Vec<Violation>,
}

impl Outcome {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for v in &self.violations {
            match v.severity {
                Severity::Advisory => counts.advisory += 1,
                Severity::Mandatory => counts.mandatory += 1,
            }
            if v.is_evaluation_error() {
                counts.evaluation_errors += 1;
            }
        }
        counts
    }

    /// Only mandatory-severity violations fail a run, and only under
    /// mandatory enforcement. Anything else that was reported is a warning.
    pub fn verdict(&self) -> Verdict {
        if self.violations.is_empty() {
            Verdict::Pass
        } else if self.level == EnforcementLevel::Mandatory && self.counts().mandatory > 0 {
            Verdict::Fail
        } else {
            Verdict::Warn
        }
    }

    /// Violations grouped per resource, groups in order of first appearance.
    /// Stack-level violations (no resource) come back under `None`.
    pub fn by_resource(&self) -> Vec<(Option<ResourceRef>, Vec<&Violation>)> {
        let mut groups: Vec<(Option<ResourceRef>, Vec<&Violation>)> = Vec::new();
        for v in &self.violations {
            let key = v.resource();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, items)) => items.push(v),
                None => groups.push((key, vec![v])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackguard_types::ViolationKind;

    fn violation(rule: &str, name: Option<&str>, severity: Severity) -> Violation {
        let r = name.map(|n| ResourceRef::new("aws:s3/bucket:Bucket", n));
        Violation::new(rule, r.as_ref(), format!("{rule} broke"), severity)
    }

    #[test]
    fn mandatory_success_is_false_on_any_violation() {
        let mut reporter = ViolationReporter::new();
        reporter.report(violation("a", Some("x"), Severity::Advisory));
        let outcome = reporter.finalize(EnforcementLevel::Mandatory);
        assert!(!outcome.success);
    }

    #[test]
    fn advisory_violations_only_warn_under_mandatory() {
        let mut reporter = ViolationReporter::new();
        reporter.report(violation("a", Some("x"), Severity::Advisory));
        reporter.report(violation("b", None, Severity::Advisory));
        let outcome = reporter.finalize(EnforcementLevel::Mandatory);
        assert_eq!(outcome.verdict(), Verdict::Warn);
    }

    #[test]
    fn mandatory_violation_fails_under_mandatory() {
        let mut reporter = ViolationReporter::new();
        reporter.report(violation("a", Some("x"), Severity::Advisory));
        reporter.report(violation("b", Some("y"), Severity::Mandatory));
        let outcome = reporter.finalize(EnforcementLevel::Mandatory);
        assert_eq!(outcome.verdict(), Verdict::Fail);
    }

    #[test]
    fn advisory_always_succeeds() {
        let mut reporter = ViolationReporter::new();
        reporter.extend([
            violation("a", Some("x"), Severity::Mandatory),
            violation("b", None, Severity::Mandatory),
        ]);
        let outcome = reporter.finalize(EnforcementLevel::Advisory);
        assert!(outcome.success);
        assert_eq!(outcome.violations.len(), 2);
        assert_eq!(outcome.verdict(), Verdict::Warn);
    }

    #[test]
    fn empty_pass_succeeds_under_any_level() {
        for level in [EnforcementLevel::Advisory, EnforcementLevel::Mandatory] {
            let outcome = ViolationReporter::new().finalize(level);
            assert!(outcome.success);
            assert_eq!(outcome.verdict(), Verdict::Pass);
            assert_eq!(outcome.counts(), OutcomeCounts::default());
        }
    }

    #[test]
    fn counts_split_by_severity_and_flag_errors() {
        let mut errored = violation("c", Some("y"), Severity::Advisory);
        errored.kind = ViolationKind::RuleEvaluationError;

        let mut reporter = ViolationReporter::new();
        reporter.extend([
            violation("a", Some("x"), Severity::Mandatory),
            violation("b", Some("x"), Severity::Advisory),
            errored,
        ]);
        let counts = reporter.finalize(EnforcementLevel::Mandatory).counts();
        assert_eq!(counts.mandatory, 1);
        assert_eq!(counts.advisory, 2);
        assert_eq!(counts.evaluation_errors, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn groups_follow_first_appearance() {
        let mut reporter = ViolationReporter::new();
        reporter.extend([
            violation("a", Some("y"), Severity::Mandatory),
            violation("a", Some("x"), Severity::Mandatory),
            violation("b", None, Severity::Mandatory),
            violation("b", Some("y"), Severity::Mandatory),
        ]);
        let outcome = reporter.finalize(EnforcementLevel::Mandatory);
        let groups = outcome.by_resource();
        let names: Vec<Option<&str>> = groups
            .iter()
            .map(|(k, _)| k.as_ref().map(|r| r.name.as_str()))
            .collect();
        assert_eq!(names, vec![Some("y"), Some("x"), None]);
        assert_eq!(groups[0].1.len(), 2);
    }
}
