#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderableSeverity {
    Advisory,
    Mandatory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderableVerdictStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableResource {
    pub resource_type: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableViolation {
    pub severity: RenderableSeverity,
    pub rule_id: String,
    pub message: String,
    /// The rule failed to evaluate rather than finding a problem.
    pub evaluation_error: bool,
    pub remediation: Option<String>,
}

/// Violations attributed to one resource; `resource` is `None` for stack-level findings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableGroup {
    pub resource: Option<RenderableResource>,
    pub violations: Vec<RenderableViolation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableData {
    pub profile: String,
    pub enforcement: String,
    pub resources_scanned: u32,
    pub rules_evaluated: u32,
    pub violations_total: u32,
    pub evaluation_errors: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableReport {
    pub verdict: RenderableVerdictStatus,
    pub groups: Vec<RenderableGroup>,
    pub data: RenderableData,
}

impl RenderableSeverity {
    pub(crate) fn label(self) -> &'static str {
        match self {
            RenderableSeverity::Advisory => "ADVISORY",
            RenderableSeverity::Mandatory => "MANDATORY",
        }
    }
}

impl RenderableVerdictStatus {
    pub(crate) fn label(self) -> &'static str {
        match self {
            RenderableVerdictStatus::Pass => "PASS",
            RenderableVerdictStatus::Warn => "WARN",
            RenderableVerdictStatus::Fail => "FAIL",
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_report() -> RenderableReport {
    RenderableReport {
        verdict: RenderableVerdictStatus::Fail,
        groups: vec![
            RenderableGroup {
                resource: Some(RenderableResource {
                    resource_type: "aws:s3/bucket:Bucket".to_string(),
                    name: "assets".to_string(),
                }),
                violations: vec![
                    RenderableViolation {
                        severity: RenderableSeverity::Mandatory,
                        rule_id: "s3-no-public-read".to_string(),
                        message: "bucket 'assets' uses public canned ACL 'public-read'".to_string(),
                        evaluation_error: false,
                        remediation: Some("Use a private ACL.".to_string()),
                    },
                    RenderableViolation {
                        severity: RenderableSeverity::Advisory,
                        rule_id: "s3-versioning-enabled".to_string(),
                        message: "bucket 'assets' has no versioning configured".to_string(),
                        evaluation_error: false,
                        remediation: None,
                    },
                ],
            },
            RenderableGroup {
                resource: None,
                violations: vec![RenderableViolation {
                    severity: RenderableSeverity::Mandatory,
                    rule_id: "route-uses-known-gateway".to_string(),
                    message: "rule 'route-uses-known-gateway' failed to evaluate: 100%\nbroken"
                        .to_string(),
                    evaluation_error: true,
                    remediation: None,
                }],
            },
        ],
        data: RenderableData {
            profile: "baseline".to_string(),
            enforcement: "mandatory".to_string(),
            resources_scanned: 4,
            rules_evaluated: 31,
            violations_total: 3,
            evaluation_errors: 1,
        },
    }
}
