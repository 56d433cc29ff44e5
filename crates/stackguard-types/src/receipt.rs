use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Stable schema identifier for stackguard reports.
pub const SCHEMA_REPORT_V1: &str = "stackguard.report.v1";

/// How much a single violation matters. Two levels map cleanly to CI signals.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Advisory,
    Mandatory,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Advisory => "advisory",
            Severity::Mandatory => "mandatory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether accumulated violations block the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    Advisory,
    Mandatory,
}

impl EnforcementLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementLevel::Advisory => "advisory",
            EnforcementLevel::Mandatory => "mandatory",
        }
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distinguishes real policy findings from rules that failed to evaluate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    #[default]
    Policy,
    RuleEvaluationError,
}

impl ViolationKind {
    fn is_policy(&self) -> bool {
        *self == ViolationKind::Policy
    }
}

/// Identity of a resource inside one snapshot: its type token plus logical name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ResourceRef {
    pub resource_type: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.resource_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub rule_id: String,

    /// `None` for stack-scoped findings not attributable to one resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    pub message: String,
    pub severity: Severity,

    #[serde(default, skip_serializing_if = "ViolationKind::is_policy")]
    pub kind: ViolationKind,

    /// Stable identifier intended for dedup and trending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl Violation {
    pub fn new(
        rule_id: impl Into<String>,
        resource: Option<&ResourceRef>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            resource_type: resource.map(|r| r.resource_type.clone()),
            resource_name: resource.map(|r| r.name.clone()),
            message: message.into(),
            severity,
            kind: ViolationKind::Policy,
            fingerprint: None,
        }
    }

    pub fn resource(&self) -> Option<ResourceRef> {
        match (&self.resource_type, &self.resource_name) {
            (Some(t), Some(n)) => Some(ResourceRef::new(t.clone(), n.clone())),
            _ => None,
        }
    }

    pub fn is_evaluation_error(&self) -> bool {
        self.kind == ViolationKind::RuleEvaluationError
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

/// Stackguard-specific summary payload for the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct StackguardData {
    pub profile: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    pub resources_scanned: u32,
    pub rules_evaluated: u32,

    pub violations_total: u32,
    pub evaluation_errors: u32,
}

/// Report envelope written by `stackguard check`.
///
/// Keeping this generic allows embedding tool-specific data while still enforcing a stable outer shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEnvelope<TData = StackguardData> {
    /// Versioned schema identifier for the envelope shape.
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub enforcement: EnforcementLevel,
    pub verdict: Verdict,
    pub violations: Vec<Violation>,
    pub data: TData,
}

pub type StackguardReport = ReportEnvelope<StackguardData>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn policy_kind_and_missing_resource_are_omitted() {
        let v = Violation::new("s3-no-public-read", None, "bad", Severity::Mandatory);
        let value = serde_json::to_value(&v).expect("serialize");
        assert_eq!(
            value,
            json!({
                "rule_id": "s3-no-public-read",
                "message": "bad",
                "severity": "mandatory",
            })
        );
    }

    #[test]
    fn evaluation_error_kind_is_serialized() {
        let r = ResourceRef::new("aws:s3/bucket:Bucket", "logs");
        let mut v = Violation::new("x", Some(&r), "boom", Severity::Advisory);
        v.kind = ViolationKind::RuleEvaluationError;
        let value = serde_json::to_value(&v).expect("serialize");
        assert_eq!(value["kind"], "rule_evaluation_error");
        assert_eq!(value["resource_name"], "logs");

        let back: Violation = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, v);
        assert_eq!(back.resource(), Some(r));
    }
}
