use anyhow::Context;
use camino::Utf8Path;
use stackguard_domain::reporter::ViolationReporter;
use stackguard_domain::rules;
use stackguard_render::{
    RenderableData, RenderableGroup, RenderableReport, RenderableResource, RenderableSeverity,
    RenderableVerdictStatus, RenderableViolation,
};
use stackguard_types::{SCHEMA_REPORT_V1, Severity, StackguardReport, Verdict};
use std::collections::BTreeMap;

/// Which JSON Schema to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// The `stackguard.report.v1` envelope.
    Report,
    /// `stackguard.toml`.
    Config,
}

pub fn schema_json(kind: SchemaKind) -> serde_json::Value {
    match kind {
        SchemaKind::Report => serde_json::to_value(schemars::schema_for!(StackguardReport))
            .unwrap_or_default(),
        SchemaKind::Config => stackguard_settings::config_schema(),
    }
}

pub fn parse_report_json(text: &str) -> anyhow::Result<StackguardReport> {
    let value: serde_json::Value = serde_json::from_str(text).context("parse report json")?;

    let schema = value
        .get("schema")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if schema != SCHEMA_REPORT_V1 {
        anyhow::bail!("unknown report schema: {schema:?} (expected {SCHEMA_REPORT_V1})");
    }

    serde_json::from_value(value).context("parse stackguard report")
}

pub fn serialize_report(report: &StackguardReport) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(report).context("serialize report")
}

pub fn write_report(path: &Utf8Path, report: &StackguardReport) -> anyhow::Result<()> {
    let mut bytes = serialize_report(report)?;
    bytes.push(b'\n');
    write_bytes(path, &bytes)
}

pub fn write_text(path: &Utf8Path, text: &str) -> anyhow::Result<()> {
    write_bytes(path, text.as_bytes())
}

fn write_bytes(path: &Utf8Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {}", path))
}

/// Convert a report into the render model: violations grouped per resource in order of first
/// appearance, each carrying its rule's remediation hint.
pub fn to_renderable(report: &StackguardReport) -> RenderableReport {
    let remediations: BTreeMap<String, Option<String>> = rules::catalog()
        .into_iter()
        .map(|m| (m.id, m.remediation))
        .collect();

    let mut reporter = ViolationReporter::new();
    reporter.extend(report.violations.iter().cloned());
    let outcome = reporter.finalize(report.enforcement);

    let groups = outcome
        .by_resource()
        .into_iter()
        .map(|(resource, violations)| RenderableGroup {
            resource: resource.map(|r| RenderableResource {
                resource_type: r.resource_type,
                name: r.name,
            }),
            violations: violations
                .into_iter()
                .map(|v| RenderableViolation {
                    severity: match v.severity {
                        Severity::Advisory => RenderableSeverity::Advisory,
                        Severity::Mandatory => RenderableSeverity::Mandatory,
                    },
                    rule_id: v.rule_id.clone(),
                    message: v.message.clone(),
                    evaluation_error: v.is_evaluation_error(),
                    remediation: if v.is_evaluation_error() {
                        None
                    } else {
                        remediations.get(&v.rule_id).cloned().flatten()
                    },
                })
                .collect(),
        })
        .collect();

    RenderableReport {
        verdict: match report.verdict {
            Verdict::Pass => RenderableVerdictStatus::Pass,
            Verdict::Warn => RenderableVerdictStatus::Warn,
            Verdict::Fail => RenderableVerdictStatus::Fail,
        },
        groups,
        data: RenderableData {
            profile: report.data.profile.clone(),
            enforcement: report.enforcement.to_string(),
            resources_scanned: report.data.resources_scanned,
            rules_evaluated: report.data.rules_evaluated,
            violations_total: report.data.violations_total,
            evaluation_errors: report.data.evaluation_errors,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use stackguard_types::{
        EnforcementLevel, ReportEnvelope, ResourceRef, StackguardData, ToolMeta, Violation,
        ViolationKind, ids,
    };
    use time::OffsetDateTime;

    pub(crate) fn sample_report() -> StackguardReport {
        let bucket = ResourceRef::new("aws:s3/bucket:Bucket", "assets");
        let vpc = ResourceRef::new("aws:ec2/vpc:Vpc", "main");
        let mut error = Violation::new(
            ids::RULE_IAM_ROLE_TRUSTED_PRINCIPALS,
            None,
            "rule 'iam-role-trusted-principals' failed to evaluate: boom",
            Severity::Mandatory,
        );
        error.kind = ViolationKind::RuleEvaluationError;

        ReportEnvelope {
            schema: SCHEMA_REPORT_V1.to_string(),
            tool: ToolMeta {
                name: "stackguard".to_string(),
                version: "0.1.0".to_string(),
            },
            started_at: OffsetDateTime::UNIX_EPOCH,
            finished_at: OffsetDateTime::UNIX_EPOCH,
            enforcement: EnforcementLevel::Mandatory,
            verdict: Verdict::Fail,
            violations: vec![
                Violation::new(
                    ids::RULE_S3_NO_PUBLIC_READ,
                    Some(&bucket),
                    "bucket 'assets' uses public canned ACL 'public-read'",
                    Severity::Mandatory,
                ),
                Violation::new(
                    ids::RULE_VPC_DNS_ENABLED,
                    Some(&vpc),
                    "vpc 'main' does not enable DNS support",
                    Severity::Advisory,
                ),
                Violation::new(
                    ids::RULE_S3_ENCRYPTION_ENABLED,
                    Some(&bucket),
                    "bucket 'assets' has no server-side encryption",
                    Severity::Mandatory,
                ),
                error,
            ],
            data: StackguardData {
                profile: "baseline".to_string(),
                stack: Some("dev".to_string()),
                resources_scanned: 2,
                rules_evaluated: 31,
                violations_total: 4,
                evaluation_errors: 1,
            },
        }
    }

    #[test]
    fn report_json_round_trips_with_schema_check() {
        let report = sample_report();
        let bytes = serialize_report(&report).expect("serialize");
        let text = String::from_utf8(bytes).expect("utf8");
        let back = parse_report_json(&text).expect("parse");
        assert_eq!(back, report);
    }

    #[test]
    fn foreign_schema_is_rejected() {
        let err = parse_report_json(r#"{"schema": "other.report.v1"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown report schema"));
    }

    #[test]
    fn renderable_groups_by_first_appearance() {
        let r = to_renderable(&sample_report());
        assert_eq!(r.verdict, RenderableVerdictStatus::Fail);
        assert_eq!(r.data.enforcement, "mandatory");
        assert_eq!(r.groups.len(), 3);

        let bucket = &r.groups[0];
        assert_eq!(bucket.resource.as_ref().map(|x| x.name.as_str()), Some("assets"));
        let rule_ids: Vec<&str> = bucket.violations.iter().map(|v| v.rule_id.as_str()).collect();
        assert_eq!(
            rule_ids,
            vec![ids::RULE_S3_NO_PUBLIC_READ, ids::RULE_S3_ENCRYPTION_ENABLED]
        );

        assert_eq!(r.groups[1].resource.as_ref().map(|x| x.name.as_str()), Some("main"));

        let stack = &r.groups[2];
        assert!(stack.resource.is_none());
        assert!(stack.violations[0].evaluation_error);
        assert!(stack.violations[0].remediation.is_none());
    }

    #[test]
    fn renderable_carries_catalog_remediation() {
        let r = to_renderable(&sample_report());
        let expected = rules::catalog()
            .into_iter()
            .find(|m| m.id == ids::RULE_S3_NO_PUBLIC_READ)
            .and_then(|m| m.remediation);
        assert_eq!(r.groups[0].violations[0].remediation, expected);
    }

    #[test]
    fn schemas_are_objects() {
        let report = schema_json(SchemaKind::Report);
        assert!(report["properties"]["violations"].is_object());
        let config = schema_json(SchemaKind::Config);
        assert!(config["properties"]["profile"].is_object());
    }

    #[test]
    fn write_report_creates_parent_dirs() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = camino::Utf8Path::from_path(tmp.path()).expect("utf8 path");
        let path = root.join("out").join("report.json");

        write_report(&path, &sample_report()).expect("write");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.ends_with('\n'));
        assert_eq!(parse_report_json(&text).expect("parse"), sample_report());
    }
}
