use super::utils::non_empty_list;
use crate::model::{Property, Resource, ResourceKind, StackContext};
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleError, RuleMeta};
use stackguard_types::{Severity, ids};

const PUBLIC_ACLS: &[&str] = &["public-read", "public-read-write"];

pub fn rules(_params: &RuleParams) -> Vec<Rule> {
    vec![
        ResourcePolicy::new(
            RuleMeta::new(
                ids::RULE_S3_NO_PUBLIC_READ,
                ids::CATEGORY_STORAGE,
                Severity::Mandatory,
                "Buckets must not use a public-read or public-read-write canned ACL",
            )
            .with_remediation("Use a private ACL and grant access through bucket policies."),
            [ResourceKind::S3Bucket],
            no_public_read,
        )
        .into(),
        ResourcePolicy::new(
            RuleMeta::new(
                ids::RULE_S3_ENCRYPTION_ENABLED,
                ids::CATEGORY_STORAGE,
                Severity::Mandatory,
                "Buckets must configure server-side encryption",
            )
            .with_remediation("Add a serverSideEncryptionConfiguration, preferably with aws:kms."),
            [ResourceKind::S3Bucket],
            |r, _| {
                if r.has_property("serverSideEncryptionConfiguration") {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "bucket '{}' has no server-side encryption configured",
                    r.name()
                )])
            },
        )
        .into(),
        ResourcePolicy::new(
            RuleMeta::new(
                ids::RULE_S3_VERSIONING_ENABLED,
                ids::CATEGORY_STORAGE,
                Severity::Advisory,
                "Buckets should enable object versioning",
            )
            .with_remediation("Set versioning.enabled to true.")
            .opt_in(),
            [ResourceKind::S3Bucket],
            versioning_enabled,
        )
        .into(),
        ResourcePolicy::new(
            RuleMeta::new(
                ids::RULE_S3_LOGGING_ENABLED,
                ids::CATEGORY_STORAGE,
                Severity::Advisory,
                "Buckets should ship access logs to a logging bucket",
            )
            .with_remediation("Add a loggings entry pointing at a dedicated log bucket.")
            .opt_in(),
            [ResourceKind::S3Bucket],
            |r, _| {
                if non_empty_list(r, "loggings")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("bucket '{}' has no access logging configured", r.name())])
            },
        )
        .into(),
    ]
}

fn no_public_read(r: &Resource, _ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    match r.str_property("acl").into_result()? {
        Some(acl) if PUBLIC_ACLS.contains(&acl) => Ok(vec![format!(
            "bucket '{}' uses public canned ACL '{}'",
            r.name(),
            acl
        )]),
        _ => Ok(Vec::new()),
    }
}

fn versioning_enabled(r: &Resource, _ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    if r.object_property("versioning").into_result()?.is_none() {
        return Ok(vec![format!("bucket '{}' has no versioning configured", r.name())]);
    }
    match r.bool_property("versioning.enabled") {
        Property::Present(true) => Ok(Vec::new()),
        Property::Present(false) | Property::Absent => {
            Ok(vec![format!("bucket '{}' has versioning disabled", r.name())])
        }
        Property::WrongShape { path, expected } => Err(RuleError::UnexpectedShape { path, expected }),
    }
}
