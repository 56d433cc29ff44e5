use super::utils::{is_true, non_empty_list};
use crate::model::{Resource, ResourceKind, StackContext};
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleError, RuleMeta};
use stackguard_types::{Severity, ids};

pub fn rules(params: &RuleParams) -> Vec<Rule> {
    let allowed_classes = params.allowed_db_instance_classes.clone();
    let forbidden_usernames = params.forbidden_db_usernames.clone();
    let min_retention = params.min_backup_retention_days;

    vec![
        rds(
            meta(
                ids::RULE_RDS_IN_SUBNET_GROUP,
                Severity::Mandatory,
                "Database instances must be placed in a DB subnet group",
                "Set dbSubnetGroupName to a subnet group built from private subnets.",
            ),
            |r, _| {
                if r.str_property("dbSubnetGroupName").into_result()?.is_some() {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("database '{}' has no DB subnet group", r.name())])
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_ALLOWED_INSTANCE_CLASS,
                Severity::Mandatory,
                "Database instances must use an approved instance class",
                "Pick a class from `allowed_db_instance_classes`.",
            ),
            move |r, _| {
                let Some(class) = r.str_property("instanceClass").into_result()? else {
                    return Ok(Vec::new());
                };
                if allowed_classes.iter().any(|c| c == class) {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "database '{}' uses unexpected instance class '{}'; expected one of: {}",
                    r.name(),
                    class,
                    allowed_classes.join(", ")
                )])
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_NOT_PUBLIC,
                Severity::Mandatory,
                "Database instances must not be publicly accessible",
                "Set publiclyAccessible to false.",
            ),
            |r, _| {
                if is_true(r, "publiclyAccessible")? {
                    return Ok(vec![format!("database '{}' is publicly accessible", r.name())]);
                }
                Ok(Vec::new())
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_STORAGE_ENCRYPTED,
                Severity::Mandatory,
                "Database storage must be encrypted at rest",
                "Set storageEncrypted to true.",
            ),
            |r, _| {
                if is_true(r, "storageEncrypted")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("database '{}' does not encrypt its storage", r.name())])
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_USERNAME_NOT_DEFAULT,
                Severity::Mandatory,
                "Database master usernames must not be a well-known default",
                "Choose a non-default master username.",
            ),
            move |r, _| {
                let Some(user) = r.str_property("username").into_result()? else {
                    return Ok(Vec::new());
                };
                if forbidden_usernames.iter().any(|u| u.eq_ignore_ascii_case(user)) {
                    return Ok(vec![format!(
                        "database '{}' uses default master username '{}'",
                        r.name(),
                        user
                    )]);
                }
                Ok(Vec::new())
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_MONITORING_ENABLED,
                Severity::Advisory,
                "Database instances should enable enhanced monitoring",
                "Set monitoringInterval to a positive number of seconds and a monitoringRoleArn.",
            ),
            |r, _| {
                match r.int_property("monitoringInterval").into_result()? {
                    Some(interval) if interval > 0 => Ok(Vec::new()),
                    _ => Ok(vec![format!(
                        "database '{}' has enhanced monitoring disabled",
                        r.name()
                    )]),
                }
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_BACKUP_RETENTION,
                Severity::Mandatory,
                "Database backups must be retained for the minimum period",
                "Raise backupRetentionPeriod to at least `min_backup_retention_days`.",
            ),
            move |r, _| backup_retention(r, min_retention),
        ),
        rds(
            meta(
                ids::RULE_RDS_MULTI_AZ,
                Severity::Advisory,
                "Database instances should be deployed across availability zones",
                "Set multiAz to true.",
            )
            .opt_in(),
            |r, _| {
                if is_true(r, "multiAz")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("database '{}' is not multi-AZ", r.name())])
            },
        ),
        rds(
            meta(
                ids::RULE_RDS_LOGGING_ENABLED,
                Severity::Advisory,
                "Database instances should export logs to CloudWatch",
                "List the engine's log types in enabledCloudwatchLogsExports.",
            )
            .opt_in(),
            |r, _| {
                if non_empty_list(r, "enabledCloudwatchLogsExports")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("database '{}' exports no logs", r.name())])
            },
        ),
    ]
}

fn meta(id: &str, severity: Severity, description: &str, remediation: &str) -> RuleMeta {
    RuleMeta::new(id, ids::CATEGORY_DATABASE, severity, description).with_remediation(remediation)
}

fn rds<F>(meta: RuleMeta, check: F) -> Rule
where
    F: Fn(&Resource, &StackContext) -> Result<Vec<String>, RuleError> + Send + Sync + 'static,
{
    ResourcePolicy::new(meta, [ResourceKind::RdsInstance], check).into()
}

fn backup_retention(r: &Resource, min_days: i64) -> Result<Vec<String>, RuleError> {
    match r.int_property("backupRetentionPeriod").into_result()? {
        Some(days) if days >= min_days => Ok(Vec::new()),
        Some(days) => Ok(vec![format!(
            "database '{}' retains backups for {} days; minimum is {}",
            r.name(),
            days,
            min_days
        )]),
        None => Ok(vec![format!(
            "database '{}' has no backup retention period configured",
            r.name()
        )]),
    }
}
