use crate::model::ResourceKind;
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleMeta, StackFinding, StackPolicy};
use stackguard_types::{Severity, ids};
use std::collections::BTreeSet;

pub fn rules(_params: &RuleParams) -> Vec<Rule> {
    vec![
        StackPolicy::new(
            RuleMeta::new(
                ids::RULE_SECRET_ROTATION_ENABLED,
                ids::CATEGORY_SECRETS,
                Severity::Advisory,
                "Every secret should have a rotation schedule",
            )
            .with_remediation("Declare an aws:secretsmanager/secretRotation:SecretRotation for the secret.")
            .opt_in(),
            |snapshot| {
                let mut rotated = BTreeSet::new();
                for rotation in snapshot.of_kind(&ResourceKind::SecretRotation) {
                    if let Some(secret) = rotation.str_property("secretId").into_result()? {
                        rotated.insert(secret);
                    }
                }

                let mut out = Vec::new();
                for secret in snapshot.of_kind(&ResourceKind::Secret) {
                    // Rotations reference the secret by id or ARN; outputs usually carry both.
                    let id = secret.str_property("id").into_result()?;
                    let arn = secret.str_property("arn").into_result()?;
                    let covered = [id, arn]
                        .into_iter()
                        .flatten()
                        .any(|key| rotated.contains(key));
                    if !covered {
                        out.push(StackFinding::on(
                            secret,
                            format!("secret '{}' has no rotation configured", secret.name()),
                        ));
                    }
                }
                Ok(out)
            },
        )
        .into(),
        ResourcePolicy::new(
            RuleMeta::new(
                ids::RULE_SECRET_CUSTOM_KMS_KEY,
                ids::CATEGORY_SECRETS,
                Severity::Mandatory,
                "Secrets must be encrypted with a customer-managed KMS key",
            )
            .with_remediation("Set kmsKeyId to a key managed by this stack."),
            [ResourceKind::Secret],
            |r, _| {
                if r.str_property("kmsKeyId").into_result()?.is_some() {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "secret '{}' uses the AWS-managed default key",
                    r.name()
                )])
            },
        )
        .into(),
    ]
}
