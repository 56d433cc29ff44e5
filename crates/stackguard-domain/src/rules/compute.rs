use super::utils::{is_true, non_empty_list};
use crate::model::{Resource, ResourceKind, StackContext, StackSnapshot};
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleError, RuleMeta, StackFinding, StackPolicy};
use regex::Regex;
use serde_json::Value;
use stackguard_types::{Severity, ids};
use std::sync::{Mutex, PoisonError};

/// Placeholder in `instance_profile_pattern` replaced by the stack's project name.
pub const PROJECT_PLACEHOLDER: &str = "{project}";

pub fn rules(params: &RuleParams) -> Vec<Rule> {
    let allowed_types = params.allowed_instance_types.clone();
    let profile = params.instance_profile_pattern.clone().map(ProfileMatcher::new);

    vec![
        ResourcePolicy::new(
            meta(
                ids::RULE_EC2_ALLOWED_INSTANCE_TYPE,
                Severity::Mandatory,
                "EC2 instances must use an approved instance type",
                "Pick an instance type from `allowed_instance_types`.",
            ),
            [ResourceKind::Ec2Instance],
            move |r, _| {
                let Some(kind) = r.str_property("instanceType").into_result()? else {
                    return Ok(Vec::new());
                };
                if allowed_types.iter().any(|t| t == kind) {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "instance '{}' uses unexpected instance type '{}'; expected one of: {}",
                    r.display_name(),
                    kind,
                    allowed_types.join(", ")
                )])
            },
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_EC2_PUBLIC_IP,
                Severity::Mandatory,
                "EC2 instances must associate a public IP address",
                "Set associatePublicIpAddress to true.",
            ),
            [ResourceKind::Ec2Instance],
            |r, _| {
                if is_true(r, "associatePublicIpAddress")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!(
                    "instance '{}' does not associate a public IP address",
                    r.display_name()
                )])
            },
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_EC2_IAM_PROFILE,
                Severity::Mandatory,
                "EC2 instances must use an instance profile matching the naming pattern",
                "Attach the project's instance profile; see `instance_profile_pattern`.",
            )
            .opt_in(),
            [ResourceKind::Ec2Instance],
            move |r, ctx| match &profile {
                Some(matcher) => iam_profile(r, ctx, matcher),
                None => Ok(Vec::new()),
            },
        )
        .into(),
        StackPolicy::new(
            meta(
                ids::RULE_EC2_EBS_ENCRYPTED,
                Severity::Mandatory,
                "Root and attached EBS volumes of EC2 instances must be encrypted",
                "Set encrypted = true on rootBlockDevice and every ebsBlockDevices entry.",
            ),
            ebs_encrypted,
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_LAMBDA_IN_VPC,
                Severity::Mandatory,
                "Lambda functions must run inside a VPC",
                "Set vpcConfig.subnetIds and vpcConfig.securityGroupIds.",
            ),
            [ResourceKind::LambdaFunction],
            |r, _| {
                if non_empty_list(r, "vpcConfig.subnetIds")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("function '{}' is not attached to a VPC", r.name())])
            },
        )
        .into(),
    ]
}

fn meta(id: &str, severity: Severity, description: &str, remediation: &str) -> RuleMeta {
    RuleMeta::new(id, ids::CATEGORY_COMPUTE, severity, description).with_remediation(remediation)
}

/// Expand `{project}` with the regex-escaped project name and compile.
pub fn profile_regex(pattern: &str, project: Option<&str>) -> Result<Regex, regex::Error> {
    let expanded = match project {
        Some(p) => pattern.replace(PROJECT_PLACEHOLDER, &regex::escape(p)),
        None => pattern.to_string(),
    };
    Regex::new(&expanded)
}

/// `instance_profile_pattern` compiled once per rule build. A pattern with a
/// `{project}` placeholder is recompiled only when the project changes.
struct ProfileMatcher {
    pattern: String,
    templated: bool,
    /// Last compiled expansion and the project it was expanded for.
    compiled: Mutex<Option<(Option<String>, Regex)>>,
}

impl ProfileMatcher {
    fn new(pattern: String) -> Self {
        let templated = pattern.contains(PROJECT_PLACEHOLDER);
        let compiled = if templated {
            None
        } else {
            profile_regex(&pattern, None).ok().map(|re| (None, re))
        };
        Self {
            pattern,
            templated,
            compiled: Mutex::new(compiled),
        }
    }

    fn regex_for(&self, project: Option<&str>) -> Result<Regex, RuleError> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((key, re)) = compiled.as_ref()
            && (!self.templated || key.as_deref() == project)
        {
            return Ok(re.clone());
        }

        let re = profile_regex(&self.pattern, project)
            .map_err(|e| RuleError::malformed("instance_profile_pattern", e.to_string()))?;
        *compiled = Some((project.map(str::to_string), re.clone()));
        Ok(re)
    }
}

fn iam_profile(
    r: &Resource,
    ctx: &StackContext,
    matcher: &ProfileMatcher,
) -> Result<Vec<String>, RuleError> {
    let re = matcher.regex_for(ctx.project.as_deref())?;

    match r.str_property("iamInstanceProfile").into_result()? {
        Some(profile) if re.is_match(profile) => Ok(Vec::new()),
        Some(profile) => Ok(vec![format!(
            "instance '{}' uses unexpected instance profile '{}'",
            r.display_name(),
            profile
        )]),
        None => Ok(vec![format!(
            "instance '{}' has no IAM instance profile",
            r.display_name()
        )]),
    }
}

fn ebs_encrypted(snapshot: &StackSnapshot) -> Result<Vec<StackFinding>, RuleError> {
    let mut out = Vec::new();
    for instance in snapshot.of_kind(&ResourceKind::Ec2Instance) {
        if instance.object_property("rootBlockDevice").into_result()?.is_some()
            && !is_true(instance, "rootBlockDevice.encrypted")?
        {
            out.push(StackFinding::on(
                instance,
                format!(
                    "instance '{}' has an unencrypted root EBS volume",
                    instance.display_name()
                ),
            ));
        }

        let devices = instance.array_property("ebsBlockDevices").into_result()?;
        for (idx, device) in devices.into_iter().flatten().enumerate() {
            if device.get("encrypted").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            let label = device
                .get("deviceName")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{idx}"));
            out.push(StackFinding::on(
                instance,
                format!(
                    "instance '{}' has an unencrypted EBS volume {}",
                    instance.display_name(),
                    label
                ),
            ));
        }
    }
    Ok(out)
}
