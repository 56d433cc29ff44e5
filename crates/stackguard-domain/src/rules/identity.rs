use super::utils::{allow_statements, policy_document, string_or_list};
use crate::model::{Resource, ResourceKind, StackContext, StackSnapshot};
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleError, RuleMeta, StackFinding, StackPolicy};
use serde_json::Value;
use stackguard_types::{Severity, ids};
use std::collections::{BTreeMap, BTreeSet};

const LAMBDA_VPC_ACCESS_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaVPCAccessExecutionRole";
const LAMBDA_BASIC_EXECUTION_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

pub fn rules(_params: &RuleParams) -> Vec<Rule> {
    vec![
        ResourcePolicy::new(
            meta(
                ids::RULE_IAM_ROLE_TRUSTED_PRINCIPALS,
                Severity::Mandatory,
                "Role trust policies must only trust principals from this account",
                "Name explicit principals from the deploying account in assumeRolePolicy.",
            ),
            [ResourceKind::IamRole],
            trusted_principals,
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_IAM_POLICY_NO_WILDCARD_ADMIN,
                Severity::Mandatory,
                "Policies must not grant every action on every resource",
                "Scope Action and Resource to what the workload needs.",
            ),
            [ResourceKind::IamPolicy, ResourceKind::IamRolePolicy],
            no_wildcard_admin,
        )
        .into(),
        StackPolicy::new(
            meta(
                ids::RULE_VPC_FLOW_LOGS_ENABLED,
                Severity::Advisory,
                "Every VPC should record traffic with a flow log",
                "Declare an aws:ec2/flowLog:FlowLog with vpcId set to the VPC.",
            ),
            |snapshot| {
                let logged = flow_log_targets(snapshot.of_kind(&ResourceKind::FlowLog))?;
                let mut out = Vec::new();
                for vpc in snapshot.of_kind(&ResourceKind::Vpc) {
                    let id = vpc.str_property("id").into_result()?;
                    if !id.is_some_and(|id| logged.contains(&id)) {
                        out.push(StackFinding::on(
                            vpc,
                            format!("VPC '{}' has no flow log", vpc.display_name()),
                        ));
                    }
                }
                Ok(out)
            },
        )
        .into(),
        StackPolicy::new(
            meta(
                ids::RULE_LAMBDA_POLICY_ATTACH,
                Severity::Mandatory,
                "Lambda execution roles must have the policies a VPC function needs attached",
                "Attach a policy allowing logs:PutLogEvents, one allowing secretsmanager:GetSecretValue \
                 and AWSLambdaVPCAccessExecutionRole to the function's role.",
            ),
            lambda_policy_attach,
        )
        .into(),
    ]
}

fn meta(id: &str, severity: Severity, description: &str, remediation: &str) -> RuleMeta {
    RuleMeta::new(id, ids::CATEGORY_IDENTITY, severity, description).with_remediation(remediation)
}

fn flow_log_targets<'a>(
    logs: impl Iterator<Item = &'a Resource>,
) -> Result<Vec<&'a str>, RuleError> {
    let mut out = Vec::new();
    for log in logs {
        if let Some(vpc) = log.str_property("vpcId").into_result()? {
            out.push(vpc);
        }
    }
    Ok(out)
}

/// Permissions a Lambda execution role must be granted through attached policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LambdaGrant {
    Logs,
    Secrets,
    VpcAccess,
}

impl LambdaGrant {
    const REQUIRED: [LambdaGrant; 3] = [
        LambdaGrant::Logs,
        LambdaGrant::Secrets,
        LambdaGrant::VpcAccess,
    ];

    fn label(self) -> &'static str {
        match self {
            LambdaGrant::Logs => "log writing",
            LambdaGrant::Secrets => "secret retrieval",
            LambdaGrant::VpcAccess => "VPC access",
        }
    }

    /// The action that proves a customer-managed policy provides this grant.
    fn action(self) -> Option<&'static str> {
        match self {
            LambdaGrant::Logs => Some("logs:PutLogEvents"),
            LambdaGrant::Secrets => Some("secretsmanager:GetSecretValue"),
            LambdaGrant::VpcAccess => None,
        }
    }
}

/// Joins `RolePolicyAttachment.role` to each function's `role`, which may be a
/// role name or ARN on either side.
fn lambda_policy_attach(snapshot: &StackSnapshot) -> Result<Vec<StackFinding>, RuleError> {
    let functions: Vec<&Resource> = snapshot.of_kind(&ResourceKind::LambdaFunction).collect();
    if functions.is_empty() {
        return Ok(Vec::new());
    }

    let policies = policy_grants(snapshot)?;
    let mut granted: BTreeMap<&str, BTreeSet<LambdaGrant>> = BTreeMap::new();
    for attachment in snapshot.of_kind(&ResourceKind::IamRolePolicyAttachment) {
        let role = attachment.str_property("role").into_result()?;
        let arn = attachment.str_property("policyArn").into_result()?;
        let (Some(role), Some(arn)) = (role, arn) else {
            continue;
        };
        let grants = granted.entry(role_name(role)).or_default();
        match arn {
            LAMBDA_VPC_ACCESS_ARN => grants.extend([LambdaGrant::VpcAccess, LambdaGrant::Logs]),
            LAMBDA_BASIC_EXECUTION_ARN => {
                grants.insert(LambdaGrant::Logs);
            }
            _ => grants.extend(policies.get(arn).into_iter().flatten().copied()),
        }
    }

    let mut out = Vec::new();
    for function in functions {
        let Some(role) = function.str_property("role").into_result()? else {
            out.push(StackFinding::on(
                function,
                format!("function '{}' has no execution role", function.name()),
            ));
            continue;
        };
        let role = role_name(role);
        let have = granted.get(role);
        let missing: Vec<&str> = LambdaGrant::REQUIRED
            .into_iter()
            .filter(|g| !have.is_some_and(|h| h.contains(g)))
            .map(LambdaGrant::label)
            .collect();
        if !missing.is_empty() {
            out.push(StackFinding::on(
                function,
                format!(
                    "execution role '{}' of function '{}' has no attached policy for {}",
                    role,
                    function.name(),
                    missing.join(", ")
                ),
            ));
        }
    }
    Ok(out)
}

/// Grants provided by each customer-managed policy in the stack, keyed by `arn`.
fn policy_grants(snapshot: &StackSnapshot) -> Result<BTreeMap<&str, Vec<LambdaGrant>>, RuleError> {
    let mut out = BTreeMap::new();
    for policy in snapshot.of_kind(&ResourceKind::IamPolicy) {
        let Some(arn) = policy.str_property("arn").into_result()? else {
            continue;
        };
        let Some(document) = policy_document(policy, "policy")? else {
            continue;
        };
        let actions: Vec<&str> = allow_statements(&document)
            .into_iter()
            .flat_map(|s| string_or_list(s.get("Action")))
            .collect();
        let grants: Vec<LambdaGrant> = LambdaGrant::REQUIRED
            .into_iter()
            .filter(|g| {
                g.action()
                    .is_some_and(|wanted| actions.iter().any(|a| action_matches(a, wanted)))
            })
            .collect();
        out.insert(arn, grants);
    }
    Ok(out)
}

/// IAM action match with a trailing `*` wildcard. Actions are case-insensitive.
fn action_matches(pattern: &str, action: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => action
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
        None => pattern.eq_ignore_ascii_case(action),
    }
}

/// `arn:aws:iam::123456789012:role/path/name` and `name` both yield `name`.
fn role_name(role: &str) -> &str {
    role.rsplit('/').next().unwrap_or(role)
}

fn trusted_principals(r: &Resource, ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    let Some(document) = policy_document(r, "assumeRolePolicy")? else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for statement in allow_statements(&document) {
        for principal in aws_principals(statement.get("Principal")) {
            if principal == "*" {
                out.push(format!("role '{}' can be assumed by any principal", r.name()));
                continue;
            }
            let (Some(expected), Some(actual)) = (ctx.account_id.as_deref(), account_of(principal))
            else {
                continue;
            };
            if actual != expected {
                out.push(format!(
                    "role '{}' trusts principal '{}' from foreign account {}",
                    r.name(),
                    principal,
                    actual
                ));
            }
        }
    }
    Ok(out)
}

/// `Principal: "*"` or the `AWS` entry of a principal map. Service and federated
/// principals are not account-scoped and are ignored.
fn aws_principals(principal: Option<&Value>) -> Vec<&str> {
    match principal {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Object(map)) => string_or_list(map.get("AWS")),
        _ => Vec::new(),
    }
}

/// Account id of an IAM ARN (`arn:aws:iam::123456789012:root`) or a bare account id.
fn account_of(principal: &str) -> Option<&str> {
    if principal.len() == 12 && principal.chars().all(|c| c.is_ascii_digit()) {
        return Some(principal);
    }
    let mut parts = principal.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("arn"), Some(_), Some(_), Some(_), Some(account)) if !account.is_empty() => {
            Some(account)
        }
        _ => None,
    }
}

fn no_wildcard_admin(r: &Resource, _ctx: &StackContext) -> Result<Vec<String>, RuleError> {
    let Some(document) = policy_document(r, "policy")? else {
        return Ok(Vec::new());
    };

    let grants_everything = allow_statements(&document).into_iter().any(|s| {
        string_or_list(s.get("Action")).contains(&"*")
            && string_or_list(s.get("Resource")).contains(&"*")
    });
    if grants_everything {
        return Ok(vec![format!(
            "policy '{}' allows every action on every resource",
            r.name()
        )]);
    }
    Ok(Vec::new())
}
