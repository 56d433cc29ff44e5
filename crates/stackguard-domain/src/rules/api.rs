use super::utils::is_true;
use crate::model::ResourceKind;
use crate::policy::RuleParams;
use crate::rule::{ResourcePolicy, Rule, RuleMeta};
use stackguard_types::{Severity, ids};

pub fn rules(_params: &RuleParams) -> Vec<Rule> {
    vec![
        ResourcePolicy::new(
            meta(
                ids::RULE_APIGW_CACHE_CLUSTER_ENABLED,
                Severity::Advisory,
                "API Gateway stages should enable the cache cluster",
            )
            .with_remediation("Set cacheClusterEnabled to true and choose a cacheClusterSize.")
            .opt_in(),
            [ResourceKind::ApiGatewayStage],
            |r, _| {
                if is_true(r, "cacheClusterEnabled")? {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("stage '{}' has no cache cluster", r.name())])
            },
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_APIGW_PRIVATE_ENDPOINT,
                Severity::Mandatory,
                "REST APIs must not use edge-optimized endpoints",
            )
            .with_remediation("Set endpointConfiguration.types to [\"PRIVATE\"] or [\"REGIONAL\"]."),
            [ResourceKind::ApiGatewayRestApi],
            |r, _| {
                // API Gateway defaults to EDGE when no endpoint configuration is given.
                let types = r
                    .str_list_property("endpointConfiguration.types")
                    .into_result()?
                    .unwrap_or_else(|| vec!["EDGE"]);
                if types.iter().any(|t| t.eq_ignore_ascii_case("EDGE")) {
                    return Ok(vec![format!(
                        "REST API '{}' is exposed through an edge-optimized endpoint",
                        r.name()
                    )]);
                }
                Ok(Vec::new())
            },
        )
        .into(),
        ResourcePolicy::new(
            meta(
                ids::RULE_APIGW_ACCESS_LOGGING,
                Severity::Mandatory,
                "API Gateway stages must write access logs",
            )
            .with_remediation("Set accessLogSettings.destinationArn to a log group."),
            [ResourceKind::ApiGatewayStage],
            |r, _| {
                if r
                    .str_property("accessLogSettings.destinationArn")
                    .into_result()?
                    .is_some()
                {
                    return Ok(Vec::new());
                }
                Ok(vec![format!("stage '{}' has no access logging", r.name())])
            },
        )
        .into(),
    ]
}

fn meta(id: &str, severity: Severity, description: &str) -> RuleMeta {
    RuleMeta::new(id, ids::CATEGORY_API, severity, description)
}
