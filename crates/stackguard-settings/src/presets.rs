use stackguard_domain::policy::{EffectiveConfig, RulePolicy};
use stackguard_types::EnforcementLevel;
use std::collections::BTreeMap;

pub const DEFAULT_PROFILE: &str = "baseline";

pub const PROFILES: &[&str] = &["baseline", "strict", "advisory"];

/// Preset profiles are opinionated defaults.
///
/// Keep these small and readable. Anything complex should go into stack config.
pub fn preset(profile: &str) -> Option<EffectiveConfig> {
    match profile {
        "baseline" => Some(baseline_profile()),
        "strict" => Some(strict_profile()),
        "advisory" => Some(advisory_profile()),
        _ => None,
    }
}

fn baseline_profile() -> EffectiveConfig {
    EffectiveConfig {
        profile: "baseline".to_string(),
        enforcement: EnforcementLevel::Mandatory,
        ..EffectiveConfig::default()
    }
}

fn strict_profile() -> EffectiveConfig {
    EffectiveConfig {
        profile: "strict".to_string(),
        enforcement: EnforcementLevel::Mandatory,
        rules: strict_rules(),
        ..EffectiveConfig::default()
    }
}

fn advisory_profile() -> EffectiveConfig {
    // Same rule selection as baseline; nothing blocks.
    EffectiveConfig {
        profile: "advisory".to_string(),
        enforcement: EnforcementLevel::Advisory,
        ..EffectiveConfig::default()
    }
}

/// Opt-in rules the strict preset turns on. `ec2-iam-profile` stays out: it needs a
/// naming pattern and is enabled by setting one.
fn strict_rules() -> BTreeMap<String, RulePolicy> {
    use stackguard_types::ids::*;
    [
        RULE_S3_VERSIONING_ENABLED,
        RULE_S3_LOGGING_ENABLED,
        RULE_RDS_MULTI_AZ,
        RULE_RDS_LOGGING_ENABLED,
        RULE_SECRET_ROTATION_ENABLED,
        RULE_APIGW_CACHE_CLUSTER_ENABLED,
    ]
    .into_iter()
    .map(|id| (id.to_string(), RulePolicy::enabled()))
    .collect()
}
