use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `stackguard.toml` schema v1.
///
/// This is a *user-facing* config model: it is intentionally permissive so forward-compat is easy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StackguardConfigV1 {
    /// Optional schema string for tooling (`stackguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Preset to start from: `baseline` (default), `strict` or `advisory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Whether violations block the run: `mandatory` or `advisory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<String>,

    /// Evaluate rules on a thread pool. Output order is unaffected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    /// Map of rule_id -> config.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,

    /// Organization-specific values compared against by the built-in rules.
    #[serde(default)]
    pub params: ParamsConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleConfig {
    /// Override preset enable/disable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Override the rule's severity: `advisory` or `mandatory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Resource-name glob patterns exempt from the rule.
    #[serde(default)]
    pub allow: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParamsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_ports: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_instance_types: Option<Vec<String>>,

    /// Regex the EC2 `iamInstanceProfile` must match; `{project}` expands to the project name.
    /// Setting it enables `ec2-iam-profile` unless that rule is configured explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_profile_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_db_instance_classes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_db_usernames: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_backup_retention_days: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_endpoint_types: Option<Vec<String>>,
}
