use crate::engine::{EvalOptions, RuleOverride};
use crate::rule::RuleMeta;
use stackguard_types::{EnforcementLevel, Severity};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RulePolicy {
    pub enabled: bool,
    /// Overrides the rule's built-in severity when set.
    pub severity: Option<Severity>,
    /// Resource-name globs exempt from this rule.
    pub allow: Vec<String>,
}

impl RulePolicy {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            severity: None,
            allow: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            severity: None,
            allow: Vec::new(),
        }
    }
}

/// Organization-specific values the built-in rules compare against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleParams {
    pub allowed_ports: Vec<i64>,
    pub allowed_instance_types: Vec<String>,
    /// Regex for `iamInstanceProfile`; `{project}` expands to the stack's project name.
    pub instance_profile_pattern: Option<String>,
    pub allowed_db_instance_classes: Vec<String>,
    pub forbidden_db_usernames: Vec<String>,
    pub min_backup_retention_days: i64,
    pub allowed_endpoint_types: Vec<String>,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            allowed_ports: vec![80, 443, 22, 5432, 587, 5555],
            allowed_instance_types: strings(&["t2.small", "t2.medium", "t2.large"]),
            instance_profile_pattern: None,
            allowed_db_instance_classes: strings(&[
                "db.t3.micro",
                "db.t3.small",
                "db.t3.medium",
                "db.t3.large",
            ]),
            forbidden_db_usernames: strings(&["admin", "root", "postgres", "master", "sa"]),
            min_backup_retention_days: 7,
            allowed_endpoint_types: strings(&["Interface", "Gateway"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug)]
pub struct EffectiveConfig {
    pub profile: String,
    pub enforcement: EnforcementLevel,
    pub parallel: bool,
    /// Explicit per-rule settings; rules not listed fall back to their defaults.
    pub rules: BTreeMap<String, RulePolicy>,
    pub params: RuleParams,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            profile: "baseline".to_string(),
            enforcement: EnforcementLevel::Mandatory,
            parallel: false,
            rules: BTreeMap::new(),
            params: RuleParams::default(),
        }
    }
}

impl EffectiveConfig {
    /// Listed rules follow their policy; unlisted rules run unless they are opt-in.
    pub fn is_enabled(&self, meta: &RuleMeta) -> bool {
        match self.rules.get(&meta.id) {
            Some(p) => p.enabled,
            None => !meta.opt_in,
        }
    }

    pub fn eval_options(&self) -> EvalOptions {
        let overrides = self
            .rules
            .iter()
            .filter(|(_, p)| p.enabled && (p.severity.is_some() || !p.allow.is_empty()))
            .map(|(id, p)| {
                (
                    id.clone(),
                    RuleOverride {
                        severity: p.severity,
                        allow: p.allow.clone(),
                    },
                )
            })
            .collect();

        EvalOptions {
            parallel: self.parallel,
            overrides,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_in_rules_need_explicit_enable() {
        let meta = RuleMeta::new("r", "storage", Severity::Advisory, "d").opt_in();
        let mut cfg = EffectiveConfig::default();
        assert!(!cfg.is_enabled(&meta));

        cfg.rules.insert("r".to_string(), RulePolicy::enabled());
        assert!(cfg.is_enabled(&meta));

        let regular = RuleMeta::new("q", "storage", Severity::Advisory, "d");
        assert!(cfg.is_enabled(&regular));
        cfg.rules.insert("q".to_string(), RulePolicy::disabled());
        assert!(!cfg.is_enabled(&regular));
    }

    #[test]
    fn eval_options_carry_only_meaningful_overrides() {
        let mut cfg = EffectiveConfig::default();
        cfg.rules.insert("plain".to_string(), RulePolicy::enabled());
        cfg.rules.insert(
            "sev".to_string(),
            RulePolicy {
                enabled: true,
                severity: Some(Severity::Advisory),
                allow: Vec::new(),
            },
        );
        cfg.rules.insert(
            "off".to_string(),
            RulePolicy {
                enabled: false,
                severity: Some(Severity::Advisory),
                allow: Vec::new(),
            },
        );

        let opts = cfg.eval_options();
        assert_eq!(opts.overrides.len(), 1);
        assert_eq!(opts.overrides["sev"].severity, Some(Severity::Advisory));
    }
}
