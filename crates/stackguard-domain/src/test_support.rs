use crate::model::{Resource, StackContext, StackSnapshot};
use crate::policy::{EffectiveConfig, RulePolicy};
use crate::registry::RuleRegistry;
use crate::rules;
use serde_json::Value;
use stackguard_types::Violation;

pub fn resource(type_token: &str, name: &str, properties: Value) -> Resource {
    let props = match properties {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => panic!("resource properties must be an object, got {other}"),
    };
    Resource::new(type_token, name, props)
}

pub fn snapshot(resources: Vec<Resource>) -> StackSnapshot {
    StackSnapshot::new(resources)
}

pub fn snapshot_in(project: &str, account_id: &str, resources: Vec<Resource>) -> StackSnapshot {
    StackSnapshot::new(resources).with_context(StackContext {
        project: Some(project.to_string()),
        stack: Some("dev".to_string()),
        account_id: Some(account_id.to_string()),
        region: Some("eu-central-1".to_string()),
    })
}

/// Registry with every rule of one category enabled by the default config.
pub fn category_registry(category: &str) -> RuleRegistry {
    category_registry_with(category, &EffectiveConfig::default())
}

pub fn category_registry_with(category: &str, cfg: &EffectiveConfig) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for rule in rules::builtin_rules(&cfg.params) {
        if rule.meta().category == category && cfg.is_enabled(rule.meta()) {
            registry.register(rule).expect("builtin ids are unique");
        }
    }
    registry
}

/// Registry holding exactly one built-in rule, regardless of opt-in status.
pub fn single_rule_registry(rule_id: &str, cfg: &EffectiveConfig) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for rule in rules::builtin_rules(&cfg.params) {
        if rule.id() == rule_id {
            registry.register(rule).expect("builtin ids are unique");
        }
    }
    assert_eq!(registry.len(), 1, "unknown builtin rule {rule_id}");
    registry
}

pub fn config_enabling(rule_ids: &[&str]) -> EffectiveConfig {
    let mut cfg = EffectiveConfig::default();
    for id in rule_ids {
        cfg.rules.insert(id.to_string(), RulePolicy::enabled());
    }
    cfg
}

pub fn rule_ids(violations: &[Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.rule_id.as_str()).collect()
}
