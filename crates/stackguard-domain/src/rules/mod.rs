//! Built-in rule sets, one module per category.

use crate::policy::{EffectiveConfig, RuleParams};
use crate::registry::{RegistryError, RuleRegistry};
use crate::rule::{Rule, RuleMeta};
use tracing::debug;

mod api;
mod compute;
mod database;
mod identity;
mod network;
mod secrets;
mod storage;
mod utils;


pub use compute::{PROJECT_PLACEHOLDER, profile_regex};

/// Every built-in rule, in registration order.
pub fn builtin_rules(params: &RuleParams) -> Vec<Rule> {
    let mut rules = network::rules(params);
    rules.extend(storage::rules(params));
    rules.extend(compute::rules(params));
    rules.extend(database::rules(params));
    rules.extend(identity::rules(params));
    rules.extend(secrets::rules(params));
    rules.extend(api::rules(params));
    rules
}

/// Metadata of every built-in rule, including opt-in ones.
pub fn catalog() -> Vec<RuleMeta> {
    builtin_rules(&RuleParams::default())
        .iter()
        .map(|r| r.meta().clone())
        .collect()
}

/// Registry of the built-in rules the configuration enables.
pub fn build_registry(cfg: &EffectiveConfig) -> Result<RuleRegistry, RegistryError> {
    let mut registry = RuleRegistry::new();
    for rule in builtin_rules(&cfg.params) {
        if cfg.is_enabled(rule.meta()) {
            registry.register(rule)?;
        } else {
            debug!(rule = rule.id(), "rule disabled by configuration");
        }
    }
    Ok(registry)
}
