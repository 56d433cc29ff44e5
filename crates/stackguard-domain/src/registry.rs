use crate::rule::Rule;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),

    #[error("invalid rule definition `{id}`: {reason}")]
    InvalidRule { id: String, reason: String },
}

/// Ordered set of rules. Iteration order is registration order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    ids: BTreeSet<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. A duplicate id is rejected and the existing rule is kept.
    pub fn register(&mut self, rule: impl Into<Rule>) -> Result<(), RegistryError> {
        let rule = rule.into();
        let id = rule.id();

        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidRule {
                id: id.to_string(),
                reason: "rule id must be non-empty and contain no whitespace".to_string(),
            });
        }
        if rule.meta().category.is_empty() {
            return Err(RegistryError::InvalidRule {
                id: id.to_string(),
                reason: "rule category must be non-empty".to_string(),
            });
        }
        if self.ids.contains(id) {
            return Err(RegistryError::DuplicateRuleId(id.to_string()));
        }

        self.ids.insert(id.to_string());
        self.rules.push(rule);
        Ok(())
    }

    pub fn all_rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn rules_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Rule> {
        self.rules
            .iter()
            .filter(move |r| r.meta().category == category)
    }

    /// Rule ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(Rule::id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;
    use crate::rule::{ResourcePolicy, RuleMeta, StackPolicy};
    use stackguard_types::Severity;

    fn resource_rule(id: &str, description: &str) -> ResourcePolicy {
        ResourcePolicy::new(
            RuleMeta::new(id, "storage", Severity::Mandatory, description),
            [ResourceKind::S3Bucket],
            |_, _| Ok(Vec::new()),
        )
    }

    #[test]
    fn duplicate_id_is_rejected_and_first_is_kept() {
        let mut registry = RuleRegistry::new();
        registry
            .register(resource_rule("s3-no-public-read", "first"))
            .expect("first registration");

        let err = registry
            .register(resource_rule("s3-no-public-read", "second"))
            .expect_err("duplicate must fail");
        assert_eq!(
            err,
            RegistryError::DuplicateRuleId("s3-no-public-read".to_string())
        );

        assert_eq!(registry.len(), 1);
        let kept = registry.get("s3-no-public-read").expect("kept rule");
        assert_eq!(kept.meta().description, "first");
    }

    #[test]
    fn preserves_registration_order_and_groups_by_category() {
        let mut registry = RuleRegistry::new();
        registry.register(resource_rule("b-rule", "b")).unwrap();
        registry
            .register(StackPolicy::new(
                RuleMeta::new("a-rule", "network", Severity::Advisory, "a"),
                |_| Ok(Vec::new()),
            ))
            .unwrap();
        registry.register(resource_rule("c-rule", "c")).unwrap();

        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["b-rule", "a-rule", "c-rule"]);

        let storage: Vec<&str> = registry.rules_in("storage").map(|r| r.id()).collect();
        assert_eq!(storage, vec!["b-rule", "c-rule"]);
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let mut registry = RuleRegistry::new();
        assert!(matches!(
            registry.register(resource_rule("", "empty")),
            Err(RegistryError::InvalidRule { .. })
        ));
        assert!(matches!(
            registry.register(resource_rule("has space", "ws")),
            Err(RegistryError::InvalidRule { .. })
        ));
        let no_category = ResourcePolicy::new(
            RuleMeta::new("x", "", Severity::Advisory, "x"),
            Vec::<ResourceKind>::new(),
            |_, _| Ok(Vec::new()),
        );
        assert!(registry.register(no_category).is_err());
        assert!(registry.is_empty());
    }
}
