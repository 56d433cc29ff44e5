use crate::model::{Resource, ResourceKind, StackContext, StackSnapshot};
use stackguard_types::{ResourceRef, Severity};
use std::fmt;

/// A rule that could not finish evaluating. Surfaces as a `RuleEvaluationError` violation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("property `{path}` has an unexpected shape (expected {expected})")]
    UnexpectedShape { path: String, expected: &'static str },

    #[error("property `{path}` is malformed: {reason}")]
    Malformed { path: String, reason: String },

    #[error("rule panicked: {0}")]
    Panicked(String),
}

impl RuleError {
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleScope {
    Resource,
    Stack,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleMeta {
    pub id: String,
    pub category: String,
    pub description: String,
    pub remediation: Option<String>,
    pub severity: Severity,
    /// Opt-in rules only run when configuration enables them explicitly.
    pub opt_in: bool,
}

impl RuleMeta {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            description: description.into(),
            remediation: None,
            severity,
            opt_in: false,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn opt_in(mut self) -> Self {
        self.opt_in = true;
        self
    }
}

/// Evaluated once per matching resource. Each returned message becomes one violation
/// attributed to that resource.
pub trait ResourceRule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn matches(&self, resource: &Resource) -> bool;

    fn check(&self, resource: &Resource, ctx: &StackContext) -> Result<Vec<String>, RuleError>;
}

/// A stack rule finding, attributed to whichever resource the rule chooses (or none).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFinding {
    pub resource: Option<ResourceRef>,
    pub message: String,
}

impl StackFinding {
    pub fn on(resource: &Resource, message: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.reference()),
            message: message.into(),
        }
    }

    pub fn stack(message: impl Into<String>) -> Self {
        Self {
            resource: None,
            message: message.into(),
        }
    }
}

/// Evaluated once per snapshot, for cross-resource invariants.
pub trait StackRule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    fn check(&self, snapshot: &StackSnapshot) -> Result<Vec<StackFinding>, RuleError>;
}

pub enum Rule {
    Resource(Box<dyn ResourceRule>),
    Stack(Box<dyn StackRule>),
}

impl Rule {
    pub fn meta(&self) -> &RuleMeta {
        match self {
            Rule::Resource(r) => r.meta(),
            Rule::Stack(r) => r.meta(),
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn scope(&self) -> RuleScope {
        match self {
            Rule::Resource(_) => RuleScope::Resource,
            Rule::Stack(_) => RuleScope::Stack,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id())
            .field("scope", &self.scope())
            .field("severity", &self.meta().severity)
            .finish()
    }
}

type ResourceCheckFn =
    dyn Fn(&Resource, &StackContext) -> Result<Vec<String>, RuleError> + Send + Sync;
type StackCheckFn = dyn Fn(&StackSnapshot) -> Result<Vec<StackFinding>, RuleError> + Send + Sync;

/// Resource rule built from a kind filter and a check closure.
pub struct ResourcePolicy {
    meta: RuleMeta,
    kinds: Vec<ResourceKind>,
    check: Box<ResourceCheckFn>,
}

impl ResourcePolicy {
    pub fn new<F>(meta: RuleMeta, kinds: impl IntoIterator<Item = ResourceKind>, check: F) -> Self
    where
        F: Fn(&Resource, &StackContext) -> Result<Vec<String>, RuleError> + Send + Sync + 'static,
    {
        Self {
            meta,
            kinds: kinds.into_iter().collect(),
            check: Box::new(check),
        }
    }
}

impl ResourceRule for ResourcePolicy {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn matches(&self, resource: &Resource) -> bool {
        self.kinds.contains(resource.kind())
    }

    fn check(&self, resource: &Resource, ctx: &StackContext) -> Result<Vec<String>, RuleError> {
        (self.check)(resource, ctx)
    }
}

/// Stack rule built from a check closure.
pub struct StackPolicy {
    meta: RuleMeta,
    check: Box<StackCheckFn>,
}

impl StackPolicy {
    pub fn new<F>(meta: RuleMeta, check: F) -> Self
    where
        F: Fn(&StackSnapshot) -> Result<Vec<StackFinding>, RuleError> + Send + Sync + 'static,
    {
        Self {
            meta,
            check: Box::new(check),
        }
    }
}

impl StackRule for StackPolicy {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check(&self, snapshot: &StackSnapshot) -> Result<Vec<StackFinding>, RuleError> {
        (self.check)(snapshot)
    }
}

impl From<ResourcePolicy> for Rule {
    fn from(p: ResourcePolicy) -> Self {
        Rule::Resource(Box::new(p))
    }
}

impl From<StackPolicy> for Rule {
    fn from(p: StackPolicy) -> Self {
        Rule::Stack(Box::new(p))
    }
}
