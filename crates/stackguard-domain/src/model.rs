use crate::rule::RuleError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stackguard_types::ResourceRef;
use std::fmt;

/// Resource kinds the built-in rules dispatch on.
///
/// Parsed from provider type tokens; anything unrecognized is kept as `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Vpc,
    Subnet,
    SecurityGroup,
    SecurityGroupRule,
    Route,
    InternetGateway,
    VpcEndpoint,
    FlowLog,
    Ec2Instance,
    LambdaFunction,
    S3Bucket,
    RdsInstance,
    IamRole,
    IamPolicy,
    IamRolePolicy,
    IamRolePolicyAttachment,
    Secret,
    SecretRotation,
    ApiGatewayRestApi,
    ApiGatewayStage,
    Other(String),
}

impl ResourceKind {
    /// Parse a type token such as `aws:ec2/instance:Instance`, `ec2/instance` or `ec2-instance`.
    pub fn from_token(token: &str) -> Self {
        let parts: Vec<&str> = token.split(':').collect();
        let module = if parts.len() == 3 { parts[1] } else { token };
        let key: String = module
            .chars()
            .filter(|c| !matches!(c, '/' | '-' | '_' | '.'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "ec2vpc" | "vpc" => ResourceKind::Vpc,
            "ec2subnet" | "subnet" => ResourceKind::Subnet,
            "ec2securitygroup" | "securitygroup" => ResourceKind::SecurityGroup,
            "ec2securitygrouprule" | "securitygrouprule" | "sgrule" => {
                ResourceKind::SecurityGroupRule
            }
            "ec2route" | "route" => ResourceKind::Route,
            "ec2internetgateway" | "internetgateway" | "igw" => ResourceKind::InternetGateway,
            "ec2vpcendpoint" | "vpcendpoint" | "vpce" => ResourceKind::VpcEndpoint,
            "ec2flowlog" | "flowlog" => ResourceKind::FlowLog,
            "ec2instance" | "instance" => ResourceKind::Ec2Instance,
            "lambdafunction" | "function" => ResourceKind::LambdaFunction,
            "s3bucket" | "s3bucketv2" | "bucket" => ResourceKind::S3Bucket,
            "rdsinstance" | "dbinstance" => ResourceKind::RdsInstance,
            "iamrole" | "role" => ResourceKind::IamRole,
            "iampolicy" | "policy" => ResourceKind::IamPolicy,
            "iamrolepolicy" | "rolepolicy" => ResourceKind::IamRolePolicy,
            "iamrolepolicyattachment" | "rolepolicyattachment" => {
                ResourceKind::IamRolePolicyAttachment
            }
            "secretsmanagersecret" | "secret" => ResourceKind::Secret,
            "secretsmanagersecretrotation" | "secretrotation" => ResourceKind::SecretRotation,
            "apigatewayrestapi" | "restapi" => ResourceKind::ApiGatewayRestApi,
            "apigatewaystage" | "stage" => ResourceKind::ApiGatewayStage,
            _ => ResourceKind::Other(token.to_string()),
        }
    }
}

/// Result of a typed property lookup.
///
/// `Absent` covers both "not configured" and "path does not traverse"; `WrongShape`
/// means the value exists but is not of the requested type.
#[derive(Clone, Debug, PartialEq)]
pub enum Property<T> {
    Present(T),
    Absent,
    WrongShape { path: String, expected: &'static str },
}

impl<T> Property<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Property::Present(v) => Some(v),
            _ => None,
        }
    }

    /// `Ok(None)` when absent; a wrong shape becomes a rule error.
    pub fn into_result(self) -> Result<Option<T>, RuleError> {
        match self {
            Property::Present(v) => Ok(Some(v)),
            Property::Absent => Ok(None),
            Property::WrongShape { path, expected } => {
                Err(RuleError::UnexpectedShape { path, expected })
            }
        }
    }
}

/// Free-form per-snapshot inputs that rules may consult (account, project, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// One declared infrastructure object with fully resolved properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ResourceRecord", into = "ResourceRecord")]
pub struct Resource {
    type_token: String,
    kind: ResourceKind,
    name: String,
    properties: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ResourceRecord {
    #[serde(rename = "type")]
    type_token: String,
    name: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl From<ResourceRecord> for Resource {
    fn from(r: ResourceRecord) -> Self {
        Resource::new(r.type_token, r.name, r.properties)
    }
}

impl From<Resource> for ResourceRecord {
    fn from(r: Resource) -> Self {
        ResourceRecord {
            type_token: r.type_token,
            name: r.name,
            properties: r.properties,
        }
    }
}

impl Resource {
    pub fn new(
        type_token: impl Into<String>,
        name: impl Into<String>,
        properties: Map<String, Value>,
    ) -> Self {
        let type_token = type_token.into();
        Self {
            kind: ResourceKind::from_token(&type_token),
            type_token,
            name: name.into(),
            properties,
        }
    }

    pub fn type_token(&self) -> &str {
        &self.type_token
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.type_token.clone(), self.name.clone())
    }

    /// Look up a dotted path (`versioning.enabled`, `ebsBlockDevices.0.encrypted`).
    ///
    /// JSON `null` is treated as absent.
    pub fn property(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.properties.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        if current.is_null() { None } else { Some(current) }
    }

    pub fn has_property(&self, path: &str) -> bool {
        self.property(path).is_some()
    }

    pub fn bool_property(&self, path: &str) -> Property<bool> {
        self.typed(path, "boolean", Value::as_bool)
    }

    pub fn str_property(&self, path: &str) -> Property<&str> {
        self.typed(path, "string", Value::as_str)
    }

    /// Integers; whole-valued floats are accepted since some providers emit `22.0`.
    pub fn int_property(&self, path: &str) -> Property<i64> {
        self.typed(path, "integer", |v| {
            v.as_i64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
        })
    }

    pub fn array_property(&self, path: &str) -> Property<&Vec<Value>> {
        self.typed(path, "array", Value::as_array)
    }

    pub fn object_property(&self, path: &str) -> Property<&Map<String, Value>> {
        self.typed(path, "object", Value::as_object)
    }

    pub fn str_list_property(&self, path: &str) -> Property<Vec<&str>> {
        match self.array_property(path) {
            Property::Present(items) => {
                let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                match strings {
                    Some(s) => Property::Present(s),
                    None => Property::WrongShape {
                        path: path.to_string(),
                        expected: "array of strings",
                    },
                }
            }
            Property::Absent => Property::Absent,
            Property::WrongShape { path, .. } => Property::WrongShape {
                path,
                expected: "array of strings",
            },
        }
    }

    /// Human-friendly label: the `Name` tag when set, otherwise the logical name.
    pub fn display_name(&self) -> &str {
        match self.str_property("tags.Name") {
            Property::Present(n) if !n.is_empty() => n,
            _ => &self.name,
        }
    }

    fn typed<'a, T>(
        &'a self,
        path: &str,
        expected: &'static str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Property<T> {
        match self.property(path) {
            None => Property::Absent,
            Some(v) => match convert(v) {
                Some(t) => Property::Present(t),
                None => Property::WrongShape {
                    path: path.to_string(),
                    expected,
                },
            },
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_token)
    }
}

/// The fully resolved resource graph for one evaluation pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSnapshot {
    #[serde(default)]
    pub context: StackContext,

    /// Declaration order; used only for stable reporting.
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl StackSnapshot {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            context: StackContext::default(),
            resources,
        }
    }

    pub fn with_context(mut self, context: StackContext) -> Self {
        self.context = context;
        self
    }

    pub fn of_kind<'a>(&'a self, kind: &'a ResourceKind) -> impl Iterator<Item = &'a Resource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
