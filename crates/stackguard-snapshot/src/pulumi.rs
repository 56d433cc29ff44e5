//! Pulumi `stack export` documents.

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use stackguard_domain::model::{Resource, StackContext, StackSnapshot};
use tracing::debug;

/// Signature key/value marking an encrypted or revealed secret in exported state.
const SECRET_SIG_KEY: &str = "4dabf18193072939515e22adb298388d";
const SECRET_SIG_VALUE: &str = "1b47061264138c4ac30d75fd1eb44270";

#[derive(Debug, Deserialize)]
struct Export {
    deployment: Deployment,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    #[serde(default)]
    resources: Vec<ExportedResource>,
}

#[derive(Debug, Deserialize)]
struct ExportedResource {
    urn: String,
    #[serde(rename = "type")]
    type_token: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    inputs: Map<String, Value>,
    #[serde(default)]
    outputs: Map<String, Value>,
    /// Set on resources replaced during an update and still awaiting deletion.
    #[serde(default)]
    delete: bool,
}

pub fn parse(value: Value) -> anyhow::Result<StackSnapshot> {
    let export: Export =
        serde_json::from_value(value).context("parse Pulumi stack export document")?;

    let mut context = StackContext::default();
    let mut resources = Vec::new();
    let mut skipped = 0usize;

    for res in export.deployment.resources {
        if context.stack.is_none()
            && let Some((stack, project)) = stack_and_project(&res.urn)
        {
            context.stack = Some(stack.to_string());
            context.project = Some(project.to_string());
        }

        if res.type_token.starts_with("pulumi:") {
            if res.type_token == "pulumi:providers:aws"
                && context.region.is_none()
                && let Some(region) = res.inputs.get("region").and_then(Value::as_str)
            {
                context.region = Some(region.to_string());
            }
            skipped += 1;
            continue;
        }
        if res.delete {
            skipped += 1;
            continue;
        }

        let name = name_from_urn(&res.urn)
            .with_context(|| format!("malformed resource URN: {}", res.urn))?
            .to_string();
        resources.push(Resource::new(
            res.type_token,
            name,
            merge_properties(res.id, res.inputs, res.outputs),
        ));
    }

    debug!(
        resources = resources.len(),
        skipped,
        "loaded Pulumi stack export"
    );
    Ok(StackSnapshot { context, resources })
}

/// `urn:pulumi:<stack>::<project>::<type>::<name>` -> `<name>`.
pub fn name_from_urn(urn: &str) -> Option<&str> {
    if !urn.starts_with("urn:pulumi:") {
        return None;
    }
    urn.rsplit("::").next().filter(|n| !n.is_empty() && *n != urn)
}

fn stack_and_project(urn: &str) -> Option<(&str, &str)> {
    let rest = urn.strip_prefix("urn:pulumi:")?;
    let mut parts = rest.split("::");
    let stack = parts.next()?;
    let project = parts.next()?;
    Some((stack, project))
}

/// Inputs overlaid with outputs; outputs carry the provider-resolved values.
fn merge_properties(
    id: Option<String>,
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
) -> Map<String, Value> {
    let mut props = inputs;
    props.extend(outputs);
    if let Some(id) = id {
        props.entry("id").or_insert(Value::String(id));
    }
    for value in props.values_mut() {
        reveal_secrets(value);
    }
    props
}

/// Replace revealed secrets (`--show-secrets` exports) with their plaintext value.
/// Still-encrypted secrets are left as opaque objects.
fn reveal_secrets(value: &mut Value) {
    if is_secret(value) {
        if let Some(plain) = value.get("plaintext").and_then(Value::as_str).map(str::to_string) {
            *value = serde_json::from_str(&plain).unwrap_or(Value::String(plain));
        }
        return;
    }
    match value {
        Value::Object(map) => map.values_mut().for_each(reveal_secrets),
        Value::Array(items) => items.iter_mut().for_each(reveal_secrets),
        _ => {}
    }
}

fn is_secret(value: &Value) -> bool {
    value.get(SECRET_SIG_KEY).and_then(Value::as_str) == Some(SECRET_SIG_VALUE)
}
