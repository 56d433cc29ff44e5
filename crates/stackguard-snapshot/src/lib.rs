//! Snapshot adapters: read a resolved resource graph from disk.
//!
//! This crate is allowed to do filesystem IO. It never talks to a cloud provider or a
//! provisioning backend; the caller exports the snapshot first.

#![forbid(unsafe_code)]

mod pulumi;

use anyhow::Context;
use camino::Utf8Path;
use serde_json::Value;
use stackguard_domain::model::{StackContext, StackSnapshot};
use tracing::info;

pub use pulumi::name_from_urn;

/// Value Pulumi writes for properties that are not known until apply.
pub const UNKNOWN_SENTINEL: &str = "04da6b54-80e4-46f7-96ec-b56ff0331ba9";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// `{"context": {...}, "resources": [{"type", "name", "properties"}]}`
    Native,
    /// Output of `pulumi stack export`.
    PulumiExport,
}

/// Read and parse a snapshot file, auto-detecting its format.
pub fn load_snapshot(path: &Utf8Path) -> anyhow::Result<StackSnapshot> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let snapshot = parse_snapshot(&text).with_context(|| format!("parse snapshot {}", path))?;
    info!(
        path = %path,
        resources = snapshot.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Parse snapshot JSON, auto-detecting its format.
pub fn parse_snapshot(text: &str) -> anyhow::Result<StackSnapshot> {
    let value: Value = serde_json::from_str(text).context("snapshot is not valid JSON")?;

    if let Some(path) = find_unknown(&value, "$") {
        anyhow::bail!(
            "snapshot contains an unresolved (unknown) value at {path}; export the stack after a successful update"
        );
    }

    match detect_format(&value)? {
        SnapshotFormat::Native => {
            serde_json::from_value(value).context("parse native snapshot document")
        }
        SnapshotFormat::PulumiExport => pulumi::parse(value),
    }
}

pub fn detect_format(value: &Value) -> anyhow::Result<SnapshotFormat> {
    let Some(obj) = value.as_object() else {
        anyhow::bail!("snapshot must be a JSON object");
    };
    if obj.contains_key("deployment") {
        Ok(SnapshotFormat::PulumiExport)
    } else if obj.contains_key("resources") {
        Ok(SnapshotFormat::Native)
    } else {
        anyhow::bail!("unrecognized snapshot format: expected a `resources` or `deployment` key")
    }
}

/// Fill context fields the caller supplied explicitly; explicit values win.
pub fn apply_context(snapshot: &mut StackSnapshot, overrides: &StackContext) {
    let ctx = &mut snapshot.context;
    for (slot, value) in [
        (&mut ctx.project, &overrides.project),
        (&mut ctx.stack, &overrides.stack),
        (&mut ctx.account_id, &overrides.account_id),
        (&mut ctx.region, &overrides.region),
    ] {
        if value.is_some() {
            slot.clone_from(value);
        }
    }
}

/// JSON path of the first unknown sentinel, if any.
fn find_unknown(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::String(s) if s == UNKNOWN_SENTINEL => Some(path.to_string()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| find_unknown(v, &format!("{path}[{i}]"))),
        Value::Object(map) => map
            .iter()
            .find_map(|(k, v)| find_unknown(v, &format!("{path}.{k}"))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serde_json::json;
    use stackguard_domain::model::ResourceKind;

    #[test]
    fn native_documents_parse() {
        let text = json!({
            "context": { "project": "shop", "account_id": "111111111111" },
            "resources": [
                { "type": "s3-bucket", "name": "assets", "properties": { "acl": "public-read" } },
                { "type": "aws:ec2/vpc:Vpc", "name": "main" }
            ]
        })
        .to_string();

        let snapshot = parse_snapshot(&text).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.resources[0].kind(), &ResourceKind::S3Bucket);
        assert_eq!(snapshot.resources[1].type_token(), "aws:ec2/vpc:Vpc");
        assert_eq!(snapshot.context.project.as_deref(), Some("shop"));
    }

    #[test]
    fn pulumi_exports_are_detected() {
        let value = json!({ "deployment": { "resources": [] } });
        assert_eq!(detect_format(&value).unwrap(), SnapshotFormat::PulumiExport);
        assert!(parse_snapshot(&value.to_string()).unwrap().is_empty());
    }

    #[test]
    fn unknown_values_are_rejected_with_their_location() {
        let text = json!({
            "resources": [
                { "type": "vpc", "name": "main", "properties": { "id": UNKNOWN_SENTINEL } }
            ]
        })
        .to_string();
        let err = parse_snapshot(&text).unwrap_err();
        assert!(
            format!("{err}").contains("$.resources[0].properties.id"),
            "{err}"
        );
    }

    #[test]
    fn unrecognized_shapes_fail() {
        assert!(parse_snapshot("[]").is_err());
        assert!(parse_snapshot("{\"stack\": {}}").is_err());
        assert!(parse_snapshot("not json").is_err());
        assert!(parse_snapshot("{\"resources\": [{\"name\": \"no-type\"}]}").is_err());
    }

    #[test]
    fn load_reads_from_disk_with_path_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("snapshot.json")).unwrap();
        std::fs::write(&path, r#"{"resources": [{"type": "vpc", "name": "main"}]}"#).unwrap();
        assert_eq!(load_snapshot(&path).unwrap().len(), 1);

        let missing = path.with_file_name("missing.json");
        let err = load_snapshot(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }

    #[test]
    fn explicit_context_wins() {
        let mut snapshot = StackSnapshot::default().with_context(StackContext {
            project: Some("from-export".to_string()),
            region: Some("eu-central-1".to_string()),
            ..StackContext::default()
        });
        apply_context(
            &mut snapshot,
            &StackContext {
                project: Some("shop".to_string()),
                account_id: Some("111111111111".to_string()),
                ..StackContext::default()
            },
        );
        assert_eq!(snapshot.context.project.as_deref(), Some("shop"));
        assert_eq!(snapshot.context.account_id.as_deref(), Some("111111111111"));
        assert_eq!(snapshot.context.region.as_deref(), Some("eu-central-1"));
    }
}
