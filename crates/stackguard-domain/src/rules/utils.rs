use crate::model::{Property, Resource, ResourceKind, StackSnapshot};
use crate::rule::RuleError;
use ipnet::IpNet;
use serde_json::Value;
use std::collections::BTreeSet;

/// `Ok(true)` only for an explicit `true`; absent counts as not set.
pub fn is_true(resource: &Resource, path: &str) -> Result<bool, RuleError> {
    Ok(resource.bool_property(path).into_result()? == Some(true))
}

/// Whether a CIDR block lies entirely inside private address space
/// (RFC 1918 for IPv4, unique-local for IPv6).
pub fn is_private_cidr(path: &str, cidr: &str) -> Result<bool, RuleError> {
    let net: IpNet = cidr
        .trim()
        .parse()
        .map_err(|e| RuleError::malformed(path, format!("invalid CIDR `{cidr}`: {e}")))?;

    let private: &[&str] = match net {
        IpNet::V4(_) => &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"],
        IpNet::V6(_) => &["fc00::/7"],
    };
    Ok(private
        .iter()
        .filter_map(|p| p.parse::<IpNet>().ok())
        .any(|range| range.contains(&net)))
}

/// A CIDR that matches every address (`0.0.0.0/0`, `::/0`).
pub fn is_open_cidr(cidr: &str) -> bool {
    cidr.trim()
        .parse::<IpNet>()
        .map(|net| net.prefix_len() == 0)
        .unwrap_or(false)
}

/// `id` values of every resource of `kind`. Resources without an id are skipped.
pub fn ids_of<'a>(snapshot: &'a StackSnapshot, kind: &ResourceKind) -> BTreeSet<&'a str> {
    snapshot
        .resources
        .iter()
        .filter(|r| r.kind() == kind)
        .filter_map(|r| r.str_property("id").present())
        .collect()
}

/// A policy document may arrive as a JSON string or an already-decoded object.
pub fn policy_document(resource: &Resource, path: &str) -> Result<Option<Value>, RuleError> {
    match resource.property(path) {
        None => Ok(None),
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| RuleError::malformed(path, format!("not a JSON policy document: {e}"))),
        Some(v @ Value::Object(_)) => Ok(Some(v.clone())),
        Some(_) => Err(RuleError::UnexpectedShape {
            path: path.to_string(),
            expected: "policy document (string or object)",
        }),
    }
}

/// `Statement` entries that grant access; a single statement object is accepted too.
pub fn allow_statements(document: &Value) -> Vec<&Value> {
    let statements: Vec<&Value> = match document.get("Statement") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v @ Value::Object(_)) => vec![v],
        _ => Vec::new(),
    };
    statements
        .into_iter()
        .filter(|s| s.get("Effect").and_then(Value::as_str) == Some("Allow"))
        .collect()
}

/// IAM fields that take either a string or a list of strings.
pub fn string_or_list(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

pub fn non_empty_list(resource: &Resource, path: &str) -> Result<bool, RuleError> {
    Ok(match resource.array_property(path) {
        Property::Present(items) => !items.is_empty(),
        Property::Absent => false,
        Property::WrongShape { path, expected } => {
            return Err(RuleError::UnexpectedShape { path, expected });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn private_ranges_cover_rfc1918_only() {
        assert!(is_private_cidr("cidrBlock", "10.0.0.0/16").unwrap());
        assert!(is_private_cidr("cidrBlock", "172.31.0.0/20").unwrap());
        assert!(is_private_cidr("cidrBlock", "192.168.1.0/24").unwrap());
        assert!(!is_private_cidr("cidrBlock", "172.32.0.0/16").unwrap());
        assert!(!is_private_cidr("cidrBlock", "8.8.8.0/24").unwrap());
        // A supernet of a private range is not itself private.
        assert!(!is_private_cidr("cidrBlock", "10.0.0.0/7").unwrap());
        assert!(is_private_cidr("cidrBlock", "fd00::/64").unwrap());
        assert!(is_private_cidr("cidrBlock", "not-a-cidr").is_err());
    }

    #[test]
    fn open_cidr_detection() {
        assert!(is_open_cidr("0.0.0.0/0"));
        assert!(is_open_cidr("::/0"));
        assert!(!is_open_cidr("10.0.0.0/8"));
        assert!(!is_open_cidr("garbage"));
    }

    #[test]
    fn statements_accept_single_object_and_filter_deny() {
        let doc = json!({ "Statement": { "Effect": "Allow", "Action": "*" } });
        assert_eq!(allow_statements(&doc).len(), 1);

        let doc = json!({ "Statement": [
            { "Effect": "Deny", "Action": "*" },
            { "Effect": "Allow", "Action": ["s3:GetObject"] }
        ]});
        let allowed = allow_statements(&doc);
        assert_eq!(allowed.len(), 1);
        assert_eq!(string_or_list(allowed[0].get("Action")), vec!["s3:GetObject"]);
    }
}
