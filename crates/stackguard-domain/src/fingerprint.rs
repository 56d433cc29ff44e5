use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for a violation.
///
/// Identity fields:
/// - rule_id
/// - resource type token (if attributed)
/// - resource name (if attributed)
/// - message
pub fn fingerprint_for_violation(
    rule_id: &str,
    resource_type: Option<&str>,
    resource_name: Option<&str>,
    message: &str,
) -> String {
    let parts = [
        rule_id,
        resource_type.unwrap_or("-"),
        resource_name.unwrap_or("-"),
        message,
    ];
    let canonical = parts.join("|");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_sensitive_to_identity() {
        let a = fingerprint_for_violation("r", Some("vpc"), Some("main"), "m");
        let b = fingerprint_for_violation("r", Some("vpc"), Some("main"), "m");
        let c = fingerprint_for_violation("r", Some("vpc"), Some("other"), "m");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
