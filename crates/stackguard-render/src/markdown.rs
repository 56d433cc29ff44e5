use crate::RenderableReport;

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();

    out.push_str("# Stackguard report\n\n");
    out.push_str(&format!(
        "- Verdict: **{}**\n- Enforcement: {} (profile `{}`)\n- Resources scanned: {}\n- Rules evaluated: {}\n- Violations: {} ({} evaluation errors)\n\n",
        report.verdict.label(),
        report.data.enforcement,
        report.data.profile,
        report.data.resources_scanned,
        report.data.rules_evaluated,
        report.data.violations_total,
        report.data.evaluation_errors,
    ));

    if report.groups.is_empty() {
        out.push_str("No violations.\n");
        return out;
    }

    out.push_str("## Violations\n");

    for group in &report.groups {
        match &group.resource {
            Some(r) => out.push_str(&format!("\n### `{}` ({})\n\n", r.name, r.resource_type)),
            None => out.push_str("\n### Stack\n\n"),
        }

        for v in &group.violations {
            let tag = if v.evaluation_error {
                "ERROR"
            } else {
                v.severity.label()
            };
            out.push_str(&format!("- [{}] `{}`: {}\n", tag, v.rule_id, single_line(&v.message)));
            if let Some(fix) = &v.remediation {
                out.push_str(&format!("  - fix: {}\n", fix));
            }
        }
    }

    out
}

fn single_line(s: &str) -> String {
    s.lines().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_report;

    #[test]
    fn renders_empty_report() {
        let mut report = sample_report();
        report.groups.clear();
        let md = render_markdown(&report);
        assert!(md.contains("No violations"));
        assert!(!md.contains("## Violations"));
    }

    #[test]
    fn renders_groups_in_order_with_remediation() {
        let md = render_markdown(&sample_report());
        assert!(md.contains("Verdict: **FAIL**"));
        assert!(md.contains("Enforcement: mandatory (profile `baseline`)"));
        assert!(md.contains("Violations: 3 (1 evaluation errors)"));

        let bucket = md.find("### `assets` (aws:s3/bucket:Bucket)").expect("bucket heading");
        let stack = md.find("### Stack").expect("stack heading");
        assert!(bucket < stack);

        assert!(md.contains("- [MANDATORY] `s3-no-public-read`: bucket 'assets'"));
        assert!(md.contains("  - fix: Use a private ACL."));
        assert!(md.contains("- [ADVISORY] `s3-versioning-enabled`"));
        assert!(md.contains("- [ERROR] `route-uses-known-gateway`: rule 'route-uses-known-gateway' failed to evaluate: 100% broken"));
    }
}
