use crate::{RenderableReport, RenderableSeverity};

/// Render violations as GitHub Actions workflow command annotations.
///
/// Format:
/// `::{level} title={rule_id}::{resource}: {message}`
///
/// Mandatory violations and evaluation errors become `error`, advisory ones `warning`.
pub fn render_github_annotations(report: &RenderableReport) -> Vec<String> {
    let mut out = Vec::new();

    for group in &report.groups {
        for v in &group.violations {
            let level = match (v.evaluation_error, v.severity) {
                (true, _) | (false, RenderableSeverity::Mandatory) => "error",
                (false, RenderableSeverity::Advisory) => "warning",
            };

            let subject = match &group.resource {
                Some(r) => format!("{} ({})", r.name, r.resource_type),
                None => "stack".to_string(),
            };
            let message = escape_data(&format!("{}: {}", subject, v.message));

            out.push(format!(
                "::{} title={}::{}",
                level,
                escape_property(&v.rule_id),
                message
            ));
        }
    }

    out
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
