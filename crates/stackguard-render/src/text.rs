use crate::{RenderableReport, RenderableSeverity};

/// Plain-text rendering for terminals: violations grouped under their resource,
/// followed by a one-line summary.
pub fn render_text(report: &RenderableReport) -> String {
    let mut out = String::new();

    for group in &report.groups {
        match &group.resource {
            Some(r) => out.push_str(&format!("{} ({})\n", r.name, r.resource_type)),
            None => out.push_str("stack\n"),
        }
        for v in &group.violations {
            let tag = if v.evaluation_error {
                "error"
            } else {
                match v.severity {
                    RenderableSeverity::Advisory => "advisory",
                    RenderableSeverity::Mandatory => "mandatory",
                }
            };
            let mut lines = v.message.lines();
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                tag,
                v.rule_id,
                lines.next().unwrap_or("")
            ));
            for rest in lines {
                out.push_str(&format!("      {}\n", rest));
            }
        }
        out.push('\n');
    }

    let d = &report.data;
    if report.groups.is_empty() {
        out.push_str(&format!(
            "no violations ({} resources, {} rules); verdict: {}\n",
            d.resources_scanned,
            d.rules_evaluated,
            report.verdict.label()
        ));
    } else {
        out.push_str(&format!(
            "{} violations ({} evaluation errors) across {} resources scanned; enforcement: {}; verdict: {}\n",
            d.violations_total,
            d.evaluation_errors,
            d.resources_scanned,
            d.enforcement,
            report.verdict.label()
        ));
    }
    out
}
