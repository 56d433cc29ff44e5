//! The `rules` use case: list built-in rules, optionally by category.

use stackguard_domain::rule::RuleMeta;
use stackguard_domain::rules;
use stackguard_types::ids;

/// Built-in rules in registration order, filtered to one category when given.
pub fn list_rules(category: Option<&str>) -> anyhow::Result<Vec<RuleMeta>> {
    if let Some(cat) = category
        && !ids::all_categories().contains(&cat)
    {
        anyhow::bail!(
            "unknown category: {cat} (expected one of {})",
            ids::all_categories().join(", ")
        );
    }

    Ok(rules::catalog()
        .into_iter()
        .filter(|m| category.is_none_or(|c| m.category == c))
        .collect())
}

/// One aligned line per rule: id, category, default severity, and an opt-in marker.
pub fn format_rule_list(rules: &[RuleMeta]) -> String {
    let id_width = rules.iter().map(|m| m.id.len()).max().unwrap_or(0);
    let cat_width = rules.iter().map(|m| m.category.len()).max().unwrap_or(0);

    let mut out = String::new();
    for m in rules {
        let line = format!(
            "{:id_width$}  {:cat_width$}  {:9}  {}",
            m.id,
            m.category,
            m.severity.as_str(),
            if m.opt_in { "opt-in" } else { "" },
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_list_covers_every_rule() {
        let all = list_rules(None).expect("list");
        let listed: Vec<&str> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(listed, ids::all_rule_ids());
    }

    #[test]
    fn category_filter() {
        let secrets = list_rules(Some(ids::CATEGORY_SECRETS)).expect("list");
        assert!(!secrets.is_empty());
        assert!(secrets.iter().all(|m| m.category == ids::CATEGORY_SECRETS));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = list_rules(Some("dns")).unwrap_err();
        assert!(err.to_string().contains("unknown category: dns"));
    }

    #[test]
    fn list_is_aligned_and_marks_opt_in() {
        let rules = list_rules(Some(ids::CATEGORY_STORAGE)).expect("list");
        let text = format_rule_list(&rules);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), rules.len());

        let versioning = lines
            .iter()
            .find(|l| l.starts_with(ids::RULE_S3_VERSIONING_ENABLED))
            .expect("versioning line");
        assert!(versioning.ends_with("opt-in"));

        let public = lines
            .iter()
            .find(|l| l.starts_with(ids::RULE_S3_NO_PUBLIC_READ))
            .expect("public line");
        assert!(public.ends_with("mandatory"));
    }
}
