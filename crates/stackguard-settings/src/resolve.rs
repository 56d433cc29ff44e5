use crate::{model::StackguardConfigV1, presets};
use anyhow::Context;
use globset::Glob;
use stackguard_domain::policy::{EffectiveConfig, RuleParams, RulePolicy};
use stackguard_domain::rule::RuleMeta;
use stackguard_domain::rules;
use stackguard_types::{EnforcementLevel, Severity, ids};

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub enforcement: Option<String>,
    pub parallel: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub effective: EffectiveConfig,
}

pub fn resolve_config(
    cfg: StackguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    let profile = overrides
        .profile
        .clone()
        .or(cfg.profile.clone())
        .unwrap_or_else(|| presets::DEFAULT_PROFILE.to_string());

    let mut effective = presets::preset(&profile).with_context(|| {
        format!(
            "unknown profile: {profile} (expected one of {})",
            presets::PROFILES.join(", ")
        )
    })?;

    // Enforcement
    if let Some(level) = overrides.enforcement.clone().or(cfg.enforcement.clone()) {
        effective.enforcement = parse_enforcement(&level)?;
    }

    // Parallel evaluation
    if let Some(parallel) = overrides.parallel.or(cfg.parallel) {
        effective.parallel = parallel;
    }

    apply_params(&mut effective.params, &cfg)?;

    // per-rule overrides
    let catalog = rules::catalog();
    for (rule_id, rc) in cfg.rules.iter() {
        let meta = find_rule(&catalog, rule_id)?;
        let entry = effective
            .rules
            .entry(rule_id.clone())
            .or_insert_with(|| default_policy(meta));

        if let Some(enabled) = rc.enabled {
            entry.enabled = enabled;
        }
        if let Some(sev) = rc.severity.as_deref() {
            entry.severity = Some(
                parse_severity(sev).with_context(|| format!("invalid severity for {rule_id}"))?,
            );
        }
        if !rc.allow.is_empty() {
            validate_allowlist(rule_id, &rc.allow)?;
            entry.allow = rc.allow.clone();
        }
    }

    // A naming pattern is only useful with its rule on.
    if effective.params.instance_profile_pattern.is_some() {
        effective
            .rules
            .entry(ids::RULE_EC2_IAM_PROFILE.to_string())
            .or_insert_with(RulePolicy::enabled);
    }

    Ok(ResolvedConfig { effective })
}

fn apply_params(params: &mut RuleParams, cfg: &StackguardConfigV1) -> anyhow::Result<()> {
    let p = &cfg.params;

    if let Some(ports) = &p.allowed_ports {
        if let Some(bad) = ports.iter().find(|port| !(0..=65535).contains(*port)) {
            anyhow::bail!("invalid port in allowed_ports: {bad} (expected 0-65535)");
        }
        params.allowed_ports = ports.clone();
    }
    if let Some(types) = &p.allowed_instance_types {
        params.allowed_instance_types = types.clone();
    }
    if let Some(pattern) = &p.instance_profile_pattern {
        rules::profile_regex(pattern, Some("project"))
            .with_context(|| format!("invalid instance_profile_pattern: {pattern}"))?;
        params.instance_profile_pattern = Some(pattern.clone());
    }
    if let Some(classes) = &p.allowed_db_instance_classes {
        params.allowed_db_instance_classes = classes.clone();
    }
    if let Some(names) = &p.forbidden_db_usernames {
        params.forbidden_db_usernames = names.clone();
    }
    if let Some(days) = p.min_backup_retention_days {
        if days < 0 {
            anyhow::bail!("min_backup_retention_days must not be negative (got {days})");
        }
        params.min_backup_retention_days = days;
    }
    if let Some(types) = &p.allowed_endpoint_types {
        params.allowed_endpoint_types = types.clone();
    }
    Ok(())
}

fn find_rule<'a>(catalog: &'a [RuleMeta], rule_id: &str) -> anyhow::Result<&'a RuleMeta> {
    catalog
        .iter()
        .find(|m| m.id == rule_id)
        .with_context(|| format!("unknown rule id in config: {rule_id}"))
}

fn default_policy(meta: &RuleMeta) -> RulePolicy {
    if meta.opt_in {
        RulePolicy::disabled()
    } else {
        RulePolicy::enabled()
    }
}

fn validate_allowlist(rule_id: &str, patterns: &[String]) -> anyhow::Result<()> {
    for pattern in patterns {
        Glob::new(pattern)
            .with_context(|| format!("invalid allow glob for {rule_id}: {pattern}"))?;
    }
    Ok(())
}

pub fn parse_enforcement(v: &str) -> anyhow::Result<EnforcementLevel> {
    match v {
        "mandatory" => Ok(EnforcementLevel::Mandatory),
        "advisory" => Ok(EnforcementLevel::Advisory),
        other => anyhow::bail!("unknown enforcement level: {other} (expected mandatory|advisory)"),
    }
}

fn parse_severity(v: &str) -> anyhow::Result<Severity> {
    match v {
        "mandatory" => Ok(Severity::Mandatory),
        "advisory" => Ok(Severity::Advisory),
        other => anyhow::bail!("unknown severity: {other} (expected mandatory|advisory)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config_toml;

    fn resolve(toml: &str) -> anyhow::Result<EffectiveConfig> {
        let cfg = parse_config_toml(toml)?;
        Ok(resolve_config(cfg, Overrides::default())?.effective)
    }

    #[test]
    fn empty_config_resolves_to_baseline() {
        let eff = resolve("").unwrap();
        assert_eq!(eff.profile, "baseline");
        assert_eq!(eff.enforcement, EnforcementLevel::Mandatory);
        assert!(!eff.parallel);
        assert!(eff.rules.is_empty());
        assert_eq!(eff.params, RuleParams::default());
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let cfg = parse_config_toml(
            r#"
            profile = "strict"
            enforcement = "mandatory"
            parallel = false
            "#,
        )
        .unwrap();
        let eff = resolve_config(
            cfg,
            Overrides {
                profile: Some("advisory".to_string()),
                enforcement: None,
                parallel: Some(true),
            },
        )
        .unwrap()
        .effective;
        assert_eq!(eff.profile, "advisory");
        // The file's explicit enforcement still applies on top of the chosen preset.
        assert_eq!(eff.enforcement, EnforcementLevel::Mandatory);
        assert!(eff.parallel);
    }

    #[test]
    fn strict_enables_opt_in_rules() {
        let eff = resolve("profile = \"strict\"").unwrap();
        let versioning = rules::catalog()
            .into_iter()
            .find(|m| m.id == ids::RULE_S3_VERSIONING_ENABLED)
            .unwrap();
        assert!(eff.is_enabled(&versioning));
    }

    #[test]
    fn rule_overrides_apply_and_keep_default_enablement() {
        let eff = resolve(
            r#"
            [rules.s3-no-public-read]
            severity = "advisory"
            allow = ["legacy-*"]

            [rules.s3-logging-enabled]
            severity = "mandatory"

            [rules.vpc-dns-enabled]
            enabled = false
            "#,
        )
        .unwrap();

        let public = &eff.rules[ids::RULE_S3_NO_PUBLIC_READ];
        assert!(public.enabled);
        assert_eq!(public.severity, Some(Severity::Advisory));
        assert_eq!(public.allow, vec!["legacy-*".to_string()]);

        // Opt-in rules stay off unless `enabled = true`.
        assert!(!eff.rules[ids::RULE_S3_LOGGING_ENABLED].enabled);
        assert!(!eff.rules[ids::RULE_VPC_DNS_ENABLED].enabled);

        let opts = eff.eval_options();
        assert_eq!(opts.overrides.len(), 1);
    }

    #[test]
    fn params_are_applied_and_profile_pattern_enables_rule() {
        let eff = resolve(
            r#"
            [params]
            allowed_ports = [443]
            instance_profile_pattern = "^{project}-[a-z0-9]{8}-instance_profile$"
            min_backup_retention_days = 14
            "#,
        )
        .unwrap();
        assert_eq!(eff.params.allowed_ports, vec![443]);
        assert_eq!(eff.params.min_backup_retention_days, 14);
        assert!(eff.rules[ids::RULE_EC2_IAM_PROFILE].enabled);
        assert_eq!(
            eff.params.allowed_instance_types,
            RuleParams::default().allowed_instance_types
        );
    }

    #[test]
    fn explicit_disable_beats_profile_pattern() {
        let eff = resolve(
            r#"
            [rules.ec2-iam-profile]
            enabled = false

            [params]
            instance_profile_pattern = "^x$"
            "#,
        )
        .unwrap();
        assert!(!eff.rules[ids::RULE_EC2_IAM_PROFILE].enabled);
    }

    #[test]
    fn invalid_values_fail_with_context() {
        let cases = [
            ("profile = \"paranoid\"", "unknown profile"),
            ("enforcement = \"sometimes\"", "unknown enforcement level"),
            ("[rules.not-a-rule]\nenabled = true", "unknown rule id"),
            ("[rules.sg-no-public-ssh]\nseverity = \"fatal\"", "invalid severity"),
            ("[rules.sg-no-public-ssh]\nallow = [\"[\"]", "invalid allow glob"),
            ("[params]\ninstance_profile_pattern = \"(\"", "invalid instance_profile_pattern"),
            ("[params]\nallowed_ports = [70000]", "invalid port"),
            ("[params]\nmin_backup_retention_days = -1", "must not be negative"),
        ];
        for (toml, expected) in cases {
            let err = resolve(toml).expect_err(toml);
            let rendered = format!("{err:#}");
            assert!(rendered.contains(expected), "{toml}: {rendered}");
        }
    }
}
