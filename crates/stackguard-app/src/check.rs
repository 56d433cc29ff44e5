//! The `check` use case: load a snapshot, evaluate policy, and produce a report.

use anyhow::Context;
use camino::Utf8Path;
use stackguard_domain::model::{StackContext, StackSnapshot};
use stackguard_domain::reporter::ViolationReporter;
use stackguard_settings::{Overrides, ResolvedConfig};
use stackguard_types::{
    ReportEnvelope, SCHEMA_REPORT_V1, StackguardData, StackguardReport, ToolMeta, Verdict,
};
use time::OffsetDateTime;
use tracing::{info, warn};

/// Where the snapshot comes from.
#[derive(Clone, Copy, Debug)]
pub enum SnapshotSource<'a> {
    /// A snapshot file on disk (native or Pulumi export JSON).
    Path(&'a Utf8Path),
    /// Snapshot JSON already in memory.
    Text(&'a str),
}

/// Input for the check use case.
#[derive(Clone, Debug)]
pub struct CheckInput<'a> {
    pub snapshot: SnapshotSource<'a>,
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// CLI overrides.
    pub overrides: Overrides,
    /// Context values that replace whatever the snapshot carries.
    pub context: StackContext,
}

/// Output from the check use case.
#[derive(Clone, Debug)]
pub struct CheckOutput {
    /// The generated report.
    pub report: StackguardReport,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
    /// `false` under mandatory enforcement whenever anything was reported.
    /// The exit code follows `report.verdict` instead.
    pub success: bool,
}

/// Run the check use case: parse config, load the snapshot, evaluate rules, produce a report.
pub fn run_check(input: CheckInput<'_>) -> anyhow::Result<CheckOutput> {
    let started_at = OffsetDateTime::now_utc();

    // Parse config (empty is allowed, defaults apply).
    let cfg = if input.config_text.trim().is_empty() {
        stackguard_settings::StackguardConfigV1::default()
    } else {
        stackguard_settings::parse_config_toml(input.config_text).context("parse config")?
    };

    let resolved = stackguard_settings::resolve_config(cfg, input.overrides.clone())
        .context("resolve config")?;

    let mut snapshot = load(input.snapshot)?;
    stackguard_snapshot::apply_context(&mut snapshot, &input.context);

    let effective = &resolved.effective;
    let registry =
        stackguard_domain::rules::build_registry(effective).context("build rule registry")?;

    info!(
        profile = %effective.profile,
        enforcement = %effective.enforcement,
        rules = registry.len(),
        resources = snapshot.len(),
        parallel = effective.parallel,
        "evaluating stack"
    );

    let violations =
        stackguard_domain::evaluate_with(&snapshot, &registry, &effective.eval_options());

    let mut reporter = ViolationReporter::new();
    reporter.extend(violations);
    let outcome = reporter.finalize(effective.enforcement);
    let counts = outcome.counts();
    let verdict = outcome.verdict();

    if counts.evaluation_errors > 0 {
        warn!(
            errors = counts.evaluation_errors,
            "some rules failed to evaluate"
        );
    }
    info!(
        violations = counts.total(),
        advisory = counts.advisory,
        mandatory = counts.mandatory,
        verdict = ?verdict,
        "check complete"
    );

    let data = StackguardData {
        profile: effective.profile.clone(),
        stack: snapshot.context.stack.clone(),
        resources_scanned: snapshot.len() as u32,
        rules_evaluated: registry.len() as u32,
        violations_total: counts.total(),
        evaluation_errors: counts.evaluation_errors,
    };

    let report = ReportEnvelope {
        schema: SCHEMA_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "stackguard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        enforcement: effective.enforcement,
        verdict,
        violations: outcome.violations,
        data,
    };

    Ok(CheckOutput {
        report,
        success: outcome.success,
        resolved_config: resolved,
    })
}

fn load(source: SnapshotSource<'_>) -> anyhow::Result<StackSnapshot> {
    match source {
        SnapshotSource::Path(path) => stackguard_snapshot::load_snapshot(path),
        SnapshotSource::Text(text) => {
            stackguard_snapshot::parse_snapshot(text).context("parse snapshot")
        }
    }
}

/// Map verdict to exit code: 0 = pass/warn, 2 = fail.
pub fn verdict_exit_code(verdict: &Verdict) -> i32 {
    match verdict {
        Verdict::Pass => 0,
        Verdict::Warn => 0,
        Verdict::Fail => 2,
    }
}
