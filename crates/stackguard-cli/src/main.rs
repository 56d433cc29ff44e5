//! CLI entry point for stackguard.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, and exit codes.
//! All business logic lives in the `stackguard-app` crate.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use stackguard_app::{
    CheckInput, ExplainOutput, SchemaKind, SnapshotSource, format_explanation, format_not_found,
    format_rule_list, list_rules, parse_report_json, render_annotations, render_markdown,
    render_text, run_check, run_explain, schema_json, serialize_report, to_renderable,
    verdict_exit_code, write_report, write_text,
};
use stackguard_domain::model::StackContext;
use stackguard_settings::Overrides;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "stackguard",
    version,
    about = "Policy guardrails for resolved infrastructure stack snapshots"
)]
struct Cli {
    /// Path to stackguard config TOML (missing file means defaults).
    #[arg(long, global = true, default_value = "stackguard.toml")]
    config: Utf8PathBuf,

    /// Override profile (baseline|strict|advisory).
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Override enforcement level (advisory|mandatory).
    #[arg(long, global = true)]
    enforcement: Option<String>,

    /// Evaluate rules in parallel.
    #[arg(long, global = true)]
    parallel: bool,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SchemaArg {
    Report,
    Config,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a stack snapshot and write artifacts.
    Check {
        /// Snapshot JSON (native format or `pulumi stack export` output).
        #[arg(long)]
        snapshot: Utf8PathBuf,

        /// Where to write the JSON report.
        #[arg(long, default_value = "artifacts/stackguard/report.json")]
        report_out: Utf8PathBuf,

        /// Write a Markdown report alongside the JSON.
        #[arg(long)]
        write_markdown: bool,

        /// Where to write the Markdown report (if enabled).
        #[arg(long, default_value = "artifacts/stackguard/comment.md")]
        markdown_out: Utf8PathBuf,

        /// What to print on stdout.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Project name, replacing the snapshot's value.
        #[arg(long)]
        project: Option<String>,

        /// Stack name, replacing the snapshot's value.
        #[arg(long)]
        stack: Option<String>,

        /// Cloud account id, replacing the snapshot's value.
        #[arg(long)]
        account_id: Option<String>,

        /// Region, replacing the snapshot's value.
        #[arg(long)]
        region: Option<String>,
    },

    /// Render markdown from an existing JSON report.
    Md {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/stackguard/report.json")]
        report: Utf8PathBuf,

        /// Where to write the Markdown output (if not specified, prints to stdout).
        #[arg(long, short)]
        output: Option<Utf8PathBuf>,
    },

    /// Render GitHub Actions annotations from an existing JSON report.
    Annotations {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/stackguard/report.json")]
        report: Utf8PathBuf,

        /// Maximum number of annotations to emit.
        #[arg(long, default_value = "10")]
        max: usize,
    },

    /// Explain a rule with remediation guidance.
    Explain {
        /// The rule id (e.g. "sg-no-public-ssh").
        rule_id: String,
    },

    /// List built-in rules.
    Rules {
        /// Only list rules of this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Print a JSON Schema.
    Schema {
        #[arg(value_enum, default_value = "report")]
        kind: SchemaArg,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("stackguard error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

/// Log to stderr; stdout is reserved for command output.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let overrides = Overrides {
        profile: cli.profile.clone(),
        enforcement: cli.enforcement.clone(),
        parallel: cli.parallel.then_some(true),
    };

    match cli.cmd {
        Commands::Check {
            snapshot,
            report_out,
            write_markdown,
            markdown_out,
            format,
            project,
            stack,
            account_id,
            region,
        } => {
            let context = StackContext {
                project,
                stack,
                account_id,
                region,
            };
            cmd_check(
                &cli.config,
                overrides,
                &snapshot,
                context,
                &report_out,
                write_markdown.then_some(markdown_out.as_path()),
                format,
            )
        }
        Commands::Md { report, output } => cmd_md(&report, output.as_deref()),
        Commands::Annotations { report, max } => cmd_annotations(&report, max),
        Commands::Explain { rule_id } => Ok(cmd_explain(&rule_id)),
        Commands::Rules { category } => {
            let rules = list_rules(category.as_deref())?;
            print!("{}", format_rule_list(&rules));
            Ok(0)
        }
        Commands::Schema { kind } => {
            let kind = match kind {
                SchemaArg::Report => SchemaKind::Report,
                SchemaArg::Config => SchemaKind::Config,
            };
            let text =
                serde_json::to_string_pretty(&schema_json(kind)).context("serialize schema")?;
            println!("{text}");
            Ok(0)
        }
    }
}

fn cmd_check(
    config: &Utf8Path,
    overrides: Overrides,
    snapshot: &Utf8Path,
    context: StackContext,
    report_out: &Utf8Path,
    markdown_out: Option<&Utf8Path>,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    // Missing config is allowed (defaults apply).
    let cfg_text = if config.exists() {
        std::fs::read_to_string(config).with_context(|| format!("read config: {}", config))?
    } else {
        debug!(path = %config, "no config file; using defaults");
        String::new()
    };

    let output = run_check(CheckInput {
        snapshot: SnapshotSource::Path(snapshot),
        config_text: &cfg_text,
        overrides,
        context,
    })?;

    write_report(report_out, &output.report).context("write report json")?;

    let renderable = to_renderable(&output.report);
    if let Some(path) = markdown_out {
        write_text(path, &render_markdown(&renderable)).context("write markdown")?;
    }

    match format {
        OutputFormat::Text => print!("{}", render_text(&renderable)),
        OutputFormat::Json => {
            let bytes = serialize_report(&output.report)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        OutputFormat::None => {}
    }

    Ok(verdict_exit_code(&output.report.verdict))
}

fn cmd_md(report_path: &Utf8Path, output: Option<&Utf8Path>) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(report_path)
        .with_context(|| format!("read report: {}", report_path))?;
    let report = parse_report_json(&report_text)?;
    let md = render_markdown(&to_renderable(&report));

    if let Some(out_path) = output {
        write_text(out_path, &md).context("write markdown output")?;
    } else {
        print!("{}", md);
    }

    Ok(0)
}

fn cmd_annotations(report_path: &Utf8Path, max: usize) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(report_path)
        .with_context(|| format!("read report: {}", report_path))?;
    let report = parse_report_json(&report_text)?;

    for annotation in render_annotations(&to_renderable(&report), max) {
        println!("{}", annotation);
    }

    Ok(0)
}

fn cmd_explain(rule_id: &str) -> i32 {
    match run_explain(rule_id) {
        ExplainOutput::Found(meta) => {
            print!("{}", format_explanation(&meta));
            0
        }
        ExplainOutput::NotFound {
            identifier,
            available_rule_ids,
        } => {
            eprint!("{}", format_not_found(&identifier, &available_rule_ids));
            1
        }
    }
}
