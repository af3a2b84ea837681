//! Subcommand implementations. Each returns what to print instead of
//! printing, so `main` owns stdout, stderr and the exit code.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use mobguard_core::OutputFormat;
use mobguard_policy::{diff_policies, Evaluator, ReportFormatter, SeededSampler, Verdict};
use rayon::prelude::*;
use tracing::info;

use crate::workspace::{load_findings, PolicyWorkspace};

/// Result of one subcommand.
#[derive(Debug)]
pub struct Output {
    /// Report body for stdout.
    pub stdout: String,
    /// Human summary lines for stderr.
    pub summaries: Vec<String>,
    /// False when an enforced verdict failed.
    pub passed: bool,
}

impl Output {
    fn report(stdout: String) -> Self {
        Self {
            stdout,
            summaries: Vec::new(),
            passed: true,
        }
    }
}

/// Evaluate `findings` against every environment in parallel. Environment
/// `i` samples with `seed + i`, so each run is reproducible on its own.
pub fn check(
    ws: &PolicyWorkspace,
    environments: &[String],
    findings: &Path,
    seed: u64,
    format: OutputFormat,
) -> Result<Output> {
    let findings = load_findings(findings)?;
    let evaluator = Evaluator::new(&ws.registry);

    let verdicts = environments
        .par_iter()
        .enumerate()
        .map(|(i, env)| {
            let policy = ws.resolve(env)?;
            let mut rng = SeededSampler::new(seed.wrapping_add(i as u64));
            Ok(evaluator.evaluate(&policy, &findings, &ws.exceptions, &mut rng))
        })
        .collect::<Result<Vec<Verdict>>>()?;

    let stdout = match format {
        OutputFormat::Json if verdicts.len() == 1 => ReportFormatter::json(&verdicts[0])?,
        OutputFormat::Json => ReportFormatter::json_many(&verdicts)?,
        OutputFormat::Text => verdicts
            .iter()
            .map(ReportFormatter::text)
            .collect::<Vec<_>>()
            .join("\n"),
    };

    let passed = verdicts.iter().all(|v| v.passed);
    info!(environments = verdicts.len(), passed, "check complete");

    Ok(Output {
        stdout,
        summaries: verdicts.iter().map(ReportFormatter::summary_line).collect(),
        passed,
    })
}

pub fn preview(ws: &PolicyWorkspace, environment: &str, format: OutputFormat) -> Result<Output> {
    let policy = ws.resolve(environment)?;

    let stdout = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&policy)
            .context("failed to serialize policy")?,
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "Policy: {}", policy.environment_name());
            let _ = writeln!(out, "  mode:             {}", policy.mode());
            let _ = writeln!(out, "  fail on severity: {}", policy.fail_on_severity());
            let _ = writeln!(out, "\nDirectives:");
            if policy.directives().is_empty() {
                out.push_str("  none\n");
            }
            for (key, directive) in policy.directives() {
                let _ = writeln!(out, "  {key} = {}  ({})", directive.value, directive.source);
            }
            let _ = writeln!(out, "\nRules:");
            for rule in ws.registry.all() {
                let effective = policy.effective_rule(rule);
                let state = if effective.enabled { "on " } else { "off" };
                let _ = writeln!(out, "  [{state}] {:<9} {}", effective.severity, rule.id);
                for (key, value) in policy.rule_directives(&rule.id).into_iter().flatten() {
                    let _ = writeln!(out, "              {key} = {value}");
                }
            }
            out
        }
    };

    Ok(Output::report(stdout))
}

pub fn diff(ws: &PolicyWorkspace, from: &str, to: &str, format: OutputFormat) -> Result<Output> {
    let base = ws.resolve(from)?;
    let compare = ws.resolve(to)?;
    let diff = diff_policies(&base, &compare, &ws.registry);

    let stdout = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&diff).context("failed to serialize diff")?
        }
        OutputFormat::Text => diff.to_text(),
    };

    Ok(Output::report(stdout))
}

pub fn envs(ws: &PolicyWorkspace, format: OutputFormat) -> Result<Output> {
    let environments = ws.policy.environments();
    let stdout = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&environments)?,
        OutputFormat::Text => environments.join("\n"),
    };
    Ok(Output::report(stdout))
}

pub fn rules(ws: &PolicyWorkspace, format: OutputFormat) -> Result<Output> {
    let stdout = match format {
        OutputFormat::Json => {
            let rules: Vec<_> = ws.registry.all().collect();
            serde_json::to_string_pretty(&rules)?
        }
        OutputFormat::Text => ws
            .registry
            .all()
            .map(|rule| {
                let flags = match (rule.default_enabled, rule.allow_exception) {
                    (true, true) => "",
                    (true, false) => "  [no exceptions]",
                    (false, true) => "  [disabled]",
                    (false, false) => "  [disabled, no exceptions]",
                };
                format!("{:<9} {}{flags}", rule.default_severity, rule.id)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(Output::report(stdout))
}
