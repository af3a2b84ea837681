//! Rendering of [`Verdict`]s for CI consumers and humans.

use std::fmt::Write as _;

use crate::evaluator::Verdict;

/// Pure formatting functions over a [`Verdict`].
///
/// Output is stable for identical input: struct fields serialize in
/// declaration order and every map in a finding is a `BTreeMap`.
pub struct ReportFormatter;

impl ReportFormatter {
    /// Machine-readable report.
    pub fn json(verdict: &Verdict) -> serde_json::Result<String> {
        serde_json::to_string_pretty(verdict)
    }

    /// JSON array of reports, in the order given.
    pub fn json_many(verdicts: &[Verdict]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(verdicts)
    }

    /// Human-readable report.
    pub fn text(verdict: &Verdict) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Policy verdict: {}", status(verdict));
        let _ = writeln!(out, "  environment:      {}", verdict.environment_name);
        let _ = writeln!(out, "  mode:             {}", verdict.mode);
        let _ = writeln!(out, "  fail on severity: {}", verdict.fail_on_severity);
        let _ = writeln!(out, "  evaluated at:     {}", verdict.evaluated_at.to_rfc3339());
        match verdict.min_score {
            Some(min) => {
                let _ = writeln!(out, "  score:            {} (min {min})", verdict.score);
            }
            None => {
                let _ = writeln!(out, "  score:            {}", verdict.score);
            }
        }

        let _ = writeln!(out, "\nViolations ({}):", verdict.violations.len());
        if verdict.violations.is_empty() {
            out.push_str("  none\n");
        }
        for v in &verdict.violations {
            let severity = v.effective_severity.as_str().to_uppercase();
            let _ = write!(out, "  {severity:<9} {}", v.finding.rule_id);
            if v.unknown_rule {
                out.push_str("  [unknown rule]");
            }
            out.push('\n');
        }

        if !verdict.sampled_out.is_empty() {
            let _ = writeln!(out, "\nSampled out ({}):", verdict.sampled_out.len());
            for finding in &verdict.sampled_out {
                let _ = writeln!(out, "  {}", finding.rule_id);
            }
        }

        if !verdict.skipped.is_empty() {
            let _ = writeln!(out, "\nSkipped ({}):", verdict.skipped.len());
            for s in &verdict.skipped {
                let _ = writeln!(out, "  {:<20} {}", s.reason.as_str(), s.finding.rule_id);
            }
        }

        out
    }

    /// One-line summary, e.g.
    /// `FAIL env=prod mode=enforce violations=2 sampled_out=0 skipped=1 score=30`.
    pub fn summary_line(verdict: &Verdict) -> String {
        format!(
            "{} env={} mode={} violations={} sampled_out={} skipped={} score={}",
            status(verdict),
            verdict.environment_name,
            verdict.mode,
            verdict.violations.len(),
            verdict.sampled_out.len(),
            verdict.skipped.len(),
            verdict.score,
        )
    }
}

fn status(verdict: &Verdict) -> &'static str {
    if verdict.passed {
        "PASS"
    } else {
        "FAIL"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mobguard_core::{Finding, Severity};

    use super::*;
    use crate::evaluator::{SkipReason, SkippedFinding, Violation};
    use crate::schema::Mode;

    fn sample() -> Verdict {
        Verdict {
            environment_name: "prod".to_string(),
            mode: Mode::Enforce,
            fail_on_severity: Severity::High,
            passed: false,
            violations: vec![
                Violation {
                    finding: Finding::new("mobile.made.up"),
                    effective_severity: Severity::Critical,
                    rule_enabled: true,
                    unknown_rule: true,
                },
                Violation {
                    finding: Finding::new("mobile.android.cleartext.disabled")
                        .with_context("file", "AndroidManifest.xml"),
                    effective_severity: Severity::High,
                    rule_enabled: true,
                    unknown_rule: false,
                },
            ],
            sampled_out: vec![Finding::new("mobile.ios.ats.required")],
            skipped: vec![SkippedFinding {
                finding: Finding::new("mobile.debug.disabled"),
                reason: SkipReason::BelowThreshold,
            }],
            score: 0,
            min_score: Some(95.0),
            evaluated_at: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn summary_line_format() {
        assert_eq!(
            ReportFormatter::summary_line(&sample()),
            "FAIL env=prod mode=enforce violations=2 sampled_out=1 skipped=1 score=0"
        );

        let mut passing = sample();
        passing.passed = true;
        assert!(ReportFormatter::summary_line(&passing).starts_with("PASS env=prod"));
    }

    #[test]
    fn json_is_stable_and_ordered() {
        let verdict = sample();
        let a = ReportFormatter::json(&verdict).unwrap();
        let b = ReportFormatter::json(&verdict.clone()).unwrap();
        assert_eq!(a, b);

        let env = a.find("\"environmentName\"").unwrap();
        let passed = a.find("\"passed\"").unwrap();
        let violations = a.find("\"violations\"").unwrap();
        let evaluated = a.find("\"evaluatedAt\"").unwrap();
        assert!(env < passed && passed < violations && violations < evaluated);

        let parsed: serde_json::Value = serde_json::from_str(&a).unwrap();
        assert_eq!(parsed["violations"][0]["unknownRule"], true);
        assert_eq!(
            parsed["violations"][1]["finding"]["context"]["file"],
            "AndroidManifest.xml"
        );
        assert_eq!(parsed["minScore"], 95.0);
    }

    #[test]
    fn text_lists_every_bucket() {
        let text = ReportFormatter::text(&sample());

        assert!(text.starts_with("Policy verdict: FAIL\n"));
        assert!(text.contains("score:            0 (min 95)"));
        assert!(text.contains("CRITICAL  mobile.made.up  [unknown rule]"));
        assert!(text.contains("HIGH      mobile.android.cleartext.disabled"));
        assert!(text.contains("Sampled out (1):\n  mobile.ios.ats.required"));
        assert!(text.contains("below_threshold"));
    }

    #[test]
    fn text_for_clean_verdict() {
        let mut verdict = sample();
        verdict.passed = true;
        verdict.violations.clear();
        verdict.sampled_out.clear();
        verdict.skipped.clear();
        verdict.min_score = None;
        verdict.score = 100;

        let text = ReportFormatter::text(&verdict);
        assert!(text.contains("Violations (0):\n  none\n"));
        assert!(!text.contains("Sampled out"));
        assert!(!text.contains("Skipped"));
        assert!(text.contains("score:            100\n"));
    }
}
