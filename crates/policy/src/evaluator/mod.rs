//! Finding evaluation against a resolved [`PolicyDocument`].
//!
//! Each finding goes through a fixed pipeline and lands in exactly one of
//! three buckets on the [`Verdict`]:
//!
//! 1. unknown rule id → forced critical violation
//! 2. rule disabled by the policy → `skipped` (`rule_disabled`)
//! 3. `sampleRate` draw misses → `sampled_out`
//! 4. approved, in-scope exception → `skipped` (`exception_approved`)
//! 5. severity below `failOnSeverity` → `skipped` (`below_threshold`)
//! 6. otherwise → violation
//!
//! Only `enforce` mode turns violations into a failed verdict.

mod sampling;


use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mobguard_core::{Finding, Severity};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::PolicyDocument;
use crate::exceptions::ExceptionRequest;
use crate::registry::RuleRegistry;
use crate::schema::Mode;

pub use sampling::{RandomSource, SeededSampler};

const MAX_SCORE: u32 = 100;

// ── Verdict ─────────────────────────────────────────────────────────

/// A finding that counts against the policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub finding: Finding,
    pub effective_severity: Severity,
    pub rule_enabled: bool,
    /// Set when the finding referenced a rule the registry does not know.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unknown_rule: bool,
}

/// Why a finding was neither a violation nor sampled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    RuleDisabled,
    ExceptionApproved,
    BelowThreshold,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::RuleDisabled => "rule_disabled",
            SkipReason::ExceptionApproved => "exception_approved",
            SkipReason::BelowThreshold => "below_threshold",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFinding {
    pub finding: Finding,
    pub reason: SkipReason,
}

/// Outcome of one evaluation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub environment_name: String,
    pub mode: Mode,
    pub fail_on_severity: Severity,
    pub passed: bool,
    /// Ordered by descending severity, then ascending rule id.
    pub violations: Vec<Violation>,
    pub sampled_out: Vec<Finding>,
    pub skipped: Vec<SkippedFinding>,
    /// Informational only, never affects `passed`.
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    pub evaluated_at: DateTime<Utc>,
}

impl Verdict {
    /// Number of findings the verdict accounts for.
    pub fn total_findings(&self) -> usize {
        self.violations.len() + self.sampled_out.len() + self.skipped.len()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedFinding> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }

    /// Whether the informational score reaches `minScore`. `None` when the
    /// policy sets no minimum.
    pub fn meets_min_score(&self) -> Option<bool> {
        self.min_score.map(|min| f64::from(self.score) >= min)
    }
}

// ── Evaluator ───────────────────────────────────────────────────────

/// Evaluates findings against a policy. Never fails: every anomaly is
/// absorbed into the verdict.
pub struct Evaluator<'a> {
    registry: &'a RuleRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn evaluate(
        &self,
        policy: &PolicyDocument,
        findings: &[Finding],
        exceptions: &[ExceptionRequest],
        rng: &mut dyn RandomSource,
    ) -> Verdict {
        self.evaluate_at(policy, findings, exceptions, rng, Utc::now())
    }

    /// Same as [`Evaluator::evaluate`] with a fixed evaluation time, which
    /// also decides exception expiry.
    pub fn evaluate_at(
        &self,
        policy: &PolicyDocument,
        findings: &[Finding],
        exceptions: &[ExceptionRequest],
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Verdict {
        let env = policy.environment_name();
        let sample_rate = policy.sample_rate();
        let excepted = self.excepted_rules(policy, exceptions, now);

        let mut violations = Vec::new();
        let mut sampled_out = Vec::new();
        let mut skipped = Vec::new();
        let mut penalty: u32 = 0;

        for finding in findings {
            let Some(rule) = self.registry.find(&finding.rule_id) else {
                warn!(
                    environment = %env,
                    rule_id = %finding.rule_id,
                    "finding references unknown rule, forcing critical violation"
                );
                penalty = penalty.saturating_add(Severity::Critical.weight());
                violations.push(Violation {
                    finding: finding.clone(),
                    effective_severity: Severity::Critical,
                    rule_enabled: true,
                    unknown_rule: true,
                });
                continue;
            };

            let effective = policy.effective_rule(rule);
            if !effective.enabled {
                debug!(rule_id = %finding.rule_id, "rule disabled, skipping finding");
                skipped.push(SkippedFinding {
                    finding: finding.clone(),
                    reason: SkipReason::RuleDisabled,
                });
                continue;
            }

            if let Some(rate) = sample_rate {
                if rng.next_unit() >= rate {
                    debug!(rule_id = %finding.rule_id, rate, "finding sampled out");
                    sampled_out.push(finding.clone());
                    continue;
                }
            }

            if excepted.contains(finding.rule_id.as_str()) {
                debug!(rule_id = %finding.rule_id, "approved exception applies");
                skipped.push(SkippedFinding {
                    finding: finding.clone(),
                    reason: SkipReason::ExceptionApproved,
                });
                continue;
            }

            let severity = finding.observed_severity.unwrap_or(effective.severity);
            penalty = penalty.saturating_add(severity.weight());

            if severity >= policy.fail_on_severity() {
                debug!(rule_id = %finding.rule_id, severity = %severity, "violation");
                violations.push(Violation {
                    finding: finding.clone(),
                    effective_severity: severity,
                    rule_enabled: true,
                    unknown_rule: false,
                });
            } else {
                debug!(rule_id = %finding.rule_id, severity = %severity, "below threshold");
                skipped.push(SkippedFinding {
                    finding: finding.clone(),
                    reason: SkipReason::BelowThreshold,
                });
            }
        }

        // Stable sort keeps input order among identical keys.
        violations.sort_by(|a, b| {
            b.effective_severity
                .cmp(&a.effective_severity)
                .then_with(|| a.finding.rule_id.cmp(&b.finding.rule_id))
        });

        let passed = violations.is_empty() || !policy.mode().is_blocking();
        let score = MAX_SCORE.saturating_sub(penalty);

        info!(
            environment = %env,
            mode = %policy.mode(),
            passed,
            violations = violations.len(),
            sampled_out = sampled_out.len(),
            skipped = skipped.len(),
            score,
            "evaluation complete"
        );

        Verdict {
            environment_name: env.to_string(),
            mode: policy.mode(),
            fail_on_severity: policy.fail_on_severity(),
            passed,
            violations,
            sampled_out,
            skipped,
            score,
            min_score: policy.min_score(),
            evaluated_at: now,
        }
    }

    /// Rule ids whose findings an exception suppresses for this evaluation.
    fn excepted_rules<'e>(
        &self,
        policy: &PolicyDocument,
        exceptions: &'e [ExceptionRequest],
        now: DateTime<Utc>,
    ) -> HashSet<&'e str> {
        if !policy.requires_exception_approval() {
            if !exceptions.is_empty() {
                debug!(
                    count = exceptions.len(),
                    "exceptions not permitted by policy, ignoring"
                );
            }
            return HashSet::new();
        }

        let env = policy.environment_name();
        exceptions
            .iter()
            .filter(|exc| {
                if !exc.approved {
                    debug!(rule_id = %exc.rule_id, "exception not approved");
                    return false;
                }
                if !exc.is_active_for(env, now) {
                    debug!(rule_id = %exc.rule_id, environment = %env, "exception out of scope or expired");
                    return false;
                }
                match self.registry.find(&exc.rule_id) {
                    Some(rule) if rule.allow_exception => true,
                    Some(_) => {
                        warn!(rule_id = %exc.rule_id, "rule does not accept exceptions");
                        false
                    }
                    None => {
                        warn!(rule_id = %exc.rule_id, "exception references unknown rule");
                        false
                    }
                }
            })
            .map(|exc| exc.rule_id.as_str())
            .collect()
    }
}
