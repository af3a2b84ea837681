//! Comparison of two resolved policies, e.g. `staging` against `prod`.

use std::collections::BTreeSet;

use mobguard_core::Severity;
use serde::Serialize;

use crate::document::PolicyDocument;
use crate::registry::RuleRegistry;
use crate::schema::{DirectiveValue, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveChange {
    pub key: String,
    pub status: ChangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_value: Option<DirectiveValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_value: Option<DirectiveValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_source: Option<String>,
}

/// Effective enabled/severity differences for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleChange {
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<(bool, bool)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<(Severity, Severity)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDiff {
    pub base_environment: String,
    pub compare_environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<(Mode, Mode)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_severity: Option<(Severity, Severity)>,
    pub directives: Vec<DirectiveChange>,
    pub rules: Vec<RuleChange>,
}

impl PolicyDiff {
    pub fn changes_detected(&self) -> bool {
        self.mode.is_some()
            || self.fail_on_severity.is_some()
            || !self.directives.is_empty()
            || !self.rules.is_empty()
    }

    /// Human-readable listing, one change per line.
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!(
            "Policy diff: {} -> {}",
            self.base_environment, self.compare_environment
        )];
        if !self.changes_detected() {
            lines.push("  no changes".to_string());
            return lines.join("\n");
        }

        if let Some((from, to)) = self.mode {
            lines.push(format!("  mode: {from} -> {to}"));
        }
        if let Some((from, to)) = self.fail_on_severity {
            lines.push(format!("  failOnSeverity: {from} -> {to}"));
        }
        for change in &self.directives {
            let line = match change.status {
                ChangeStatus::Added => format!(
                    "  + directives.{} = {}",
                    change.key,
                    display(&change.compare_value)
                ),
                ChangeStatus::Removed => format!(
                    "  - directives.{} = {}",
                    change.key,
                    display(&change.base_value)
                ),
                ChangeStatus::Changed => format!(
                    "  ~ directives.{}: {} -> {}",
                    change.key,
                    display(&change.base_value),
                    display(&change.compare_value)
                ),
            };
            lines.push(line);
        }
        for rule in &self.rules {
            if let Some((from, to)) = rule.enabled {
                lines.push(format!("  ~ {}.enabled: {from} -> {to}", rule.rule_id));
            }
            if let Some((from, to)) = rule.severity {
                lines.push(format!("  ~ {}.severity: {from} -> {to}", rule.rule_id));
            }
        }
        lines.join("\n")
    }
}

fn display(value: &Option<DirectiveValue>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Compare two policies. Directive changes are sorted by key and rule
/// changes by rule id; only rules whose effective state differs appear.
pub fn diff_policies(
    base: &PolicyDocument,
    compare: &PolicyDocument,
    registry: &RuleRegistry,
) -> PolicyDiff {
    let mode = (base.mode() != compare.mode()).then(|| (base.mode(), compare.mode()));
    let fail_on_severity = (base.fail_on_severity() != compare.fail_on_severity())
        .then(|| (base.fail_on_severity(), compare.fail_on_severity()));

    let keys: BTreeSet<&String> = base
        .directives()
        .keys()
        .chain(compare.directives().keys())
        .collect();

    let directives = keys
        .into_iter()
        .filter_map(|key| {
            let before = base.directives().get(key);
            let after = compare.directives().get(key);
            let status = match (before, after) {
                (None, Some(_)) => ChangeStatus::Added,
                (Some(_), None) => ChangeStatus::Removed,
                (Some(b), Some(a)) if b.value != a.value => ChangeStatus::Changed,
                _ => return None,
            };
            Some(DirectiveChange {
                key: key.clone(),
                status,
                base_value: before.map(|d| d.value.clone()),
                compare_value: after.map(|d| d.value.clone()),
                base_source: before.map(|d| d.source.clone()),
                compare_source: after.map(|d| d.source.clone()),
            })
        })
        .collect();

    let rules = registry
        .all()
        .filter_map(|rule| {
            let before = base.effective_rule(rule);
            let after = compare.effective_rule(rule);
            let enabled = (before.enabled != after.enabled).then_some((before.enabled, after.enabled));
            let severity =
                (before.severity != after.severity).then_some((before.severity, after.severity));
            (enabled.is_some() || severity.is_some()).then(|| RuleChange {
                rule_id: rule.id.clone(),
                enabled,
                severity,
            })
        })
        .collect();

    PolicyDiff {
        base_environment: base.environment_name().to_string(),
        compare_environment: compare.environment_name().to_string(),
        mode,
        fail_on_severity,
        directives,
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::PolicyLoader;
    use crate::schema::RawConfig;

    fn base() -> RawConfig {
        RawConfig::default()
            .with_mode("warn")
            .with_directive("minScore", "60")
            .with_directive("networkProfile", "relaxed")
            .with_directive("allowDemoCleartext", "true")
    }

    #[test]
    fn identical_policies_have_no_changes() {
        let registry = RuleRegistry::builtin();
        let loader = PolicyLoader::new(&registry);
        let a = loader.load("dev", &base(), None).unwrap();
        let b = loader.load("dev", &base(), None).unwrap();

        let diff = diff_policies(&a, &b, &registry);
        assert!(!diff.changes_detected());
        assert!(diff.to_text().ends_with("no changes"));
    }

    #[test]
    fn detects_scalar_directive_and_rule_changes() {
        let registry = RuleRegistry::builtin();
        let loader = PolicyLoader::new(&registry);
        let staging = loader.load("staging", &base(), None).unwrap();
        let prod_overlay = RawConfig::default()
            .with_mode("enforce")
            .with_fail_on_severity("medium")
            .with_directive("minScore", "95")
            .with_directive("requireTlsEverywhere", "true")
            .with_rule_override("mobile.debug.disabled", None, Some("critical"))
            .with_rule_override("mobile.android.allow-backup-enabled", Some(false), None);
        let mut prod_base = base();
        prod_base.directives.remove("allowDemoCleartext");
        let prod = loader.load("prod", &prod_base, Some(&prod_overlay)).unwrap();

        let diff = diff_policies(&staging, &prod, &registry);

        assert!(diff.changes_detected());
        assert_eq!(diff.mode, Some((Mode::Warn, Mode::Enforce)));
        assert_eq!(diff.fail_on_severity, Some((Severity::High, Severity::Medium)));

        let summary: Vec<(&str, ChangeStatus)> = diff
            .directives
            .iter()
            .map(|c| (c.key.as_str(), c.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("allowDemoCleartext", ChangeStatus::Removed),
                ("minScore", ChangeStatus::Changed),
                ("requireTlsEverywhere", ChangeStatus::Added),
            ]
        );
        let min_score = &diff.directives[1];
        assert_eq!(min_score.base_source.as_deref(), Some("defaults"));
        assert_eq!(min_score.compare_source.as_deref(), Some("envs.prod"));

        assert_eq!(diff.rules.len(), 2);
        assert_eq!(diff.rules[0].rule_id, "mobile.android.allow-backup-enabled");
        assert_eq!(diff.rules[0].enabled, Some((true, false)));
        assert_eq!(diff.rules[1].rule_id, "mobile.debug.disabled");
        assert_eq!(diff.rules[1].severity, Some((Severity::Medium, Severity::Critical)));

        let text = diff.to_text();
        assert!(text.contains("mode: warn -> enforce"));
        assert!(text.contains("~ directives.minScore: 60 -> 95"));
        assert!(text.contains("+ directives.requireTlsEverywhere = true"));
        assert!(text.contains("- directives.allowDemoCleartext = true"));
        assert!(text.contains("~ mobile.debug.disabled.severity: medium -> critical"));
    }

    #[test]
    fn source_only_change_is_not_a_change() {
        let registry = RuleRegistry::builtin();
        let loader = PolicyLoader::new(&registry);
        let a = loader.load("dev", &base(), None).unwrap();
        let same_value = RawConfig::default().with_directive("minScore", "60");
        let b = loader.load("qa", &base(), Some(&same_value)).unwrap();

        let diff = diff_policies(&a, &b, &registry);
        assert!(diff.directives.is_empty());
    }
}
