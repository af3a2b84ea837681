//! Fully merged, validated policy for one environment.

use std::collections::BTreeMap;

use mobguard_core::Severity;
use serde::Serialize;

use crate::registry::RuleDefinition;
use crate::schema::{DirectiveValue, Mode};

/// Canonical name of the exception approval directive.
pub const REQUIRE_APPROVAL_FOR_EXCEPTIONS: &str = "requireApprovalForExceptions";
/// Accepted alias, rewritten to [`REQUIRE_APPROVAL_FOR_EXCEPTIONS`] at load time.
pub const REQUIRE_EXCEPTION_APPROVAL_ALIAS: &str = "requireExceptionApproval";
pub const SAMPLE_RATE: &str = "sampleRate";
pub const MIN_SCORE: &str = "minScore";
pub const ALLOW_DEMO_CLEARTEXT: &str = "allowDemoCleartext";
pub const REQUIRE_TLS_EVERYWHERE: &str = "requireTlsEverywhere";

/// A typed directive plus the layer it came from (`defaults` or `envs.<name>`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directive {
    pub value: DirectiveValue,
    pub source: String,
}

/// Per-rule override as given by the winning layer. `None` fields fall back
/// to the rule's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub directives: BTreeMap<String, DirectiveValue>,
}

/// Effective state of a rule under a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveRule {
    pub enabled: bool,
    pub severity: Severity,
}

/// Immutable policy for one environment.
///
/// Only [`crate::PolicyLoader`] constructs documents, and only after every
/// value has been validated, so holding one means the policy is well-formed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    environment_name: String,
    mode: Mode,
    fail_on_severity: Severity,
    directives: BTreeMap<String, Directive>,
    rule_overrides: BTreeMap<String, RuleOverride>,
}

impl PolicyDocument {
    pub(crate) fn new(
        environment_name: String,
        mode: Mode,
        fail_on_severity: Severity,
        directives: BTreeMap<String, Directive>,
        rule_overrides: BTreeMap<String, RuleOverride>,
    ) -> Self {
        Self {
            environment_name,
            mode,
            fail_on_severity,
            directives,
            rule_overrides,
        }
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn fail_on_severity(&self) -> Severity {
        self.fail_on_severity
    }

    pub fn directives(&self) -> &BTreeMap<String, Directive> {
        &self.directives
    }

    pub fn rule_overrides(&self) -> &BTreeMap<String, RuleOverride> {
        &self.rule_overrides
    }

    pub fn directive(&self, key: &str) -> Option<&DirectiveValue> {
        self.directives.get(key).map(|d| &d.value)
    }

    pub fn rule_override(&self, rule_id: &str) -> Option<&RuleOverride> {
        self.rule_overrides.get(rule_id)
    }

    /// Rule-scoped directives of the override for `rule_id`, if any.
    pub fn rule_directives(&self, rule_id: &str) -> Option<&BTreeMap<String, DirectiveValue>> {
        self.rule_overrides
            .get(rule_id)
            .map(|o| &o.directives)
            .filter(|d| !d.is_empty())
    }

    /// Probability of keeping a finding. `None` means keep everything.
    pub fn sample_rate(&self) -> Option<f64> {
        self.directive(SAMPLE_RATE).and_then(DirectiveValue::as_f64)
    }

    pub fn min_score(&self) -> Option<f64> {
        self.directive(MIN_SCORE).and_then(DirectiveValue::as_f64)
    }

    /// Exceptions only take effect when this directive is true.
    pub fn requires_exception_approval(&self) -> bool {
        self.directive(REQUIRE_APPROVAL_FOR_EXCEPTIONS)
            .and_then(DirectiveValue::as_bool)
            .unwrap_or(false)
    }

    /// Apply this policy's override (if any) over the rule's defaults.
    pub fn effective_rule(&self, rule: &RuleDefinition) -> EffectiveRule {
        let ovr = self.rule_overrides.get(&rule.id);
        EffectiveRule {
            enabled: ovr
                .and_then(|o| o.enabled)
                .unwrap_or(rule.default_enabled),
            severity: ovr
                .and_then(|o| o.severity)
                .unwrap_or(rule.default_severity),
        }
    }
}
