//! Layer merging: the overlay wins per key, for directives and for whole rule
//! override entries alike.

use std::collections::BTreeMap;

use mobguard_core::Severity;
use tracing::{debug, warn};

use crate::document::{
    Directive, RuleOverride, ALLOW_DEMO_CLEARTEXT, MIN_SCORE, REQUIRE_APPROVAL_FOR_EXCEPTIONS,
    REQUIRE_EXCEPTION_APPROVAL_ALIAS, REQUIRE_TLS_EVERYWHERE, SAMPLE_RATE,
};
use crate::error::{PolicyError, Result};
use crate::registry::RuleRegistry;
use crate::schema::{DirectiveKind, DirectiveValue, RawRuleOverride};

/// Directives whose type is fixed regardless of what the layers say.
const WELL_KNOWN: &[(&str, DirectiveKind)] = &[
    (MIN_SCORE, DirectiveKind::Number),
    (SAMPLE_RATE, DirectiveKind::Number),
    (REQUIRE_APPROVAL_FOR_EXCEPTIONS, DirectiveKind::Bool),
    (ALLOW_DEMO_CLEARTEXT, DirectiveKind::Bool),
    (REQUIRE_TLS_EVERYWHERE, DirectiveKind::Bool),
];

/// Rewrite alias keys to their canonical name within one layer.
///
/// When a layer carries both spellings the canonical key wins.
pub(super) fn normalize_aliases(
    source: &str,
    directives: &BTreeMap<String, serde_yaml::Value>,
) -> BTreeMap<String, serde_yaml::Value> {
    let mut normalized = directives.clone();
    if let Some(alias_value) = normalized.remove(REQUIRE_EXCEPTION_APPROVAL_ALIAS) {
        if normalized.contains_key(REQUIRE_APPROVAL_FOR_EXCEPTIONS) {
            warn!(
                layer = %source,
                alias = REQUIRE_EXCEPTION_APPROVAL_ALIAS,
                canonical = REQUIRE_APPROVAL_FOR_EXCEPTIONS,
                "both directive spellings present, ignoring alias"
            );
        } else {
            normalized.insert(REQUIRE_APPROVAL_FOR_EXCEPTIONS.to_string(), alias_value);
        }
    }
    normalized
}

/// Type one YAML scalar. Bools and numbers keep their YAML type; strings go
/// through the same text typing a flat key/value source gets.
fn type_scalar(key: &str, value: &serde_yaml::Value) -> Result<DirectiveValue> {
    match value {
        serde_yaml::Value::Bool(b) => Ok(DirectiveValue::Bool(*b)),
        serde_yaml::Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => Ok(DirectiveValue::Number(f)),
            _ => Err(PolicyError::InvalidDirective {
                key: key.to_string(),
                reason: format!("number must be finite, got {n}"),
            }),
        },
        serde_yaml::Value::String(s) => Ok(DirectiveValue::parse(s)),
        _ => Err(PolicyError::InvalidDirective {
            key: key.to_string(),
            reason: "expected a bool, number or string scalar".to_string(),
        }),
    }
}

/// Type one layer's directives.
pub(super) fn type_directives(
    directives: &BTreeMap<String, serde_yaml::Value>,
) -> Result<BTreeMap<String, DirectiveValue>> {
    directives
        .iter()
        .map(|(key, raw)| Ok((key.clone(), type_scalar(key, raw)?)))
        .collect()
}

/// Merge typed directive layers in order. Later layers replace earlier values
/// per key; the first layer to define a key fixes its type.
pub(super) fn merge_directives(
    layers: &[(&str, BTreeMap<String, DirectiveValue>)],
) -> Result<BTreeMap<String, Directive>> {
    let mut merged: BTreeMap<String, Directive> = BTreeMap::new();

    for (source, directives) in layers {
        for (key, value) in directives {
            if let Some(existing) = merged.get(key) {
                let expected = existing.value.kind();
                if expected != value.kind() {
                    return Err(PolicyError::DirectiveTypeMismatch {
                        key: key.clone(),
                        expected,
                        found: value.kind(),
                    });
                }
            }
            merged.insert(
                key.clone(),
                Directive {
                    value: value.clone(),
                    source: source.to_string(),
                },
            );
        }
    }

    Ok(merged)
}

/// Enforce the fixed types and ranges of recognized directives.
pub(super) fn check_well_known(directives: &BTreeMap<String, Directive>) -> Result<()> {
    for (key, expected) in WELL_KNOWN {
        if let Some(directive) = directives.get(*key) {
            let found = directive.value.kind();
            if found != *expected {
                return Err(PolicyError::DirectiveTypeMismatch {
                    key: key.to_string(),
                    expected: *expected,
                    found,
                });
            }
        }
    }

    if let Some(rate) = directives.get(SAMPLE_RATE).and_then(|d| d.value.as_f64()) {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PolicyError::InvalidDirective {
                key: SAMPLE_RATE.to_string(),
                reason: format!("must be between 0.0 and 1.0, got {rate}"),
            });
        }
    }

    Ok(())
}

/// Merge rule override layers. Every layer is validated in full, then a later
/// layer's entry replaces an earlier one for the same rule id as a whole.
pub(super) fn merge_rule_overrides(
    registry: &RuleRegistry,
    layers: &[(&str, &BTreeMap<String, RawRuleOverride>)],
) -> Result<BTreeMap<String, RuleOverride>> {
    let mut merged: BTreeMap<String, RuleOverride> = BTreeMap::new();

    for (source, overrides) in layers {
        for (rule_id, raw) in overrides.iter() {
            if !registry.contains(rule_id) {
                return Err(registry.unknown(rule_id));
            }

            let severity = raw
                .severity
                .as_deref()
                .map(|s| {
                    s.parse::<Severity>().map_err(|_| PolicyError::InvalidSeverity {
                        key: format!("{source}.ruleOverrides.{rule_id}.severity"),
                        value: s.to_string(),
                    })
                })
                .transpose()?;

            let directives = type_directives(&raw.directives).map_err(|e| match e {
                PolicyError::InvalidDirective { key, reason } => PolicyError::InvalidDirective {
                    key: format!("{source}.ruleOverrides.{rule_id}.directives.{key}"),
                    reason,
                },
                other => other,
            })?;

            if merged.contains_key(rule_id) {
                debug!(rule_id = %rule_id, layer = %source, "rule override replaced");
            }
            merged.insert(
                rule_id.clone(),
                RuleOverride {
                    enabled: raw.enabled,
                    severity,
                    directives,
                },
            );
        }
    }

    Ok(merged)
}
