//! A single untyped policy layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// One policy layer as supplied by the config source: either the base
/// (`defaults`) or an environment overlay.
///
/// Values stay untyped here; [`crate::PolicyLoader`] validates and types them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on_severity: Option<String>,
    /// Directive name → raw scalar (YAML bool, number, or string).
    #[serde(default)]
    pub directives: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub rule_overrides: BTreeMap<String, RawRuleOverride>,
}

/// Partial per-rule override inside one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRuleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Rule-scoped parameters, typed like layer directives.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub directives: BTreeMap<String, serde_yaml::Value>,
}

impl RawConfig {
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_fail_on_severity(mut self, severity: impl Into<String>) -> Self {
        self.fail_on_severity = Some(severity.into());
        self
    }

    /// Add a directive as raw text, exactly as a flat key/value source would.
    pub fn with_directive(mut self, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.directives
            .insert(key.into(), serde_yaml::Value::String(raw.into()));
        self
    }

    pub fn with_rule_override(
        mut self,
        rule_id: impl Into<String>,
        enabled: Option<bool>,
        severity: Option<&str>,
    ) -> Self {
        self.rule_overrides.insert(
            rule_id.into(),
            RawRuleOverride {
                enabled,
                severity: severity.map(str::to_string),
                directives: BTreeMap::new(),
            },
        );
        self
    }

    /// Add a rule-scoped directive as raw text, creating the override entry
    /// if needed.
    pub fn with_rule_directive(
        mut self,
        rule_id: impl Into<String>,
        key: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        self.rule_overrides
            .entry(rule_id.into())
            .or_default()
            .directives
            .insert(key.into(), serde_yaml::Value::String(raw.into()));
        self
    }

    /// Parse a flat `key = value` listing into a layer.
    ///
    /// ```text
    /// # comments and blank lines are ignored
    /// mode = enforce
    /// failOnSeverity = high
    /// directives.minScore = 95
    /// directives.platform = "android"
    /// ruleOverrides.mobile.debug.disabled.enabled = false
    /// ruleOverrides.mobile.debug.disabled.severity = low
    /// ruleOverrides.mobile.debug.disabled.directives.maxFindings = 3
    /// ```
    ///
    /// `:` is accepted as separator when a line has no `=`.
    pub fn from_flat_text(text: &str) -> Result<Self> {
        let mut layer = RawConfig::default();

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| PolicyError::Syntax {
                    line: line_no,
                    message: format!("expected 'key = value', got '{}'", line),
                })?;
            let key = key.trim();
            let value = value.trim();

            if key.is_empty() {
                return Err(PolicyError::Syntax {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }

            if key == "mode" {
                layer.mode = Some(value.to_string());
            } else if key == "failOnSeverity" {
                layer.fail_on_severity = Some(value.to_string());
            } else if let Some(name) = key.strip_prefix("directives.") {
                layer
                    .directives
                    .insert(name.to_string(), serde_yaml::Value::String(value.to_string()));
            } else if let Some(rest) = key.strip_prefix("ruleOverrides.") {
                apply_flat_override(&mut layer, rest, value, line_no)?;
            } else {
                return Err(PolicyError::Syntax {
                    line: line_no,
                    message: format!("unrecognized key '{}'", key),
                });
            }
        }

        Ok(layer)
    }
}

/// `rest` is `<rule id>.enabled`, `<rule id>.severity` or
/// `<rule id>.directives.<key>`. Rule ids contain dots, so the field is split
/// off from the right.
fn apply_flat_override(layer: &mut RawConfig, rest: &str, value: &str, line: usize) -> Result<()> {
    if let Some((rule_id, key)) = rest.split_once(".directives.") {
        if rule_id.is_empty() || key.is_empty() {
            return Err(PolicyError::Syntax {
                line,
                message: format!("expected 'ruleOverrides.<rule id>.directives.<key>', got '{}'", rest),
            });
        }
        layer
            .rule_overrides
            .entry(rule_id.to_string())
            .or_default()
            .directives
            .insert(key.to_string(), serde_yaml::Value::String(value.to_string()));
        return Ok(());
    }

    let (rule_id, field) = rest.rsplit_once('.').ok_or_else(|| PolicyError::Syntax {
        line,
        message: format!("expected 'ruleOverrides.<rule id>.<field>', got '{}'", rest),
    })?;

    let entry = layer.rule_overrides.entry(rule_id.to_string()).or_default();
    match field {
        "enabled" => {
            entry.enabled = Some(match value {
                "true" => true,
                "false" => false,
                other => {
                    return Err(PolicyError::Syntax {
                        line,
                        message: format!("'enabled' must be true or false, got '{}'", other),
                    })
                }
            });
        }
        "severity" => entry.severity = Some(value.to_string()),
        other => {
            return Err(PolicyError::Syntax {
                line,
                message: format!("unknown rule override field '{}'", other),
            })
        }
    }
    Ok(())
}
