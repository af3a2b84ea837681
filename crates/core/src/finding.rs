use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Severity;

/// Evidence that a rule's condition was observed in the artifact under test.
///
/// Produced by an external scanner. `observed_severity` is optional; when
/// absent the evaluator falls back to the rule's effective severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    #[serde(default, alias = "severity", skip_serializing_if = "Option::is_none")]
    pub observed_severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    pub fn new(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            observed_severity: None,
            context: BTreeMap::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.observed_severity = Some(severity);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
