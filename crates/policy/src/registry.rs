//! Canonical rule catalog.
//!
//! The registry is append-only: rules can be registered and looked up but
//! never removed, so a populated registry can be shared read-only across
//! concurrent evaluations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use mobguard_core::Severity;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::suggest::{fuzzy_match, is_dotted_rule_id};

/// A named security check with its default severity and enabled state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(alias = "ruleId")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub description: String,
    pub default_severity: Severity,
    #[serde(default = "default_true")]
    pub default_enabled: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remediation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Whether an approved exception may suppress this rule's findings.
    #[serde(default = "default_true")]
    pub allow_exception: bool,
}

fn default_true() -> bool {
    true
}

impl RuleDefinition {
    pub fn new(id: impl Into<String>, default_severity: Severity, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: description.into(),
            default_severity,
            default_enabled: true,
            remediation: String::new(),
            tags: Vec::new(),
            allow_exception: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.default_enabled = false;
        self
    }

    pub fn without_exceptions(mut self) -> Self {
        self.allow_exception = false;
        self
    }
}

/// On-disk `rules.yaml` catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesFile {
    #[serde(default, rename = "version")]
    _version: Option<u32>,
    rules: Vec<RuleDefinition>,
}

/// Holds every known [`RuleDefinition`] keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, RuleDefinition>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Fails if the id is malformed or already registered.
    pub fn register(&mut self, rule: RuleDefinition) -> Result<()> {
        if !is_dotted_rule_id(&rule.id) {
            return Err(PolicyError::InvalidRuleId { id: rule.id });
        }
        if self.rules.contains_key(&rule.id) {
            return Err(PolicyError::DuplicateRule { id: rule.id });
        }
        debug!(rule_id = %rule.id, severity = %rule.default_severity, "registered rule");
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Look up a rule by id. Unknown ids carry a closest-match suggestion.
    pub fn get(&self, id: &str) -> Result<&RuleDefinition> {
        self.rules.get(id).ok_or_else(|| self.unknown(id))
    }

    /// Plain lookup without building an error.
    pub fn find(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// All rules, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn unknown(&self, id: &str) -> PolicyError {
        PolicyError::UnknownRule {
            id: id.to_string(),
            suggestion: fuzzy_match(id, self.ids()).map(str::to_string),
        }
    }

    /// Build a registry from a `rules.yaml` document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: RulesFile = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        for rule in file.rules {
            registry.register(rule)?;
        }
        Ok(registry)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| PolicyError::io(path, e))?;
        Self::from_yaml(&contents)
    }

    /// The built-in mobile catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in builtin_rules() {
            // Built-in ids are unique and well-formed; a failure here is a
            // catalog bug caught by `builtin_catalog_is_consistent`.
            if let Err(e) = registry.register(rule) {
                tracing::error!(error = %e, "skipping malformed built-in rule");
            }
        }
        registry
    }
}

fn builtin_rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new(
            "mobile.android.cleartext.disabled",
            Severity::High,
            "Android apps must not permit cleartext network traffic.",
        )
        .with_title("Cleartext traffic disabled")
        .with_remediation("Set android:usesCleartextTraffic=\"false\" and use a network security config.")
        .with_tags(&["mobile", "android", "network"]),
        RuleDefinition::new(
            "mobile.debug.disabled",
            Severity::Medium,
            "Production mobile builds must not ship with debugging enabled.",
        )
        .with_title("Release build without debug")
        .with_remediation("Ensure release build types disable debugging and never set debuggable=true.")
        .with_tags(&["mobile", "release-hardening"])
        .without_exceptions(),
        RuleDefinition::new(
            "mobile.ios.ats.required",
            Severity::High,
            "iOS apps must keep App Transport Security enabled.",
        )
        .with_title("App Transport Security required")
        .with_remediation("Remove NSAllowsArbitraryLoads or scope exceptions to specific domains.")
        .with_tags(&["mobile", "ios", "network"]),
        RuleDefinition::new(
            "mobile.android.allow-backup-enabled",
            Severity::Medium,
            "android:allowBackup=true lets app data be extracted via adb backup.",
        )
        .with_title("Backup allowed")
        .with_remediation("Set android:allowBackup=\"false\" or define explicit backup rules.")
        .with_tags(&["mobile", "android", "storage"]),
        RuleDefinition::new(
            "mobile.android.cleartext-traffic-enabled",
            Severity::High,
            "The manifest enables cleartext HTTP traffic.",
        )
        .with_title("Cleartext traffic enabled")
        .with_remediation("Remove android:usesCleartextTraffic=\"true\" from the manifest.")
        .with_tags(&["mobile", "android", "network"]),
        RuleDefinition::new(
            "mobile.android.debuggable-enabled",
            Severity::High,
            "The manifest marks the application as debuggable.",
        )
        .with_title("Debuggable application")
        .with_remediation("Remove android:debuggable=\"true\" from the manifest.")
        .with_tags(&["mobile", "android", "release-hardening"])
        .without_exceptions(),
        RuleDefinition::new(
            "mobile.android.hardcoded-fake-secret",
            Severity::Medium,
            "A secret-looking literal is embedded in the Android sources.",
        )
        .with_title("Hardcoded secret")
        .with_remediation("Move secrets to a secure store or inject them at build time.")
        .with_tags(&["mobile", "android", "secrets"]),
        RuleDefinition::new(
            "mobile.ios.ats.arbitrary-loads-enabled",
            Severity::Critical,
            "Info.plist sets NSAllowsArbitraryLoads=true.",
        )
        .with_title("ATS arbitrary loads enabled")
        .with_remediation("Drop NSAllowsArbitraryLoads and use per-domain exceptions if unavoidable.")
        .with_tags(&["mobile", "ios", "network"]),
        RuleDefinition::new(
            "mobile.ios.hardcoded-fake-secret",
            Severity::High,
            "A secret-looking literal is embedded in the iOS sources.",
        )
        .with_title("Hardcoded secret")
        .with_remediation("Move secrets to the Keychain or inject them at build time.")
        .with_tags(&["mobile", "ios", "secrets"]),
    ]
}
