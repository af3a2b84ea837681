//! Error types for registry, policy loading, and catalog parsing.
//!
//! Every variant is raised at load or registration time. Evaluation never
//! fails; anomalies found there are folded into the verdict instead.

use std::path::PathBuf;

use crate::schema::DirectiveKind;

/// Errors that can occur while building a registry or a policy document.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// A rule with the same id is already registered.
    #[error("rule '{id}' is already registered")]
    DuplicateRule { id: String },

    /// A rule id referenced by a policy or lookup is not in the registry.
    #[error("unknown rule '{id}'{}", suggestion_suffix(.suggestion))]
    UnknownRule {
        id: String,
        suggestion: Option<String>,
    },

    /// Rule id is not a dotted namespace of lowercase kebab-case segments.
    #[error("invalid rule id '{id}': expected dotted lowercase segments like 'mobile.debug.disabled'")]
    InvalidRuleId { id: String },

    /// `mode` is not one of audit, warn, enforce.
    #[error("invalid mode '{value}' in {layer} (expected audit, warn or enforce)")]
    InvalidMode { layer: String, value: String },

    /// A severity value is not one of the four levels.
    #[error("invalid severity '{value}' for {key} (expected low, medium, high or critical)")]
    InvalidSeverity { key: String, value: String },

    /// An overlay (or a well-known directive contract) disagrees with the
    /// type fixed for a directive.
    #[error("directive '{key}' must be {expected}, got {found}")]
    DirectiveTypeMismatch {
        key: String,
        expected: DirectiveKind,
        found: DirectiveKind,
    },

    /// A directive has the right type but an unusable value.
    #[error("invalid directive '{key}': {reason}")]
    InvalidDirective { key: String, reason: String },

    /// The requested environment overlay does not exist in the policy file.
    #[error("unknown policy environment '{name}'. Available: {}", available_list(.available))]
    UnknownEnvironment {
        name: String,
        available: Vec<String>,
    },

    /// A flat key/value source contains a line that cannot be parsed.
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Filesystem I/O error.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse/deserialization error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PolicyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PolicyError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

fn available_list(available: &[String]) -> String {
    if available.is_empty() {
        "<none>".to_string()
    } else {
        available.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_rule_message_includes_suggestion() {
        let err = PolicyError::UnknownRule {
            id: "mobile.debug.disabld".to_string(),
            suggestion: Some("mobile.debug.disabled".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown rule 'mobile.debug.disabld' (did you mean 'mobile.debug.disabled'?)"
        );

        let bare = PolicyError::UnknownRule {
            id: "x.y".to_string(),
            suggestion: None,
        };
        assert_eq!(bare.to_string(), "unknown rule 'x.y'");
    }

    #[test]
    fn unknown_environment_lists_available() {
        let err = PolicyError::UnknownEnvironment {
            name: "qa".to_string(),
            available: vec!["dev".to_string(), "prod".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown policy environment 'qa'. Available: dev, prod"
        );

        let none = PolicyError::UnknownEnvironment {
            name: "qa".to_string(),
            available: vec![],
        };
        assert!(none.to_string().ends_with("<none>"));
    }

    #[test]
    fn type_mismatch_names_both_kinds() {
        let err = PolicyError::DirectiveTypeMismatch {
            key: "minScore".to_string(),
            expected: DirectiveKind::Number,
            found: DirectiveKind::String,
        };
        assert_eq!(err.to_string(), "directive 'minScore' must be number, got string");
    }
}
