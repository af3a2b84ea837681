//! Core [`PolicyLoader`] struct: turns raw layers into a [`PolicyDocument`].

use std::path::Path;

use mobguard_core::Severity;
use tracing::{debug, info};

use crate::document::PolicyDocument;
use crate::error::{PolicyError, Result};
use crate::registry::RuleRegistry;
use crate::schema::{Mode, PolicyFile, RawConfig};

use super::merge::{
    check_well_known, merge_directives, merge_rule_overrides, normalize_aliases, type_directives,
};

/// Source label of the base layer.
pub const DEFAULTS_SOURCE: &str = "defaults";

const DEFAULT_FAIL_ON_SEVERITY: Severity = Severity::High;

/// Resolves raw policy layers against a [`RuleRegistry`].
///
/// Loading is all-or-nothing: the first invalid value aborts construction and
/// no partial document is ever returned.
pub struct PolicyLoader<'a> {
    registry: &'a RuleRegistry,
}

impl<'a> PolicyLoader<'a> {
    pub fn new(registry: &'a RuleRegistry) -> Self {
        Self { registry }
    }

    /// Merge `base` with an optional environment `overlay`.
    ///
    /// For every key present in the overlay, the overlay's value replaces the
    /// base's. Keys only in the base are kept unchanged.
    pub fn load(
        &self,
        environment: &str,
        base: &RawConfig,
        overlay: Option<&RawConfig>,
    ) -> Result<PolicyDocument> {
        let overlay_source = format!("envs.{environment}");

        let mut layers: Vec<(&str, &RawConfig)> = vec![(DEFAULTS_SOURCE, base)];
        if let Some(overlay) = overlay {
            layers.push((overlay_source.as_str(), overlay));
        }

        // Scalars: validate every layer's value, last one present wins.
        let mut mode = Mode::default();
        let mut fail_on_severity = DEFAULT_FAIL_ON_SEVERITY;
        for (source, layer) in &layers {
            if let Some(raw) = &layer.mode {
                mode = raw.parse().map_err(|_| PolicyError::InvalidMode {
                    layer: source.to_string(),
                    value: raw.clone(),
                })?;
            }
            if let Some(raw) = &layer.fail_on_severity {
                fail_on_severity = raw.parse().map_err(|_| PolicyError::InvalidSeverity {
                    key: format!("{source}.failOnSeverity"),
                    value: raw.clone(),
                })?;
            }
        }

        let typed = layers
            .iter()
            .map(|(source, layer)| {
                let normalized = normalize_aliases(source, &layer.directives);
                type_directives(&normalized).map(|d| (*source, d))
            })
            .collect::<Result<Vec<_>>>()?;
        let directives = merge_directives(&typed)?;
        check_well_known(&directives)?;

        let override_layers: Vec<_> = layers
            .iter()
            .map(|(source, layer)| (*source, &layer.rule_overrides))
            .collect();
        let rule_overrides = merge_rule_overrides(self.registry, &override_layers)?;

        for (key, directive) in &directives {
            debug!(key = %key, value = %directive.value, source = %directive.source, "directive resolved");
        }
        info!(
            environment = %environment,
            mode = %mode,
            fail_on_severity = %fail_on_severity,
            directives = directives.len(),
            rule_overrides = rule_overrides.len(),
            "policy loaded"
        );

        Ok(PolicyDocument::new(
            environment.to_string(),
            mode,
            fail_on_severity,
            directives,
            rule_overrides,
        ))
    }

    /// Resolve a named environment from a policy file.
    pub fn load_environment(&self, file: &PolicyFile, environment: &str) -> Result<PolicyDocument> {
        let overlay = file.overlay(environment)?;
        self.load(environment, &file.defaults, Some(overlay))
    }

    /// Read `policy.yaml` from disk and resolve a named environment.
    pub fn load_path(&self, path: &Path, environment: &str) -> Result<PolicyDocument> {
        let file = PolicyFile::from_path(path)?;
        self.load_environment(&file, environment)
    }
}
