//! Everything loaded from a policy directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mobguard_core::{Config, Finding};
use mobguard_policy::{
    ExceptionRequest, ExceptionsFile, PolicyDocument, PolicyFile, PolicyLoader, RuleRegistry,
};
use tracing::{debug, info};

pub struct PolicyWorkspace {
    pub registry: RuleRegistry,
    pub policy: PolicyFile,
    pub exceptions: Vec<ExceptionRequest>,
}

impl PolicyWorkspace {
    /// Load `policy.yaml` plus the optional `rules.yaml` and `exceptions.yaml`.
    ///
    /// Without `rules.yaml` the built-in catalog is used. `exceptions_override`
    /// replaces the directory's `exceptions.yaml` and must exist.
    pub fn load(config: &Config, exceptions_override: Option<&Path>) -> Result<Self> {
        let rules_path = config.rules_file();
        let registry = if rules_path.exists() {
            RuleRegistry::from_path(&rules_path)
                .with_context(|| format!("failed to load rule catalog {}", rules_path.display()))?
        } else {
            debug!(path = %rules_path.display(), "no rules.yaml, using built-in catalog");
            RuleRegistry::builtin()
        };

        let policy_path = config.policy_file();
        let policy = PolicyFile::from_path(&policy_path)
            .with_context(|| format!("failed to load policy {}", policy_path.display()))?;

        let exceptions = match exceptions_override {
            Some(path) => load_exceptions(path)?,
            None => {
                let default_path = config.exceptions_file();
                if default_path.exists() {
                    load_exceptions(&default_path)?
                } else {
                    Vec::new()
                }
            }
        };

        info!(
            dir = %config.policy_dir.display(),
            rules = registry.len(),
            environments = policy.envs.len(),
            exceptions = exceptions.len(),
            "policy directory loaded"
        );

        Ok(Self {
            registry,
            policy,
            exceptions,
        })
    }

    pub fn resolve(&self, environment: &str) -> Result<PolicyDocument> {
        PolicyLoader::new(&self.registry)
            .load_environment(&self.policy, environment)
            .with_context(|| format!("failed to resolve policy for environment '{environment}'"))
    }
}

fn load_exceptions(path: &Path) -> Result<Vec<ExceptionRequest>> {
    let file = ExceptionsFile::from_path(path)
        .with_context(|| format!("failed to load exceptions {}", path.display()))?;
    Ok(file.exceptions)
}

/// Read a JSON array of findings.
pub fn load_findings(path: &Path) -> Result<Vec<Finding>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read findings {}", path.display()))?;
    let findings: Vec<Finding> = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse findings {}", path.display()))?;
    debug!(count = findings.len(), "findings loaded");
    Ok(findings)
}
