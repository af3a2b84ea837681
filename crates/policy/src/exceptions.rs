//! Exception requests that may suppress a rule's findings for one evaluation.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// A request to waive a rule's findings.
///
/// Exceptions only have an effect when the policy's
/// `requireApprovalForExceptions` directive is true, and then only when
/// `approved` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExceptionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_id: Option<String>,
    pub rule_id: String,
    #[serde(alias = "reason")]
    pub justification: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Environments the exception covers. Empty means every environment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    /// Last day (UTC, inclusive) the exception is valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

impl ExceptionRequest {
    pub fn new(rule_id: impl Into<String>, justification: impl Into<String>) -> Self {
        Self {
            exception_id: None,
            rule_id: rule_id.into(),
            justification: justification.into(),
            approved: false,
            approved_by: None,
            environments: Vec::new(),
            expires_on: None,
        }
    }

    pub fn approve(mut self, approver: impl Into<String>) -> Self {
        self.approved = true;
        self.approved_by = Some(approver.into());
        self
    }

    pub fn for_environments(mut self, envs: &[&str]) -> Self {
        self.environments = envs.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn expiring(mut self, date: NaiveDate) -> Self {
        self.expires_on = Some(date);
        self
    }

    /// Whether the exception is in scope for `environment` and not expired at `now`.
    ///
    /// Approval is checked separately by the evaluator.
    pub fn is_active_for(&self, environment: &str, now: DateTime<Utc>) -> bool {
        if !self.environments.is_empty() && !self.environments.iter().any(|e| e == environment) {
            return false;
        }
        match self.expires_on {
            Some(last_day) => now.date_naive() <= last_day,
            None => true,
        }
    }
}

/// Contents of `exceptions.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExceptionsFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub exceptions: Vec<ExceptionRequest>,
}

fn default_version() -> u32 {
    1
}

impl ExceptionsFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| PolicyError::io(path, e))?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn parse_exceptions_file() {
        let yaml = r#"
version: 1
exceptions:
  - exceptionId: EXC-1
    ruleId: mobile.android.cleartext.disabled
    reason: Legacy staging backend without TLS
    approved: true
    approvedBy: security-team
    environments: [staging]
    expiresOn: 2026-12-31
  - ruleId: mobile.ios.ats.required
    justification: Pending review
"#;
        let file = ExceptionsFile::from_yaml(yaml).unwrap();
        assert_eq!(file.exceptions.len(), 2);

        let first = &file.exceptions[0];
        assert_eq!(first.exception_id.as_deref(), Some("EXC-1"));
        assert_eq!(first.justification, "Legacy staging backend without TLS");
        assert!(first.approved);
        assert_eq!(first.environments, vec!["staging"]);
        assert_eq!(first.expires_on, NaiveDate::from_ymd_opt(2026, 12, 31));

        let second = &file.exceptions[1];
        assert!(!second.approved);
        assert!(second.environments.is_empty());
    }

    #[test]
    fn environment_scope() {
        let now = at(2026, 10, 16, 12);
        let scoped = ExceptionRequest::new("mobile.debug.disabled", "r").for_environments(&["dev", "staging"]);
        assert!(scoped.is_active_for("dev", now));
        assert!(!scoped.is_active_for("prod", now));

        let global = ExceptionRequest::new("mobile.debug.disabled", "r");
        assert!(global.is_active_for("prod", now));
    }

    #[test]
    fn expiry_is_inclusive_of_last_day() {
        let last_day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let exc = ExceptionRequest::new("mobile.debug.disabled", "r").expiring(last_day);

        assert!(exc.is_active_for("prod", at(2026, 10, 16, 0)));
        assert!(exc.is_active_for("prod", at(2026, 10, 16, 23)));
        assert!(!exc.is_active_for("prod", at(2026, 10, 17, 0)));
    }

    #[test]
    fn approve_sets_approver() {
        let exc = ExceptionRequest::new("mobile.debug.disabled", "r").approve("alice");
        assert!(exc.approved);
        assert_eq!(exc.approved_by.as_deref(), Some("alice"));
    }
}
