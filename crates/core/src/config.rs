use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Populate the process environment from `.env`, if there is one.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

/// Non-empty value of `{PROFILE}_{KEY}`, else of `{KEY}`.
fn lookup(profile: &str, key: &str) -> Option<String> {
    let scoped = (!profile.is_empty()).then(|| format!("{profile}_{key}"));
    scoped
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(key))
        .find_map(|k| env::var(k).ok().filter(|v| !v.is_empty()))
}

fn lookup_or(profile: &str, key: &str, default: &str) -> String {
    lookup(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parsed lookup. Unparsable values are logged and replaced by `default`.
fn lookup_parsed<T>(profile: &str, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(profile, key).map(|raw| raw.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            tracing::warn!(key, error = %e, "ignoring invalid config value");
            default
        }
        None => default,
    }
}

// ── Output format ─────────────────────────────────────────────

/// Report rendering selected for stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(CoreError::InvalidFormat(other.to_string())),
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upper-cased profile name, empty when none is active.
    pub profile: String,
    /// Directory holding `policy.yaml`, `rules.yaml` and `exceptions.yaml`.
    pub policy_dir: PathBuf,
    /// Environment overlay evaluated when none is given on the command line.
    pub environment: String,
    /// Base seed for sampling decisions.
    pub seed: u64,
    pub format: OutputFormat,
}

impl Config {
    /// Resolve from the process environment using the profile named by
    /// `MOBGUARD_PROFILE` (unset means no profile). Call `load_dotenv()` first.
    pub fn from_env() -> Self {
        let profile = env::var("MOBGUARD_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Resolve every key for `profile`, which is upper-cased first.
    pub fn for_profile(profile: &str) -> Self {
        let profile = profile.trim().to_uppercase();
        let p = profile.as_str();

        Self {
            policy_dir: PathBuf::from(lookup_or(p, "MOBGUARD_POLICY_DIR", ".mobguard")),
            environment: lookup_or(p, "MOBGUARD_ENV", "dev"),
            seed: lookup_parsed(p, "MOBGUARD_SEED", 0),
            format: lookup_parsed(p, "MOBGUARD_FORMAT", OutputFormat::Json),
            profile,
        }
    }

    pub fn profile_label(&self) -> &str {
        match self.profile.as_str() {
            "" => "default",
            named => named,
        }
    }

    pub fn policy_file(&self) -> PathBuf {
        self.policy_dir.join("policy.yaml")
    }

    pub fn rules_file(&self) -> PathBuf {
        self.policy_dir.join("rules.yaml")
    }

    pub fn exceptions_file(&self) -> PathBuf {
        self.policy_dir.join("exceptions.yaml")
    }

    pub fn log_summary(&self) {
        tracing::info!(
            profile = %self.profile_label(),
            policy_dir = %self.policy_dir.display(),
            environment = %self.environment,
            seed = self.seed,
            format = %self.format,
            "config loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global; each test uses its own profile prefix so
    // parallel test threads never observe each other's values.

    #[test]
    fn defaults_when_unset() {
        let config = Config::for_profile("MGTESTDEFAULTS");
        assert_eq!(config.profile_label(), "MGTESTDEFAULTS");
        assert_eq!(config.policy_file(), PathBuf::from(".mobguard/policy.yaml"));
        assert_eq!(config.rules_file(), PathBuf::from(".mobguard/rules.yaml"));
        assert_eq!(config.exceptions_file(), PathBuf::from(".mobguard/exceptions.yaml"));
    }

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("MGTESTPROF_MOBGUARD_ENV", "prod");
        env::set_var("MGTESTPROF_MOBGUARD_SEED", "42");
        env::set_var("MGTESTPROF_MOBGUARD_FORMAT", "text");

        let config = Config::for_profile("mgtestprof");
        assert_eq!(config.profile, "MGTESTPROF");
        assert_eq!(config.environment, "prod");
        assert_eq!(config.seed, 42);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn invalid_seed_falls_back() {
        env::set_var("MGTESTSEED_MOBGUARD_SEED", "not-a-number");
        let config = Config::for_profile("MGTESTSEED");
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
