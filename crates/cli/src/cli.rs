use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mobguard_core::OutputFormat;

/// Mobile security policy gate.
///
/// Loads a layered policy from a policy directory, evaluates scanner
/// findings against one or more environments and reports a verdict.
#[derive(Parser, Debug)]
#[command(name = "mobguard", version, about = "Mobile security policy gate")]
pub struct CliArgs {
    /// Config profile; keys resolve as {PROFILE}_{KEY} before {KEY}
    #[arg(long, global = true, env = "MOBGUARD_PROFILE")]
    pub profile: Option<String>,

    /// Directory holding policy.yaml, rules.yaml and exceptions.yaml
    #[arg(long, global = true)]
    pub policy_dir: Option<PathBuf>,

    /// Report format for stdout
    #[arg(long, global = true, value_enum)]
    pub format: Option<FormatArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate findings and exit non-zero if any enforced environment fails
    Check {
        /// Environment(s) to evaluate, comma separated
        #[arg(long, value_delimiter = ',')]
        env: Vec<String>,

        /// JSON array of findings produced by a scanner
        #[arg(long)]
        findings: PathBuf,

        /// Base sampling seed; environment N uses seed + N
        #[arg(long)]
        seed: Option<u64>,

        /// Exceptions file (default: <policy-dir>/exceptions.yaml if present)
        #[arg(long)]
        exceptions: Option<PathBuf>,
    },

    /// Print the merged policy for an environment with directive sources
    Preview {
        #[arg(long)]
        env: Option<String>,
    },

    /// Compare the merged policies of two environments
    Diff {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// List the environments defined in policy.yaml
    Envs,

    /// List the rule catalog
    Rules,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}
