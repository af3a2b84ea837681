mod cli;
mod commands;
mod workspace;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use mobguard_core::config::load_dotenv;
use mobguard_core::{Config, OutputFormat};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::commands::Output;
use crate::workspace::PolicyWorkspace;

const EXIT_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    load_dotenv();

    // Logs go to stderr; stdout carries only the report.
    let filter = EnvFilter::try_from_env("MOBGUARD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    match run(args) {
        Ok(output) => {
            if !output.stdout.is_empty() {
                println!("{}", output.stdout);
            }
            for line in &output.summaries {
                eprintln!("{line}");
            }
            if output.passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILED)
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: CliArgs) -> Result<Output> {
    let mut config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(dir) = args.policy_dir {
        config.policy_dir = dir;
    }
    if let Some(format) = args.format {
        config.format = OutputFormat::from(format);
    }
    config.log_summary();
    let format = config.format;

    let exceptions_override = match &args.command {
        Command::Check { exceptions, .. } => exceptions.clone(),
        _ => None,
    };
    let ws = PolicyWorkspace::load(&config, exceptions_override.as_deref())?;

    match args.command {
        Command::Check {
            env,
            findings,
            seed,
            exceptions: _,
        } => {
            let environments = if env.is_empty() {
                vec![config.environment.clone()]
            } else {
                env
            };
            let seed = seed.unwrap_or(config.seed);
            info!(environments = ?environments, seed, "running check");
            commands::check(&ws, &environments, &findings, seed, format)
        }
        Command::Preview { env } => {
            let env = env.unwrap_or_else(|| config.environment.clone());
            commands::preview(&ws, &env, format)
        }
        Command::Diff { from, to } => commands::diff(&ws, &from, &to, format),
        Command::Envs => commands::envs(&ws, format),
        Command::Rules => commands::rules(&ws, format),
    }
}
