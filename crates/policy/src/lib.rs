//! Mobile security policy engine.
//!
//! This crate provides:
//! - A rule registry with built-in and YAML-loaded catalogs
//! - Layered policy loading (defaults + environment overlay) with typed directives
//! - Finding evaluation with sampling, exceptions, and mode-aware verdicts
//! - Stable report rendering and environment-to-environment policy diffs

pub mod diff;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod exceptions;
pub mod loader;
pub mod registry;
pub mod report;
pub mod schema;
mod suggest;

pub use diff::{diff_policies, ChangeStatus, DirectiveChange, PolicyDiff, RuleChange};
pub use document::{Directive, EffectiveRule, PolicyDocument, RuleOverride};
pub use error::{PolicyError, Result};
pub use evaluator::{
    Evaluator, RandomSource, SeededSampler, SkipReason, SkippedFinding, Verdict, Violation,
};
pub use exceptions::{ExceptionRequest, ExceptionsFile};
pub use loader::PolicyLoader;
pub use registry::{RuleDefinition, RuleRegistry};
pub use report::ReportFormatter;
pub use schema::{DirectiveKind, DirectiveValue, Mode, PolicyFile, RawConfig, RawRuleOverride};
