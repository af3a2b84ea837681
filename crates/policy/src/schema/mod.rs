//! Raw policy schema types with serde deserialization.
//!
//! Defines the untyped input side of policy loading:
//! - `RawConfig`: one policy layer (defaults or an environment overlay)
//! - `PolicyFile`: YAML container holding `defaults` plus named `envs`
//! - `DirectiveValue`: typed directive value parsed from raw scalar text
//! - `Mode`: blocking behavior of a policy

mod directive;
mod file;
mod mode;
mod raw;

pub use directive::*;
pub use file::*;
pub use mode::*;
pub use raw::*;
