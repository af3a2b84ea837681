//! Policy loader: merges a base layer with an environment overlay.
//!
//! Directive values are typed on the way in (bool, number, string), alias
//! names are canonicalized, rule override ids are checked against the
//! registry, and the result is frozen into a [`crate::PolicyDocument`].

mod core;
mod merge;


pub use self::core::{PolicyLoader, DEFAULTS_SOURCE};
