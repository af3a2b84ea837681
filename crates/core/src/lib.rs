pub mod config;
pub mod error;
pub mod finding;
pub mod severity;

pub use config::{Config, OutputFormat};
pub use error::*;
pub use finding::*;
pub use severity::*;
