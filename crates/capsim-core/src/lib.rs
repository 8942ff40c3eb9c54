pub mod config;
pub mod errors;
pub mod types;

pub use config::SimConfig;
pub use errors::{CompositeError, ConfigError, TraceError};
pub use types::*;
