//! Configuration
//!
//! Environment-based configuration for the stream trigger.

mod settings;

pub use settings::{ConfigError, Credentials, Environment, TriggerConfig};
