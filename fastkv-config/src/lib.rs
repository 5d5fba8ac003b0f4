pub mod config;
pub mod http;

pub use config::{ConfigError, Configurable, expand_env, expand_env_values};
