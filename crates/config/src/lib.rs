//! Configuration loading for the letterbox server.
//!
//! Uses figment to layer serialized defaults, an optional YAML file, and
//! `LETTERBOX_`-prefixed environment variables.

pub mod schema;

pub use schema::{
    Config, CorsConfig, DatabaseConfig, ExportConfig, GoogleConfig, IdentityConfig, LogConfig,
    LogFormat,
};
