mod config;
mod error;

pub use config::AppConfig;
pub use error::ConfigError;
