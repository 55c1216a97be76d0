//! Configuration module
//!
//! YAML configuration with defaults for every field. The configuration value
//! is passed explicitly into the gateway, governor and engine; nothing here
//! is process-global.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;


use crate::errors::DocsumError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<DocsumConfig, DocsumError> {
    ConfigLoader::from_file(path).await
}
