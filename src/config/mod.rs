//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! operator settings (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ToolConfig (endpoints, cache dir, upload batching, program id)
//!
//! configuration input document (JSON)
//!     → loader.rs (parse)
//!     → deployment.rs (validate, scale prices, check payment accounts)
//!     → DeploymentSettings (read once per deploy run)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All operator settings have defaults to allow running without a file
//! - Validation separates syntactic (serde) from semantic checks

pub mod deployment;
pub mod loader;
pub mod schema;
pub mod validation;

pub use deployment::{resolve_deployment, DeploymentSettings, ItemSource, RawDeploymentConfig};
pub use loader::{load_deployment_config, load_tool_config, load_tool_config_or_default, ConfigError};
pub use schema::{CacheConfig, ClusterConfig, ToolConfig, UploadConfig};
