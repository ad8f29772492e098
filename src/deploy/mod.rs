//! Deployment: record creation and bulk item upload.
//!
//! # Data Flow
//! ```text
//! DeploymentSettings + cached DeploymentState
//!     → orchestrator.rs (create record once, persist identity)
//!     → uploader.rs (slices → groups → add_config_lines)
//!     → CacheStore::save after every confirmed group
//!     → DeployReport (success = no failed group)
//! ```

pub mod orchestrator;
pub mod uploader;

pub use orchestrator::{DeployError, DeployPhase, DeployReport, DeploymentOrchestrator};
pub use uploader::{ConfigUploader, GroupFailure, UploadError, UploadReport};
