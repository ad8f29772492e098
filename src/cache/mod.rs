//! Deployment progress cache.
//!
//! # Data Flow
//! ```text
//! deploy run
//!     → store.rs load(env, cache name)   (modern file, then legacy name)
//!     → state.rs DeploymentState          (record identity + item map)
//!     → uploader marks confirmed groups on-chain
//!     → store.rs save                      (full overwrite after every group)
//! ```
//!
//! The cache is the only thing that makes a deploy resumable: a rerun
//! repeats exactly the groups it does not record as on-chain.

pub mod state;
pub mod store;

pub use state::{DeploymentRecord, DeploymentState, ItemRecord};
pub use store::{CacheError, CacheStore, FileCacheStore, MemoryCacheStore};
