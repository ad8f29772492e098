//! Candy machine operator library.
//!
//! Deploys a configuration record, uploads its item catalogue resumably,
//! mints single items and sweeps record balances back to the authority.

pub mod blockchain;
pub mod cache;
pub mod config;
pub mod deploy;
pub mod mint;
pub mod observability;
pub mod withdraw;

pub use blockchain::{AddressDeriver, Ledger, RpcLedger};
pub use cache::{CacheStore, DeploymentState, FileCacheStore, MemoryCacheStore};
pub use config::ToolConfig;
pub use deploy::{ConfigUploader, DeploymentOrchestrator};
pub use mint::{mint_one, MintTransactionBuilder};
pub use withdraw::WithdrawalSweeper;
