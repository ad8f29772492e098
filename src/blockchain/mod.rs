//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! keypair file
//!     → wallet.rs (key loading)
//! record address / mint
//!     → address.rs (program-derived addresses)
//!     → program.rs (record layout, instruction encoders)
//!     → client.rs (submit, confirm, account queries)
//! ```
//!
//! # Security Constraints
//! - Never log secret key material
//! - All RPC calls carry the cluster timeout
//! - Address strings are parsed at the boundary, never inside derivations

pub mod address;
pub mod client;
pub mod program;
pub mod types;
pub mod wallet;

pub use address::AddressDeriver;
pub use client::{Ledger, OwnedAccount, RpcLedger};
pub use types::{BlockchainError, BlockchainResult};
pub use wallet::load_keypair;
