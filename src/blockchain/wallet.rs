//! Signing-key loading.
//!
//! # Security
//! - Keys are read from a JSON keypair file (array of 64 bytes)
//! - Secret bytes are never logged or serialized; only the public key is

use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use std::path::Path;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Load the operator keypair from `path`.
pub fn load_keypair(path: &Path) -> BlockchainResult<Keypair> {
    let keypair = read_keypair_file(path).map_err(|e| {
        BlockchainError::Wallet(format!("Failed to read keypair {}: {}", path.display(), e))
    })?;

    tracing::info!(pubkey = %keypair.pubkey(), "Wallet loaded");
    Ok(keypair)
}
