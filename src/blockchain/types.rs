//! Chain-specific types, well-known program ids and error definitions.

use solana_sdk::{pubkey, pubkey::Pubkey};
use thiserror::Error;

/// Default id of the collectible-minting program.
pub const CANDY_MACHINE_PROGRAM_ID: Pubkey = pubkey!("mkwGBRGbNv8aWekyAx8Af5ebXaQr5UeJFZnxgUqcZ7B");

/// Token Metadata program.
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Lamports per whole native currency unit.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction was submitted but did not confirm successfully.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Signing the transaction failed (missing or mismatched signer).
    #[error("Signing error: {0}")]
    Signing(String),

    /// Invalid keypair file or key material.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// A string could not be parsed as an address.
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// Instruction payload could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Account data did not match the expected layout.
    #[error("Decoding error for account {account}: {reason}")]
    Decode { account: Pubkey, reason: String },

    /// Expected account is absent from the ledger.
    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),
}

/// Result type for ledger operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Parse a base58 address, reporting failures as [`BlockchainError::InvalidAddress`].
pub fn parse_address(value: &str) -> BlockchainResult<Pubkey> {
    value
        .trim()
        .parse()
        .map_err(|_| BlockchainError::InvalidAddress(value.to_string()))
}
