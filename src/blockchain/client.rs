//! Ledger RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Submit transactions and block until they confirm or error
//! - Query account existence and data
//! - Enumerate program accounts owned by an authority
//!
//! [`Ledger`] is the seam the deploy, mint and withdraw flows are written
//! against; [`RpcLedger`] is the network-backed implementation.

use async_trait::async_trait;
use solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::time::Duration;

use crate::blockchain::program::AUTHORITY_OFFSET;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::ClusterConfig;

/// A program account and its current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedAccount {
    pub address: Pubkey,
    pub lamports: u64,
}

/// Operations the tool needs from the ledger network.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Sign `instructions` with `signers`, submit them as one transaction and
    /// wait for confirmation.
    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> BlockchainResult<Signature>;

    /// Fetch an account, `None` when it does not exist.
    async fn get_account(&self, address: &Pubkey) -> BlockchainResult<Option<Account>>;

    /// Whether an account exists at `address`.
    async fn account_exists(&self, address: &Pubkey) -> BlockchainResult<bool> {
        Ok(self.get_account(address).await?.is_some())
    }

    /// Minimum balance for an account of `size` bytes to be rent exempt.
    async fn minimum_balance_for_rent_exemption(&self, size: usize) -> BlockchainResult<u64>;

    /// All accounts of `program` whose authority field equals `authority`.
    async fn program_accounts_by_authority(
        &self,
        program: &Pubkey,
        authority: &Pubkey,
    ) -> BlockchainResult<Vec<OwnedAccount>>;
}

/// [`Ledger`] backed by a JSON-RPC endpoint.
pub struct RpcLedger {
    rpc: RpcClient,
    rpc_url: String,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    /// Create a client for `rpc_url` using the cluster timeout and commitment.
    pub fn new(rpc_url: String, cluster: &ClusterConfig) -> Self {
        let commitment = cluster.commitment_config();
        let rpc = RpcClient::new_with_timeout_and_commitment(
            rpc_url.clone(),
            Duration::from_secs(cluster.rpc_timeout_secs),
            commitment,
        );

        tracing::info!(
            rpc_url = %rpc_url,
            timeout_secs = cluster.rpc_timeout_secs,
            commitment = ?commitment.commitment,
            "Ledger client initialized"
        );

        Self {
            rpc,
            rpc_url,
            commitment,
        }
    }

    /// Endpoint this client talks to.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> BlockchainResult<Signature> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("latest blockhash: {}", e)))?;

        let mut tx = Transaction::new_with_payer(instructions, Some(payer));
        tx.try_sign(signers, blockhash)
            .map_err(|e| BlockchainError::Signing(e.to_string()))?;

        let signature = self
            .rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| BlockchainError::Transaction(e.to_string()))?;

        tracing::debug!(signature = %signature, instructions = instructions.len(), "Transaction confirmed");
        Ok(signature)
    }

    async fn get_account(&self, address: &Pubkey) -> BlockchainResult<Option<Account>> {
        self.rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map(|response| response.value)
            .map_err(|e| BlockchainError::Rpc(format!("get account {}: {}", address, e)))
    }

    async fn minimum_balance_for_rent_exemption(&self, size: usize) -> BlockchainResult<u64> {
        self.rpc
            .get_minimum_balance_for_rent_exemption(size)
            .await
            .map_err(|e| BlockchainError::Rpc(format!("rent exemption for {} bytes: {}", size, e)))
    }

    async fn program_accounts_by_authority(
        &self,
        program: &Pubkey,
        authority: &Pubkey,
    ) -> BlockchainResult<Vec<OwnedAccount>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                AUTHORITY_OFFSET,
                authority.as_ref(),
            ))]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                // only balances are needed
                data_slice: Some(UiDataSliceConfig {
                    offset: 0,
                    length: 0,
                }),
                commitment: Some(self.commitment),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .rpc
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(|e| BlockchainError::Rpc(format!("program accounts of {}: {}", program, e)))?;

        Ok(accounts
            .into_iter()
            .map(|(address, account)| OwnedAccount {
                address,
                lamports: account.lamports,
            })
            .collect())
    }
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("rpc_url", &self.rpc_url)
            .field("commitment", &self.commitment.commitment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        // Construction does not touch the network
        let cluster = ClusterConfig::default();
        let ledger = RpcLedger::new("http://127.0.0.1:8899".to_string(), &cluster);
        assert_eq!(ledger.rpc_url(), "http://127.0.0.1:8899");
        assert!(format!("{:?}", ledger).contains("127.0.0.1:8899"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_rpc_error() {
        let mut cluster = ClusterConfig::default();
        cluster.rpc_timeout_secs = 1;
        // Port 9 (discard) is not an RPC server
        let ledger = RpcLedger::new("http://127.0.0.1:9".to_string(), &cluster);

        let result = ledger.minimum_balance_for_rent_exemption(128).await;
        assert!(matches!(result, Err(BlockchainError::Rpc(_))));
    }
}
