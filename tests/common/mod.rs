//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use candy_operator::blockchain::client::{Ledger, OwnedAccount};
use candy_operator::blockchain::program::{config_lines_index, is_withdraw_funds};
use candy_operator::blockchain::types::{BlockchainError, BlockchainResult};
use candy_operator::cache::{DeploymentState, ItemRecord};
use candy_operator::config::UploadConfig;

/// One `send_and_confirm` call, successful or not.
#[derive(Debug, Clone)]
pub struct Submission {
    pub instructions: Vec<Instruction>,
    pub payer: Pubkey,
    pub signers: Vec<Pubkey>,
    pub confirmed: bool,
}

/// In-memory ledger that records submissions and fails on request.
#[derive(Default)]
pub struct MockLedger {
    submissions: Mutex<Vec<Submission>>,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    owned: Mutex<Vec<(Pubkey, OwnedAccount)>>,
    failing_line_starts: Mutex<HashSet<u32>>,
    failing_withdrawals: Mutex<HashSet<Pubkey>>,
    fail_everything: AtomicBool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_config_lines_at(&self, start_index: u32) {
        self.failing_line_starts.lock().unwrap().insert(start_index);
    }

    pub fn fail_withdraw_of(&self, record: Pubkey) {
        self.failing_withdrawals.lock().unwrap().insert(record);
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_everything.store(fail, Ordering::SeqCst);
    }

    pub fn clear_failures(&self) {
        self.failing_line_starts.lock().unwrap().clear();
        self.failing_withdrawals.lock().unwrap().clear();
        self.fail_all(false);
    }

    pub fn put_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(
            address,
            Account {
                lamports: 1_000_000,
                data,
                owner: Pubkey::default(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn own_record(&self, authority: Pubkey, address: Pubkey, lamports: u64) {
        self.owned
            .lock()
            .unwrap()
            .push((authority, OwnedAccount { address, lamports }));
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn clear_submissions(&self) {
        self.submissions.lock().unwrap().clear();
    }

    /// Start indices of every attempted `add_config_lines`, sorted.
    pub fn config_line_starts(&self) -> Vec<u32> {
        let mut starts: Vec<u32> = self
            .submissions()
            .iter()
            .flat_map(|s| s.instructions.iter())
            .filter_map(|ix| config_lines_index(&ix.data))
            .collect();
        starts.sort_unstable();
        starts
    }

    fn rejection(&self, instructions: &[Instruction]) -> Option<String> {
        if self.fail_everything.load(Ordering::SeqCst) {
            return Some("injected failure".to_string());
        }
        let lines = self.failing_line_starts.lock().unwrap();
        let withdrawals = self.failing_withdrawals.lock().unwrap();
        for ix in instructions {
            if let Some(start) = config_lines_index(&ix.data) {
                if lines.contains(&start) {
                    return Some(format!("injected failure at index {}", start));
                }
            }
            if is_withdraw_funds(ix) && withdrawals.contains(&ix.accounts[0].pubkey) {
                return Some(format!("injected withdraw failure for {}", ix.accounts[0].pubkey));
            }
        }
        None
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> BlockchainResult<Signature> {
        let rejection = self.rejection(instructions);
        self.submissions.lock().unwrap().push(Submission {
            instructions: instructions.to_vec(),
            payer: *payer,
            signers: signers.iter().map(|k| k.pubkey()).collect(),
            confirmed: rejection.is_none(),
        });
        tokio::task::yield_now().await;
        match rejection {
            Some(reason) => Err(BlockchainError::Transaction(reason)),
            None => Ok(Signature::new_unique()),
        }
    }

    async fn get_account(&self, address: &Pubkey) -> BlockchainResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn minimum_balance_for_rent_exemption(&self, size: usize) -> BlockchainResult<u64> {
        Ok(890_880 + size as u64 * 6_960)
    }

    async fn program_accounts_by_authority(
        &self,
        _program: &Pubkey,
        authority: &Pubkey,
    ) -> BlockchainResult<Vec<OwnedAccount>> {
        Ok(self
            .owned
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| owner == authority)
            .map(|(_, account)| *account)
            .collect())
    }
}

/// Upload batching used by most tests.
pub fn upload_config() -> UploadConfig {
    UploadConfig {
        outer_batch_size: 1000,
        group_size: 10,
        max_concurrent_slices: 4,
    }
}

/// State with `count` uploaded-pending items.
pub fn state_with_items(count: u32) -> DeploymentState {
    let mut state = DeploymentState::new("devnet", "temp");
    for i in 0..count {
        state
            .items
            .insert(i, ItemRecord::new(format!("Item #{}", i), format!("https://arweave.net/{}", i)));
    }
    state
}
