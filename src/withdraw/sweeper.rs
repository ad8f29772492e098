//! Drain residual balances from owned configuration records.
//!
//! Records are found by the authority field filter. In live mode each
//! funded record gets its own transaction: an optional charity transfer
//! followed by `withdraw_funds`. One record failing never stops the sweep.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::client::{Ledger, OwnedAccount};
use crate::blockchain::program::withdraw_funds;
use crate::blockchain::types::BlockchainError;

const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Debug, Error)]
pub enum WithdrawError {
    #[error("charity percentage must be within [0, 100], got {0}")]
    InvalidPercent(f64),

    #[error("failed to enumerate owned records: {0}")]
    Enumerate(#[source] BlockchainError),
}

/// Charity destination and share, stored in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharityShare {
    pub address: Pubkey,
    bps: u16,
}

impl CharityShare {
    /// `percent` may carry up to two decimals; anything finer is rounded.
    pub fn new(address: Pubkey, percent: f64) -> Result<Self, WithdrawError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(WithdrawError::InvalidPercent(percent));
        }
        Ok(Self {
            address,
            bps: (percent * 100.0).round() as u16,
        })
    }

    pub fn basis_points(&self) -> u16 {
        self.bps
    }

    /// Share of `lamports` owed to the charity, rounded down.
    pub fn donation(&self, lamports: u64) -> u64 {
        (u128::from(lamports) * u128::from(self.bps) / BPS_DENOMINATOR) as u64
    }
}

/// A record whose withdrawal failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub address: Pubkey,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub dry_run: bool,
    pub record_count: usize,
    pub total_lamports: u64,
    /// Donation computed (dry run) or sent (live).
    pub donation_lamports: u64,
    /// Records drained, or with nothing to drain.
    pub success_count: usize,
    pub failures: Vec<RecordFailure>,
}

impl SweepReport {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct WithdrawalSweeper {
    ledger: Arc<dyn Ledger>,
    program_id: Pubkey,
}

impl WithdrawalSweeper {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    /// Records owned by `authority` with their balances.
    pub async fn owned_records(&self, authority: &Pubkey) -> Result<Vec<OwnedAccount>, WithdrawError> {
        self.ledger
            .program_accounts_by_authority(&self.program_id, authority)
            .await
            .map_err(WithdrawError::Enumerate)
    }

    pub async fn sweep(
        &self,
        authority: &Keypair,
        charity: Option<&CharityShare>,
        dry_run: bool,
    ) -> Result<SweepReport, WithdrawError> {
        let authority_key = authority.pubkey();
        let records = self.owned_records(&authority_key).await?;
        let charity = charity.filter(|c| c.basis_points() > 0);

        let mut report = SweepReport {
            dry_run,
            record_count: records.len(),
            total_lamports: records.iter().map(|r| r.lamports).sum(),
            ..SweepReport::default()
        };
        tracing::info!(
            authority = %authority_key,
            records = report.record_count,
            lamports = report.total_lamports,
            "Owned configuration records found"
        );

        if dry_run {
            if let Some(charity) = charity {
                report.donation_lamports = records.iter().map(|r| charity.donation(r.lamports)).sum();
                tracing::info!(
                    charity = %charity.address,
                    basis_points = charity.basis_points(),
                    lamports = report.donation_lamports,
                    "Dry run donation"
                );
            }
            report.success_count = report.record_count;
            return Ok(report);
        }

        for record in &records {
            if record.lamports == 0 {
                tracing::debug!(candy_machine = %record.address, "Record already empty");
                report.success_count += 1;
                continue;
            }

            let mut instructions = Vec::with_capacity(2);
            let donation = charity.map_or(0, |c| c.donation(record.lamports));
            if let Some(charity) = charity.filter(|_| donation > 0) {
                instructions.push(system_instruction::transfer(&authority_key, &charity.address, donation));
            }
            instructions.push(withdraw_funds(&self.program_id, &record.address, &authority_key));

            match self
                .ledger
                .send_and_confirm(&instructions, &authority_key, &[authority])
                .await
            {
                Ok(signature) => {
                    tracing::info!(
                        candy_machine = %record.address,
                        lamports = record.lamports,
                        donation,
                        signature = %signature,
                        "Withdrew record balance"
                    );
                    report.success_count += 1;
                    report.donation_lamports += donation;
                }
                Err(e) => {
                    tracing::error!(candy_machine = %record.address, error = %e, "Withdraw failed");
                    report.failures.push(RecordFailure {
                        address: record.address,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.success_count,
            total = report.record_count,
            "Withdraw sweep finished"
        );
        Ok(report)
    }
}
