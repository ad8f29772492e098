//! Single-mint transaction assembly and submission.
//!
//! # Data Flow
//! ```text
//! record address
//!     → Ledger::get_account + CandyMachineAccount::decode
//!     → MintSettings
//!     → whitelist token account existence check
//!     → rules.rs (ordered rule table) → plan.rs InstructionPlan
//!     → one atomic submission signed by buyer, mint and throwaways
//! ```

pub mod plan;
pub mod rules;

use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use thiserror::Error;

use crate::blockchain::client::Ledger;
use crate::blockchain::program::CandyMachineAccount;
use crate::blockchain::types::BlockchainError;

pub use plan::{InstructionPlan, PlanBuilder, PlannedOp};
pub use rules::{MintContext, MintSettings, MintTransactionBuilder};

#[derive(Debug, Error)]
pub enum MintError {
    #[error("configuration record {0} not found")]
    RecordNotFound(Pubkey),

    #[error("operation added after the mint invocation")]
    PlanSealed,

    #[error("invocation and revoke operations are placed by the builder")]
    MisplacedOp,

    #[error("plan has no mint invocation")]
    MissingInvoke,

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

/// A confirmed mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub signature: Signature,
    pub mint: Pubkey,
}

/// Mint one item from `candy_machine` for `buyer`.
pub async fn mint_one(
    ledger: &dyn Ledger,
    builder: &MintTransactionBuilder,
    candy_machine: &Pubkey,
    buyer: &Keypair,
) -> Result<MintReceipt, MintError> {
    let account = ledger
        .get_account(candy_machine)
        .await?
        .ok_or(MintError::RecordNotFound(*candy_machine))?;
    let record = CandyMachineAccount::decode(candy_machine, &account.data)?;
    let settings = MintSettings::from_account(*candy_machine, &record);

    if let Some(gate) = &settings.gatekeeper {
        tracing::warn!(
            gatekeeper_network = %gate.gatekeeper_network,
            "Record requires a gateway token; the program enforces it at mint time"
        );
    }

    let buyer_key = buyer.pubkey();
    let whitelist_account_exists = match &settings.whitelist {
        Some(whitelist) => {
            let token_account = builder.deriver().holder_token_account(&buyer_key, &whitelist.mint);
            ledger.account_exists(&token_account).await?
        }
        None => false,
    };
    let mint_rent = ledger
        .minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
        .await?;

    let plan = builder.build(&MintContext {
        settings: &settings,
        buyer: buyer_key,
        whitelist_account_exists,
        mint_rent,
    })?;
    let instructions = plan.to_instructions()?;
    let signers = plan.signers(buyer);

    tracing::debug!(
        candy_machine = %candy_machine,
        mint = %plan.mint(),
        operations = instructions.len(),
        signers = signers.len(),
        "Submitting mint"
    );
    let signature = ledger.send_and_confirm(&instructions, &buyer_key, &signers).await?;

    tracing::info!(
        candy_machine = %candy_machine,
        mint = %plan.mint(),
        signature = %signature,
        "Minted"
    );
    Ok(MintReceipt {
        signature,
        mint: plan.mint(),
    })
}
