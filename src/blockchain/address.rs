//! Deterministic program-derived address computation.
//!
//! Every derivation is a pure function of its seed bytes and the owning
//! program id. Address strings are parsed at the edges (config, CLI);
//! nothing in here can fail.

use solana_sdk::pubkey::Pubkey;

use crate::blockchain::types::{CANDY_MACHINE_PROGRAM_ID, TOKEN_METADATA_PROGRAM_ID};

/// Literal seed shared by metadata and master-edition accounts.
pub const METADATA_SEED: &[u8] = b"metadata";
/// Literal seed suffix for master-edition accounts.
pub const EDITION_SEED: &[u8] = b"edition";
/// Literal seed prefix for the record authority.
pub const CANDY_MACHINE_SEED: &[u8] = b"candy_machine";

/// Program ids the derivations are computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDeriver {
    pub candy_program: Pubkey,
    pub token_program: Pubkey,
    pub metadata_program: Pubkey,
    pub associated_token_program: Pubkey,
}

impl Default for AddressDeriver {
    fn default() -> Self {
        Self::new(CANDY_MACHINE_PROGRAM_ID)
    }
}

impl AddressDeriver {
    /// Deriver for a given minting program with the standard token programs.
    pub fn new(candy_program: Pubkey) -> Self {
        Self {
            candy_program,
            token_program: spl_token::id(),
            metadata_program: TOKEN_METADATA_PROGRAM_ID,
            associated_token_program: spl_associated_token_account::id(),
        }
    }

    /// Holder token account of `owner` for `mint`.
    ///
    /// Seeds: `[owner, token program, mint]` under the associated-token program.
    /// Used for the buyer's holder account, whitelist token account and
    /// payment token account alike.
    pub fn holder_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[owner.as_ref(), self.token_program.as_ref(), mint.as_ref()],
            &self.associated_token_program,
        )
        .0
    }

    /// Metadata account for `mint`.
    pub fn metadata(&self, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[METADATA_SEED, self.metadata_program.as_ref(), mint.as_ref()],
            &self.metadata_program,
        )
        .0
    }

    /// Master-edition account for `mint`.
    pub fn master_edition(&self, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[
                METADATA_SEED,
                self.metadata_program.as_ref(),
                mint.as_ref(),
                EDITION_SEED,
            ],
            &self.metadata_program,
        )
        .0
    }

    /// Record authority for a configuration record, with its bump.
    ///
    /// The bump is passed to the mint invocation so the program can
    /// re-validate the derivation.
    pub fn record_authority(&self, record: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[CANDY_MACHINE_SEED, record.as_ref()], &self.candy_program)
    }
}
