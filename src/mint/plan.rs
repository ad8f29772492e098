//! Mint transaction plan.
//!
//! A plan is a closed list of [`PlannedOp`]s plus the one-time keypairs that
//! must sign next to the buyer. [`PlanBuilder`] only allows appends before
//! the core invocation and places every scheduled revoke after it.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;

use crate::blockchain::program::{mint_nft, MintNftAccounts};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::mint::MintError;

/// One operation of a mint transaction.
#[derive(Debug, Clone)]
pub enum PlannedOp {
    /// Allocate the new mint account.
    Create { payer: Pubkey, mint: Pubkey, lamports: u64 },
    /// Single-unit mint, `authority` as mint and freeze authority.
    InitializeMint { mint: Pubkey, authority: Pubkey },
    CreateHolderAccount { payer: Pubkey, owner: Pubkey, mint: Pubkey },
    MintUnit { mint: Pubkey, holder: Pubkey, authority: Pubkey },
    ApproveDelegate {
        source: Pubkey,
        delegate: Pubkey,
        owner: Pubkey,
        amount: u64,
    },
    /// The program's `mint_nft` call.
    Invoke {
        accounts: MintNftAccounts,
        creator_bump: u8,
        remaining: Vec<AccountMeta>,
    },
    RevokeDelegate { source: Pubkey, owner: Pubkey },
}

/// Ordered operations and signers for exactly one mint.
#[derive(Debug)]
pub struct InstructionPlan {
    program_id: Pubkey,
    token_program: Pubkey,
    buyer: Pubkey,
    ops: Vec<PlannedOp>,
    /// Fresh mint first, then throwaway authorities.
    ephemeral: Vec<Keypair>,
}

impl InstructionPlan {
    pub fn ops(&self) -> &[PlannedOp] {
        &self.ops
    }

    pub fn buyer(&self) -> Pubkey {
        self.buyer
    }

    /// Address of the mint created by this plan.
    pub fn mint(&self) -> Pubkey {
        self.ephemeral
            .first()
            .map(|k| k.pubkey())
            .unwrap_or_default()
    }

    /// Number of one-time delegate authorities.
    pub fn throwaway_count(&self) -> usize {
        self.ephemeral.len().saturating_sub(1)
    }

    /// Buyer followed by every ephemeral signer.
    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        std::iter::once(self.buyer)
            .chain(self.ephemeral.iter().map(|k| k.pubkey()))
            .collect()
    }

    /// Signing set for submission.
    pub fn signers<'a>(&'a self, buyer: &'a Keypair) -> Vec<&'a Keypair> {
        std::iter::once(buyer).chain(self.ephemeral.iter()).collect()
    }

    /// Encode every operation, in plan order.
    pub fn to_instructions(&self) -> BlockchainResult<Vec<Instruction>> {
        let token = &self.token_program;
        let encode = |e: solana_sdk::program_error::ProgramError| BlockchainError::Encode(e.to_string());

        self.ops
            .iter()
            .map(|op| match op {
                PlannedOp::Create { payer, mint, lamports } => Ok(system_instruction::create_account(
                    payer,
                    mint,
                    *lamports,
                    spl_token::state::Mint::LEN as u64,
                    token,
                )),
                PlannedOp::InitializeMint { mint, authority } => {
                    spl_token::instruction::initialize_mint(token, mint, authority, Some(authority), 0)
                        .map_err(encode)
                }
                PlannedOp::CreateHolderAccount { payer, owner, mint } => Ok(
                    spl_associated_token_account::instruction::create_associated_token_account(
                        payer, owner, mint, token,
                    ),
                ),
                PlannedOp::MintUnit { mint, holder, authority } => {
                    spl_token::instruction::mint_to(token, mint, holder, authority, &[], 1).map_err(encode)
                }
                PlannedOp::ApproveDelegate {
                    source,
                    delegate,
                    owner,
                    amount,
                } => spl_token::instruction::approve(token, source, delegate, owner, &[], *amount).map_err(encode),
                PlannedOp::Invoke {
                    accounts,
                    creator_bump,
                    remaining,
                } => mint_nft(&self.program_id, accounts, *creator_bump, remaining),
                PlannedOp::RevokeDelegate { source, owner } => {
                    spl_token::instruction::revoke(token, source, owner, &[]).map_err(encode)
                }
            })
            .collect()
    }
}

/// Assembles an [`InstructionPlan`] with the invocation ordering fixed.
#[derive(Debug)]
pub struct PlanBuilder {
    program_id: Pubkey,
    token_program: Pubkey,
    buyer: Pubkey,
    head: Vec<PlannedOp>,
    remaining: Vec<AccountMeta>,
    invoke: Option<PlannedOp>,
    revokes: Vec<PlannedOp>,
    ephemeral: Vec<Keypair>,
}

impl PlanBuilder {
    pub fn new(program_id: Pubkey, token_program: Pubkey, buyer: Pubkey, mint: Keypair) -> Self {
        Self {
            program_id,
            token_program,
            buyer,
            head: Vec::new(),
            remaining: Vec::new(),
            invoke: None,
            revokes: Vec::new(),
            ephemeral: vec![mint],
        }
    }

    pub fn buyer(&self) -> Pubkey {
        self.buyer
    }

    pub fn mint(&self) -> Pubkey {
        self.ephemeral
            .first()
            .map(|k| k.pubkey())
            .unwrap_or_default()
    }

    fn ensure_open(&self) -> Result<(), MintError> {
        if self.invoke.is_some() {
            return Err(MintError::PlanSealed);
        }
        Ok(())
    }

    /// Append an operation ahead of the invocation.
    pub fn push(&mut self, op: PlannedOp) -> Result<(), MintError> {
        self.ensure_open()?;
        if matches!(op, PlannedOp::Invoke { .. } | PlannedOp::RevokeDelegate { .. }) {
            return Err(MintError::MisplacedOp);
        }
        self.head.push(op);
        Ok(())
    }

    /// Append an extra account to the invocation.
    pub fn add_account(&mut self, meta: AccountMeta) -> Result<(), MintError> {
        self.ensure_open()?;
        self.remaining.push(meta);
        Ok(())
    }

    /// Register a one-time authority; returns its address.
    pub fn add_throwaway(&mut self, keypair: Keypair) -> Result<Pubkey, MintError> {
        self.ensure_open()?;
        let pubkey = keypair.pubkey();
        self.ephemeral.push(keypair);
        Ok(pubkey)
    }

    /// Approve `delegate` on `source` now and revoke it after the invocation.
    pub fn approve_scoped(&mut self, source: Pubkey, delegate: Pubkey, amount: u64) -> Result<(), MintError> {
        self.ensure_open()?;
        let owner = self.buyer;
        self.head.push(PlannedOp::ApproveDelegate {
            source,
            delegate,
            owner,
            amount,
        });
        self.revokes.push(PlannedOp::RevokeDelegate { source, owner });
        Ok(())
    }

    /// Set the core invocation with the accumulated extra accounts.
    pub fn invoke(&mut self, accounts: MintNftAccounts, creator_bump: u8) -> Result<(), MintError> {
        self.ensure_open()?;
        self.invoke = Some(PlannedOp::Invoke {
            accounts,
            creator_bump,
            remaining: std::mem::take(&mut self.remaining),
        });
        Ok(())
    }

    pub fn finish(self) -> Result<InstructionPlan, MintError> {
        let invoke = self.invoke.ok_or(MintError::MissingInvoke)?;
        let mut ops = self.head;
        ops.push(invoke);
        ops.extend(self.revokes);
        Ok(InstructionPlan {
            program_id: self.program_id,
            token_program: self.token_program,
            buyer: self.buyer,
            ops,
            ephemeral: self.ephemeral,
        })
    }
}
