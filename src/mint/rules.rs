//! Ordered rule table for mint assembly.
//!
//! Each rule looks at the record's settings and extends the plan. Rules run
//! in table order; the plan builder then appends scheduled revokes after the
//! invocation.

use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use crate::blockchain::address::AddressDeriver;
use crate::blockchain::program::{
    CandyMachineAccount, GatekeeperConfig, MintNftAccounts, WhitelistMintMode, WhitelistMintSettings,
};
use crate::mint::plan::{InstructionPlan, PlanBuilder, PlannedOp};
use crate::mint::MintError;

/// Record settings that shape a mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSettings {
    pub candy_machine: Pubkey,
    /// Treasury receiving the payment.
    pub wallet: Pubkey,
    pub price: u64,
    pub token_mint: Option<Pubkey>,
    pub whitelist: Option<WhitelistMintSettings>,
    pub gatekeeper: Option<GatekeeperConfig>,
}

impl MintSettings {
    pub fn from_account(address: Pubkey, account: &CandyMachineAccount) -> Self {
        Self {
            candy_machine: address,
            wallet: account.wallet,
            price: account.data.price,
            token_mint: account.token_mint,
            whitelist: account.data.whitelist_mint_settings.clone(),
            gatekeeper: account.data.gatekeeper.clone(),
        }
    }
}

/// Inputs gathered before assembly.
#[derive(Debug, Clone, Copy)]
pub struct MintContext<'a> {
    pub settings: &'a MintSettings,
    pub buyer: Pubkey,
    /// Whether the buyer's whitelist token account exists.
    pub whitelist_account_exists: bool,
    /// Rent-exempt balance for a mint account.
    pub mint_rent: u64,
}

type Rule = fn(&AddressDeriver, &MintContext<'_>, &mut PlanBuilder) -> Result<(), MintError>;

/// Rules in application order.
pub const RULES: &[(&str, Rule)] = &[
    ("base", base_ops),
    ("whitelist", whitelist),
    ("payment_token", payment_token),
    ("invoke", invoke),
];

/// Builds the plan for one mint from record settings.
#[derive(Debug, Clone, Default)]
pub struct MintTransactionBuilder {
    deriver: AddressDeriver,
}

impl MintTransactionBuilder {
    pub fn new(deriver: AddressDeriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    /// Assemble a plan around a freshly generated mint keypair.
    pub fn build(&self, ctx: &MintContext<'_>) -> Result<InstructionPlan, MintError> {
        self.build_with_mint(ctx, Keypair::new())
    }

    pub fn build_with_mint(&self, ctx: &MintContext<'_>, mint: Keypair) -> Result<InstructionPlan, MintError> {
        let mut builder = PlanBuilder::new(self.deriver.candy_program, self.deriver.token_program, ctx.buyer, mint);
        for (name, rule) in RULES {
            rule(&self.deriver, ctx, &mut builder)?;
            tracing::trace!(rule = name, "Mint rule applied");
        }
        builder.finish()
    }
}

fn base_ops(deriver: &AddressDeriver, ctx: &MintContext<'_>, b: &mut PlanBuilder) -> Result<(), MintError> {
    let buyer = ctx.buyer;
    let mint = b.mint();
    b.push(PlannedOp::Create {
        payer: buyer,
        mint,
        lamports: ctx.mint_rent,
    })?;
    b.push(PlannedOp::InitializeMint { mint, authority: buyer })?;
    b.push(PlannedOp::CreateHolderAccount {
        payer: buyer,
        owner: buyer,
        mint,
    })?;
    b.push(PlannedOp::MintUnit {
        mint,
        holder: deriver.holder_token_account(&buyer, &mint),
        authority: buyer,
    })
}

fn whitelist(deriver: &AddressDeriver, ctx: &MintContext<'_>, b: &mut PlanBuilder) -> Result<(), MintError> {
    let Some(whitelist) = &ctx.settings.whitelist else {
        return Ok(());
    };
    let token_account = deriver.holder_token_account(&ctx.buyer, &whitelist.mint);
    b.add_account(AccountMeta::new(token_account, false))?;

    if whitelist.mode == WhitelistMintMode::BurnEveryTime {
        let burner = b.add_throwaway(Keypair::new())?;
        b.add_account(AccountMeta::new(whitelist.mint, false))?;
        b.add_account(AccountMeta::new_readonly(burner, true))?;
        if ctx.whitelist_account_exists {
            b.approve_scoped(token_account, burner, 1)?;
        }
    }
    Ok(())
}

fn payment_token(deriver: &AddressDeriver, ctx: &MintContext<'_>, b: &mut PlanBuilder) -> Result<(), MintError> {
    let Some(token_mint) = ctx.settings.token_mint else {
        return Ok(());
    };
    let token_account = deriver.holder_token_account(&ctx.buyer, &token_mint);
    let transfer_authority = b.add_throwaway(Keypair::new())?;
    b.add_account(AccountMeta::new(token_account, false))?;
    b.add_account(AccountMeta::new_readonly(transfer_authority, true))?;
    b.approve_scoped(token_account, transfer_authority, ctx.settings.price)
}

fn invoke(deriver: &AddressDeriver, ctx: &MintContext<'_>, b: &mut PlanBuilder) -> Result<(), MintError> {
    let mint = b.mint();
    let (creator, creator_bump) = deriver.record_authority(&ctx.settings.candy_machine);
    let accounts = MintNftAccounts {
        candy_machine: ctx.settings.candy_machine,
        candy_machine_creator: creator,
        payer: ctx.buyer,
        wallet: ctx.settings.wallet,
        metadata: deriver.metadata(&mint),
        mint,
        mint_authority: ctx.buyer,
        update_authority: ctx.buyer,
        master_edition: deriver.master_edition(&mint),
        token_metadata_program: deriver.metadata_program,
        token_program: deriver.token_program,
    };
    b.invoke(accounts, creator_bump)
}
