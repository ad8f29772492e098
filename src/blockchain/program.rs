//! On-chain record layout and instruction encoders for the minting program.
//!
//! Anchor-style wire format: an 8-byte discriminator followed by the
//! Borsh-encoded body. Instruction discriminators are
//! `sha256("global:<name>")[..8]`, the record discriminator is
//! `sha256("account:CandyMachine")[..8]`.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;
pub const MAX_CREATOR_LIMIT: usize = 5;
const MAX_CREATOR_LEN: usize = 32 + 1 + 1;

/// Size of one serialized config line (two length-prefixed, padded strings).
pub const CONFIG_LINE_SIZE: usize = 4 + MAX_NAME_LENGTH + 4 + MAX_URI_LENGTH;

/// Fixed header of the record account before the config-line array.
pub const CONFIG_ARRAY_START: usize = 8 // discriminator
    + 32 // authority
    + 32 // wallet
    + 33 // token mint
    + 4 + 6 // uuid
    + 8 // price
    + 8 // items available
    + 9 // go live date
    + 10 // end settings
    + 4 + MAX_SYMBOL_LENGTH // symbol
    + 2 // seller fee basis points
    + 4 + MAX_CREATOR_LIMIT * MAX_CREATOR_LEN // creators
    + 8 // max supply
    + 1 // is mutable
    + 1 // retain authority
    + 1 + 4 + MAX_NAME_LENGTH + 4 + MAX_URI_LENGTH + 32 // hidden settings
    + 4 // max number of lines
    + 8 // items redeemed
    + 1 + 1 + 1 + 9 + 32 // whitelist settings
    + 1 + 32 + 1 // gatekeeper
    + 1 + 4 + MAX_NAME_LENGTH + 4 + MAX_URI_LENGTH + 1; // sequel settings

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSettingType {
    Date,
    Amount,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndSettings {
    pub end_setting_type: EndSettingType,
    pub number: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct HiddenSettings {
    pub name: String,
    pub uri: String,
    pub hash: [u8; 32],
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistMintMode {
    /// One whitelist token is burned per mint.
    BurnEveryTime,
    NeverBurn,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct WhitelistMintSettings {
    pub mode: WhitelistMintMode,
    pub mint: Pubkey,
    pub presale: bool,
    pub discount_price: Option<u64>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct GatekeeperConfig {
    pub gatekeeper_network: Pubkey,
    pub expire_on_use: bool,
}

/// Item naming template; with `sequel_mint` set no items are uploaded.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct SequelSettings {
    pub name: String,
    pub uri: String,
    pub sequel_mint: bool,
}

/// Configuration payload of the record, written once at initialisation.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CandyMachineData {
    pub uuid: String,
    pub price: u64,
    pub symbol: String,
    pub seller_fee_basis_points: u16,
    pub max_supply: u64,
    pub is_mutable: bool,
    pub retain_authority: bool,
    pub go_live_date: Option<i64>,
    pub end_settings: Option<EndSettings>,
    pub creators: Vec<Creator>,
    pub hidden_settings: Option<HiddenSettings>,
    pub whitelist_mint_settings: Option<WhitelistMintSettings>,
    pub items_available: u64,
    pub gatekeeper: Option<GatekeeperConfig>,
    pub sequel_settings: Option<SequelSettings>,
}

impl CandyMachineData {
    /// Whether the item upload phase is suppressed for this record.
    pub fn skips_upload(&self) -> bool {
        self.hidden_settings.is_some()
            || self.sequel_settings.as_ref().is_some_and(|s| s.sequel_mint)
    }

    /// Account size the program requires for this payload.
    pub fn account_size(&self) -> usize {
        if self.skips_upload() {
            return CONFIG_ARRAY_START;
        }
        let items = self.items_available as usize;
        CONFIG_ARRAY_START + 4 + items * CONFIG_LINE_SIZE + 8 + 2 * (items / 8 + 1)
    }
}

/// The configuration record as stored on the ledger.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CandyMachineAccount {
    pub authority: Pubkey,
    pub wallet: Pubkey,
    pub token_mint: Option<Pubkey>,
    pub items_redeemed: u64,
    pub data: CandyMachineData,
}

/// Byte offset of the authority field, used for ownership filtering.
pub const AUTHORITY_OFFSET: usize = 8;

impl CandyMachineAccount {
    /// Decode record account data, checking the discriminator.
    ///
    /// Trailing bytes (config lines, bitmask) are ignored.
    pub fn decode(address: &Pubkey, data: &[u8]) -> BlockchainResult<Self> {
        let decode_err = |reason: String| BlockchainError::Decode {
            account: *address,
            reason,
        };
        if data.len() < 8 {
            return Err(decode_err(format!("{} bytes is too short", data.len())));
        }
        if data[..8] != account_discriminator("CandyMachine") {
            return Err(decode_err("discriminator mismatch".to_string()));
        }
        let mut body = &data[8..];
        Self::deserialize(&mut body).map_err(|e| decode_err(e.to_string()))
    }

    /// Encode with discriminator; used by tests and fixtures.
    pub fn encode(&self) -> BlockchainResult<Vec<u8>> {
        let mut out = account_discriminator("CandyMachine").to_vec();
        self.serialize(&mut out)
            .map_err(|e| BlockchainError::Encode(e.to_string()))?;
        Ok(out)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub name: String,
    pub uri: String,
}

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator(&format!("global:{}", name))
}

pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator(&format!("account:{}", name))
}

fn discriminator(preimage: &str) -> [u8; 8] {
    let digest = hash(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.to_bytes()[..8]);
    out
}

fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> BlockchainResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)
        .map_err(|e| BlockchainError::Encode(e.to_string()))?;
    Ok(data)
}

/// Accounts of the `initialize_candy_machine` instruction.
#[derive(Debug, Clone)]
pub struct InitializeAccounts {
    pub candy_machine: Pubkey,
    pub wallet: Pubkey,
    pub authority: Pubkey,
    pub payer: Pubkey,
    /// Payment mint, passed as a read-only extra account when set.
    pub token_mint: Option<Pubkey>,
}

pub fn initialize_candy_machine(
    program_id: &Pubkey,
    accounts: &InitializeAccounts,
    data: &CandyMachineData,
) -> BlockchainResult<Instruction> {
    let mut metas = vec![
        AccountMeta::new(accounts.candy_machine, false),
        AccountMeta::new_readonly(accounts.wallet, false),
        AccountMeta::new_readonly(accounts.authority, false),
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];
    if let Some(mint) = accounts.token_mint {
        metas.push(AccountMeta::new_readonly(mint, false));
    }
    Ok(Instruction {
        program_id: *program_id,
        accounts: metas,
        data: instruction_data("initialize_candy_machine", data)?,
    })
}

pub fn add_config_lines(
    program_id: &Pubkey,
    candy_machine: &Pubkey,
    authority: &Pubkey,
    index: u32,
    lines: Vec<ConfigLine>,
) -> BlockchainResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*candy_machine, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data: instruction_data("add_config_lines", &(index, lines))?,
    })
}

/// Start index carried by an encoded `add_config_lines` instruction.
pub fn config_lines_index(data: &[u8]) -> Option<u32> {
    if data.len() < 12 || data[..8] != instruction_discriminator("add_config_lines") {
        return None;
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[8..12]);
    Some(u32::from_le_bytes(bytes))
}

/// Accounts of the `mint_nft` instruction, in program order.
#[derive(Debug, Clone)]
pub struct MintNftAccounts {
    pub candy_machine: Pubkey,
    pub candy_machine_creator: Pubkey,
    pub payer: Pubkey,
    pub wallet: Pubkey,
    pub metadata: Pubkey,
    pub mint: Pubkey,
    pub mint_authority: Pubkey,
    pub update_authority: Pubkey,
    pub master_edition: Pubkey,
    pub token_metadata_program: Pubkey,
    pub token_program: Pubkey,
}

#[allow(deprecated)]
pub fn mint_nft(
    program_id: &Pubkey,
    accounts: &MintNftAccounts,
    creator_bump: u8,
    remaining: &[AccountMeta],
) -> BlockchainResult<Instruction> {
    let mut metas = vec![
        AccountMeta::new(accounts.candy_machine, false),
        AccountMeta::new_readonly(accounts.candy_machine_creator, false),
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new(accounts.wallet, false),
        AccountMeta::new(accounts.metadata, false),
        AccountMeta::new(accounts.mint, false),
        AccountMeta::new_readonly(accounts.mint_authority, true),
        AccountMeta::new_readonly(accounts.update_authority, true),
        AccountMeta::new(accounts.master_edition, false),
        AccountMeta::new_readonly(accounts.token_metadata_program, false),
        AccountMeta::new_readonly(accounts.token_program, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::recent_blockhashes::id(), false),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
    ];
    metas.extend_from_slice(remaining);
    Ok(Instruction {
        program_id: *program_id,
        accounts: metas,
        data: instruction_data("mint_nft", &creator_bump)?,
    })
}

pub fn withdraw_funds(
    program_id: &Pubkey,
    candy_machine: &Pubkey,
    authority: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*candy_machine, false),
            AccountMeta::new(*authority, true),
        ],
        data: instruction_discriminator("withdraw_funds").to_vec(),
    }
}

/// Whether an instruction is a `withdraw_funds` call.
pub fn is_withdraw_funds(instruction: &Instruction) -> bool {
    instruction.data.len() >= 8 && instruction.data[..8] == instruction_discriminator("withdraw_funds")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> CandyMachineData {
        CandyMachineData {
            uuid: "abcdef".to_string(),
            price: 1_000_000_000,
            symbol: "CNDY".to_string(),
            seller_fee_basis_points: 500,
            max_supply: 0,
            is_mutable: true,
            retain_authority: true,
            go_live_date: Some(1_640_000_000),
            end_settings: None,
            creators: vec![Creator {
                address: Pubkey::new_unique(),
                verified: true,
                share: 100,
            }],
            hidden_settings: None,
            whitelist_mint_settings: None,
            items_available: 16,
            gatekeeper: None,
            sequel_settings: None,
        }
    }

    #[test]
    fn test_account_decode() {
        let account = CandyMachineAccount {
            authority: Pubkey::new_unique(),
            wallet: Pubkey::new_unique(),
            token_mint: Some(Pubkey::new_unique()),
            items_redeemed: 3,
            data: sample_data(),
        };
        let address = Pubkey::new_unique();
        let mut bytes = account.encode().unwrap();
        // config lines follow the header on-chain
        bytes.extend_from_slice(&[0u8; 64]);

        let decoded = CandyMachineAccount::decode(&address, &bytes).unwrap();
        assert_eq!(decoded, account);
        assert_eq!(&bytes[AUTHORITY_OFFSET..AUTHORITY_OFFSET + 32], account.authority.as_ref());
    }

    #[test]
    fn test_decode_rejects_foreign_account() {
        let address = Pubkey::new_unique();
        let err = CandyMachineAccount::decode(&address, &[7u8; 100]).unwrap_err();
        assert!(err.to_string().contains("discriminator mismatch"));

        let err = CandyMachineAccount::decode(&address, &[0u8; 3]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_account_size() {
        let mut data = sample_data();
        let full = CONFIG_ARRAY_START + 4 + 16 * CONFIG_LINE_SIZE + 8 + 2 * 3;
        assert_eq!(data.account_size(), full);

        data.sequel_settings = Some(SequelSettings {
            name: "Drop".to_string(),
            uri: "https://example.com/".to_string(),
            sequel_mint: false,
        });
        assert_eq!(data.account_size(), full);

        data.sequel_settings.as_mut().unwrap().sequel_mint = true;
        assert_eq!(data.account_size(), CONFIG_ARRAY_START);
    }

    #[test]
    fn test_add_config_lines_index() {
        let ix = add_config_lines(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            40,
            vec![ConfigLine {
                name: "#40".to_string(),
                uri: "https://example.com/40".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(config_lines_index(&ix.data), Some(40));
        assert!(ix.accounts[1].is_signer);
        assert_eq!(config_lines_index(&[0u8; 4]), None);
    }

    #[test]
    fn test_withdraw_funds_shape() {
        let program = Pubkey::new_unique();
        let ix = withdraw_funds(&program, &Pubkey::new_unique(), &Pubkey::new_unique());
        assert!(is_withdraw_funds(&ix));
        assert!(ix.accounts[1].is_writable && ix.accounts[1].is_signer);
    }
}
