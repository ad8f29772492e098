//! Configuration input document and its resolution into record data.
//!
//! The document is JSON (camelCase). Resolution scales prices into base
//! units, resolves the treasury, parses dates and checks the payment
//! token accounts on the ledger. It runs once, before record creation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;

use crate::blockchain::address::AddressDeriver;
use crate::blockchain::client::Ledger;
use crate::blockchain::program::{
    CandyMachineData, Creator, EndSettingType, EndSettings, GatekeeperConfig, HiddenSettings,
    SequelSettings, WhitelistMintMode, WhitelistMintSettings,
};
use crate::blockchain::types::{parse_address, BlockchainError};
use crate::config::loader::ConfigError;
use crate::config::validation::{validate_deployment, ValidationError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeploymentConfig {
    pub number: u64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub seller_fee_basis_points: u16,
    #[serde(default)]
    pub creators: Vec<RawCreator>,
    #[serde(default)]
    pub no_retain_authority: bool,
    #[serde(default)]
    pub no_mutable: bool,
    pub price: f64,
    pub spl_token: Option<String>,
    pub spl_token_account: Option<String>,
    pub sol_treasury_account: Option<String>,
    pub gatekeeper: Option<RawGatekeeper>,
    pub end_settings: Option<RawEndSettings>,
    pub hidden_settings: Option<RawHiddenSettings>,
    pub whitelist_mint_settings: Option<RawWhitelistSettings>,
    #[serde(alias = "cometMintSettings")]
    pub sequel_settings: Option<RawSequelSettings>,
    pub go_live_date: Option<String>,
    /// Explicit item catalogue, index = position.
    pub items: Option<Vec<RawItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCreator {
    pub address: String,
    #[serde(default)]
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGatekeeper {
    pub gatekeeper_network: String,
    #[serde(default)]
    pub expire_on_use: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEndSettingType {
    #[serde(default)]
    pub date: bool,
    #[serde(default)]
    pub amount: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEndSettings {
    pub end_setting_type: RawEndSettingType,
    /// A date string for date ends, an item count for amount ends.
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHiddenSettings {
    pub name: String,
    pub uri: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWhitelistMode {
    #[serde(default)]
    pub burn_every_time: bool,
    #[serde(default)]
    pub never_burn: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWhitelistSettings {
    pub mode: RawWhitelistMode,
    pub mint: String,
    #[serde(default)]
    pub presale: bool,
    pub discount_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSequelSettings {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub sequel_mint: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub name: String,
    pub uri: String,
}

/// A name/uri pair for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSource {
    pub name: String,
    pub uri: String,
}

/// Fully resolved deployment, ready for record creation.
#[derive(Debug, Clone)]
pub struct DeploymentSettings {
    /// Record payload; `uuid` is filled in when the record keypair exists.
    pub data: CandyMachineData,
    /// Treasury receiving mint payments.
    pub treasury: Pubkey,
    /// Payment mint when price is paid in a token.
    pub token_mint: Option<Pubkey>,
    /// Catalogue entries supplied by the document.
    pub items: BTreeMap<u32, ItemSource>,
}

impl DeploymentSettings {
    pub fn item_count(&self) -> u64 {
        self.data.items_available
    }

    /// Whether the item upload phase runs for this deployment.
    pub fn uploads_items(&self) -> bool {
        !self.data.skips_upload()
    }

    /// Record payload carrying the generated identity tag.
    pub fn candy_data(&self, uuid: String) -> CandyMachineData {
        CandyMachineData {
            uuid,
            ..self.data.clone()
        }
    }

    /// Entry for `index`, from the catalogue or the sequel naming template.
    pub fn item_source(&self, index: u32) -> Option<ItemSource> {
        if let Some(item) = self.items.get(&index) {
            return Some(item.clone());
        }
        self.data.sequel_settings.as_ref().map(|sequel| sequel_item(sequel, index))
    }
}

/// Placeholder entry generated from sequel settings.
pub fn sequel_item(sequel: &SequelSettings, index: u32) -> ItemSource {
    ItemSource {
        name: format!("{} #{}", sequel.name, index),
        uri: format!("{}{}", sequel.uri, index),
    }
}

/// Parse a go-live or end date into unix seconds.
///
/// Accepts `now`, RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD` (the last two as UTC).
pub fn parse_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if value == "now" {
        return Some(Utc::now().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Decimals of the native currency (lamports per unit = 10^9).
const NATIVE_DECIMALS: u8 = 9;

fn scale_price(value: f64, decimals: u8) -> u64 {
    (value * 10f64.powi(decimals as i32)).round() as u64
}

fn single(field: &str, message: String) -> ConfigError {
    ConfigError::Validation(vec![ValidationError::new(field, message)])
}

/// Resolve a validated document against the ledger.
///
/// Fails before any mutation when the payment token configuration is
/// unusable.
pub async fn resolve_deployment(
    raw: RawDeploymentConfig,
    payer: &Pubkey,
    ledger: &dyn Ledger,
) -> Result<DeploymentSettings, ConfigError> {
    validate_deployment(&raw).map_err(ConfigError::Validation)?;

    let (treasury, token_mint, decimals) = match &raw.spl_token {
        Some(token) => {
            let mint = parse_address(token).map_err(ConfigError::Ledger)?;
            let token_account = match &raw.spl_token_account {
                Some(account) => parse_address(account).map_err(ConfigError::Ledger)?,
                None => AddressDeriver::default().holder_token_account(payer, &mint),
            };
            let decimals = check_payment_accounts(ledger, &mint, &token_account).await?;
            (token_account, Some(mint), decimals)
        }
        None => {
            let treasury = match &raw.sol_treasury_account {
                Some(account) => parse_address(account).map_err(ConfigError::Ledger)?,
                None => *payer,
            };
            (treasury, None, NATIVE_DECIMALS)
        }
    };

    let go_live_date = match &raw.go_live_date {
        Some(value) => Some(
            parse_date(value).ok_or_else(|| single("goLiveDate", format!("unparseable date '{}'", value)))?,
        ),
        None => None,
    };

    let end_settings = match &raw.end_settings {
        Some(end) if end.end_setting_type.date => {
            let value = end.value.as_str().unwrap_or_default();
            let date = parse_date(value)
                .ok_or_else(|| single("endSettings.value", format!("unparseable date '{}'", value)))?;
            Some(EndSettings {
                end_setting_type: EndSettingType::Date,
                number: date.max(0) as u64,
            })
        }
        Some(end) => {
            let amount = end
                .value
                .as_u64()
                .or_else(|| end.value.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| single("endSettings.value", "amount must be a non-negative integer".to_string()))?;
            Some(EndSettings {
                end_setting_type: EndSettingType::Amount,
                number: amount,
            })
        }
        None => None,
    };

    let hidden_settings = match raw.hidden_settings {
        Some(hidden) => {
            let hash: [u8; 32] = hidden.hash.as_bytes().try_into().map_err(|_| {
                single("hiddenSettings.hash", "must be exactly 32 bytes".to_string())
            })?;
            Some(HiddenSettings {
                name: hidden.name,
                uri: hidden.uri,
                hash,
            })
        }
        None => None,
    };

    let whitelist_mint_settings = match raw.whitelist_mint_settings {
        Some(whitelist) => Some(WhitelistMintSettings {
            mode: if whitelist.mode.burn_every_time {
                WhitelistMintMode::BurnEveryTime
            } else {
                WhitelistMintMode::NeverBurn
            },
            mint: parse_address(&whitelist.mint).map_err(ConfigError::Ledger)?,
            presale: whitelist.presale,
            discount_price: whitelist.discount_price.map(|p| scale_price(p, decimals)),
        }),
        None => None,
    };

    let gatekeeper = match raw.gatekeeper {
        Some(gate) => Some(GatekeeperConfig {
            gatekeeper_network: parse_address(&gate.gatekeeper_network).map_err(ConfigError::Ledger)?,
            expire_on_use: gate.expire_on_use,
        }),
        None => None,
    };

    let creators = raw
        .creators
        .iter()
        .map(|c| {
            Ok(Creator {
                address: parse_address(&c.address)?,
                verified: c.verified,
                share: c.share,
            })
        })
        .collect::<Result<Vec<_>, BlockchainError>>()
        .map_err(ConfigError::Ledger)?;

    let items = raw
        .items
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            (
                i as u32,
                ItemSource {
                    name: item.name,
                    uri: item.uri,
                },
            )
        })
        .collect();

    let data = CandyMachineData {
        uuid: String::new(),
        price: scale_price(raw.price, decimals),
        symbol: raw.symbol,
        seller_fee_basis_points: raw.seller_fee_basis_points,
        max_supply: 0,
        is_mutable: !raw.no_mutable,
        retain_authority: !raw.no_retain_authority,
        go_live_date,
        end_settings,
        creators,
        hidden_settings,
        whitelist_mint_settings,
        items_available: raw.number,
        gatekeeper,
        sequel_settings: raw.sequel_settings.map(|s| SequelSettings {
            name: s.name,
            uri: s.uri,
            sequel_mint: s.sequel_mint,
        }),
    };

    tracing::info!(
        items = data.items_available,
        price = data.price,
        treasury = %treasury,
        token_mint = ?token_mint,
        "Deployment configuration resolved"
    );

    Ok(DeploymentSettings {
        data,
        treasury,
        token_mint,
        items,
    })
}

/// Check the payment mint and token account; returns the mint's decimals.
async fn check_payment_accounts(
    ledger: &dyn Ledger,
    mint: &Pubkey,
    token_account: &Pubkey,
) -> Result<u8, ConfigError> {
    let mint_account = ledger
        .get_account(mint)
        .await
        .map_err(ConfigError::Ledger)?
        .ok_or_else(|| single("splToken", format!("mint {} does not exist", mint)))?;
    let mint_state = spl_token::state::Mint::unpack(&mint_account.data)
        .map_err(|_| single("splToken", format!("{} is not an initialized mint", mint)))?;

    let account = ledger
        .get_account(token_account)
        .await
        .map_err(ConfigError::Ledger)?
        .ok_or_else(|| single("splTokenAccount", format!("token account {} does not exist", token_account)))?;
    let account_state = spl_token::state::Account::unpack(&account.data).map_err(|_| {
        single("splTokenAccount", format!("{} is not an initialized token account", token_account))
    })?;

    if account_state.mint != *mint {
        return Err(single(
            "splTokenAccount",
            format!(
                "token account mint ({}) does not match splToken {}",
                account_state.mint, mint
            ),
        ));
    }
    Ok(mint_state.decimals)
}
