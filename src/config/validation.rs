//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Value ranges (batch sizes, fee basis points, creator shares)
//! - Mutually exclusive options (hidden vs. sequel, treasury vs. payment token)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the parsed document
//! - Runs before anything is written to the ledger or the cache

use std::fmt;

use crate::blockchain::program::{MAX_CREATOR_LIMIT, MAX_NAME_LENGTH, MAX_SYMBOL_LENGTH, MAX_URI_LENGTH};
use crate::blockchain::types::parse_address;
use crate::config::deployment::RawDeploymentConfig;
use crate::config::schema::ToolConfig;

/// A single semantic problem with a configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field path, e.g. `upload.group_size` or `creators[1].address`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate operator settings.
pub fn validate_tool_config(config: &ToolConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cluster.endpoints.is_empty() {
        errors.push(ValidationError::new("cluster.endpoints", "at least one endpoint is required"));
    }
    for (env, endpoint) in &config.cluster.endpoints {
        if let Err(e) = url::Url::parse(endpoint) {
            errors.push(ValidationError::new(
                format!("cluster.endpoints.{}", env),
                format!("invalid URL '{}': {}", endpoint, e),
            ));
        }
    }
    if config.cluster.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("cluster.rpc_timeout_secs", "must be greater than 0"));
    }
    if !matches!(config.cluster.commitment.as_str(), "processed" | "confirmed" | "finalized") {
        errors.push(ValidationError::new(
            "cluster.commitment",
            format!("unknown commitment '{}'", config.cluster.commitment),
        ));
    }

    let upload = &config.upload;
    if upload.outer_batch_size == 0 {
        errors.push(ValidationError::new("upload.outer_batch_size", "must be greater than 0"));
    }
    if upload.group_size == 0 || upload.group_size > upload.outer_batch_size {
        errors.push(ValidationError::new(
            "upload.group_size",
            format!("must be between 1 and outer_batch_size ({})", upload.outer_batch_size),
        ));
    }
    if upload.max_concurrent_slices == 0 {
        errors.push(ValidationError::new("upload.max_concurrent_slices", "must be at least 1"));
    }

    if parse_address(&config.program.candy_machine_id).is_err() {
        errors.push(ValidationError::new(
            "program.candy_machine_id",
            format!("invalid address '{}'", config.program.candy_machine_id),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a configuration input document before resolution.
pub fn validate_deployment(raw: &RawDeploymentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if raw.number == 0 {
        errors.push(ValidationError::new("number", "must be greater than 0"));
    }
    if raw.symbol.len() > MAX_SYMBOL_LENGTH {
        errors.push(ValidationError::new(
            "symbol",
            format!("at most {} bytes", MAX_SYMBOL_LENGTH),
        ));
    }
    if raw.seller_fee_basis_points > 10_000 {
        errors.push(ValidationError::new("sellerFeeBasisPoints", "must be at most 10000"));
    }
    if !raw.price.is_finite() || raw.price < 0.0 {
        errors.push(ValidationError::new("price", "must be a non-negative number"));
    }

    // the program appends its own creator entry
    if raw.creators.len() > MAX_CREATOR_LIMIT - 1 {
        errors.push(ValidationError::new(
            "creators",
            format!("at most {} creators", MAX_CREATOR_LIMIT - 1),
        ));
    }
    for (i, creator) in raw.creators.iter().enumerate() {
        check_address(&mut errors, &format!("creators[{}].address", i), &creator.address);
    }
    if !raw.creators.is_empty() {
        let total: u32 = raw.creators.iter().map(|c| c.share as u32).sum();
        if total != 100 {
            errors.push(ValidationError::new(
                "creators",
                format!("shares must sum to 100, got {}", total),
            ));
        }
    }

    if raw.sol_treasury_account.is_some() && (raw.spl_token.is_some() || raw.spl_token_account.is_some()) {
        errors.push(ValidationError::new(
            "solTreasuryAccount",
            "cannot be set together with splToken or splTokenAccount",
        ));
    }
    if raw.spl_token_account.is_some() && raw.spl_token.is_none() {
        errors.push(ValidationError::new(
            "splTokenAccount",
            "splToken must also be set",
        ));
    }
    for (field, value) in [
        ("splToken", &raw.spl_token),
        ("splTokenAccount", &raw.spl_token_account),
        ("solTreasuryAccount", &raw.sol_treasury_account),
    ] {
        if let Some(value) = value {
            check_address(&mut errors, field, value);
        }
    }

    if let Some(gatekeeper) = &raw.gatekeeper {
        check_address(&mut errors, "gatekeeper.gatekeeperNetwork", &gatekeeper.gatekeeper_network);
    }
    if let Some(whitelist) = &raw.whitelist_mint_settings {
        check_address(&mut errors, "whitelistMintSettings.mint", &whitelist.mint);
        if whitelist.mode.burn_every_time == whitelist.mode.never_burn {
            errors.push(ValidationError::new(
                "whitelistMintSettings.mode",
                "exactly one of burnEveryTime or neverBurn must be set",
            ));
        }
        if let Some(discount) = whitelist.discount_price {
            if !discount.is_finite() || discount < 0.0 {
                errors.push(ValidationError::new(
                    "whitelistMintSettings.discountPrice",
                    "must be a non-negative number",
                ));
            }
        }
    }
    if let Some(end) = &raw.end_settings {
        if end.end_setting_type.date == end.end_setting_type.amount {
            errors.push(ValidationError::new(
                "endSettings.endSettingType",
                "exactly one of date or amount must be set",
            ));
        }
    }

    if raw.hidden_settings.is_some() && raw.sequel_settings.is_some() {
        errors.push(ValidationError::new(
            "hiddenSettings",
            "cannot be combined with sequelSettings",
        ));
    }
    if let Some(hidden) = &raw.hidden_settings {
        check_line(&mut errors, "hiddenSettings", &hidden.name, &hidden.uri);
        if hidden.hash.len() != 32 {
            errors.push(ValidationError::new(
                "hiddenSettings.hash",
                format!("must be exactly 32 bytes, got {}", hidden.hash.len()),
            ));
        }
    }
    if let Some(sequel) = &raw.sequel_settings {
        // longest generated entry is the one for the last index
        let last = raw.number.saturating_sub(1);
        check_line(
            &mut errors,
            "sequelSettings",
            &format!("{} #{}", sequel.name, last),
            &format!("{}{}", sequel.uri, last),
        );
    }
    if let Some(items) = &raw.items {
        if items.len() as u64 > raw.number {
            errors.push(ValidationError::new(
                "items",
                format!("{} entries for {} items", items.len(), raw.number),
            ));
        }
        for (i, item) in items.iter().enumerate() {
            check_line(&mut errors, &format!("items[{}]", i), &item.name, &item.uri);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if parse_address(value).is_err() {
        errors.push(ValidationError::new(field, format!("invalid address '{}'", value)));
    }
}

fn check_line(errors: &mut Vec<ValidationError>, field: &str, name: &str, uri: &str) {
    if name.len() > MAX_NAME_LENGTH {
        errors.push(ValidationError::new(
            format!("{}.name", field),
            format!("at most {} bytes", MAX_NAME_LENGTH),
        ));
    }
    if uri.len() > MAX_URI_LENGTH {
        errors.push(ValidationError::new(
            format!("{}.uri", field),
            format!("at most {} bytes", MAX_URI_LENGTH),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawDeploymentConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_tool_config_is_valid() {
        assert!(validate_tool_config(&ToolConfig::default()).is_ok());
    }

    #[test]
    fn test_tool_config_collects_all_errors() {
        let mut config = ToolConfig::default();
        config.upload.group_size = 0;
        config.upload.max_concurrent_slices = 0;
        config.program.candy_machine_id = "bogus".to_string();

        let errors = validate_tool_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "upload.group_size"));
        assert!(errors.iter().any(|e| e.field == "program.candy_machine_id"));
    }

    #[test]
    fn test_group_size_bounded_by_outer_batch() {
        let mut config = ToolConfig::default();
        config.upload.outer_batch_size = 5;
        config.upload.group_size = 10;
        assert!(validate_tool_config(&config).is_err());
    }

    #[test]
    fn test_minimal_deployment_is_valid() {
        let doc = raw(r#"{ "number": 3, "price": 1.5 }"#);
        assert!(validate_deployment(&doc).is_ok());
    }

    #[test]
    fn test_hidden_and_sequel_are_exclusive() {
        let doc = raw(
            r#"{
                "number": 3,
                "price": 1,
                "hiddenSettings": { "name": "h", "uri": "u", "hash": "01234567890123456789012345678901" },
                "sequelSettings": { "name": "s", "uri": "u", "sequelMint": true }
            }"#,
        );
        let errors = validate_deployment(&doc).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "hiddenSettings"));
    }

    #[test]
    fn test_treasury_conflicts_with_payment_token() {
        let mint = solana_sdk::pubkey::Pubkey::new_unique().to_string();
        let doc = raw(&format!(
            r#"{{ "number": 1, "price": 1, "splToken": "{m}", "solTreasuryAccount": "{m}" }}"#,
            m = mint
        ));
        let errors = validate_deployment(&doc).unwrap_err();
        assert_eq!(errors[0].field, "solTreasuryAccount");
    }

    #[test]
    fn test_token_account_requires_token() {
        let account = solana_sdk::pubkey::Pubkey::new_unique().to_string();
        let doc = raw(&format!(
            r#"{{ "number": 1, "price": 1, "splTokenAccount": "{}" }}"#,
            account
        ));
        let errors = validate_deployment(&doc).unwrap_err();
        assert_eq!(errors[0].field, "splTokenAccount");
    }

    #[test]
    fn test_deployment_collects_multiple_errors() {
        let doc = raw(
            r#"{
                "number": 0,
                "price": -1,
                "symbol": "WAY-TOO-LONG-SYMBOL",
                "sellerFeeBasisPoints": 20000,
                "creators": [{ "address": "nope", "share": 50 }]
            }"#,
        );
        let errors = validate_deployment(&doc).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"number"));
        assert!(fields.contains(&"price"));
        assert!(fields.contains(&"symbol"));
        assert!(fields.contains(&"sellerFeeBasisPoints"));
        assert!(fields.contains(&"creators[0].address"));
        assert!(fields.contains(&"creators"));
    }

    #[test]
    fn test_hidden_hash_length() {
        let doc = raw(
            r#"{ "number": 1, "price": 1, "hiddenSettings": { "name": "h", "uri": "u", "hash": "short" } }"#,
        );
        let errors = validate_deployment(&doc).unwrap_err();
        assert_eq!(errors[0].field, "hiddenSettings.hash");
    }
}
