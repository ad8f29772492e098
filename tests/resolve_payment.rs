//! Payment account resolution against an in-memory ledger.

mod common;

use serde_json::json;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::solana_program::program_option::COption;
use spl_token::state::{Account, AccountState, Mint};

use candy_operator::blockchain::address::AddressDeriver;
use candy_operator::blockchain::types::LAMPORTS_PER_SOL;
use candy_operator::config::{resolve_deployment, ConfigError, RawDeploymentConfig};
use common::MockLedger;

fn document(extra: serde_json::Value) -> RawDeploymentConfig {
    let mut doc = json!({ "number": 3, "price": 1.5, "symbol": "CNDY" });
    if let (Some(doc), Some(extra)) = (doc.as_object_mut(), extra.as_object()) {
        doc.extend(extra.clone());
    }
    serde_json::from_value(doc).unwrap()
}

fn put_mint(ledger: &MockLedger, address: Pubkey, decimals: u8) {
    let mint = Mint {
        mint_authority: COption::None,
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(mint, &mut data).unwrap();
    ledger.put_account(address, data);
}

fn put_token_account(ledger: &MockLedger, address: Pubkey, mint: Pubkey, owner: Pubkey) {
    let account = Account {
        mint,
        owner,
        amount: 0,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; Account::LEN];
    Account::pack(account, &mut data).unwrap();
    ledger.put_account(address, data);
}

fn failed_field(err: ConfigError) -> String {
    match err {
        ConfigError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            errors[0].field.clone()
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_native_price_and_payer_treasury() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();

    let settings = resolve_deployment(document(json!({ "price": 2 })), &payer, &ledger)
        .await
        .unwrap();

    assert_eq!(settings.data.price, 2 * LAMPORTS_PER_SOL);
    assert_eq!(settings.treasury, payer);
    assert!(settings.token_mint.is_none());
}

#[tokio::test]
async fn test_explicit_native_treasury() {
    let ledger = MockLedger::new();
    let treasury = Pubkey::new_unique();

    let settings = resolve_deployment(
        document(json!({ "solTreasuryAccount": treasury.to_string() })),
        &Pubkey::new_unique(),
        &ledger,
    )
    .await
    .unwrap();

    assert_eq!(settings.treasury, treasury);
}

#[tokio::test]
async fn test_token_price_uses_mint_decimals_and_payer_holder_account() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let mint = Pubkey::new_unique();
    let holder = AddressDeriver::default().holder_token_account(&payer, &mint);
    put_mint(&ledger, mint, 6);
    put_token_account(&ledger, holder, mint, payer);

    let settings = resolve_deployment(document(json!({ "splToken": mint.to_string() })), &payer, &ledger)
        .await
        .unwrap();

    assert_eq!(settings.data.price, 1_500_000);
    assert_eq!(settings.treasury, holder);
    assert_eq!(settings.token_mint, Some(mint));
}

#[tokio::test]
async fn test_explicit_token_account_is_the_treasury() {
    let ledger = MockLedger::new();
    let mint = Pubkey::new_unique();
    let account = Pubkey::new_unique();
    put_mint(&ledger, mint, 0);
    put_token_account(&ledger, account, mint, Pubkey::new_unique());

    let settings = resolve_deployment(
        document(json!({
            "price": 7,
            "splToken": mint.to_string(),
            "splTokenAccount": account.to_string()
        })),
        &Pubkey::new_unique(),
        &ledger,
    )
    .await
    .unwrap();

    assert_eq!(settings.data.price, 7);
    assert_eq!(settings.treasury, account);
}

#[tokio::test]
async fn test_missing_mint_is_rejected() {
    let ledger = MockLedger::new();
    let mint = Pubkey::new_unique();

    let err = resolve_deployment(document(json!({ "splToken": mint.to_string() })), &Pubkey::new_unique(), &ledger)
        .await
        .unwrap_err();

    assert_eq!(failed_field(err), "splToken");
}

#[tokio::test]
async fn test_uninitialized_mint_is_rejected() {
    let ledger = MockLedger::new();
    let payer = Pubkey::new_unique();
    let mint = Pubkey::new_unique();
    ledger.put_account(mint, vec![0u8; Mint::LEN]);
    put_token_account(
        &ledger,
        AddressDeriver::default().holder_token_account(&payer, &mint),
        mint,
        payer,
    );

    let err = resolve_deployment(document(json!({ "splToken": mint.to_string() })), &payer, &ledger)
        .await
        .unwrap_err();

    assert_eq!(failed_field(err), "splToken");
}

#[tokio::test]
async fn test_missing_token_account_is_rejected() {
    let ledger = MockLedger::new();
    let mint = Pubkey::new_unique();
    put_mint(&ledger, mint, 6);

    let err = resolve_deployment(document(json!({ "splToken": mint.to_string() })), &Pubkey::new_unique(), &ledger)
        .await
        .unwrap_err();

    assert_eq!(failed_field(err), "splTokenAccount");
}

#[tokio::test]
async fn test_token_account_for_another_mint_is_rejected() {
    let ledger = MockLedger::new();
    let mint = Pubkey::new_unique();
    let account = Pubkey::new_unique();
    put_mint(&ledger, mint, 6);
    put_token_account(&ledger, account, Pubkey::new_unique(), Pubkey::new_unique());

    let err = resolve_deployment(
        document(json!({
            "splToken": mint.to_string(),
            "splTokenAccount": account.to_string()
        })),
        &Pubkey::new_unique(),
        &ledger,
    )
    .await
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("does not match"), "{}", message);
    assert_eq!(failed_field(err), "splTokenAccount");
}

#[tokio::test]
async fn test_conflicting_treasury_fails_before_lookup() {
    let ledger = MockLedger::new();
    let mint = Pubkey::new_unique();

    let err = resolve_deployment(
        document(json!({
            "splToken": mint.to_string(),
            "solTreasuryAccount": Pubkey::new_unique().to_string()
        })),
        &Pubkey::new_unique(),
        &ledger,
    )
    .await
    .unwrap_err();

    assert_eq!(failed_field(err), "solTreasuryAccount");
}
