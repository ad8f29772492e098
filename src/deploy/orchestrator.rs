//! One-time record creation plus the upload phase.
//!
//! ```text
//! Uninitialized ──create──▶ RecordCreated ──▶ ItemsUploading ──▶ Done
//!                                 │
//!                                 └──────────▶ SkippedUpload (hidden / sequel mint)
//! ```
//!
//! A run against a cache that already holds a record starts at
//! `RecordCreated`. Creation failure aborts the run without touching the
//! cache. So does a cached `program` entry holding only half an identity,
//! and that check happens before any ledger call.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::client::Ledger;
use crate::blockchain::program::{initialize_candy_machine, InitializeAccounts};
use crate::blockchain::types::BlockchainError;
use crate::cache::state::{DeploymentRecord, DeploymentState, ItemRecord};
use crate::cache::store::{CacheError, CacheStore};
use crate::config::deployment::{sequel_item, DeploymentSettings};
use crate::deploy::uploader::{ConfigUploader, UploadError, UploadReport};

/// Length of the identity tag taken from the record address.
pub const IDENTITY_TAG_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("item {index} has no name/uri in the cache or the items catalogue")]
    MissingItem { index: u32 },

    #[error("configuration record creation failed: {0}")]
    RecordCreation(#[source] BlockchainError),

    #[error("cached record is unreadable: {0}")]
    CorruptRecord(#[source] BlockchainError),

    #[error("cached program entry for {env}/{cache_name} has only one of uuid/candyMachine")]
    PartialRecord { env: String, cache_name: String },

    #[error("item count {0} exceeds the supported index range")]
    TooManyItems(u64),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Uninitialized,
    RecordCreated,
    ItemsUploading,
    SkippedUpload,
    Done,
}

/// Result of a deploy run.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub record: DeploymentRecord,
    /// Whether this run created the record (false on resume).
    pub created: bool,
    /// Phases visited, in order.
    pub phases: Vec<DeployPhase>,
    /// Present when the upload phase ran.
    pub upload: Option<UploadReport>,
}

impl DeployReport {
    /// False if any upload group failed.
    pub fn success(&self) -> bool {
        self.upload.as_ref().map_or(true, UploadReport::success)
    }
}

/// Drives a deployment for one `(env, cache_name)` pair.
pub struct DeploymentOrchestrator {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn CacheStore>,
    uploader: ConfigUploader,
    program_id: Pubkey,
    env: String,
    cache_name: String,
}

impl DeploymentOrchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn CacheStore>,
        uploader: ConfigUploader,
        program_id: Pubkey,
        env: impl Into<String>,
        cache_name: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            store,
            uploader,
            program_id,
            env: env.into(),
            cache_name: cache_name.into(),
        }
    }

    pub async fn deploy(&self, settings: &DeploymentSettings, payer: &Keypair) -> Result<DeployReport, DeployError> {
        let item_count = u32::try_from(settings.item_count())
            .map_err(|_| DeployError::TooManyItems(settings.item_count()))?;

        let mut state = self
            .store
            .load(&self.env, &self.cache_name)?
            .unwrap_or_else(|| DeploymentState::new(&self.env, &self.cache_name));
        state.env = self.env.clone();
        state.cache_name = self.cache_name.clone();
        if state.has_partial_record() {
            return Err(self.partial_record());
        }

        if settings.uploads_items() {
            fill_items(&mut state, settings, item_count)?;
        }

        let mut phases = vec![DeployPhase::Uninitialized];
        let (record, created) = match state.record().map_err(DeployError::CorruptRecord)? {
            Some(record) => {
                tracing::info!(
                    candy_machine = %record.ledger_address,
                    uuid = %record.identity_tag,
                    "Resuming existing deployment"
                );
                (record, false)
            }
            None => {
                let record = self.create_record(settings, payer).await?;
                if !state.set_record(&record) {
                    return Err(self.partial_record());
                }
                if let Some(sequel) = &settings.data.sequel_settings {
                    for index in 0..item_count {
                        let placeholder = sequel_item(sequel, index);
                        let item = state
                            .items
                            .entry(index)
                            .or_insert_with(|| ItemRecord::new(placeholder.name, placeholder.uri));
                        item.on_chain |= sequel.sequel_mint;
                    }
                }
                self.store.save(&self.env, &self.cache_name, &state)?;
                (record, true)
            }
        };
        phases.push(DeployPhase::RecordCreated);

        if !settings.uploads_items() {
            tracing::info!(candy_machine = %record.ledger_address, "Upload phase skipped");
            phases.push(DeployPhase::SkippedUpload);
            return Ok(DeployReport {
                record,
                created,
                phases,
                upload: None,
            });
        }

        phases.push(DeployPhase::ItemsUploading);
        let (_, upload) = self
            .uploader
            .upload(state, &record.ledger_address, payer, item_count)
            .await?;
        phases.push(DeployPhase::Done);

        Ok(DeployReport {
            record,
            created,
            phases,
            upload: Some(upload),
        })
    }

    fn partial_record(&self) -> DeployError {
        DeployError::PartialRecord {
            env: self.env.clone(),
            cache_name: self.cache_name.clone(),
        }
    }

    /// Create and initialise the record account in one transaction.
    async fn create_record(
        &self,
        settings: &DeploymentSettings,
        payer: &Keypair,
    ) -> Result<DeploymentRecord, DeployError> {
        let record_keypair = Keypair::new();
        let address = record_keypair.pubkey();
        let identity_tag: String = address.to_string().chars().take(IDENTITY_TAG_LEN).collect();

        let data = settings.candy_data(identity_tag.clone());
        let size = data.account_size();
        let lamports = self
            .ledger
            .minimum_balance_for_rent_exemption(size)
            .await
            .map_err(DeployError::RecordCreation)?;

        let payer_key = payer.pubkey();
        let create = system_instruction::create_account(&payer_key, &address, lamports, size as u64, &self.program_id);
        let initialize = initialize_candy_machine(
            &self.program_id,
            &InitializeAccounts {
                candy_machine: address,
                wallet: settings.treasury,
                authority: payer_key,
                payer: payer_key,
                token_mint: settings.token_mint,
            },
            &data,
        )
        .map_err(DeployError::RecordCreation)?;

        let signature = self
            .ledger
            .send_and_confirm(&[create, initialize], &payer_key, &[payer, &record_keypair])
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Configuration record creation failed");
                DeployError::RecordCreation(e)
            })?;

        tracing::info!(
            candy_machine = %address,
            uuid = %identity_tag,
            size,
            lamports,
            signature = %signature,
            "Configuration record created"
        );
        Ok(DeploymentRecord {
            identity_tag,
            ledger_address: address,
        })
    }
}

/// Give every index a cached entry, taking new ones from the document.
fn fill_items(state: &mut DeploymentState, settings: &DeploymentSettings, item_count: u32) -> Result<(), DeployError> {
    for index in 0..item_count {
        if state.items.contains_key(&index) {
            continue;
        }
        let source = settings
            .item_source(index)
            .ok_or(DeployError::MissingItem { index })?;
        state.items.insert(index, ItemRecord::new(source.name, source.uri));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::program::{CandyMachineData, SequelSettings};
    use crate::config::deployment::ItemSource;
    use std::collections::BTreeMap;

    fn settings(items: u32, catalogue: u32) -> DeploymentSettings {
        DeploymentSettings {
            data: CandyMachineData {
                items_available: items as u64,
                ..CandyMachineData::default()
            },
            treasury: Pubkey::new_unique(),
            token_mint: None,
            items: (0..catalogue)
                .map(|i| {
                    (
                        i,
                        ItemSource {
                            name: format!("Item #{}", i),
                            uri: format!("https://arweave.net/{}", i),
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_fill_items_from_catalogue() {
        let mut state = DeploymentState::new("devnet", "temp");
        fill_items(&mut state, &settings(3, 3), 3).unwrap();
        assert_eq!(state.items.len(), 3);
        assert_eq!(state.items[&2].name, "Item #2");
    }

    #[test]
    fn test_fill_items_keeps_cached_entries() {
        let mut state = DeploymentState::new("devnet", "temp");
        let mut cached = ItemRecord::new("Cached", "https://cached");
        cached.on_chain = true;
        state.items.insert(0, cached.clone());

        fill_items(&mut state, &settings(2, 2), 2).unwrap();
        assert_eq!(state.items[&0], cached);
    }

    #[test]
    fn test_fill_items_reports_first_gap() {
        let mut state = DeploymentState::new("devnet", "temp");
        let err = fill_items(&mut state, &settings(5, 3), 5).unwrap_err();
        assert!(matches!(err, DeployError::MissingItem { index: 3 }));
    }

    #[test]
    fn test_fill_items_from_sequel_template() {
        let mut settings = settings(2, 0);
        settings.data.sequel_settings = Some(SequelSettings {
            name: "Comet".to_string(),
            uri: "https://comet/".to_string(),
            sequel_mint: false,
        });
        let mut state = DeploymentState::new("devnet", "temp");
        fill_items(&mut state, &settings, 2).unwrap();
        assert_eq!(state.items[&1].name, "Comet #1");
        assert_eq!(state.items[&1].uri, "https://comet/1");
    }
}
