//! Bulk item upload with resume.
//!
//! # Responsibilities
//! - Split the index range into outer slices and inner groups
//! - Write each group with one `add_config_lines` submission
//! - Mark confirmed groups on-chain and persist after every one
//! - Keep going when a group fails; the next run retries only that group
//!
//! Slices run concurrently up to `max_concurrent_slices`; the groups of a
//! slice all run at once. The deployment state sits behind one async mutex
//! and every save happens while it is held, so persisted snapshots never
//! interleave.

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::client::Ledger;
use crate::blockchain::program::{add_config_lines, ConfigLine};
use crate::cache::state::DeploymentState;
use crate::cache::store::{CacheError, CacheStore};
use crate::config::schema::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("item {0} has no cached name/uri")]
    MissingItem(u32),

    #[error("failed to persist upload progress: {0}")]
    Cache(#[from] CacheError),
}

/// A group whose write did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub start_index: u32,
    /// Inclusive.
    pub end_index: u32,
    pub reason: String,
}

/// Outcome of one upload run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub written_groups: usize,
    pub skipped_groups: usize,
    pub failures: Vec<GroupFailure>,
}

impl UploadReport {
    /// True when no group failed.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_groups(&self) -> usize {
        self.written_groups + self.skipped_groups + self.failures.len()
    }
}

enum GroupOutcome {
    Written,
    Skipped,
    Failed(GroupFailure),
}

/// Pushes cached items into a configuration record.
pub struct ConfigUploader {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn CacheStore>,
    config: UploadConfig,
    program_id: Pubkey,
}

impl ConfigUploader {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn CacheStore>,
        config: UploadConfig,
        program_id: Pubkey,
    ) -> Self {
        Self {
            ledger,
            store,
            config,
            program_id,
        }
    }

    /// Upload every item of `0..item_count` not yet on-chain.
    ///
    /// Returns the updated state. Group failures are reported, not returned as
    /// errors; only a missing item or the final save fails the call.
    pub async fn upload(
        &self,
        state: DeploymentState,
        candy_machine: &Pubkey,
        authority: &Keypair,
        item_count: u32,
    ) -> Result<(DeploymentState, UploadReport), UploadError> {
        if let Some(missing) = (0..item_count).find(|i| !state.items.contains_key(i)) {
            return Err(UploadError::MissingItem(missing));
        }

        let env = state.env.clone();
        let cache_name = state.cache_name.clone();
        let shared = Mutex::new(state);

        let slices = partition(0..item_count, self.config.outer_batch_size);
        tracing::info!(
            candy_machine = %candy_machine,
            items = item_count,
            slices = slices.len(),
            group_size = self.config.group_size,
            "Starting item upload"
        );

        let outcomes: Vec<Vec<GroupOutcome>> = stream::iter(slices)
            .map(|slice| self.upload_slice(&shared, &env, &cache_name, candy_machine, authority, slice))
            .buffer_unordered(self.config.max_concurrent_slices.max(1))
            .collect()
            .await;

        let mut report = UploadReport::default();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                GroupOutcome::Written => report.written_groups += 1,
                GroupOutcome::Skipped => report.skipped_groups += 1,
                GroupOutcome::Failed(failure) => report.failures.push(failure),
            }
        }
        report.failures.sort_by_key(|f| f.start_index);

        let state = shared.into_inner();
        self.store.save(&env, &cache_name, &state)?;

        tracing::info!(
            written = report.written_groups,
            skipped = report.skipped_groups,
            failed = report.failures.len(),
            on_chain = state.on_chain_count(),
            "Item upload finished"
        );
        Ok((state, report))
    }

    async fn upload_slice(
        &self,
        shared: &Mutex<DeploymentState>,
        env: &str,
        cache_name: &str,
        candy_machine: &Pubkey,
        authority: &Keypair,
        slice: Range<u32>,
    ) -> Vec<GroupOutcome> {
        tracing::debug!(start_index = slice.start, end_index = slice.end, "Processing slice");
        let groups = partition(slice, self.config.group_size);
        join_all(
            groups
                .into_iter()
                .map(|group| self.upload_group(shared, env, cache_name, candy_machine, authority, group)),
        )
        .await
    }

    async fn upload_group(
        &self,
        shared: &Mutex<DeploymentState>,
        env: &str,
        cache_name: &str,
        candy_machine: &Pubkey,
        authority: &Keypair,
        group: Range<u32>,
    ) -> GroupOutcome {
        let start_index = group.start;
        let end_index = group.end.saturating_sub(1);
        let failed = |reason: String| {
            tracing::error!(start_index, end_index, error = %reason, "Config line group failed");
            GroupOutcome::Failed(GroupFailure {
                start_index,
                end_index,
                reason,
            })
        };

        let lines = {
            let state = shared.lock().await;
            if group.clone().all(|i| state.is_on_chain(i)) {
                tracing::debug!(start_index, end_index, "Group already on-chain, skipping");
                return GroupOutcome::Skipped;
            }
            let lines: Option<Vec<ConfigLine>> = group
                .clone()
                .map(|i| {
                    state.items.get(&i).map(|item| ConfigLine {
                        name: item.name.clone(),
                        uri: item.uri.clone(),
                    })
                })
                .collect();
            match lines {
                Some(lines) => lines,
                None => return failed("group references an uncached item".to_string()),
            }
        };

        let authority_key = authority.pubkey();
        let instruction = match add_config_lines(&self.program_id, candy_machine, &authority_key, start_index, lines) {
            Ok(instruction) => instruction,
            Err(e) => return failed(e.to_string()),
        };

        let signature = match self
            .ledger
            .send_and_confirm(&[instruction], &authority_key, &[authority])
            .await
        {
            Ok(signature) => signature,
            Err(e) => return failed(e.to_string()),
        };

        let mut state = shared.lock().await;
        state.mark_on_chain(start_index, end_index);
        if let Err(e) = self.store.save(env, cache_name, &state) {
            return failed(format!("written in {} but not persisted: {}", signature, e));
        }
        tracing::info!(start_index, end_index, signature = %signature, "Config lines written");
        GroupOutcome::Written
    }
}

/// Split `range` into consecutive chunks of at most `size` indices.
fn partition(range: Range<u32>, size: usize) -> Vec<Range<u32>> {
    let size = u32::try_from(size).unwrap_or(u32::MAX).max(1);
    let mut chunks = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = start.saturating_add(size).min(range.end);
        chunks.push(start..end);
        start = end;
    }
    chunks
}
