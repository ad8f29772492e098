//! Operator settings schema.
//!
//! All types derive Serde traits for deserialization from a TOML file.
//! Every table has defaults so an absent file means "use the defaults".

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root operator settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ToolConfig {
    /// Endpoints and RPC behaviour.
    pub cluster: ClusterConfig,

    /// On-disk progress cache location.
    pub cache: CacheConfig,

    /// Bulk upload batching.
    pub upload: UploadConfig,

    /// Program ids.
    pub program: ProgramConfig,
}

/// Name of the environment used when an unknown name is given.
pub const DEFAULT_ENV: &str = "devnet";

/// Cluster endpoint and RPC settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Environment name -> RPC URL.
    pub endpoints: BTreeMap<String, String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Commitment level: processed, confirmed or finalized.
    pub commitment: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        let endpoints = [
            ("devnet", "https://api.devnet.solana.com"),
            ("testnet", "https://api.testnet.solana.com"),
            ("mainnet-beta", "https://api.mainnet-beta.solana.com"),
            ("localnet", "http://127.0.0.1:8899"),
        ]
        .into_iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect();

        Self {
            endpoints,
            rpc_timeout_secs: 60,
            commitment: "confirmed".to_string(),
        }
    }
}

impl ClusterConfig {
    /// Resolve the RPC URL for `env`, preferring an explicit override.
    ///
    /// Unknown environment names fall back to devnet.
    pub fn resolve_url(&self, env: &str, custom_rpc_url: Option<&str>) -> String {
        if let Some(url) = custom_rpc_url {
            tracing::info!(rpc_url = %url, "Using custom RPC URL");
            return url.to_string();
        }
        self.endpoints
            .get(env)
            .or_else(|| self.endpoints.get(DEFAULT_ENV))
            .cloned()
            .unwrap_or_else(|| "https://api.devnet.solana.com".to_string())
    }

    /// Commitment as understood by the RPC client.
    pub fn commitment_config(&self) -> CommitmentConfig {
        match self.commitment.as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }
}

/// Progress cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON file per (environment, cache name).
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cache"),
        }
    }
}

/// Batching used when pushing item records to the ledger.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    /// Items per outer slice.
    pub outer_batch_size: usize,

    /// Items per ledger write.
    pub group_size: usize,

    /// Outer slices processed at the same time.
    pub max_concurrent_slices: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            outer_batch_size: 1000,
            group_size: 10,
            max_concurrent_slices: 4,
        }
    }
}

/// Program ids (base58).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub candy_machine_id: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            candy_machine_id: crate::blockchain::types::CANDY_MACHINE_PROGRAM_ID.to_string(),
        }
    }
}
