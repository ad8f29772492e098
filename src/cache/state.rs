//! Persisted deployment progress.
//!
//! JSON shape, kept compatible with cache files written by earlier tools:
//! ```text
//! {
//!   "program": { "uuid": "...", "candyMachine": "<base58>" } | {},
//!   "items": { "0": { "name", "uri", "onChain", "verifyRun" }, ... },
//!   "env": "devnet",
//!   "cacheName": "temp"
//! }
//! ```

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;

use crate::blockchain::types::{parse_address, BlockchainResult};

/// Identity of a created configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub identity_tag: String,
    pub ledger_address: Pubkey,
}

/// Raw `program` object; both fields present once the record exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candy_machine: Option<String>,
}

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub on_chain: bool,
    /// Needs a future verification pass; reset whenever `on_chain` flips.
    #[serde(default)]
    pub verify_run: bool,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            on_chain: false,
            verify_run: false,
        }
    }
}

/// Full persisted unit for one (environment, cache name) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    #[serde(default)]
    pub program: ProgramEntry,
    #[serde(default)]
    pub items: BTreeMap<u32, ItemRecord>,
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub cache_name: String,
}

impl DeploymentState {
    pub fn new(env: &str, cache_name: &str) -> Self {
        Self {
            env: env.to_string(),
            cache_name: cache_name.to_string(),
            ..Self::default()
        }
    }

    /// The created record, if any.
    ///
    /// A half-written `program` entry counts as absent here. Callers check
    /// [`has_partial_record`](Self::has_partial_record) first. An unparseable
    /// address is reported as an error.
    pub fn record(&self) -> BlockchainResult<Option<DeploymentRecord>> {
        match (&self.program.uuid, &self.program.candy_machine) {
            (Some(uuid), Some(address)) => Ok(Some(DeploymentRecord {
                identity_tag: uuid.clone(),
                ledger_address: parse_address(address)?,
            })),
            _ => Ok(None),
        }
    }

    /// True when exactly one of `uuid` and `candyMachine` is stored.
    pub fn has_partial_record(&self) -> bool {
        self.program.uuid.is_some() != self.program.candy_machine.is_some()
    }

    /// Store the record identity. Returns `false` if any part of one was
    /// already set.
    pub fn set_record(&mut self, record: &DeploymentRecord) -> bool {
        if self.program.uuid.is_some() || self.program.candy_machine.is_some() {
            return false;
        }
        self.program.uuid = Some(record.identity_tag.clone());
        self.program.candy_machine = Some(record.ledger_address.to_string());
        true
    }

    /// Mark a contiguous index range as confirmed on-chain.
    pub fn mark_on_chain(&mut self, start: u32, end_inclusive: u32) {
        for index in start..=end_inclusive {
            if let Some(item) = self.items.get_mut(&index) {
                item.on_chain = true;
                item.verify_run = false;
            }
        }
    }

    pub fn is_on_chain(&self, index: u32) -> bool {
        self.items.get(&index).is_some_and(|item| item.on_chain)
    }

    /// Number of items confirmed on-chain.
    pub fn on_chain_count(&self) -> usize {
        self.items.values().filter(|item| item.on_chain).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_program_serializes_as_empty_object() {
        let state = DeploymentState::new("devnet", "temp");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["program"], serde_json::json!({}));
        assert_eq!(json["cacheName"], "temp");
        assert_eq!(json["env"], "devnet");
    }

    #[test]
    fn test_reads_legacy_shape() {
        let record = Pubkey::new_unique();
        let json = format!(
            r#"{{
                "program": {{ "uuid": "abcdef", "candyMachine": "{}" }},
                "items": {{
                    "0": {{ "name": "A #0", "uri": "https://a/0", "onChain": true }},
                    "1": {{ "name": "A #1", "uri": "https://a/1", "onChain": false, "verifyRun": true }}
                }},
                "env": "devnet",
                "cacheName": "temp"
            }}"#,
            record
        );
        let state: DeploymentState = serde_json::from_str(&json).unwrap();

        let stored = state.record().unwrap().unwrap();
        assert_eq!(stored.identity_tag, "abcdef");
        assert_eq!(stored.ledger_address, record);
        assert!(state.is_on_chain(0));
        assert!(!state.is_on_chain(1));
        assert!(state.items[&1].verify_run);
        assert!(!state.items[&0].verify_run);
    }

    #[test]
    fn test_record_set_once() {
        let mut state = DeploymentState::new("devnet", "temp");
        assert!(state.record().unwrap().is_none());

        let first = DeploymentRecord {
            identity_tag: "first1".to_string(),
            ledger_address: Pubkey::new_unique(),
        };
        assert!(state.set_record(&first));

        let second = DeploymentRecord {
            identity_tag: "second".to_string(),
            ledger_address: Pubkey::new_unique(),
        };
        assert!(!state.set_record(&second));
        assert_eq!(state.record().unwrap(), Some(first));
    }

    #[test]
    fn test_half_written_record_is_detected() {
        let mut state = DeploymentState::new("devnet", "temp");
        assert!(!state.has_partial_record());

        state.program.candy_machine = Some(Pubkey::new_unique().to_string());
        assert!(state.has_partial_record());
        assert!(state.record().unwrap().is_none());

        let record = DeploymentRecord {
            identity_tag: "fresh1".to_string(),
            ledger_address: Pubkey::new_unique(),
        };
        assert!(!state.set_record(&record));

        state.program.candy_machine = None;
        state.program.uuid = Some("stale1".to_string());
        assert!(state.has_partial_record());

        state.program.uuid = None;
        assert!(state.set_record(&record));
        assert!(!state.has_partial_record());
    }

    #[test]
    fn test_mark_on_chain_resets_verify_run() {
        let mut state = DeploymentState::new("devnet", "temp");
        for i in 0..5 {
            let mut item = ItemRecord::new(format!("#{}", i), format!("u{}", i));
            item.verify_run = true;
            state.items.insert(i, item);
        }

        state.mark_on_chain(1, 3);
        assert_eq!(state.on_chain_count(), 3);
        assert!(!state.is_on_chain(0));
        assert!(state.is_on_chain(3));
        assert!(!state.items[&2].verify_run);
        assert!(state.items[&4].verify_run);
    }
}
