//! Recovery of identifiers from the deployment CLI's text output.
//!
//! The CLI prints loosely structured `key: value` lines. The pipeline only
//! talks to the [`OutputExtractor`] trait, so the marker convention can be
//! replaced by a structured format without touching the stage logic.

use derive_more::{Deref, Display, From};
use serde::{Deserialize, Serialize};

/// Marker key of the class hash in declare output.
pub const CLASS_HASH_KEY: &str = "class_hash";
/// Marker key of the contract address in deploy output.
pub const CONTRACT_ADDRESS_KEY: &str = "contract_address";

/// Identifier of a declared contract class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassHash(String);

/// Identifier of a deployed contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(String);

/// Pulls the value of a keyed line out of command output.
pub trait OutputExtractor: Send + Sync {
    /// Return the token recorded under `key`, or `None` when the output has no such entry.
    fn extract(&self, output: &str, key: &str) -> Option<String>;

    fn class_hash(&self, output: &str) -> Option<ClassHash> {
        self.extract(output, CLASS_HASH_KEY).map(ClassHash::from)
    }

    fn contract_address(&self, output: &str) -> Option<ContractAddress> {
        self.extract(output, CONTRACT_ADDRESS_KEY)
            .map(ContractAddress::from)
    }
}

/// Line-oriented `key:` marker scanner.
///
/// The first line (top to bottom) containing `key:` wins; the token is
/// whatever follows the first occurrence of the marker on that line, trimmed.
/// Text before the marker is ignored, colons included.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerExtractor;

impl OutputExtractor for MarkerExtractor {
    fn extract(&self, output: &str, key: &str) -> Option<String> {
        let marker = format!("{key}:");

        output.lines().find_map(|line| {
            line.find(&marker)
                .map(|start| line[start + marker.len()..].trim().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARE_OUTPUT: &str = "command: declare\n\
        class_hash: 0x0123abc\n\
        transaction_hash: 0x0456def\n";

    #[test]
    fn test_extracts_class_hash() {
        let hash = MarkerExtractor.class_hash(DECLARE_OUTPUT).unwrap();
        assert_eq!(hash.as_str(), "0x0123abc");
    }

    #[test]
    fn test_missing_marker_is_none() {
        assert_eq!(MarkerExtractor.extract("command: declare\nerror: boom", "class_hash"), None);
        assert_eq!(MarkerExtractor.contract_address(""), None);
    }

    #[test]
    fn test_first_match_wins() {
        let output = "contract_address: 0x1\ncontract_address: 0x2\n";
        assert_eq!(
            MarkerExtractor.extract(output, CONTRACT_ADDRESS_KEY).as_deref(),
            Some("0x1")
        );
    }

    #[test]
    fn test_prefix_before_marker_is_ignored() {
        let output = "12:00:01 INFO result: class_hash:   0xABC  \n";
        assert_eq!(
            MarkerExtractor.extract(output, CLASS_HASH_KEY).as_deref(),
            Some("0xABC")
        );
    }

    #[test]
    fn test_only_first_marker_occurrence_splits() {
        let output = "class_hash: 0xA class_hash: 0xB";
        assert_eq!(
            MarkerExtractor.extract(output, CLASS_HASH_KEY).as_deref(),
            Some("0xA class_hash: 0xB")
        );
    }

    #[test]
    fn test_key_without_colon_does_not_match() {
        let output = "class_hash 0xABC\nclass_hash_extra: 0x1";
        assert_eq!(MarkerExtractor.extract(output, CLASS_HASH_KEY), None);
    }
}
