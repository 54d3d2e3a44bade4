//! The durable outcome of a deployment run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extract::ContractAddress;

/// Format of [`DeploymentRecord::deployed_at`].
pub const DEPLOYMENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A pre-funded account exposed by the local node.
///
/// Fields the node reports beyond address and keys are kept untouched so the
/// record stores the node's description as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDescriptor {
    pub address: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Record written after a successful deployment and read by the interactive session.
///
/// Field names on disk follow the established `deployment-info.json` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Address of the deployed contract. Records written by this crate always carry one;
    /// `null` only appears in files left behind by a failed attempt of older tooling.
    pub contract_address: Option<ContractAddress>,
    /// Base URL of the node the contract was deployed to.
    #[serde(rename = "devnet_url")]
    pub node_url: String,
    /// Accounts available at deployment time.
    #[serde(default)]
    pub accounts: Vec<AccountDescriptor>,
    /// Local creation time, formatted with [`DEPLOYMENT_TIME_FORMAT`].
    #[serde(rename = "deployment_time")]
    pub deployed_at: String,
}

impl DeploymentRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        contract_address: ContractAddress,
        node_url: impl Into<String>,
        accounts: Vec<AccountDescriptor>,
    ) -> Self {
        Self {
            contract_address: Some(contract_address),
            node_url: node_url.into(),
            accounts,
            deployed_at: chrono::Local::now()
                .format(DEPLOYMENT_TIME_FORMAT)
                .to_string(),
        }
    }

    /// Whether two records describe the same deployment, ignoring when they were written.
    pub fn same_deployment(&self, other: &Self) -> bool {
        self.contract_address == other.contract_address
            && self.node_url == other.node_url
            && self.accounts == other.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD_JSON: &str = r#"{
        "contract_address": "0x0555",
        "devnet_url": "http://127.0.0.1:5050",
        "accounts": [
            {
                "initial_balance": "1000000000000000000000",
                "address": "0x064b48806902a367c8598f4f95c305e8c1a1acba5f082d294a43793113115691",
                "public_key": "0x039d9e6ce352ad4530a0ef5d5a18fd3303c3606a7fa6ac5b620020ad681cc33b",
                "private_key": "0x0000000000000000000000000000000071d7bb07b9a64f6f78ac4c816aff4da9"
            }
        ],
        "deployment_time": "2024-05-01 10:11:12"
    }"#;

    #[test]
    fn test_reads_existing_layout() {
        let record: DeploymentRecord = serde_json::from_str(RECORD_JSON).unwrap();

        assert_eq!(record.contract_address.as_ref().unwrap().as_str(), "0x0555");
        assert_eq!(record.node_url, "http://127.0.0.1:5050");
        assert_eq!(record.deployed_at, "2024-05-01 10:11:12");
        assert_eq!(record.accounts.len(), 1);
        assert_eq!(
            record.accounts[0].extra.get("initial_balance"),
            Some(&Value::String("1000000000000000000000".to_string()))
        );
    }

    #[test]
    fn test_unknown_account_fields_survive_round_trip() {
        let record: DeploymentRecord = serde_json::from_str(RECORD_JSON).unwrap();
        let json: Value = serde_json::to_value(&record).unwrap();

        assert_eq!(json["accounts"][0]["initial_balance"], "1000000000000000000000");
        assert_eq!(json["devnet_url"], "http://127.0.0.1:5050");
        assert!(json.get("node_url").is_none());
    }

    #[test]
    fn test_null_address_is_accepted() {
        let json = r#"{"contract_address": null, "devnet_url": "http://x", "accounts": [], "deployment_time": "t"}"#;
        let record: DeploymentRecord = serde_json::from_str(json).unwrap();
        assert!(record.contract_address.is_none());
    }

    #[test]
    fn test_same_deployment_ignores_timestamp() {
        let a = DeploymentRecord::new(ContractAddress::from("0x1".to_string()), "http://n", vec![]);
        let mut b = a.clone();
        b.deployed_at = "1999-01-01 00:00:00".to_string();
        assert!(a.same_deployment(&b));

        b.node_url = "http://other".to_string();
        assert!(!a.same_deployment(&b));
    }

    #[test]
    fn test_new_record_uses_local_time() {
        let before = chrono::Local::now().naive_local();
        let record = DeploymentRecord::new(ContractAddress::from("0x1".to_string()), "http://n", vec![]);
        let after = chrono::Local::now().naive_local();

        let stamped =
            chrono::NaiveDateTime::parse_from_str(&record.deployed_at, DEPLOYMENT_TIME_FORMAT).unwrap();
        let second = chrono::Duration::seconds(1);
        assert!(stamped >= before - second && stamped <= after + second);
    }
}
