//! Command builder for the contract deployment CLI.

/// Contract-lifecycle operation of the deployment CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SncastAction {
    Declare,
    Deploy,
    Call,
    Invoke,
}

/// Builder for sncast commands.
///
/// Every operation runs under a named profile and against an explicit node URL.
#[derive(Debug, Clone)]
pub struct SncastCmdBuilder {
    binary: String,
    profile: String,
    url: String,
}

impl SncastCmdBuilder {
    /// Create a new sncast command builder.
    pub fn new(
        binary: impl Into<String>,
        profile: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            profile: profile.into(),
            url: url.into(),
        }
    }

    /// `account import`: register a pre-funded account under the profile.
    pub fn account_import(
        &self,
        address: &str,
        private_key: &str,
        account_type: &str,
    ) -> Vec<String> {
        vec![
            self.binary.clone(),
            "account".to_string(),
            "import".to_string(),
            format!("--address={address}"),
            format!("--type={account_type}"),
            format!("--url={}", self.url),
            format!("--private-key={private_key}"),
            format!("--add-profile={}", self.profile),
            "--silent".to_string(),
        ]
    }

    /// `declare`: register the contract class.
    pub fn declare(&self, contract_name: &str) -> Vec<String> {
        let mut cmd = self.action(SncastAction::Declare);
        cmd.push("--contract-name".to_string());
        cmd.push(contract_name.to_string());
        cmd
    }

    /// `deploy`: instantiate a declared class.
    pub fn deploy(&self, class_hash: &str, constructor_calldata: &[String], salt: &str) -> Vec<String> {
        let mut cmd = self.action(SncastAction::Deploy);
        cmd.push("--class-hash".to_string());
        cmd.push(class_hash.to_string());
        if !constructor_calldata.is_empty() {
            cmd.push("--constructor-calldata".to_string());
            cmd.extend(constructor_calldata.iter().cloned());
        }
        cmd.push(format!("--salt={salt}"));
        cmd
    }

    /// `call` (read-only) or `invoke` (state-changing) of a contract function.
    pub fn function(
        &self,
        action: SncastAction,
        contract_address: &str,
        function: &str,
        calldata: &[String],
    ) -> Vec<String> {
        let mut cmd = self.action(action);
        cmd.push("--contract-address".to_string());
        cmd.push(contract_address.to_string());
        cmd.push("--function".to_string());
        cmd.push(function.to_string());
        if !calldata.is_empty() {
            cmd.push("--calldata".to_string());
            cmd.extend(calldata.iter().cloned());
        }
        cmd
    }

    fn action(&self, action: SncastAction) -> Vec<String> {
        vec![
            self.binary.clone(),
            format!("--profile={}", self.profile),
            action.to_string(),
            format!("--url={}", self.url),
        ]
    }
}
