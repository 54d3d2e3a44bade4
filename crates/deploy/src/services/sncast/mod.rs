//! Contract deployment CLI (sncast): account import, declare, deploy, call, invoke.

mod cmd;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use cmd::{SncastAction, SncastCmdBuilder};

use crate::{
    codec,
    config::lenient_string,
    extract::{ClassHash, ContractAddress},
    process::{CommandRunner, CommandSpec, StageOutput},
};

/// Default sncast binary.
pub const DEFAULT_BINARY: &str = "sncast";
/// Default profile the devnet account is registered under.
pub const DEFAULT_PROFILE: &str = "devnet";

/// First pre-funded account of a devnet started with seed 42.
pub const DEFAULT_ACCOUNT_ADDRESS: &str =
    "0x064b48806902a367c8598f4f95c305e8c1a1acba5f082d294a43793113115691";
/// Private key of [`DEFAULT_ACCOUNT_ADDRESS`].
pub const DEFAULT_ACCOUNT_PRIVATE_KEY: &str =
    "0x0000000000000000000000000000000071d7bb07b9a64f6f78ac4c816aff4da9";

/// Configuration for the sncast CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SncastConfig {
    /// Binary used to run sncast.
    pub binary: String,
    /// Profile name used for every operation.
    #[serde(deserialize_with = "lenient_string")]
    pub profile: String,
    /// Address of the account imported into the profile.
    pub account_address: String,
    /// Private key of the account imported into the profile.
    pub private_key: String,
    /// Account contract flavour passed to `account import --type`.
    pub account_type: String,
    /// Salt for the deployment address.
    #[serde(deserialize_with = "lenient_string")]
    pub salt: String,
    /// Greeting passed to the contract constructor.
    #[serde(deserialize_with = "lenient_string")]
    pub constructor_greeting: String,
}

impl Default for SncastConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            account_address: DEFAULT_ACCOUNT_ADDRESS.to_string(),
            private_key: DEFAULT_ACCOUNT_PRIVATE_KEY.to_string(),
            account_type: "oz".to_string(),
            salt: "0".to_string(),
            constructor_greeting: "Hello World".to_string(),
        }
    }
}

impl SncastConfig {
    pub fn cmd_builder(&self, node_url: &str) -> SncastCmdBuilder {
        SncastCmdBuilder::new(&self.binary, &self.profile, node_url)
    }

    /// Constructor calldata: the greeting as a single word.
    pub fn constructor_calldata(&self) -> Vec<String> {
        vec![codec::encode_text(&self.constructor_greeting)]
    }

    /// Import the configured account. Not required: the account may already be registered.
    pub fn import_command(&self, node_url: &str) -> CommandSpec {
        let argv = self.cmd_builder(node_url).account_import(
            &self.account_address,
            &self.private_key,
            &self.account_type,
        );
        CommandSpec::from_argv("Import devnet account", argv).required(false)
    }

    pub fn declare_command(&self, node_url: &str, contract_name: &str) -> CommandSpec {
        let argv = self.cmd_builder(node_url).declare(contract_name);
        CommandSpec::from_argv("Declare contract class", argv)
    }

    pub fn deploy_command(&self, node_url: &str, class_hash: &ClassHash) -> CommandSpec {
        let argv = self.cmd_builder(node_url).deploy(
            class_hash,
            &self.constructor_calldata(),
            &self.salt,
        );
        CommandSpec::from_argv("Deploy contract", argv)
    }
}

/// Handle on a deployed contract, issuing calls and invokes through a [`CommandRunner`].
#[derive(Debug)]
pub struct ContractClient<'a, R> {
    runner: &'a R,
    builder: SncastCmdBuilder,
    address: ContractAddress,
    cwd: Option<PathBuf>,
}

impl<'a, R: CommandRunner> ContractClient<'a, R> {
    pub fn new(runner: &'a R, config: &SncastConfig, node_url: &str, address: ContractAddress) -> Self {
        Self {
            runner,
            builder: config.cmd_builder(node_url),
            address,
            cwd: None,
        }
    }

    /// Run commands from `dir`, where the profile's configuration lives.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn address(&self) -> &ContractAddress {
        &self.address
    }

    /// Read contract state without changing it.
    pub async fn call(&self, function: &str, calldata: &[String]) -> StageOutput {
        self.run(SncastAction::Call, function, calldata).await
    }

    /// Send a state-changing transaction.
    pub async fn invoke(&self, function: &str, calldata: &[String]) -> StageOutput {
        self.run(SncastAction::Invoke, function, calldata).await
    }

    async fn run(&self, action: SncastAction, function: &str, calldata: &[String]) -> StageOutput {
        let argv = self.builder.function(action, &self.address, function, calldata);
        let mut command =
            CommandSpec::from_argv(format!("{action} {function}"), argv).required(false);
        if let Some(cwd) = &self.cwd {
            command = command.cwd(cwd);
        }
        self.runner.run(&command).await
    }

    /// Example invocations to show after a deployment.
    pub fn usage_examples(&self) -> Vec<String> {
        vec![
            self.builder
                .function(SncastAction::Call, &self.address, "get_greeting", &[])
                .join(" "),
            self.builder
                .function(
                    SncastAction::Invoke,
                    &self.address,
                    "set_greeting",
                    &[codec::encode_text("Hello Devnet")],
                )
                .join(" "),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constructor_calldata() {
        assert_eq!(
            SncastConfig::default().constructor_calldata(),
            vec!["0x48656c6c6f20576f726c64".to_string()]
        );
    }

    #[test]
    fn test_import_is_not_required() {
        let cmd = SncastConfig::default().import_command("http://127.0.0.1:5050");
        assert!(!cmd.required);
        assert_eq!(cmd.program, "sncast");
        assert!(cmd.args.contains(&format!("--address={DEFAULT_ACCOUNT_ADDRESS}")));
    }

    #[test]
    fn test_deploy_command_uses_class_hash() {
        let hash = ClassHash::from("0xABC".to_string());
        let cmd = SncastConfig::default().deploy_command("http://127.0.0.1:5050", &hash);

        assert!(cmd.required);
        assert!(cmd.args.windows(2).any(|w| w == ["--class-hash", "0xABC"]));
        assert!(cmd.args.contains(&"--salt=0".to_string()));
    }
}
