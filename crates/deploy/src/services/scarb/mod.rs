//! Contract build tool (scarb).
//!
//! Only the outcome of the build and the location of the compiled class matter
//! to the deployment; the compiler itself is opaque.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::process::CommandSpec;

/// Default scarb binary.
pub const DEFAULT_BINARY: &str = "scarb";

/// Configuration for the contract build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScarbConfig {
    /// Binary used to build and test the package.
    pub binary: String,
    /// Root of the contract package; commands run from here.
    pub project_dir: PathBuf,
    /// Build output directory, relative to `project_dir`.
    pub build_dir: PathBuf,
    /// Package name, the prefix of the artifact file name.
    pub package: String,
    /// Contract name, as given to `declare --contract-name`.
    pub contract_name: String,
}

impl Default for ScarbConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            project_dir: PathBuf::from("."),
            build_dir: PathBuf::from("target/dev"),
            package: "friendly_lamp".to_string(),
            contract_name: "HelloWorld".to_string(),
        }
    }
}

impl ScarbConfig {
    /// Path of the compiled class: `<build-output>/<package>_<ContractName>.contract_class.json`.
    pub fn artifact_path(&self) -> PathBuf {
        self.project_dir.join(&self.build_dir).join(format!(
            "{}_{}.contract_class.json",
            self.package, self.contract_name
        ))
    }

    pub fn build_command(&self) -> CommandSpec {
        CommandSpec::new("Build contract", &self.binary)
            .args(["build"])
            .cwd(&self.project_dir)
    }

    pub fn test_command(&self) -> CommandSpec {
        CommandSpec::new("Test contract", &self.binary)
            .args(["test"])
            .cwd(&self.project_dir)
    }
}
