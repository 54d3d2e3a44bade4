//! Configuration of the whole workflow.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! TOML file, and `STARKUP_`-prefixed environment variables (nested keys
//! separated by `__`, e.g. `STARKUP_DEVNET__PORT=5051`). Command-line
//! overrides are applied by the binary on top of the result.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    services::{DevnetConfig, ScarbConfig, SncastConfig},
    store::{DEFAULT_RECORD_PATH, DeploymentStore},
};

/// The default name for the starkup configuration file.
pub const CONFIG_FILENAME: &str = "Starkup.toml";

/// Prefix of the environment variables read by [`StarkupConfig::load`].
pub const ENV_PREFIX: &str = "STARKUP_";

/// Complete configuration, passed by reference to each component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarkupConfig {
    /// Where the deployment record is kept.
    pub record_path: PathBuf,
    /// Local node settings.
    pub devnet: DevnetConfig,
    /// Build settings.
    pub scarb: ScarbConfig,
    /// Deployment CLI settings.
    pub sncast: SncastConfig,
}

impl Default for StarkupConfig {
    fn default() -> Self {
        Self {
            record_path: PathBuf::from(DEFAULT_RECORD_PATH),
            devnet: DevnetConfig::default(),
            scarb: ScarbConfig::default(),
            sncast: SncastConfig::default(),
        }
    }
}

impl StarkupConfig {
    /// Layer defaults, the TOML file at `path` (when it exists) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            let file = if path.is_dir() {
                path.join(CONFIG_FILENAME)
            } else {
                path.to_path_buf()
            };

            if file.exists() {
                tracing::debug!(path = %file.display(), "Reading configuration file");
                figment = figment.merge(Toml::file(&file));
            } else {
                tracing::debug!(path = %file.display(), "No configuration file, using defaults");
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load configuration")
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn store(&self) -> DeploymentStore {
        DeploymentStore::new(&self.record_path)
    }
}

/// Deserialize a string field that also accepts a bare number or boolean.
///
/// The environment provider types `STARKUP_SNCAST__SALT=7` as an integer, so
/// text fields that commonly hold digits go through this.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientString;

    impl de::Visitor<'_> for LenientString {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
            Ok(value)
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u128<E: de::Error>(self, value: u128) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_i128<E: de::Error>(self, value: i128) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(LenientString)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_toml_round_trip() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join(CONFIG_FILENAME);

            let mut config = StarkupConfig::default();
            config.devnet.port = 6060;
            config.scarb.contract_name = "Counter".to_string();
            config.sncast.salt = "12".to_string();
            config.save_to_file(&path).unwrap();

            assert_eq!(StarkupConfig::load(Some(&path)).unwrap(), config);
            Ok(())
        });
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILENAME,
                "[devnet]\nport = 7070\n\n[sncast]\nprofile = \"local\"\n",
            )?;

            let config = StarkupConfig::load(Some(jail.directory())).unwrap();

            assert_eq!(config.devnet.port, 7070);
            assert_eq!(config.devnet.seed, 42);
            assert_eq!(config.sncast.profile, "local");
            assert_eq!(config.scarb.package, "friendly_lamp");
            assert_eq!(config.record_path, PathBuf::from(DEFAULT_RECORD_PATH));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let config = StarkupConfig::load(Some(&jail.directory().join("absent.toml"))).unwrap();
            assert_eq!(config.devnet, DevnetConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_numeric_env_values_load_into_text_fields() {
        Jail::expect_with(|jail| {
            jail.set_env("STARKUP_SNCAST__SALT", "7");
            jail.set_env("STARKUP_SNCAST__CONSTRUCTOR_GREETING", "42");
            jail.set_env("STARKUP_DEVNET__INITIAL_BALANCE", "5000000000000000000000");
            jail.set_env("STARKUP_DEVNET__PORT", "5051");

            let config = StarkupConfig::load(None).unwrap();

            assert_eq!(config.sncast.salt, "7");
            assert_eq!(config.sncast.constructor_greeting, "42");
            assert_eq!(config.devnet.initial_balance, "5000000000000000000000");
            assert_eq!(config.devnet.port, 5051);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILENAME, "[sncast]\nsalt = \"3\"\n")?;
            jail.set_env("STARKUP_SNCAST__SALT", "9");

            let config = StarkupConfig::load(Some(jail.directory())).unwrap();

            assert_eq!(config.sncast.salt, "9");
            Ok(())
        });
    }
}
