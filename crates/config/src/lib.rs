//! Configuration management for meridian
//!
//! This crate provides functionality for managing the meridian configuration,
//! including loading, saving, updating, and deleting configuration settings, and turning them
//! into the [`VmConfig`] and environment the interpreter runs with.

/// Error types for the configuration module
pub mod error;

use std::path::{Path, PathBuf};

use crate::error::Error;
use alloy::primitives::{Address, U256};
use clap::Parser;
use meridian_common::utils::io::file::{delete_path, read_file, write_file};
use meridian_vm::core::{env::BlockEnv, hardfork::HardFork, vm::VmConfig};
use serde::{Deserialize, Serialize};
#[allow(deprecated)]
use std::env::home_dir;
use tracing::{debug, error, info};

/// Command line arguments for the configuration command
#[derive(Debug, Clone, Parser)]
#[clap(
    about = "Display and edit the current configuration",
    override_usage = "meridian config [OPTIONS] [KEY] [VALUE]"
)]
pub struct ConfigArgs {
    /// The target key to update.
    #[clap(required = false, default_value = "")]
    key: String,

    /// The value to set the key to.
    #[clap(required = false, default_value = "")]
    value: String,

    /// Path of the configuration file. Defaults to `$HOME/.meridian/config.toml`.
    #[clap(long = "config-path", short = 'c')]
    pub path: Option<PathBuf>,
}

/// The [`Configuration`] struct represents the configuration of the CLI. Every `exec` run starts
/// from these values, which command line flags may override.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// The fork whose rules and gas costs apply
    pub hardfork: HardFork,

    /// Whether to record an execution trace
    pub tracing: bool,

    /// Whether a failed top-level execution is reported as an error
    pub throw_on_fail_result: bool,

    /// The gas limit of executions and of the block
    pub gas_limit: u64,

    /// The chain id exposed by `CHAINID`
    pub chain_id: u64,

    /// The block beneficiary exposed by `COINBASE`
    pub coinbase: Address,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            hardfork: HardFork::Latest,
            tracing: false,
            throw_on_fail_result: false,
            gas_limit: 30_000_000,
            chain_id: 1,
            coinbase: Address::ZERO,
        }
    }
}

#[allow(deprecated)]
impl Configuration {
    /// Returns the path of the configuration file, `$HOME/.meridian/config.toml`.
    pub fn default_path() -> Result<PathBuf, Error> {
        let mut home = home_dir().ok_or_else(|| {
            Error::Generic(
                "failed to get home directory. does your os support `std::env::home_dir()`?"
                    .to_string(),
            )
        })?;
        home.push(".meridian");
        home.push("config.toml");
        Ok(home)
    }

    /// Returns the current configuration.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&Self::default_path()?)
    }

    /// Returns the configuration stored at `path`, creating it with defaults if it doesn't
    /// exist.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        // if the config file doesn't exist, create it
        if !path.exists() {
            debug!(path = %path.display(), "creating default configuration");
            Configuration::default().save_to(path)?;
        }

        let contents = read_file(path_str(path)?)
            .map_err(|e| Error::Generic(format!("failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| Error::ParseError(format!("failed to parse config file: {e}")))
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> Result<(), Error> {
        self.save_to(&Self::default_path()?)
    }

    /// Saves the current configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        write_file(
            path_str(path)?,
            &toml::to_string(&self)
                .map_err(|e| Error::ParseError(format!("failed to serialize config: {e}")))?,
        )
        .map_err(|e| Error::Generic(format!("failed to write config file: {e}")))?;

        Ok(())
    }

    /// Deletes the configuration file at `$HOME/.meridian/config.toml`.
    pub fn delete() -> Result<(), Error> {
        Self::delete_at(&Self::default_path()?)
    }

    /// Deletes the configuration file at `path`.
    pub fn delete_at(path: &Path) -> Result<(), Error> {
        delete_path(path_str(path)?);
        Ok(())
    }

    /// Update a single key/value pair in the configuration, without saving it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        // update the key in the struct and ensure it's the correct type
        match key {
            "hardfork" => {
                self.hardfork = value.parse().map_err(Error::ParseError)?;
            }
            "tracing" => {
                self.tracing = parse_value(key, value)?;
            }
            "throw_on_fail_result" => {
                self.throw_on_fail_result = parse_value(key, value)?;
            }
            "gas_limit" => {
                self.gas_limit = parse_value(key, value)?;
            }
            "chain_id" => {
                self.chain_id = parse_value(key, value)?;
            }
            "coinbase" => {
                self.coinbase = parse_value(key, value)?;
            }
            _ => return Err(Error::InvalidKey(key.to_string())),
        }

        Ok(())
    }

    /// Update a single key/value pair and write the configuration to disk.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.set(key, value)?;
        self.save()
    }

    /// The interpreter settings described by this configuration.
    pub fn vm_config(&self) -> VmConfig {
        VmConfig {
            hardfork: self.hardfork,
            tracing: self.tracing,
            throw_on_fail_result: self.throw_on_fail_result,
        }
    }

    /// A block environment carrying the configured chain id, gas limit and coinbase.
    pub fn block_env(&self) -> BlockEnv {
        BlockEnv {
            coinbase: self.coinbase,
            gas_limit: self.gas_limit,
            chain_id: self.chain_id,
            base_fee: U256::ZERO,
            ..Default::default()
        }
    }
}

fn path_str(path: &Path) -> Result<&str, Error> {
    path.to_str().ok_or_else(|| Error::Generic("failed to convert path to string".to_string()))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| Error::ParseError(format!("invalid value for '{key}': {e}")))
}

/// The `config` command is used to display and edit the current configuration.
pub fn config(args: ConfigArgs) -> Result<(), Error> {
    let path = match args.path {
        Some(path) => path,
        None => Configuration::default_path()?,
    };

    if !args.key.is_empty() {
        if !args.value.is_empty() {
            // read the config file and update the key/value pair
            let mut config = Configuration::load_from(&path)?;
            config.set(&args.key, &args.value)?;
            config.save_to(&path)?;
            info!("updated configuration! Set \'{}\' = \'{}\' .", &args.key, &args.value);
        } else {
            // key is set, but no value is set
            error!(
                "found key but no value to set. Please specify a value to set, use `meridian \
                 config --help` for more information."
            );
        }
    } else {
        // no key is set, print the config file
        println!("{:#?}", Configuration::load_from(&path)?);
        info!("use `meridian config <KEY> <VALUE>` to set a key/value pair.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_path(name: &str) -> PathBuf {
        std::env::temp_dir().join("meridian-config-test").join(name)
    }

    // Test default configuration
    #[test]
    #[serial]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.hardfork, HardFork::Latest);
        assert!(!config.tracing);
        assert!(!config.throw_on_fail_result);
        assert_eq!(config.gas_limit, 30_000_000);
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.coinbase, Address::ZERO);
    }

    // Test loading configuration from a missing file
    #[test]
    #[serial]
    fn test_load_configuration() {
        let path = test_path("load.toml");
        Configuration::delete_at(&path).expect("failed to delete config file");

        let config = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(config, Configuration::default());
        assert!(path.exists());
    }

    // Test saving configuration to a file
    #[test]
    #[serial]
    fn test_save_configuration() {
        let path = test_path("save.toml");
        Configuration::delete_at(&path).expect("failed to delete config file");

        let mut config = Configuration::default();
        config.set("hardfork", "spurious-dragon").expect("failed to update hardfork");
        config.set("tracing", "true").expect("failed to update tracing");
        config
            .set("coinbase", "0x00000000000000000000000000000000000000cb")
            .expect("failed to update coinbase");
        config.save_to(&path).expect("failed to save config file");

        let loaded_config = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(loaded_config.hardfork, HardFork::SpuriousDragon);
        assert!(loaded_config.tracing);
        assert_eq!(loaded_config.coinbase, Address::with_last_byte(0xcb));
        assert_eq!(loaded_config.gas_limit, 30_000_000);
    }

    // Test deleting configuration file
    #[test]
    #[serial]
    fn test_delete_configuration() {
        let path = test_path("delete.toml");
        let mut config = Configuration::load_from(&path).expect("failed to load config file");
        config.set("chain_id", "5").expect("failed to update chain_id");
        config.save_to(&path).expect("failed to save config file");

        Configuration::delete_at(&path).expect("failed to delete config file");
        let config = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(config.chain_id, 1);
    }

    #[test]
    #[serial]
    fn test_partial_file_uses_defaults() {
        let path = test_path("partial.toml");
        write_file(path.to_str().expect("temp path is utf-8"), "hardfork = \"berlin\"\n")
            .expect("failed to write config file");

        let config = Configuration::load_from(&path).expect("failed to load config file");
        assert_eq!(config.hardfork, HardFork::Berlin);
        assert_eq!(config.chain_id, 1);
    }

    #[test]
    fn test_invalid_updates() {
        let mut config = Configuration::default();
        assert!(matches!(config.set("rpc_url", "x"), Err(Error::InvalidKey(_))));
        assert!(matches!(config.set("gas_limit", "lots"), Err(Error::ParseError(_))));
        assert!(matches!(config.set("hardfork", "olympic"), Err(Error::ParseError(_))));
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_vm_config() {
        let mut config = Configuration::default();
        config.set("hardfork", "istanbul").expect("failed to update hardfork");
        config.set("throw_on_fail_result", "true").expect("failed to update flag");

        let vm_config = config.vm_config();
        assert_eq!(vm_config.hardfork, HardFork::Istanbul);
        assert!(vm_config.throw_on_fail_result);
        assert!(!vm_config.tracing);
        assert_eq!(config.block_env().chain_id, 1);
    }
}
