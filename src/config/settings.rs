use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "UTXO_CHAIN_CONFIG";

const DIFFICULTY_ENV: &str = "UTXO_CHAIN_DIFFICULTY";
const DATA_DIR_ENV: &str = "UTXO_CHAIN_DATA_DIR";
const WALLET_FILE_ENV: &str = "UTXO_CHAIN_WALLET_FILE";

const DEFAULT_DIFFICULTY: u32 = 12;
const DEFAULT_GENESIS_REWARD: u64 = 100;
const DEFAULT_ADDRESS_VERSION: u8 = 0x00;
const DEFAULT_DATA_DIR: &str = "./tmp/blocks";
const DEFAULT_WALLET_FILE: &str = "./tmp/wallets.dat";

// Hash width in bits; difficulty is subtracted from it to get the target exponent.
const MAX_DIFFICULTY: u32 = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Leading zero bits required of every block hash
    pub difficulty: u32,
    /// Value minted by the genesis coinbase
    pub genesis_reward: u64,
    /// Version byte prefixed to key hashes in text addresses
    pub address_version: u8,
    /// Directory of the block store
    pub data_dir: PathBuf,
    /// File holding the serialized wallet collection
    pub wallet_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            difficulty: DEFAULT_DIFFICULTY,
            genesis_reward: DEFAULT_GENESIS_REWARD,
            address_version: DEFAULT_ADDRESS_VERSION,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            wallet_file: PathBuf::from(DEFAULT_WALLET_FILE),
        }
    }
}

impl Config {
    /// Builds the effective configuration: defaults, then the TOML file at
    /// `path` (or `$UTXO_CHAIN_CONFIG`), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => env::var_os(CONFIG_PATH_ENV).map(PathBuf::from),
        };

        let mut config = match file {
            Some(p) => Self::from_file(&p)?,
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = env::var(DIFFICULTY_ENV) {
            self.difficulty = value.parse().map_err(|e| {
                BlockchainError::Config(format!("{DIFFICULTY_ENV}={value}: {e}"))
            })?;
        }
        if let Some(dir) = env::var_os(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = env::var_os(WALLET_FILE_ENV) {
            self.wallet_file = PathBuf::from(file);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "difficulty {} exceeds maximum {MAX_DIFFICULTY}",
                self.difficulty
            )));
        }
        Ok(())
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Config {
        self.difficulty = difficulty;
        self
    }
}
