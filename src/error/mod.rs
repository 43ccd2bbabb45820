//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`]. Only `main`
//! turns an error into a process exit.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, Error)]
pub enum BlockchainError {
    /// Underlying key-value store failed (open, get, put, flush)
    #[error("Storage error: {0}")]
    Storage(String),
    /// A block, transaction or chain that was referenced does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// A chain is already initialized at the configured location
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// Spendable value is below the requested amount
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },
    /// Stored bytes could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A loaded block does not satisfy the proof-of-work target
    #[error("Proof-of-work invalid for block {0}")]
    ProofOfWorkInvalid(String),
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Mining error: {0}")]
    Mining(String),
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Storage(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
