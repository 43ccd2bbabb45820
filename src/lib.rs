//! # utxo-chain - a single-node proof-of-work UTXO ledger
//!
//! Value lives in unspent transaction outputs locked to key hashes. Spending
//! an output means referencing it from a signed request in a new transaction,
//! and transactions become part of history only by being mined into a block.
//!
//! ## Layout
//! - `core/`: blocks, transactions, Merkle roots, proof-of-work, the chain
//!   store and the unspent-output ledger
//! - `storage/`: the [`KvStore`] seam with sled and in-memory backends
//! - `wallet/`: key pairs, key hashes and text addresses
//! - `config/`: difficulty, genesis reward and on-disk locations
//! - `utils/`: hashing, ECDSA P-256, base58 and bincode helpers
//! - `cli/`: argument parsing for the binary
//!
//! ## Reading order
//! 1. `core/transaction.rs` for requests, results, signing and verification
//! 2. `core/blockchain.rs` for how blocks are appended and walked
//! 3. `core/ledger.rs` for balances and building payments
//!
//! Every block is checked against the proof-of-work target whenever it is
//! read back, so a tampered store surfaces as an error instead of a silently
//! wrong balance.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Opt};
pub use config::Config;
pub use crate::core::{
    Block, Blockchain, BlockchainIterator, Ledger, MerkleProof, MerkleTree, PrevTransactions,
    ProofOfWork, TXRequest, TXResult, Transaction, UnspentOutput,
};
pub use error::{BlockchainError, Result};
pub use storage::{KvStore, MemoryStore, SledStore, TIP_BLOCK_HASH_KEY};
pub use utils::{
    base58_decode, base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    convert_address, decode_address, hash_pub_key, validate_address, Wallet, Wallets,
    ADDRESS_CHECK_SUM_LEN,
};
