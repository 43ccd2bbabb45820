//! Core chain functionality
//!
//! Blocks, transactions, the Merkle commitment, proof-of-work, the chain
//! store and the unspent-output ledger built on top of it.

pub mod block;
pub mod blockchain;
pub mod ledger;
pub mod merkle;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator};
pub use ledger::{Ledger, SpendableOutputs, UnspentOutput};
pub use merkle::{MerkleProof, MerkleTree, ProofElement};
pub use proof_of_work::ProofOfWork;
pub use transaction::{PrevTransactions, TXRequest, TXResult, Transaction, COINBASE_VOUT};
