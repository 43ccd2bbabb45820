use crate::core::{MerkleProof, MerkleTree, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    hash: Vec<u8>,
    pre_block_hash: Vec<u8>, // empty for genesis
    transactions: Vec<Transaction>,
    nonce: i64,
    merkle_root: Vec<u8>,
}

impl Block {
    /// Builds and mines a block on top of `pre_block_hash`. Blocks only come
    /// into existence through this path and are never modified afterwards.
    pub fn new_block(
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        pow: &ProofOfWork,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let merkle_root = MerkleTree::calculate_merkle_root(transactions)?;
        let (nonce, hash) = pow.run(&merkle_root, &pre_block_hash)?;
        info!(
            "Mined block {} with {} transaction(s)",
            HEXLOWER.encode(&hash),
            transactions.len()
        );

        Ok(Block {
            hash,
            pre_block_hash,
            transactions: transactions.to_vec(),
            nonce,
            merkle_root,
        })
    }

    pub fn generate_genesis_block(coinbase: &Transaction, pow: &ProofOfWork) -> Result<Block> {
        if !coinbase.is_coinbase() {
            return Err(BlockchainError::InvalidBlock(
                "Genesis block must hold a coinbase transaction".to_string(),
            ));
        }
        Block::new_block(vec![], std::slice::from_ref(coinbase), pow)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash)
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn get_merkle_root(&self) -> &[u8] {
        &self.merkle_root
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    /// Verify that the block's Merkle root matches its transactions
    pub fn verify_merkle_root(&self) -> Result<bool> {
        let calculated_root = MerkleTree::calculate_merkle_root(&self.transactions)?;
        Ok(calculated_root == self.merkle_root)
    }

    pub fn generate_merkle_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        MerkleTree::new(&self.transactions)?.generate_proof(transaction_index)
    }

    /// Verify a Merkle proof against this block's Merkle root
    pub fn verify_merkle_proof(&self, proof: &MerkleProof) -> bool {
        proof.merkle_root == self.merkle_root && MerkleTree::verify_proof(proof)
    }

    #[cfg(test)]
    pub(crate) fn set_nonce_for_test(&mut self, nonce: i64) {
        self.nonce = nonce;
    }

    #[cfg(test)]
    pub(crate) fn set_hash_for_test(&mut self, hash: Vec<u8>) {
        self.hash = hash;
    }
}
