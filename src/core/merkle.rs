use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use serde::{Deserialize, Serialize};

/// Binary Merkle tree over a block's transactions.
///
/// Leaves are the SHA-256 of each transaction's canonical encoding. Each
/// parent is the SHA-256 of `left ‖ right`; a level with an odd number of
/// nodes pairs its last node with itself. A single leaf is its own root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    // levels[0] are the leaves, the last level holds only the root
    levels: Vec<Vec<Vec<u8>>>,
}

/// Inclusion proof for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Leaf hash being proven
    pub transaction_hash: Vec<u8>,
    pub merkle_root: Vec<u8>,
    /// Sibling hashes from the leaf level upwards
    pub proof_path: Vec<ProofElement>,
    /// Position of the transaction in the block
    pub transaction_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    pub hash: Vec<u8>,
    /// true if the sibling sits to the right of the running hash
    pub is_right: bool,
}

impl MerkleTree {
    pub fn new(transactions: &[Transaction]) -> Result<Self> {
        let leaves = transactions
            .iter()
            .map(|tx| tx.serialize().map(|bytes| sha256_digest(&bytes)))
            .collect::<Result<Vec<_>>>()?;
        Self::from_leaves(leaves)
    }

    /// Builds the tree from precomputed leaf hashes.
    pub fn from_leaves(leaves: Vec<Vec<u8>>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Cannot build a Merkle tree from an empty transaction list".to_string(),
            ));
        }

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next_level = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => Self::hash_pair(left, right),
                    [single] => Self::hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next_level);
        }
        Ok(MerkleTree { levels })
    }

    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Result<Vec<u8>> {
        Ok(Self::new(transactions)?.get_root_hash().to_vec())
    }

    pub fn get_root_hash(&self) -> &[u8] {
        // from_leaves guarantees a non-empty final level
        &self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn generate_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        if transaction_index >= self.leaf_count() {
            return Err(BlockchainError::InvalidBlock(format!(
                "Transaction index {} out of bounds (leaves: {})",
                transaction_index,
                self.leaf_count()
            )));
        }

        let mut proof_path = Vec::with_capacity(self.levels.len() - 1);
        let mut index = transaction_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling, is_right) = if index % 2 == 0 {
                // missing right sibling means the node was paired with itself
                (level.get(index + 1).unwrap_or(&level[index]), true)
            } else {
                (&level[index - 1], false)
            };
            proof_path.push(ProofElement {
                hash: sibling.clone(),
                is_right,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            transaction_hash: self.levels[0][transaction_index].clone(),
            merkle_root: self.get_root_hash().to_vec(),
            proof_path,
            transaction_index,
        })
    }

    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let computed = proof
            .proof_path
            .iter()
            .fold(proof.transaction_hash.clone(), |current, element| {
                if element.is_right {
                    Self::hash_pair(&current, &element.hash)
                } else {
                    Self::hash_pair(&element.hash, &current)
                }
            });
        computed == proof.merkle_root
    }

    fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut combined = Vec::with_capacity(left.len() + right.len());
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        sha256_digest(&combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u8) -> Vec<Vec<u8>> {
        (0..n).map(|i| sha256_digest(&[i])).collect()
    }

    #[test]
    fn test_single_leaf_is_root() {
        let tree = MerkleTree::from_leaves(leaves(1)).unwrap();
        assert_eq!(tree.get_root_hash(), leaves(1)[0].as_slice());
    }

    #[test]
    fn test_odd_level_duplicates_last_leaf() {
        let l = leaves(3);
        let tree = MerkleTree::from_leaves(l.clone()).unwrap();

        let left = MerkleTree::hash_pair(&l[0], &l[1]);
        let right = MerkleTree::hash_pair(&l[2], &l[2]);
        assert_eq!(tree.get_root_hash(), MerkleTree::hash_pair(&left, &right).as_slice());
    }

    #[test]
    fn test_root_is_order_sensitive() {
        let mut l = leaves(4);
        let root = MerkleTree::from_leaves(l.clone()).unwrap().get_root_hash().to_vec();
        l.swap(1, 2);
        let swapped = MerkleTree::from_leaves(l).unwrap().get_root_hash().to_vec();
        assert_ne!(root, swapped);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(MerkleTree::from_leaves(vec![]).is_err());
        assert!(MerkleTree::calculate_merkle_root(&[]).is_err());
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        for n in 1..=7 {
            let tree = MerkleTree::from_leaves(leaves(n)).unwrap();
            for i in 0..n as usize {
                let proof = tree.generate_proof(i).unwrap();
                assert!(MerkleTree::verify_proof(&proof), "n={n} i={i}");
            }
            assert!(tree.generate_proof(n as usize).is_err());
        }
    }

    #[test]
    fn test_tampered_proof_fails() {
        let tree = MerkleTree::from_leaves(leaves(5)).unwrap();
        let mut proof = tree.generate_proof(2).unwrap();
        proof.transaction_hash = sha256_digest(b"forged");
        assert!(!MerkleTree::verify_proof(&proof));
    }

    #[test]
    fn test_tree_over_transactions() {
        let txs = vec![
            Transaction::new_coinbase_tx(b"a", 1, b"one").unwrap(),
            Transaction::new_coinbase_tx(b"b", 2, b"two").unwrap(),
        ];
        let root = MerkleTree::calculate_merkle_root(&txs).unwrap();
        let leaf_a = sha256_digest(&txs[0].serialize().unwrap());
        let leaf_b = sha256_digest(&txs[1].serialize().unwrap());
        assert_eq!(root, MerkleTree::hash_pair(&leaf_a, &leaf_b));
    }
}
