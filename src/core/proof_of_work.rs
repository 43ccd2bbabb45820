use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;

const MAX_NONCE: i64 = i64::MAX;
const MAX_DIFFICULTY: u32 = 255;

/// Nonce search against the fixed target `2^(256 - difficulty)`.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    target: BigInt,
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Result<ProofOfWork> {
        if difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "difficulty {difficulty} exceeds maximum {MAX_DIFFICULTY}"
            )));
        }
        let mut target = BigInt::from(1);
        target.shl_assign(256 - difficulty);
        Ok(ProofOfWork { target, difficulty })
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_target(&self) -> &BigInt {
        &self.target
    }

    fn prepare_data(&self, merkle_root: &[u8], pre_block_hash: &[u8], nonce: i64) -> Vec<u8> {
        let mut data_bytes = Vec::with_capacity(merkle_root.len() + pre_block_hash.len() + 16);
        data_bytes.extend_from_slice(merkle_root);
        data_bytes.extend_from_slice(pre_block_hash);
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes.extend(i64::from(self.difficulty).to_be_bytes());
        data_bytes
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigInt::from_bytes_be(Sign::Plus, hash) < self.target
    }

    /// Returns the first nonce, counting up from zero, whose hash falls below
    /// the target, together with that hash.
    pub fn run(&self, merkle_root: &[u8], pre_block_hash: &[u8]) -> Result<(i64, Vec<u8>)> {
        info!("Mining the block (difficulty {})", self.difficulty);
        let mut nonce = 0;
        loop {
            let data = self.prepare_data(merkle_root, pre_block_hash, nonce);
            let hash = sha256_digest(data.as_slice());
            if self.meets_target(&hash) {
                info!("Found nonce {nonce}: {}", HEXLOWER.encode(&hash));
                return Ok((nonce, hash));
            }
            if nonce == MAX_NONCE {
                return Err(BlockchainError::Mining(
                    "nonce space exhausted without meeting the target".to_string(),
                ));
            }
            nonce += 1;
        }
    }

    /// Recomputes the block's hash from its stored nonce. The block passes
    /// when that hash is below the target and equals the stored one.
    pub fn validate(&self, block: &Block) -> bool {
        let data = self.prepare_data(
            block.get_merkle_root(),
            block.get_pre_block_hash(),
            block.get_nonce(),
        );
        let hash = sha256_digest(data.as_slice());
        let valid = self.meets_target(&hash) && hash.as_slice() == block.get_hash();
        if !valid {
            debug!("Proof-of-work rejected for {}", HEXLOWER.encode(block.get_hash()));
        }
        valid
    }
}
