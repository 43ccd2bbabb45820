use crate::error::{BlockchainError, Result};
use crate::utils::{base58_decode, base58_encode, new_key_pair, ripemd160_digest, sha256_digest};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

/// A signer: PKCS#8 private key plus the matching `x‖y` public key.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Drop for Wallet {
    fn drop(&mut self) {
        self.pkcs8.zeroize();
    }
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let (pkcs8, public_key) = new_key_pair()?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self, version: u8) -> String {
        convert_address(version, &self.get_pub_key_hash())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    pub fn get_pub_key_hash(&self) -> Vec<u8> {
        hash_pub_key(&self.public_key)
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

/// Checksum and length check only; the version byte is not compared.
pub fn validate_address(address: &str) -> bool {
    let payload = match base58_decode(address) {
        Ok(payload) => payload,
        Err(_) => return false,
    };

    if payload.len() < ADDRESS_CHECK_SUM_LEN + 1 {
        return false;
    }

    let (body, actual_checksum) = payload.split_at(payload.len() - ADDRESS_CHECK_SUM_LEN);
    checksum(body) == actual_checksum
}

/// version + pub_key_hash + checksum, base58 encoded
pub fn convert_address(version: u8, pub_key_hash: &[u8]) -> String {
    let mut payload: Vec<u8> = Vec::with_capacity(1 + pub_key_hash.len() + ADDRESS_CHECK_SUM_LEN);
    payload.push(version);
    payload.extend(pub_key_hash);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    base58_encode(payload.as_slice())
}

/// Extracts the key hash from a text address after validating it.
pub fn decode_address(address: &str) -> Result<Vec<u8>> {
    if !validate_address(address) {
        return Err(BlockchainError::InvalidAddress(address.to_string()));
    }
    let payload = base58_decode(address)?;
    Ok(payload[1..payload.len() - ADDRESS_CHECK_SUM_LEN].to_vec())
}
