use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};

use crate::error::{BlockchainError, Result};

/// Width in bytes of one P-256 scalar or coordinate.
pub const P256_COMPONENT_LEN: usize = 32;

// SEC1 tag for an uncompressed point; ring wants it, the ledger stores x‖y without it.
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| BlockchainError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}

/// Generates a P-256 key pair, returning the PKCS#8 document and the
/// public key as fixed-width `x‖y`.
pub fn new_key_pair() -> Result<(Vec<u8>, Vec<u8>)> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    let public_key = public_key_from_pkcs8(&pkcs8)?;
    Ok((pkcs8, public_key))
}

pub fn public_key_from_pkcs8(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let point = key_pair.public_key().as_ref();
    match point.split_first() {
        Some((&UNCOMPRESSED_POINT_TAG, xy)) if xy.len() == 2 * P256_COMPONENT_LEN => {
            Ok(xy.to_vec())
        }
        _ => Err(BlockchainError::Crypto(
            "Unexpected public key encoding".to_string(),
        )),
    }
}

/// Signs `message` and returns the signature as fixed-width `r‖s`.
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

/// Splits a two-component encoding (`r‖s` or `x‖y`) at its midpoint.
///
/// Both components must be exactly [`P256_COMPONENT_LEN`] bytes; anything
/// else is rejected instead of guessing where one component ends.
pub fn split_components(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    if bytes.len() != 2 * P256_COMPONENT_LEN {
        return None;
    }
    Some(bytes.split_at(P256_COMPONENT_LEN))
}

/// Verifies an `r‖s` signature over `message` against an `x‖y` public key.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let (Some((x, y)), Some((r, s))) = (split_components(public_key), split_components(signature))
    else {
        return false;
    };

    let mut point = Vec::with_capacity(1 + 2 * P256_COMPONENT_LEN);
    point.push(UNCOMPRESSED_POINT_TAG);
    point.extend_from_slice(x);
    point.extend_from_slice(y);

    let mut rs = Vec::with_capacity(2 * P256_COMPONENT_LEN);
    rs.extend_from_slice(r);
    rs.extend_from_slice(s);

    UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, point)
        .verify(message, &rs)
        .is_ok()
}
