//! Key management and address encoding
//!
//! The ledger only ever sees raw key hashes and a signing key; this module
//! is where text addresses are produced, validated and decoded.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{
    convert_address, decode_address, hash_pub_key, validate_address, Wallet,
    ADDRESS_CHECK_SUM_LEN,
};
pub use wallets::Wallets;
