// Transactions move value through unspent outputs. A request claims one
// output of an earlier transaction, a result locks new value to a key hash.

use crate::error::{BlockchainError, Result};
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, serialize,
    sha256_digest,
};
use crate::wallet::hash_pub_key;
use data_encoding::HEXLOWER;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Output index carried by the single request of a coinbase transaction.
pub const COINBASE_VOUT: i64 = -1;

const COINBASE_DATA_LEN: usize = 24;

/// Previously committed transactions keyed by id, as needed by
/// [`Transaction::sign`] and [`Transaction::verify`].
pub type PrevTransactions = HashMap<Vec<u8>, Transaction>;

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXRequest {
    txid: Vec<u8>,
    vout: i64,
    signature: Vec<u8>,
    pub_key: Vec<u8>,
}

impl TXRequest {
    /// An unsigned request claiming output `vout` of transaction `txid`.
    pub fn new(txid: &[u8], vout: i64) -> TXRequest {
        TXRequest {
            txid: txid.to_vec(),
            vout,
            signature: vec![],
            pub_key: vec![],
        }
    }

    /// An unsigned request carrying the spender's `x‖y` public key.
    pub fn with_pub_key(txid: &[u8], vout: i64, pub_key: &[u8]) -> TXRequest {
        TXRequest {
            pub_key: pub_key.to_vec(),
            ..TXRequest::new(txid, vout)
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    /// Whether this request was made by the holder of `pub_key_hash`.
    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        hash_pub_key(self.pub_key.as_slice()) == pub_key_hash
    }

    fn output_index(&self) -> Option<usize> {
        usize::try_from(self.vout).ok()
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXResult {
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TXResult {
    pub fn new(value: u64, pub_key_hash: &[u8]) -> TXResult {
        TXResult {
            value,
            pub_key_hash: pub_key_hash.to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.as_slice() == pub_key_hash
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXRequest>,
    vout: Vec<TXResult>,
}

impl Transaction {
    /// Mints `reward` to `to_pub_key_hash`. Empty `data` is replaced by random
    /// filler so two coinbases to the same key never share an id.
    pub fn new_coinbase_tx(to_pub_key_hash: &[u8], reward: u64, data: &[u8]) -> Result<Transaction> {
        let data = if data.is_empty() {
            let mut filler = [0u8; COINBASE_DATA_LEN];
            rand::thread_rng().fill_bytes(&mut filler);
            HEXLOWER.encode(&filler).into_bytes()
        } else {
            data.to_vec()
        };

        let tx_input = TXRequest {
            txid: vec![],
            vout: COINBASE_VOUT,
            signature: vec![],
            pub_key: data,
        };

        let mut tx = Transaction {
            id: vec![],
            vin: vec![tx_input],
            vout: vec![TXResult::new(reward, to_pub_key_hash)],
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Assembles a transaction from already chosen requests and results and
    /// computes its id. Requests are left unsigned.
    pub fn new_unsigned(vin: Vec<TXRequest>, vout: Vec<TXResult>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    /// SHA-256 of the canonical encoding with the id field cleared.
    pub fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    /// Copy with every request's signature and public key cleared; the basis
    /// of each per-request signing digest.
    fn trimmed_copy(&self) -> Transaction {
        let vin = self
            .vin
            .iter()
            .map(|input| TXRequest::new(input.get_txid(), input.get_vout()))
            .collect();
        Transaction {
            id: self.id.clone(),
            vin,
            vout: self.vout.clone(),
        }
    }

    fn check_prev_transactions(&self, prev_txs: &PrevTransactions) -> Result<()> {
        for vin in &self.vin {
            if !prev_txs.contains_key(vin.get_txid()) {
                return Err(BlockchainError::NotFound(format!(
                    "previous transaction {}",
                    HEXLOWER.encode(vin.get_txid())
                )));
            }
        }
        Ok(())
    }

    fn referenced_output<'a>(
        vin: &TXRequest,
        prev_txs: &'a PrevTransactions,
    ) -> Result<&'a TXResult> {
        let not_found = || {
            BlockchainError::NotFound(format!(
                "output {}:{}",
                HEXLOWER.encode(vin.get_txid()),
                vin.get_vout()
            ))
        };
        let prev_tx = prev_txs.get(vin.get_txid()).ok_or_else(not_found)?;
        vin.output_index()
            .and_then(|idx| prev_tx.vout.get(idx))
            .ok_or_else(not_found)
    }

    /// Digest signed for request `idx`: the trimmed copy's id with that
    /// request's public key temporarily set to the referenced output's key hash.
    fn signing_digest(
        tx_copy: &mut Transaction,
        idx: usize,
        prev_output: &TXResult,
    ) -> Result<Vec<u8>> {
        tx_copy.vin[idx].signature = vec![];
        tx_copy.vin[idx].pub_key = prev_output.pub_key_hash.clone();
        tx_copy.id = tx_copy.hash()?;
        tx_copy.vin[idx].pub_key = vec![];
        Ok(tx_copy.id.clone())
    }

    pub fn sign(&mut self, pkcs8: &[u8], prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }
        self.check_prev_transactions(prev_txs)?;

        let mut tx_copy = self.trimmed_copy();
        for idx in 0..self.vin.len() {
            let prev_output = Self::referenced_output(&self.vin[idx], prev_txs)?;
            let digest = Self::signing_digest(&mut tx_copy, idx, prev_output)?;
            self.vin[idx].signature = ecdsa_p256_sha256_sign_digest(pkcs8, &digest)?;
        }
        Ok(())
    }

    /// `Ok(false)` on the first request whose signature does not check out or
    /// whose public key does not own the output it claims.
    pub fn verify(&self, prev_txs: &PrevTransactions) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }
        self.check_prev_transactions(prev_txs)?;

        let mut tx_copy = self.trimmed_copy();
        for (idx, vin) in self.vin.iter().enumerate() {
            let prev_output = Self::referenced_output(vin, prev_txs)?;
            if !vin.uses_key(prev_output.get_pub_key_hash()) {
                log::warn!(
                    "Request {idx} of {} claims an output locked to another key",
                    HEXLOWER.encode(&self.id)
                );
                return Ok(false);
            }
            let digest = Self::signing_digest(&mut tx_copy, idx, prev_output)?;
            if !ecdsa_p256_sha256_sign_verify(
                vin.pub_key.as_slice(),
                vin.signature.as_slice(),
                &digest,
            ) {
                log::warn!(
                    "Signature check failed for request {idx} of {}",
                    HEXLOWER.encode(&self.id)
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXRequest] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXResult] {
        self.vout.as_slice()
    }

    pub fn get_output_value(&self) -> Result<u64> {
        self.vout.iter().try_fold(0u64, |total, out| {
            total
                .checked_add(out.get_value())
                .ok_or_else(|| BlockchainError::InvalidTransaction("Output value overflow".into()))
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Transaction {}:", HEXLOWER.encode(&self.id))?;
        for (i, req) in self.vin.iter().enumerate() {
            writeln!(f, "    Request {i}:")?;
            writeln!(f, "      TXID:      {}", HEXLOWER.encode(&req.txid))?;
            writeln!(f, "      Out:       {}", req.vout)?;
            writeln!(f, "      Signature: {}", HEXLOWER.encode(&req.signature))?;
            writeln!(f, "      PubKey:    {}", HEXLOWER.encode(&req.pub_key))?;
        }
        for (i, res) in self.vout.iter().enumerate() {
            writeln!(f, "    Result {i}:")?;
            writeln!(f, "      Value:     {}", res.value)?;
            writeln!(f, "      KeyHash:   {}", HEXLOWER.encode(&res.pub_key_hash))?;
        }
        Ok(())
    }
}
