// Unspent-output queries and transaction building over a chain store.

use crate::core::{Blockchain, Transaction, TXRequest, TXResult};
use crate::error::{BlockchainError, Result};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};

/// An output nobody has claimed yet, with its position on the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub txid: Vec<u8>,
    pub index: usize,
    pub output: TXResult,
}

/// Outputs picked to cover a payment: transaction id to output indices.
/// Ordered by id so the resulting requests come out in a stable order.
pub type SpendableOutputs = BTreeMap<Vec<u8>, Vec<usize>>;

pub struct Ledger<'a> {
    blockchain: &'a Blockchain,
}

impl<'a> Ledger<'a> {
    pub fn new(blockchain: &'a Blockchain) -> Ledger<'a> {
        Ledger { blockchain }
    }

    /// Every unspent output locked to `pub_key_hash`, newest block first and
    /// in output order within a transaction.
    pub fn find_unspent_outputs(&self, pub_key_hash: &[u8]) -> Result<Vec<UnspentOutput>> {
        let spent = self.blockchain.spent_outputs()?;
        let mut unspent = Vec::new();

        for block in self.blockchain.iterator() {
            for tx in block?.get_transactions() {
                for (index, output) in tx.get_vout().iter().enumerate() {
                    let Ok(claim_index) = i64::try_from(index) else {
                        continue;
                    };
                    if spent.contains(&(tx.get_id().to_vec(), claim_index)) {
                        continue;
                    }
                    if output.is_locked_with_key(pub_key_hash) {
                        unspent.push(UnspentOutput {
                            txid: tx.get_id().to_vec(),
                            index,
                            output: output.clone(),
                        });
                    }
                }
            }
        }
        Ok(unspent)
    }

    /// Transactions holding at least one unspent output locked to
    /// `pub_key_hash`, each listed once.
    pub fn find_unspent_transactions(&self, pub_key_hash: &[u8]) -> Result<Vec<Transaction>> {
        let mut wanted: HashSet<Vec<u8>> = self
            .find_unspent_outputs(pub_key_hash)?
            .into_iter()
            .map(|utxo| utxo.txid)
            .collect();

        let mut found = Vec::with_capacity(wanted.len());
        for block in self.blockchain.iterator() {
            for tx in block?.get_transactions() {
                if wanted.remove(tx.get_id()) {
                    found.push(tx.clone());
                }
            }
        }
        Ok(found)
    }

    pub fn find_utxo(&self, pub_key_hash: &[u8]) -> Result<Vec<TXResult>> {
        Ok(self
            .find_unspent_outputs(pub_key_hash)?
            .into_iter()
            .map(|utxo| utxo.output)
            .collect())
    }

    pub fn get_balance(&self, pub_key_hash: &[u8]) -> Result<u64> {
        self.find_utxo(pub_key_hash)?
            .iter()
            .try_fold(0u64, |total, out| {
                total.checked_add(out.get_value()).ok_or_else(|| {
                    BlockchainError::InvalidTransaction("Balance overflow".to_string())
                })
            })
    }

    /// First-fit selection: takes unspent outputs in scan order until their
    /// sum reaches `amount`. The returned total may fall short of `amount`.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, SpendableOutputs)> {
        let mut accumulated = 0u64;
        let mut selected = SpendableOutputs::new();

        for utxo in self.find_unspent_outputs(pub_key_hash)? {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated.saturating_add(utxo.output.get_value());
            selected.entry(utxo.txid).or_default().push(utxo.index);
        }
        Ok((accumulated, selected))
    }

    /// Builds and signs a payment of `amount` from `wallet` to `to_pub_key_hash`.
    /// Any excess over `amount` is returned to the sender as change.
    pub fn new_utxo_transaction(
        &self,
        wallet: &Wallet,
        to_pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::InvalidTransaction(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let from_pub_key_hash = wallet.get_pub_key_hash();
        let (accumulated, selected) = self.find_spendable_outputs(&from_pub_key_hash, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = Vec::new();
        for (txid, indices) in &selected {
            for index in indices {
                let vout = i64::try_from(*index).map_err(|_| {
                    BlockchainError::InvalidTransaction(format!("output index {index} too large"))
                })?;
                inputs.push(TXRequest::with_pub_key(txid, vout, wallet.get_public_key()));
            }
        }

        let mut outputs = vec![TXResult::new(amount, to_pub_key_hash)];
        if accumulated > amount {
            outputs.push(TXResult::new(accumulated - amount, &from_pub_key_hash));
        }

        let mut tx = Transaction::new_unsigned(inputs, outputs)?;
        self.sign_transaction(&mut tx, wallet.get_pkcs8())?;
        info!(
            "Built transaction {} spending {} output(s)",
            HEXLOWER.encode(tx.get_id()),
            tx.get_vin().len()
        );
        Ok(tx)
    }

    pub fn sign_transaction(&self, tx: &mut Transaction, pkcs8: &[u8]) -> Result<()> {
        let prev_txs = self.blockchain.previous_transactions(tx)?;
        tx.sign(pkcs8, &prev_txs)
    }

    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool> {
        let prev_txs = self.blockchain.previous_transactions(tx)?;
        let valid = tx.verify(&prev_txs)?;
        debug!("Transaction {} verified: {valid}", HEXLOWER.encode(tx.get_id()));
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::ChainFixture;

    #[test]
    fn test_genesis_funds_the_first_wallet() {
        let fixture = ChainFixture::new();
        let ledger = Ledger::new(&fixture.blockchain);

        assert_eq!(ledger.get_balance(&fixture.alice.get_pub_key_hash()).unwrap(), 100);
        assert_eq!(ledger.get_balance(&fixture.bob.get_pub_key_hash()).unwrap(), 0);

        let utxos = ledger.find_unspent_outputs(&fixture.alice.get_pub_key_hash()).unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].index, 0);
        assert_eq!(utxos[0].output.get_value(), 100);
    }

    #[test]
    fn test_send_with_change() {
        let mut fixture = ChainFixture::new();
        let alice = fixture.alice.get_pub_key_hash();
        let bob = fixture.bob.get_pub_key_hash();

        let tx = Ledger::new(&fixture.blockchain)
            .new_utxo_transaction(&fixture.alice, &bob, 40)
            .unwrap();
        assert_eq!(tx.get_vin().len(), 1);
        assert_eq!(tx.get_vout().len(), 2);
        assert_eq!(tx.get_vout()[0], TXResult::new(40, &bob));
        assert_eq!(tx.get_vout()[1], TXResult::new(60, &alice));

        fixture.blockchain.mine_block(&[tx]).unwrap();

        let ledger = Ledger::new(&fixture.blockchain);
        assert_eq!(ledger.get_balance(&alice).unwrap(), 60);
        assert_eq!(ledger.get_balance(&bob).unwrap(), 40);
    }

    #[test]
    fn test_exact_amount_has_no_change() {
        let fixture = ChainFixture::new();
        let tx = Ledger::new(&fixture.blockchain)
            .new_utxo_transaction(&fixture.alice, &fixture.bob.get_pub_key_hash(), 100)
            .unwrap();
        assert_eq!(tx.get_vout().len(), 1);
    }

    #[test]
    fn test_insufficient_funds() {
        let fixture = ChainFixture::new();
        let ledger = Ledger::new(&fixture.blockchain);

        let result = ledger.new_utxo_transaction(&fixture.alice, &fixture.bob.get_pub_key_hash(), 1000);
        assert!(matches!(
            result,
            Err(BlockchainError::InsufficientFunds {
                required: 1000,
                available: 100
            })
        ));
        assert_eq!(fixture.blockchain.block_count().unwrap(), 1);
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let fixture = ChainFixture::new();
        let result = Ledger::new(&fixture.blockchain).new_utxo_transaction(
            &fixture.alice,
            &fixture.bob.get_pub_key_hash(),
            0,
        );
        assert!(matches!(result, Err(BlockchainError::InvalidTransaction(_))));
    }

    #[test]
    fn test_spendable_selection_stops_once_covered() {
        let mut fixture = ChainFixture::new();
        let alice = fixture.alice.get_pub_key_hash();
        for _ in 0..3 {
            let reward = Transaction::new_coinbase_tx(&alice, 10, b"").unwrap();
            fixture.blockchain.add_block(&[reward]).unwrap();
        }
        let ledger = Ledger::new(&fixture.blockchain);

        // newest outputs come first: three 10s, then the genesis 100
        let (accumulated, selected) = ledger.find_spendable_outputs(&alice, 15).unwrap();
        assert_eq!(accumulated, 20);
        assert_eq!(selected.values().map(Vec::len).sum::<usize>(), 2);

        let (accumulated, _) = ledger.find_spendable_outputs(&alice, 500).unwrap();
        assert_eq!(accumulated, 130);
    }

    #[test]
    fn test_spent_outputs_are_not_counted_twice() {
        let mut fixture = ChainFixture::new();
        let alice = fixture.alice.get_pub_key_hash();
        let bob = fixture.bob.get_pub_key_hash();

        // Alice pays herself twice over the same transaction, leaving two
        // outputs of one transaction locked to her.
        let tx = Ledger::new(&fixture.blockchain)
            .new_utxo_transaction(&fixture.alice, &alice, 30)
            .unwrap();
        fixture.blockchain.mine_block(&[tx.clone()]).unwrap();

        let ledger = Ledger::new(&fixture.blockchain);
        assert_eq!(ledger.get_balance(&alice).unwrap(), 100);
        assert_eq!(ledger.find_unspent_outputs(&alice).unwrap().len(), 2);
        let txs = ledger.find_unspent_transactions(&alice).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].get_id(), tx.get_id());

        let pay_bob = ledger.new_utxo_transaction(&fixture.alice, &bob, 100).unwrap();
        assert_eq!(pay_bob.get_vin().len(), 2);
        fixture.blockchain.mine_block(&[pay_bob]).unwrap();

        let ledger = Ledger::new(&fixture.blockchain);
        assert_eq!(ledger.get_balance(&alice).unwrap(), 0);
        assert!(ledger.find_unspent_transactions(&alice).unwrap().is_empty());
        assert_eq!(ledger.get_balance(&bob).unwrap(), 100);
    }

    #[test]
    fn test_verify_transaction_through_chain() {
        let fixture = ChainFixture::new();
        let ledger = Ledger::new(&fixture.blockchain);
        let tx = ledger
            .new_utxo_transaction(&fixture.alice, &fixture.bob.get_pub_key_hash(), 10)
            .unwrap();
        assert!(ledger.verify_transaction(&tx).unwrap());

        // Bob cannot spend Alice's output
        let mut forged = Transaction::new_unsigned(
            vec![TXRequest::with_pub_key(
                tx.get_vin()[0].get_txid(),
                0,
                fixture.bob.get_public_key(),
            )],
            vec![TXResult::new(100, &fixture.bob.get_pub_key_hash())],
        )
        .unwrap();
        ledger.sign_transaction(&mut forged, fixture.bob.get_pkcs8()).unwrap();
        assert!(!ledger.verify_transaction(&forged).unwrap());
    }

    #[test]
    fn test_mine_block_rejects_double_spend() {
        let mut fixture = ChainFixture::new();
        let bob = fixture.bob.get_pub_key_hash();

        let first = Ledger::new(&fixture.blockchain)
            .new_utxo_transaction(&fixture.alice, &bob, 10)
            .unwrap();
        let second = Ledger::new(&fixture.blockchain)
            .new_utxo_transaction(&fixture.alice, &bob, 20)
            .unwrap();

        let same_block = fixture.blockchain.mine_block(&[first.clone(), second.clone()]);
        assert!(matches!(same_block, Err(BlockchainError::InvalidTransaction(_))));

        fixture.blockchain.mine_block(&[first]).unwrap();
        let replay = fixture.blockchain.mine_block(&[second]);
        assert!(matches!(replay, Err(BlockchainError::InvalidTransaction(_))));
        assert_eq!(fixture.blockchain.block_count().unwrap(), 2);
    }
}
