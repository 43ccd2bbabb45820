// The chain store: an append-only sequence of mined blocks in a key-value
// store, with the reserved "lh" key pointing at the newest one.

use crate::config::Config;
use crate::core::{Block, PrevTransactions, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::{KvStore, TIP_BLOCK_HASH_KEY};
use data_encoding::HEXLOWER;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::iter::FusedIterator;
use std::mem;

const GENESIS_COINBASE_DATA: &[u8] = b"First transaction from genesis";

pub struct Blockchain {
    store: Box<dyn KvStore>,
    pow: ProofOfWork,
    tip_hash: Vec<u8>, // hash of the most recent block
}

impl Blockchain {
    /// Initializes a new chain whose genesis coinbase pays the configured
    /// reward to `genesis_pub_key_hash`.
    pub fn create_blockchain(
        store: Box<dyn KvStore>,
        config: &Config,
        genesis_pub_key_hash: &[u8],
    ) -> Result<Blockchain> {
        let coinbase = Transaction::new_coinbase_tx(
            genesis_pub_key_hash,
            config.genesis_reward,
            GENESIS_COINBASE_DATA,
        )?;
        Self::create_genesis(store, config, coinbase)
    }

    /// Mines a genesis block holding only `coinbase` and makes it the head.
    /// Fails if the store already holds a chain.
    pub fn create_genesis(
        store: Box<dyn KvStore>,
        config: &Config,
        coinbase: Transaction,
    ) -> Result<Blockchain> {
        config.validate()?;
        if store.exists()? {
            return Err(BlockchainError::AlreadyExists(
                "a blockchain is already initialized in this store".to_string(),
            ));
        }

        let pow = ProofOfWork::new(config.difficulty)?;
        info!("Creating genesis block");
        let genesis = Block::generate_genesis_block(&coinbase, &pow)?;
        Self::persist(store.as_ref(), &genesis)?;
        info!("Genesis block created: {}", genesis.get_hash_hex());

        Ok(Blockchain {
            store,
            pow,
            tip_hash: genesis.get_hash().to_vec(),
        })
    }

    /// Opens an existing chain.
    pub fn open(store: Box<dyn KvStore>, config: &Config) -> Result<Blockchain> {
        config.validate()?;
        let tip_hash = store.get(TIP_BLOCK_HASH_KEY)?.ok_or_else(|| {
            BlockchainError::NotFound("No existing blockchain found. Create one first.".to_string())
        })?;
        let pow = ProofOfWork::new(config.difficulty)?;
        debug!("Opened chain at tip {}", HEXLOWER.encode(&tip_hash));
        Ok(Blockchain {
            store,
            pow,
            tip_hash,
        })
    }

    // Block content first, head pointer second, in one batch so backends
    // that support it never expose a head without its block.
    fn persist(store: &dyn KvStore, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;
        store.put_batch(&[
            (block.get_hash(), block_data.as_slice()),
            (TIP_BLOCK_HASH_KEY, block.get_hash()),
        ])
    }

    pub fn get_tip_hash(&self) -> &[u8] {
        self.tip_hash.as_slice()
    }

    pub fn get_pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Mines `transactions` into a new block on top of the stored head and
    /// advances the head to it. No validation beyond the non-empty check.
    pub fn add_block(&mut self, transactions: &[Transaction]) -> Result<Block> {
        let tip_hash = self
            .store
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or_else(|| BlockchainError::NotFound("chain head".to_string()))?;

        let block = Block::new_block(tip_hash, transactions, &self.pow)?;
        Self::persist(self.store.as_ref(), &block)?;
        self.tip_hash = block.get_hash().to_vec();
        info!(
            "Appended block {} ({} transaction(s))",
            block.get_hash_hex(),
            transactions.len()
        );
        Ok(block)
    }

    /// Checks signatures and double spends, then appends the block.
    pub fn mine_block(&mut self, transactions: &[Transaction]) -> Result<Block> {
        for (i, transaction) in transactions.iter().enumerate() {
            let prev_txs = self.previous_transactions(transaction)?;
            if !transaction.verify(&prev_txs)? {
                warn!("Rejecting block: transaction {i} failed verification");
                return Err(BlockchainError::InvalidTransaction(format!(
                    "Invalid signature in transaction at index {i}"
                )));
            }
        }
        self.check_for_double_spending(transactions)?;
        self.add_block(transactions)
    }

    fn check_for_double_spending(&self, transactions: &[Transaction]) -> Result<()> {
        let already_spent = self.spent_outputs()?;
        let mut spent_in_block: HashSet<(&[u8], i64)> = HashSet::new();

        for transaction in transactions.iter().filter(|tx| !tx.is_coinbase()) {
            for input in transaction.get_vin() {
                let output_reference = (input.get_txid(), input.get_vout());
                if already_spent.contains(&(input.get_txid().to_vec(), input.get_vout()))
                    || !spent_in_block.insert(output_reference)
                {
                    return Err(BlockchainError::InvalidTransaction(format!(
                        "Output {}:{} is already spent",
                        HEXLOWER.encode(input.get_txid()),
                        input.get_vout()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every `(txid, output index)` claimed by a committed request.
    pub fn spent_outputs(&self) -> Result<HashSet<(Vec<u8>, i64)>> {
        let mut spent = HashSet::new();
        for block in self.iterator() {
            for tx in block?.get_transactions() {
                if tx.is_coinbase() {
                    continue;
                }
                for input in tx.get_vin() {
                    spent.insert((input.get_txid().to_vec(), input.get_vout()));
                }
            }
        }
        Ok(spent)
    }

    pub fn iterator(&self) -> BlockchainIterator<'_> {
        BlockchainIterator::new(self.tip_hash.clone(), self.store.as_ref(), &self.pow)
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Transaction> {
        for block in self.iterator() {
            let block = block?;
            if let Some(tx) = block.get_transactions().iter().find(|tx| tx.get_id() == txid) {
                return Ok(tx.clone());
            }
        }
        Err(BlockchainError::NotFound(format!(
            "transaction {}",
            HEXLOWER.encode(txid)
        )))
    }

    /// Resolves every transaction referenced by `tx`'s requests in a single
    /// pass over the chain. Coinbase transactions reference nothing.
    pub fn previous_transactions(&self, tx: &Transaction) -> Result<PrevTransactions> {
        let mut prev_txs = PrevTransactions::new();
        if tx.is_coinbase() {
            return Ok(prev_txs);
        }

        let mut wanted: HashSet<&[u8]> = tx.get_vin().iter().map(|vin| vin.get_txid()).collect();
        for block in self.iterator() {
            if wanted.is_empty() {
                break;
            }
            for candidate in block?.get_transactions() {
                if wanted.remove(candidate.get_id()) {
                    prev_txs.insert(candidate.get_id().to_vec(), candidate.clone());
                }
            }
        }

        match wanted.into_iter().next() {
            Some(missing) => Err(BlockchainError::NotFound(format!(
                "previous transaction {}",
                HEXLOWER.encode(missing)
            ))),
            None => Ok(prev_txs),
        }
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        match self.store.get(block_hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of blocks from the head back to genesis.
    pub fn block_count(&self) -> Result<usize> {
        self.iterator().try_fold(0, |count, block| block.map(|_| count + 1))
    }

    /// Walks the whole chain checking proof-of-work, Merkle roots and the
    /// genesis shape. Returns the number of blocks checked.
    pub fn validate_chain(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iterator() {
            let block = block?;
            if !block.verify_merkle_root()? {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Merkle root mismatch in block {}",
                    block.get_hash_hex()
                )));
            }
            if block.is_genesis()
                && !(block.get_transactions().len() == 1
                    && block.get_transactions()[0].is_coinbase())
            {
                return Err(BlockchainError::InvalidBlock(
                    "Genesis block must hold exactly one coinbase transaction".to_string(),
                ));
            }
            count += 1;
        }
        info!("Validated {count} block(s)");
        Ok(count)
    }

    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

enum IteratorState {
    At(Vec<u8>),
    ReachedGenesis,
}

/// Walks the chain newest-first, ending after the genesis block.
///
/// Each loaded block is checked against the proof-of-work target. Any
/// failure is yielded once and ends the walk. A fresh iterator is needed to
/// replay the chain.
pub struct BlockchainIterator<'a> {
    store: &'a dyn KvStore,
    pow: &'a ProofOfWork,
    state: IteratorState,
}

impl<'a> BlockchainIterator<'a> {
    fn new(tip_hash: Vec<u8>, store: &'a dyn KvStore, pow: &'a ProofOfWork) -> Self {
        BlockchainIterator {
            store,
            pow,
            state: IteratorState::At(tip_hash),
        }
    }

    fn load(&self, block_hash: &[u8]) -> Result<Block> {
        let bytes = self.store.get(block_hash)?.ok_or_else(|| {
            BlockchainError::NotFound(format!("block {}", HEXLOWER.encode(block_hash)))
        })?;
        let block = Block::deserialize(&bytes)?;
        if block.get_hash() != block_hash {
            return Err(BlockchainError::InvalidBlock(format!(
                "block stored under {} claims hash {}",
                HEXLOWER.encode(block_hash),
                block.get_hash_hex()
            )));
        }
        if !self.pow.validate(&block) {
            return Err(BlockchainError::ProofOfWorkInvalid(block.get_hash_hex()));
        }
        Ok(block)
    }
}

impl Iterator for BlockchainIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let current_hash = match mem::replace(&mut self.state, IteratorState::ReachedGenesis) {
            IteratorState::At(hash) => hash,
            IteratorState::ReachedGenesis => return None,
        };

        let block = match self.load(&current_hash) {
            Ok(block) => block,
            Err(e) => return Some(Err(e)),
        };
        if !block.is_genesis() {
            self.state = IteratorState::At(block.get_pre_block_hash().to_vec());
        }
        Some(Ok(block))
    }
}

impl FusedIterator for BlockchainIterator<'_> {}
