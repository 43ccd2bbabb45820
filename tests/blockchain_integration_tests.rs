//! Blockchain integration tests
//!
//! Drive the chain store, ledger and wallet layer together through the
//! public API, on sled-backed stores in temporary directories.

use std::path::Path;
use tempfile::tempdir;
use utxo_chain::core::{Block, Blockchain, Ledger, ProofOfWork, Transaction};
use utxo_chain::storage::{KvStore, SledStore, TIP_BLOCK_HASH_KEY};
use utxo_chain::wallet::{decode_address, Wallet, Wallets};
use utxo_chain::{BlockchainError, Config};

fn test_config(dir: &Path) -> Config {
    Config {
        data_dir: dir.join("blocks"),
        wallet_file: dir.join("wallets.dat"),
        ..Config::default()
    }
    .with_difficulty(4)
}

fn open_store(config: &Config) -> Box<dyn KvStore> {
    Box::new(SledStore::open(&config.data_dir).unwrap())
}

#[test]
fn test_proof_of_work_validation() {
    let pow = ProofOfWork::new(8).unwrap();
    let coinbase_tx = Transaction::new_coinbase_tx(b"miner", 100, b"").unwrap();
    let block = Block::new_block(vec![], &[coinbase_tx], &pow).unwrap();

    assert!(pow.validate(&block));
    assert!(block.verify_merkle_root().unwrap());
}

#[test]
fn test_send_scenario() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let (a, b) = (alice.get_pub_key_hash(), bob.get_pub_key_hash());

    let mut blockchain = Blockchain::create_blockchain(open_store(&config), &config, &a).unwrap();
    assert_eq!(Ledger::new(&blockchain).get_balance(&a).unwrap(), 100);

    let tx = Ledger::new(&blockchain).new_utxo_transaction(&alice, &b, 40).unwrap();
    let values: Vec<u64> = tx.get_vout().iter().map(|out| out.get_value()).collect();
    assert_eq!(values, vec![40, 60]);
    assert!(tx.get_vout()[0].is_locked_with_key(&b));
    assert!(tx.get_vout()[1].is_locked_with_key(&a));
    blockchain.mine_block(&[tx]).unwrap();

    let ledger = Ledger::new(&blockchain);
    assert_eq!(ledger.get_balance(&a).unwrap(), 60);
    assert_eq!(ledger.get_balance(&b).unwrap(), 40);

    let too_much = ledger.new_utxo_transaction(&alice, &b, 1000);
    assert!(matches!(
        too_much,
        Err(BlockchainError::InsufficientFunds {
            required: 1000,
            available: 60
        })
    ));
    assert_eq!(blockchain.block_count().unwrap(), 2);
    assert_eq!(blockchain.validate_chain().unwrap(), 2);
}

#[test]
fn test_value_is_conserved_across_payments() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let wallets: Vec<Wallet> = (0..3).map(|_| Wallet::new().unwrap()).collect();
    let hashes: Vec<Vec<u8>> = wallets.iter().map(Wallet::get_pub_key_hash).collect();

    let mut blockchain =
        Blockchain::create_blockchain(open_store(&config), &config, &hashes[0]).unwrap();

    let payments = [(0, 1, 30), (1, 2, 10), (0, 2, 50), (2, 0, 25), (1, 0, 20)];
    for (from, to, amount) in payments {
        let tx = Ledger::new(&blockchain)
            .new_utxo_transaction(&wallets[from], &hashes[to], amount)
            .unwrap();
        blockchain.mine_block(&[tx]).unwrap();
    }

    let ledger = Ledger::new(&blockchain);
    let balances: Vec<u64> = hashes.iter().map(|h| ledger.get_balance(h).unwrap()).collect();
    assert_eq!(balances, vec![65, 0, 35]);
    assert_eq!(balances.iter().sum::<u64>(), config.genesis_reward);
}

#[test]
fn test_blockchain_persistence() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let miner = Wallet::new().unwrap().get_pub_key_hash();

    let tip = {
        let mut blockchain =
            Blockchain::create_blockchain(open_store(&config), &config, &miner).unwrap();
        for _ in 1..=3 {
            let coinbase_tx = Transaction::new_coinbase_tx(&miner, 10, b"").unwrap();
            blockchain.add_block(&[coinbase_tx]).unwrap();
        }
        let tip = blockchain.get_tip_hash().to_vec();
        blockchain.close().unwrap();
        tip
    };

    let mut blockchain = Blockchain::open(open_store(&config), &config).unwrap();
    assert_eq!(blockchain.get_tip_hash(), tip.as_slice());
    assert_eq!(blockchain.block_count().unwrap(), 4);
    assert_eq!(Ledger::new(&blockchain).get_balance(&miner).unwrap(), 130);

    let coinbase_tx = Transaction::new_coinbase_tx(&miner, 10, b"").unwrap();
    let block = blockchain.add_block(&[coinbase_tx]).unwrap();
    assert_eq!(block.get_pre_block_hash(), tip.as_slice());
    assert_eq!(blockchain.validate_chain().unwrap(), 5);
}

#[test]
fn test_create_over_existing_chain_fails() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());

    Blockchain::create_blockchain(open_store(&config), &config, b"first")
        .unwrap()
        .close()
        .unwrap();
    let again = Blockchain::create_blockchain(open_store(&config), &config, b"second");
    assert!(matches!(again, Err(BlockchainError::AlreadyExists(_))));
}

#[test]
fn test_open_requires_existing_chain() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let result = Blockchain::open(open_store(&config), &config);
    assert!(matches!(result, Err(BlockchainError::NotFound(_))));
}

#[test]
fn test_tampered_block_is_detected() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();

    let mut blockchain =
        Blockchain::create_blockchain(open_store(&config), &config, &alice.get_pub_key_hash())
            .unwrap();
    let tx = Ledger::new(&blockchain)
        .new_utxo_transaction(&alice, &bob.get_pub_key_hash(), 40)
        .unwrap();
    let block = blockchain.mine_block(&[tx]).unwrap();
    blockchain.close().unwrap();

    // Swap the payment for one that pays Bob everything, keeping the
    // mined hash and nonce.
    let store = SledStore::open(&config.data_dir).unwrap();
    let genesis_hash = block.get_pre_block_hash().to_vec();
    let forged_tx = Transaction::new_coinbase_tx(&bob.get_pub_key_hash(), 100, b"forged").unwrap();
    let forged = Block::new_block(genesis_hash, &[forged_tx], &ProofOfWork::new(0).unwrap())
        .unwrap();
    store
        .put(block.get_hash(), &forged.serialize().unwrap())
        .unwrap();
    store.close().unwrap();
    drop(store);

    let blockchain = Blockchain::open(open_store(&config), &config).unwrap();
    assert!(blockchain.validate_chain().is_err());
    assert!(Ledger::new(&blockchain)
        .get_balance(&bob.get_pub_key_hash())
        .is_err());
}

#[test]
fn test_wallet_addresses_drive_the_ledger() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());

    let (sender, recipient) = {
        let mut wallets = Wallets::load(&config.wallet_file, config.address_version).unwrap();
        (wallets.create_wallet().unwrap(), wallets.create_wallet().unwrap())
    };

    let wallets = Wallets::load(&config.wallet_file, config.address_version).unwrap();
    assert_eq!(wallets.get_addresses().len(), 2);
    let signer = wallets.require_wallet(&sender).unwrap();
    let sender_hash = decode_address(&sender).unwrap();
    let recipient_hash = decode_address(&recipient).unwrap();
    assert_eq!(signer.get_pub_key_hash(), sender_hash);

    let mut blockchain =
        Blockchain::create_blockchain(open_store(&config), &config, &sender_hash).unwrap();
    let tx = Ledger::new(&blockchain)
        .new_utxo_transaction(signer, &recipient_hash, 100)
        .unwrap();
    assert_eq!(tx.get_vout().len(), 1);
    blockchain.mine_block(&[tx]).unwrap();

    let ledger = Ledger::new(&blockchain);
    assert_eq!(ledger.get_balance(&sender_hash).unwrap(), 0);
    assert_eq!(ledger.get_balance(&recipient_hash).unwrap(), 100);
    assert!(matches!(
        wallets.require_wallet("not-an-address"),
        Err(BlockchainError::Wallet(_))
    ));
}

#[test]
fn test_head_pointer_tracks_latest_block() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let mut blockchain =
        Blockchain::create_blockchain(open_store(&config), &config, b"miner").unwrap();
    let coinbase_tx = Transaction::new_coinbase_tx(b"miner", 1, b"").unwrap();
    let block = blockchain.add_block(&[coinbase_tx]).unwrap();
    blockchain.close().unwrap();

    let store = SledStore::open(&config.data_dir).unwrap();
    assert_eq!(
        store.get(TIP_BLOCK_HASH_KEY).unwrap().as_deref(),
        Some(block.get_hash())
    );
    assert!(store.exists().unwrap());
}
