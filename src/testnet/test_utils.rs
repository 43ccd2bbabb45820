use crate::config::Config;
use crate::core::Blockchain;
use crate::storage::MemoryStore;
use crate::wallet::Wallet;

/// Low enough that a block is found within a few dozen nonces.
pub const TEST_DIFFICULTY: u32 = 4;

pub fn test_config() -> Config {
    Config::default().with_difficulty(TEST_DIFFICULTY)
}

/// A fresh in-memory chain whose genesis pays the default reward to `alice`.
pub struct ChainFixture {
    pub blockchain: Blockchain,
    pub alice: Wallet,
    pub bob: Wallet,
}

impl ChainFixture {
    pub fn new() -> ChainFixture {
        let alice = Wallet::new().unwrap();
        let bob = Wallet::new().unwrap();
        let blockchain = Blockchain::create_blockchain(
            Box::new(MemoryStore::new()),
            &test_config(),
            &alice.get_pub_key_hash(),
        )
        .unwrap();
        ChainFixture {
            blockchain,
            alice,
            bob,
        }
    }
}
