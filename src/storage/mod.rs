//! Key-value persistence behind the chain store
//!
//! The chain store only needs get/put/exists/close over raw bytes, so every
//! backend implements [`KvStore`] and is injected as a trait object.

pub mod memory_store;
pub mod sled_store;

pub use memory_store::MemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;

/// Reserved key holding the hash of the current chain head.
pub const TIP_BLOCK_HASH_KEY: &[u8] = b"lh";

pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Writes all entries. Backends that can commit several keys atomically
    /// override this; the fallback writes them in order.
    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<()> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Whether a chain has already been initialized in this store.
    fn exists(&self) -> Result<bool> {
        Ok(self.get(TIP_BLOCK_HASH_KEY)?.is_some())
    }

    fn close(&self) -> Result<()>;
}
