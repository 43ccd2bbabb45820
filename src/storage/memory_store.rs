use crate::error::{BlockchainError, Result};
use crate::storage::KvStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-process store for tests and throwaway chains. Nothing survives the
/// value being dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> Result<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| BlockchainError::Storage(format!("Lock poisoned: {e}")))?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data = self
            .data
            .read()
            .map_err(|e| BlockchainError::Storage(format!("Lock poisoned: {e}")))?;
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| BlockchainError::Storage(format!("Lock poisoned: {e}")))?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    // Single lock acquisition, so readers never observe half a batch.
    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| BlockchainError::Storage(format!("Lock poisoned: {e}")))?;
        for (key, value) in entries {
            data.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
