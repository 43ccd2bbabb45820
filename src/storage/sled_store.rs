use crate::error::{BlockchainError, Result};
use crate::storage::KvStore;
use log::{debug, info};
use sled::{Batch, Db, Tree};
use std::path::{Path, PathBuf};

const BLOCKS_TREE: &str = "blocks";

/// Block store backed by an embedded sled database.
pub struct SledStore {
    db: Db,
    blocks: Tree,
    db_path: PathBuf,
}

impl SledStore {
    pub fn open(path: &Path) -> Result<SledStore> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Storage(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Storage(format!("Failed to open blocks tree: {e}")))?;
        info!("Opened block store at {}", path.display());
        Ok(SledStore {
            db,
            blocks,
            db_path: path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .blocks
            .get(key)
            .map_err(|e| BlockchainError::Storage(format!("Failed to read key: {e}")))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.blocks
            .insert(key, value)
            .map_err(|e| BlockchainError::Storage(format!("Failed to write key: {e}")))?;
        Ok(())
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<()> {
        let mut batch = Batch::default();
        for (key, value) in entries {
            batch.insert(*key, *value);
        }
        self.blocks
            .apply_batch(batch)
            .map_err(|e| BlockchainError::Storage(format!("Failed to apply batch: {e}")))?;
        debug!("Committed batch of {} entries", entries.len());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| BlockchainError::Storage(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}
