use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use log::info;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Address-keyed wallet collection persisted to a single file.
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    path: PathBuf,
    address_version: u8,
}

impl Wallets {
    /// Loads the collection at `path`; a missing file yields an empty one.
    pub fn load(path: &Path, address_version: u8) -> Result<Wallets> {
        let wallets = if path.exists() {
            let bytes = fs::read(path)?;
            deserialize(&bytes)?
        } else {
            HashMap::new()
        };
        Ok(Wallets {
            wallets,
            path: path.to_path_buf(),
            address_version,
        })
    }

    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address(self.address_version);
        self.wallets.insert(address.clone(), wallet);
        self.save_to_file()?;
        info!("Created wallet {address}");
        Ok(address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    /// Like [`Wallets::get_wallet`], but a missing signer is an error.
    pub fn require_wallet(&self, address: &str) -> Result<&Wallet> {
        self.get_wallet(address).ok_or_else(|| {
            BlockchainError::Wallet(format!("Wallet not found for address: {address}"))
        })
    }

    fn save_to_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        let wallets_bytes = serialize(&self.wallets)?;
        writer.write_all(wallets_bytes.as_slice())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallets_persist_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wallets.dat");

        let mut wallets = Wallets::load(&path, 0).unwrap();
        assert!(wallets.get_addresses().is_empty());
        let first = wallets.create_wallet().unwrap();
        let second = wallets.create_wallet().unwrap();

        let reloaded = Wallets::load(&path, 0).unwrap();
        let addresses = reloaded.get_addresses();
        assert_eq!(addresses.len(), 2);
        assert!(addresses.contains(&first) && addresses.contains(&second));
        assert_eq!(
            reloaded.require_wallet(&first).unwrap().get_public_key(),
            wallets.require_wallet(&first).unwrap().get_public_key()
        );
        assert!(matches!(
            reloaded.require_wallet("unknown"),
            Err(BlockchainError::Wallet(_))
        ));
    }

    #[test]
    fn test_corrupt_wallet_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallets.dat");
        fs::write(&path, [0xFF, 0xFF, 0xFF]).unwrap();
        assert!(Wallets::load(&path, 0).is_err());
    }
}
