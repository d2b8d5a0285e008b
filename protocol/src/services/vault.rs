//! # Vault
//!
//! A participant's local record of finalized transactions and of which
//! states it can still spend.
//!
//! The vault is not an authority on uniqueness. It can be stale (a
//! transaction we were not party to may have consumed something) and that
//! is fine: the notary has the last word. The vault exists so a node knows
//! what it holds and can refuse to sign obviously stale proposals.
//!
//! Two implementations:
//!
//! | Type            | Backing                     | Use            |
//! |-----------------|-----------------------------|----------------|
//! | [`InMemoryVault`] | `parking_lot::RwLock` maps | tests, demo    |
//! | [`SledVault`]     | sled trees, bincode values | persistent node |

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::crypto::hash::SecureHash;
use crate::state::{StateAndRef, StateRef, UniqueIdentifier};
use crate::transaction::{codec, FinalizedTransaction};

// ---------------------------------------------------------------------------
// Errors & Interface
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("no unspent state at {0}")]
    NotFound(StateRef),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for VaultError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<codec::CodecError> for VaultError {
    fn from(err: codec::CodecError) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Record a finalized transaction: its inputs become spent, its outputs
    /// unspent. Storing the same transaction twice is a no-op.
    async fn store(&self, tx: &FinalizedTransaction) -> Result<(), VaultError>;

    async fn lookup_unspent(&self, reference: &StateRef) -> Result<StateAndRef, VaultError>;

    /// The current head of a lineage, if we hold it unspent.
    async fn unspent_by_linear_id(
        &self,
        linear_id: &UniqueIdentifier,
    ) -> Result<Option<StateAndRef>, VaultError>;

    async fn transaction(
        &self,
        txid: &SecureHash,
    ) -> Result<Option<FinalizedTransaction>, VaultError>;

    async fn unspent_states(&self) -> Result<Vec<StateAndRef>, VaultError>;
}

// ---------------------------------------------------------------------------
// InMemoryVault
// ---------------------------------------------------------------------------

#[derive(Default)]
struct VaultMaps {
    transactions: HashMap<SecureHash, FinalizedTransaction>,
    unspent: BTreeMap<StateRef, StateAndRef>,
}

#[derive(Default)]
pub struct InMemoryVault {
    maps: RwLock<VaultMaps>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.maps.read().transactions.len()
    }
}

#[async_trait]
impl VaultStore for InMemoryVault {
    async fn store(&self, tx: &FinalizedTransaction) -> Result<(), VaultError> {
        let txid = tx.id();
        let mut maps = self.maps.write();
        if maps.transactions.contains_key(&txid) {
            return Ok(());
        }
        for r in tx.signed.proposal().input_refs() {
            maps.unspent.remove(&r);
        }
        for out in tx.signed.proposal().output_refs() {
            maps.unspent.insert(out.reference, out);
        }
        maps.transactions.insert(txid, tx.clone());
        debug!(txid = %txid, "stored in memory vault");
        Ok(())
    }

    async fn lookup_unspent(&self, reference: &StateRef) -> Result<StateAndRef, VaultError> {
        self.maps
            .read()
            .unspent
            .get(reference)
            .cloned()
            .ok_or(VaultError::NotFound(*reference))
    }

    async fn unspent_by_linear_id(
        &self,
        linear_id: &UniqueIdentifier,
    ) -> Result<Option<StateAndRef>, VaultError> {
        Ok(self
            .maps
            .read()
            .unspent
            .values()
            .find(|s| s.state.linear_id() == linear_id)
            .cloned())
    }

    async fn transaction(
        &self,
        txid: &SecureHash,
    ) -> Result<Option<FinalizedTransaction>, VaultError> {
        Ok(self.maps.read().transactions.get(txid).cloned())
    }

    async fn unspent_states(&self) -> Result<Vec<StateAndRef>, VaultError> {
        Ok(self.maps.read().unspent.values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// SledVault
// ---------------------------------------------------------------------------

/// sled-backed vault.
///
/// | Tree           | Key                          | Value                          |
/// |----------------|------------------------------|--------------------------------|
/// | `transactions` | txid (32B)                   | `bincode(FinalizedTransaction)` |
/// | `unspent`      | txhash (32B) ++ index (4B BE) | `bincode(StateAndRef)`         |
///
/// Both trees are updated in one sled transaction, so a crash never leaves
/// an input spent without its transaction recorded.
#[derive(Debug, Clone)]
pub struct SledVault {
    db: sled::Db,
    transactions: sled::Tree,
    unspent: sled::Tree,
}

impl SledVault {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VaultError> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory sled instance, dropped with the vault.
    pub fn open_temporary() -> Result<Self, VaultError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, VaultError> {
        let transactions = db.open_tree("transactions")?;
        let unspent = db.open_tree("unspent")?;
        Ok(Self {
            db,
            transactions,
            unspent,
        })
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn flush(&self) -> Result<(), VaultError> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl VaultStore for SledVault {
    async fn store(&self, tx: &FinalizedTransaction) -> Result<(), VaultError> {
        use sled::transaction::{ConflictableTransactionError, TransactionError};
        use sled::Transactional;

        let txid = tx.id();
        let tx_bytes = codec::encode(tx)?;
        let spent: Vec<[u8; 36]> = tx
            .signed
            .proposal()
            .input_refs()
            .iter()
            .map(StateRef::to_key_bytes)
            .collect();
        let mut created = Vec::new();
        for out in tx.signed.proposal().output_refs() {
            created.push((out.reference.to_key_bytes(), codec::encode(&out)?));
        }

        let result: Result<(), TransactionError<()>> = (&self.transactions, &self.unspent)
            .transaction(|(txs, unspent)| {
                if txs.get(txid.as_bytes())?.is_some() {
                    return Ok(());
                }
                for key in &spent {
                    unspent.remove(&key[..])?;
                }
                for (key, value) in &created {
                    unspent.insert(&key[..], value.as_slice())?;
                }
                txs.insert(&txid.as_bytes()[..], tx_bytes.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            });
        result.map_err(|e| VaultError::Storage(format!("{:?}", e)))?;

        self.db.flush_async().await?;
        debug!(txid = %txid, "stored in sled vault");
        Ok(())
    }

    async fn lookup_unspent(&self, reference: &StateRef) -> Result<StateAndRef, VaultError> {
        match self.unspent.get(reference.to_key_bytes())? {
            Some(bytes) => Ok(codec::decode(&bytes)?),
            None => Err(VaultError::NotFound(*reference)),
        }
    }

    async fn unspent_by_linear_id(
        &self,
        linear_id: &UniqueIdentifier,
    ) -> Result<Option<StateAndRef>, VaultError> {
        for entry in self.unspent.iter() {
            let (_key, value) = entry?;
            let candidate: StateAndRef = codec::decode(&value)?;
            if candidate.state.linear_id() == linear_id {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn transaction(
        &self,
        txid: &SecureHash,
    ) -> Result<Option<FinalizedTransaction>, VaultError> {
        match self.transactions.get(txid.as_bytes())? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn unspent_states(&self) -> Result<Vec<StateAndRef>, VaultError> {
        let mut states = Vec::with_capacity(self.unspent.len());
        for entry in self.unspent.iter() {
            let (_key, value) = entry?;
            states.push(codec::decode(&value)?);
        }
        Ok(states)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
