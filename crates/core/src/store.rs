//! On-disk cache backed by a redb database with one table per logical cache.

use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

const TRANSLATIONS_NAME: &str = "trans_cache";
const DICTIONARY_NAME: &str = "dict_cache";

const TRANSLATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new(TRANSLATIONS_NAME);
const DICTIONARY: TableDefinition<&str, &[u8]> = TableDefinition::new(DICTIONARY_NAME);

/// Logical tables held in the cache file.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Table {
    /// Raw input string to JSON `Translation`.
    Translations,
    /// Lowercase word to JSON `Dict`.
    Dictionary,
}

impl Table {
    fn definition(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            Table::Translations => TRANSLATIONS,
            Table::Dictionary => DICTIONARY,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Table::Translations => TRANSLATIONS_NAME,
            Table::Dictionary => DICTIONARY_NAME,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache database error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("cache transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("cache table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("cache storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("cache commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Handle to the translation and dictionary caches.
///
/// Every read runs in its own read transaction and every write in its own
/// write transaction, so a failed write never leaves a partial record behind.
pub struct CacheStore {
    db: Database,
}

impl CacheStore {
    /// Opens the cache file at `path`, creating it and its parent directory if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Ok(Self { db })
    }

    /// Opens a store that lives only as long as the handle.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Ok(Self { db })
    }

    /// Returns the raw value for `key`, or `None` if the key or table is absent.
    pub fn get(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read()?;
        let handle = match txn.open_table(table.definition()) {
            Ok(handle) => handle,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = handle.get(key)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    /// Upserts `key` in `table`, creating the table on first write.
    pub fn put(&self, table: Table, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut handle = txn.open_table(table.definition())?;
            handle.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Streams every entry of `table` in key order to `visit`.
    ///
    /// A table that was never written yields nothing.
    pub fn for_each<F>(&self, table: Table, mut visit: F) -> Result<(), StoreError>
    where
        F: FnMut(&str, &[u8]),
    {
        let txn = self.db.begin_read()?;
        let handle = match txn.open_table(table.definition()) {
            Ok(handle) => handle,
            Err(TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        for entry in handle.iter()? {
            let (key, value) = entry?;
            visit(key.value(), value.value());
        }
        Ok(())
    }

    /// Reads and decodes a JSON record. Undecodable bytes count as a miss.
    pub fn get_json<T>(&self, table: Table, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.get(table, key)? else {
            return Ok(None);
        };
        Ok(decode_record(table, key, &raw))
    }

    pub fn put_json<T>(&self, table: Table, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let encoded = serde_json::to_vec(value)?;
        self.put(table, key, &encoded)
    }
}

/// Decodes a stored record, logging and discarding corrupt bytes.
pub fn decode_record<T: DeserializeOwned>(table: Table, key: &str, raw: &[u8]) -> Option<T> {
    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(table = table.name(), key, error = %err, "skipping undecodable cache record");
            None
        }
    }
}
