//! Storage backend implementations.
//!
//! Two byte-level key/value backends share one trait:
//! - InMemoryStore: ephemeral, for tests and dry runs
//! - FileStore: a single JSON file of hex-encoded pairs, written on flush
//!
//! [`TypedStore`] layers bincode-encoded values on top of either.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key type for storage operations
pub type StorageKey = Vec<u8>;

/// Value type for storage operations
pub type StorageValue = Vec<u8>;

/// Trait for storage backends
pub trait StorageBackend: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>>;

    /// Set a value for a key
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Check if a key exists
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>>;

    /// Remove every pair whose key starts with `prefix`
    fn delete_prefix(&self, prefix: &[u8]) -> Result<usize> {
        let mut removed = 0;
        for (key, _) in self.scan_prefix(prefix)? {
            if self.delete(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Flush any pending writes to persistent storage
    fn flush(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered map behind both backends
#[derive(Debug, Default)]
struct Table {
    data: RwLock<BTreeMap<StorageKey, StorageValue>>,
}

impl Table {
    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<StorageKey, StorageValue>>> {
        self.data
            .read()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<StorageKey, StorageValue>>> {
        self.data
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))
    }

    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        Ok(self
            .read()?
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory storage backend (for testing and ephemeral use)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    table: Table,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.table.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        self.table.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.table.set(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        self.table.delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        self.table.scan_prefix(prefix)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE-BASED STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// File-based storage backend using JSON
#[derive(Debug)]
pub struct FileStore {
    /// Directory holding the data file
    base_path: PathBuf,
    /// In-memory copy of the file
    table: Table,
    /// Whether the table has changes not yet on disk
    dirty: RwLock<bool>,
}

impl FileStore {
    /// Name of the data file inside the store directory
    pub const DATA_FILE: &'static str = "safe.json";

    /// Open (or create) a file store in `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| {
            Error::Storage(format!("Failed to create storage directory: {}", e))
        })?;

        let store = Self {
            base_path,
            table: Table::default(),
            dirty: RwLock::new(false),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    /// Path of the data file
    pub fn data_file_path(&self) -> PathBuf {
        self.base_path.join(Self::DATA_FILE)
    }

    fn mark_dirty(&self, dirty: bool) -> Result<()> {
        let mut flag = self
            .dirty
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
        *flag = dirty;
        Ok(())
    }

    fn load_from_disk(&self) -> Result<()> {
        let path = self.data_file_path();
        if !path.exists() {
            return Ok(());
        }

        let file = File::open(&path)
            .map_err(|e| Error::Storage(format!("Failed to open data file: {}", e)))?;
        let data: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Deserialization(format!("Failed to parse data file: {}", e)))?;

        let mut table = self.table.write()?;
        for (key_hex, value_hex) in data {
            let key = hex::decode(&key_hex)
                .map_err(|e| Error::Deserialization(format!("Invalid key in storage: {}", e)))?;
            let value = hex::decode(&value_hex)
                .map_err(|e| Error::Deserialization(format!("Invalid value in storage: {}", e)))?;
            table.insert(key, value);
        }
        Ok(())
    }

    /// Write the table to a sibling temp file, then move it over the data file
    fn save_to_disk(&self) -> Result<()> {
        let data: BTreeMap<String, String> = self
            .table
            .read()?
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();

        let path = self.data_file_path();
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).map_err(|e| {
                Error::Storage(format!("Failed to open data file for writing: {}", e))
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &data)
                .map_err(|e| Error::Serialization(format!("Failed to write data file: {}", e)))?;
            writer
                .flush()
                .map_err(|e| Error::Storage(format!("Failed to write data file: {}", e)))?;
        }
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Storage(format!("Failed to replace data file: {}", e)))?;

        self.mark_dirty(false)
    }
}

impl StorageBackend for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        self.table.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.table.set(key, value)?;
        self.mark_dirty(true)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let existed = self.table.delete(key)?;
        if existed {
            self.mark_dirty(true)?;
        }
        Ok(existed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, StorageValue)>> {
        self.table.scan_prefix(prefix)
    }

    fn flush(&self) -> Result<()> {
        let dirty = *self
            .dirty
            .read()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;
        if dirty {
            self.save_to_disk()?;
        }
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush {} on drop: {}", self.data_file_path().display(), e);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPED STORE WRAPPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Type-safe wrapper around a storage backend
pub struct TypedStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> TypedStore<B> {
    /// Create a new typed store
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get a typed value
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        self.backend.get(key)?.map(|data| decode(&data)).transpose()
    }

    /// Set a typed value
    pub fn set<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let data = bincode::serialize(value)
            .map_err(|e| Error::Serialization(format!("Failed to serialize value: {}", e)))?;
        self.backend.set(key, &data)
    }

    /// All typed values under `prefix`, with the prefix stripped from their keys
    pub fn scan<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<(StorageKey, T)>> {
        self.backend
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(key, data)| Ok((key[prefix.len()..].to_vec(), decode(&data)?)))
            .collect()
    }

    /// Delete a value
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        self.backend.delete(key)
    }

    /// Delete every value under `prefix`
    pub fn delete_prefix(&self, prefix: &[u8]) -> Result<usize> {
        self.backend.delete_prefix(prefix)
    }

    /// Check if a key exists
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.backend.exists(key)
    }

    /// Flush pending writes
    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    bincode::deserialize(data)
        .map_err(|e| Error::Deserialization(format!("Failed to deserialize value: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PREFIXES
// ═══════════════════════════════════════════════════════════════════════════════

/// Key prefixes for different data types
pub mod prefixes {
    /// Per-user balance record: prefix + user + asset
    pub const USER: &[u8] = b"usr:";
    /// Aggregate balance record: prefix + asset
    pub const TOTAL: &[u8] = b"tot:";
    /// Ledger meta (config, owner, block)
    pub const META: &[u8] = b"meta:";
    /// Balance sheet of the local bank
    pub const BANK: &[u8] = b"bank:";
}

/// Create a key with a prefix
pub fn make_key(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let len = prefix.len() + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut result = Vec::with_capacity(len);
    result.extend_from_slice(prefix);
    for part in parts {
        result.extend_from_slice(part);
    }
    result
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryStore::new();

        store.set(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"nonexistent").unwrap(), None);

        assert!(store.exists(b"key1").unwrap());
        assert!(!store.exists(b"nonexistent").unwrap());

        assert!(store.delete(b"key1").unwrap());
        assert!(!store.exists(b"key1").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_scan_prefix_is_ordered_and_bounded() {
        let store = InMemoryStore::new();
        store.set(b"usr:b", b"2").unwrap();
        store.set(b"usr:a", b"1").unwrap();
        store.set(b"usr;", b"x").unwrap();
        store.set(b"tot:a", b"3").unwrap();

        let users = store.scan_prefix(prefixes::USER).unwrap();
        assert_eq!(
            users,
            vec![
                (b"usr:a".to_vec(), b"1".to_vec()),
                (b"usr:b".to_vec(), b"2".to_vec())
            ]
        );

        assert_eq!(store.delete_prefix(prefixes::USER).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_typed_store() {
        let store = TypedStore::new(InMemoryStore::new());

        store.set(b"number", &12345u128).unwrap();
        let value: u128 = store.get(b"number").unwrap().unwrap();
        assert_eq!(value, 12345);

        store.set(&make_key(b"n:", &[&b"a"[..]]), &1u64).unwrap();
        store.set(&make_key(b"n:", &[&b"b"[..]]), &2u64).unwrap();
        let scanned: Vec<(StorageKey, u64)> = store.scan(b"n:").unwrap();
        assert_eq!(scanned, vec![(b"a".to_vec(), 1), (b"b".to_vec(), 2)]);

        store.set(b"bad", &1u8).unwrap();
        assert!(matches!(
            store.get::<u128>(b"bad").unwrap_err(),
            Error::Deserialization(_)
        ));
    }

    #[test]
    fn test_make_key() {
        let key = make_key(prefixes::USER, &[&b"alice"[..], &b"eth"[..]]);
        assert!(key.starts_with(b"usr:"));
        assert_eq!(&key[4..], b"aliceeth");
    }

    #[test]
    fn test_file_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        store.set(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));

        store.flush().unwrap();
        assert!(temp_dir.path().join(FileStore::DATA_FILE).exists());
    }

    #[test]
    fn test_file_store_persistence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let store = FileStore::new(&path).unwrap();
            store.set(b"persistent", b"data").unwrap();
            store.set(b"flushed-on-drop", b"too").unwrap();
        }

        {
            let store = FileStore::new(&path).unwrap();
            assert_eq!(store.get(b"persistent").unwrap(), Some(b"data".to_vec()));
            assert_eq!(store.get(b"flushed-on-drop").unwrap(), Some(b"too".to_vec()));
        }
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(FileStore::DATA_FILE), "not json").unwrap();
        assert!(matches!(
            FileStore::new(temp_dir.path()).unwrap_err(),
            Error::Deserialization(_)
        ));
    }
}
