// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Namespaced persistent store over the host's quota-limited key/value storage.
//
// Layout (default prefixes):
//   sheetbridge:<key>         plain items
//   sheetbridge:file:<name>   stored files, base64
//   sheetbridge:recent        recent-files JSON
//
// Foreign keys sharing the host store are never listed, read or removed.

use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sheetbridge_core::config::BridgeConfig;
use sheetbridge_core::error::{BridgeError, Result};
use tracing::{debug, info, instrument, warn};

use crate::listing::DirectoryListingCache;
use crate::traits::HostStorage;

/// Encode `bytes` as one base64 string, `chunk_size` raw bytes at a time.
///
/// `chunk_size` is rounded down to a multiple of 3 (at least 3) so that no
/// chunk but the last carries padding and the concatenation is itself valid
/// base64.
pub fn encode_chunked(bytes: &[u8], chunk_size: usize) -> String {
    let chunk_size = (chunk_size / 3).max(1) * 3;
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(chunk_size) {
        STANDARD.encode_string(chunk, &mut out);
    }
    out
}

pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| BridgeError::Encoding(e.to_string()))
}

/// File and item access inside one namespace of the host store.
#[derive(Debug)]
pub struct PersistentStore {
    prefix: String,
    file_prefix: String,
    chunk_size: usize,
    listing: DirectoryListingCache,
}

impl PersistentStore {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            prefix: config.store_prefix.clone(),
            file_prefix: format!("{}{}", config.store_prefix, config.file_prefix),
            chunk_size: config.base64_chunk_size,
            listing: DirectoryListingCache::new(config.listing_ttl()),
        }
    }

    pub fn item_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    pub fn file_key(&self, name: &str) -> String {
        format!("{}{name}", self.file_prefix)
    }

    // -- files --------------------------------------------------------------

    /// Persist a file. Quota failures come back as `QuotaExceeded` untouched.
    #[instrument(skip_all, fields(name = %name, bytes = bytes.len()))]
    pub fn save<S: HostStorage + ?Sized>(&mut self, storage: &mut S, name: &str, bytes: &[u8]) -> Result<()> {
        let encoded = encode_chunked(bytes, self.chunk_size);
        // Invalidate whether or not the write lands; a partial host write is
        // possible on some quota failures.
        self.listing.invalidate();
        match storage.storage_set(&self.file_key(name), &encoded) {
            Ok(()) => {
                info!(encoded_len = encoded.len(), "file saved");
                Ok(())
            }
            Err(e @ BridgeError::QuotaExceeded(_)) => {
                warn!(error = %e, "store quota exceeded");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all, fields(name = %name))]
    pub fn load<S: HostStorage + ?Sized>(&self, storage: &S, name: &str) -> Result<Vec<u8>> {
        let encoded = storage
            .storage_get(&self.file_key(name))?
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))?;
        let bytes = decode(&encoded)?;
        debug!(bytes = bytes.len(), "file loaded");
        Ok(bytes)
    }

    /// Stored file names, sorted. Served from the listing cache while fresh.
    pub fn list<S: HostStorage + ?Sized>(&mut self, storage: &S, now: Instant) -> Result<Vec<String>> {
        if let Some(cached) = self.listing.get(now) {
            return Ok(cached.to_vec());
        }
        let mut names: Vec<String> = storage
            .storage_keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.file_prefix).map(str::to_string))
            .collect();
        names.sort();
        debug!(count = names.len(), "listing refreshed");
        self.listing.store(names.clone(), now);
        Ok(names)
    }

    #[instrument(skip_all, fields(name = %name))]
    pub fn delete<S: HostStorage + ?Sized>(&mut self, storage: &mut S, name: &str) -> Result<()> {
        self.listing.invalidate();
        storage.storage_remove(&self.file_key(name))?;
        info!("file deleted");
        Ok(())
    }

    // -- plain items --------------------------------------------------------

    pub fn set_item<S: HostStorage + ?Sized>(&mut self, storage: &mut S, key: &str, value: &str) -> Result<()> {
        storage.storage_set(&self.item_key(key), value)?;
        if self.item_key(key).starts_with(&self.file_prefix) {
            self.listing.invalidate();
        }
        Ok(())
    }

    pub fn get_item<S: HostStorage + ?Sized>(&self, storage: &S, key: &str) -> Result<Option<String>> {
        storage.storage_get(&self.item_key(key))
    }

    pub fn remove_item<S: HostStorage + ?Sized>(&mut self, storage: &mut S, key: &str) -> Result<()> {
        storage.storage_remove(&self.item_key(key))?;
        if self.item_key(key).starts_with(&self.file_prefix) {
            self.listing.invalidate();
        }
        Ok(())
    }

    /// Remove every key in the namespace. Returns how many were removed.
    #[instrument(skip_all)]
    pub fn clear<S: HostStorage + ?Sized>(&mut self, storage: &mut S) -> Result<usize> {
        self.listing.invalidate();
        let owned: Vec<String> = storage
            .storage_keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect();
        for key in &owned {
            storage.storage_remove(key)?;
        }
        info!(removed = owned.len(), "namespace cleared");
        Ok(owned.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::stub::StubHost;

    fn store() -> PersistentStore {
        PersistentStore::new(&BridgeConfig::default())
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn round_trip_around_chunk_boundary() {
        let chunk = BridgeConfig::default().base64_chunk_size;
        let mut storage = StubHost::new();
        let mut store = store();
        for len in [0, 1, chunk - 1, chunk, chunk + 1, 3 * chunk + 2] {
            let bytes = payload(len);
            store.save(&mut storage, "f.bin", &bytes).unwrap();
            assert_eq!(store.load(&storage, "f.bin").unwrap(), bytes, "len {len}");
        }
    }

    #[test]
    fn chunked_encoding_matches_one_shot() {
        let bytes = payload(100_000);
        let one_shot = STANDARD.encode(&bytes);
        assert_eq!(encode_chunked(&bytes, 32_766), one_shot);
        assert_eq!(encode_chunked(&bytes, 3), one_shot);
        // sizes that are not multiples of 3 are rounded down, never padded mid-stream
        assert_eq!(encode_chunked(&bytes, 32_768), one_shot);
        assert_eq!(encode_chunked(&bytes, 1), one_shot);
        assert_eq!(decode(&encode_chunked(&bytes, 1000)).unwrap(), bytes);
    }

    #[test]
    fn keys_are_namespaced() {
        let mut storage = StubHost::new();
        let mut store = store();
        store.save(&mut storage, "a.cbk", b"x").unwrap();
        store.set_item(&mut storage, "theme", "dark").unwrap();
        assert!(storage.kv.contains_key("sheetbridge:file:a.cbk"));
        assert_eq!(storage.kv.get("sheetbridge:theme").unwrap(), "dark");
        assert_eq!(store.get_item(&storage, "theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn listing_ignores_foreign_keys() {
        let mut storage = StubHost::new();
        storage.kv.insert("other-app:file:z".into(), "AA==".into());
        storage.kv.insert("sheetbridge:theme".into(), "dark".into());
        let mut store = store();
        store.save(&mut storage, "b", b"1").unwrap();
        store.save(&mut storage, "a", b"2").unwrap();
        assert_eq!(store.list(&storage, Instant::now()).unwrap(), ["a", "b"]);
    }

    #[test]
    fn delete_is_visible_within_ttl() {
        let t0 = Instant::now();
        let mut storage = StubHost::new();
        let mut store = store();
        store.save(&mut storage, "big.bin", &payload(100 * 1024)).unwrap();
        assert_eq!(store.list(&storage, t0).unwrap(), ["big.bin"]);
        store.delete(&mut storage, "big.bin").unwrap();
        let later = t0 + Duration::from_millis(10);
        assert!(store.list(&storage, later).unwrap().is_empty());
    }

    #[test]
    fn listing_is_cached_until_ttl() {
        let t0 = Instant::now();
        let mut storage = StubHost::new();
        let mut store = store();
        store.save(&mut storage, "a", b"1").unwrap();
        assert_eq!(store.list(&storage, t0).unwrap(), ["a"]);
        // a write behind the store's back is not seen until the TTL passes
        storage.kv.insert("sheetbridge:file:b".into(), "AA==".into());
        assert_eq!(store.list(&storage, t0 + Duration::from_millis(500)).unwrap(), ["a"]);
        assert_eq!(
            store.list(&storage, t0 + Duration::from_millis(1500)).unwrap(),
            ["a", "b"]
        );
    }

    #[test]
    fn quota_exceeded_is_distinct() {
        let mut storage = StubHost::new();
        storage.quota = Some(1024);
        let mut store = store();
        let err = store.save(&mut storage, "big", &payload(4096)).unwrap_err();
        assert!(matches!(err, BridgeError::QuotaExceeded(_)));
        assert!(matches!(store.load(&storage, "big"), Err(BridgeError::NotFound(_))));
    }

    #[test]
    fn corrupt_payload_is_encoding_error() {
        let mut storage = StubHost::new();
        storage.kv.insert("sheetbridge:file:bad".into(), "!!not base64!!".into());
        let err = store().load(&storage, "bad").unwrap_err();
        assert!(matches!(err, BridgeError::Encoding(_)));
    }

    #[test]
    fn clear_spares_foreign_keys() {
        let mut storage = StubHost::new();
        storage.kv.insert("other-app:setting".into(), "1".into());
        let mut store = store();
        store.save(&mut storage, "a", b"1").unwrap();
        store.set_item(&mut storage, "theme", "dark").unwrap();
        assert_eq!(store.clear(&mut storage).unwrap(), 2);
        assert_eq!(storage.kv.len(), 1);
        assert!(storage.kv.contains_key("other-app:setting"));
        assert!(store.list(&storage, Instant::now()).unwrap().is_empty());
    }
}
