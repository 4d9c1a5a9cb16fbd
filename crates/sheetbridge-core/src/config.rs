// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Tunables for every bridge component.
///
/// Missing fields in a JSON document fall back to the defaults, so a host
/// can override a single value (e.g. `{"max_upload_bytes": 1048576}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on cached asset entries.
    pub max_image_cache_size: usize,
    /// Fraction of the cache evicted in one batch once the bound is exceeded.
    pub cache_eviction_fraction: f64,
    /// Edge length of the placeholder square drawn for unloaded assets.
    pub placeholder_size: u32,
    /// Raw bytes per base64 chunk. Must be a multiple of 3.
    pub base64_chunk_size: usize,
    /// Lifetime of the cached directory listing.
    pub listing_ttl_ms: u64,
    /// Largest file accepted from the upload picker.
    pub max_upload_bytes: u64,
    /// Quiescence window for resize events.
    pub resize_debounce_ms: u64,
    /// Namespace prefix for every persisted key.
    pub store_prefix: String,
    /// Sub-prefix (inside the namespace) for stored files.
    pub file_prefix: String,
    /// Size of the linear memory shared with the native core.
    pub heap_capacity: usize,
    /// Entries kept in the recent-files list.
    pub max_recent_files: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_image_cache_size: 100,
            cache_eviction_fraction: 0.25,
            placeholder_size: 16,
            // largest multiple of 3 below 32 KiB
            base64_chunk_size: 32 * 1024 - 2,
            listing_ttl_ms: 1000,
            max_upload_bytes: 50 * 1024 * 1024,
            resize_debounce_ms: 100,
            store_prefix: "sheetbridge:".into(),
            file_prefix: "file:".into(),
            heap_capacity: 64 * 1024 * 1024,
            max_recent_files: 10,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the components cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_image_cache_size == 0 {
            return Err(BridgeError::MalformedInput(
                "max_image_cache_size must be at least 1".into(),
            ));
        }
        if !(self.cache_eviction_fraction > 0.0 && self.cache_eviction_fraction <= 1.0) {
            return Err(BridgeError::MalformedInput(format!(
                "cache_eviction_fraction {} outside (0, 1]",
                self.cache_eviction_fraction
            )));
        }
        if self.base64_chunk_size == 0 || self.base64_chunk_size % 3 != 0 {
            return Err(BridgeError::MalformedInput(format!(
                "base64_chunk_size {} is not a positive multiple of 3",
                self.base64_chunk_size
            )));
        }
        if self.store_prefix.is_empty() {
            return Err(BridgeError::MalformedInput("store_prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_millis(self.listing_ttl_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}
