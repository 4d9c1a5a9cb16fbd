// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resource cache for lazily loaded assets (icon bitmaps).
//
// Lookups never block: a miss issues the external load and answers with a
// placeholder straight away. Completions land later through `complete`. A
// failed load caches a placeholder so that redrawing does not retrigger it.
//
// The cache is bounded. Once an insertion pushes it past its size, the oldest
// fraction of entries (by insertion order) is evicted in one batch.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use sheetbridge_core::error::Result;
use tracing::{debug, info, warn};

use crate::traits::{AssetImage, HostAssets};

// ---------------------------------------------------------------------------
// Bounded insertion-ordered cache
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: u64,
}

/// Size-bounded map evicting the oldest insertions in batches.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Insertion log. Entries superseded by a re-insert are skipped lazily.
    order: VecDeque<(u64, K)>,
    max_size: usize,
    batch: usize,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// `eviction_fraction` of `max_size` (at least one entry) is evicted each
    /// time the bound is exceeded.
    pub fn new(max_size: usize, eviction_fraction: f64) -> Self {
        let max_size = max_size.max(1);
        let batch = ((max_size as f64 * eviction_fraction).ceil() as usize).clamp(1, max_size);
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
            batch,
            clock: 0,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Insert (or re-insert, which counts as newest) and return the keys
    /// evicted to stay within bounds, oldest first.
    pub fn insert(&mut self, key: K, value: V) -> Vec<K> {
        self.clock += 1;
        let inserted_at = self.clock;
        self.entries.insert(key.clone(), CacheEntry { value, inserted_at });
        self.order.push_back((inserted_at, key));

        let mut evicted = Vec::new();
        if self.entries.len() > self.max_size {
            while evicted.len() < self.batch {
                let Some((stamp, oldest)) = self.order.pop_front() else {
                    break;
                };
                let current = self.entries.get(&oldest).map(|e| e.inserted_at);
                if current == Some(stamp) {
                    self.entries.remove(&oldest);
                    evicted.push(oldest);
                }
            }
            debug!(evicted = evicted.len(), remaining = self.entries.len(), "cache batch eviction");
        }
        if self.order.len() > 2 * self.max_size {
            self.compact();
        }
        evicted
    }

    /// Drop log entries superseded by a later re-insert.
    fn compact(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(stamp, k)| entries.get(k).map(|e| e.inserted_at) == Some(*stamp));
    }

    /// Keys from oldest to newest insertion.
    pub fn keys_by_age(&self) -> Vec<K> {
        self.order
            .iter()
            .filter(|(stamp, k)| self.entries.get(k).map(|e| e.inserted_at) == Some(*stamp))
            .map(|(_, k)| k.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Asset cache with load state machine
// ---------------------------------------------------------------------------

/// Per-key load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotRequested,
    Loading { generation: u64 },
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
enum CachedAsset {
    Image(AssetImage),
    /// Terminal placeholder for a failed load.
    Placeholder,
}

/// Result of a non-blocking lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLookup {
    Loaded(AssetImage),
    Placeholder,
}

/// Icon bitmap cache keyed by icon index.
#[derive(Debug)]
pub struct ImageCache {
    entries: BoundedCache<u32, CachedAsset>,
    loading: HashMap<u32, u64>,
    next_generation: u64,
    loads_issued: u64,
}

impl ImageCache {
    pub fn new(max_size: usize, eviction_fraction: f64) -> Self {
        Self {
            entries: BoundedCache::new(max_size, eviction_fraction),
            loading: HashMap::new(),
            next_generation: 0,
            loads_issued: 0,
        }
    }

    /// URL an icon index is loaded from.
    pub fn asset_url(key: u32) -> String {
        format!("images/icon{key}.png")
    }

    pub fn state(&self, key: u32) -> LoadState {
        if let Some(&generation) = self.loading.get(&key) {
            return LoadState::Loading { generation };
        }
        match self.entries.get(&key) {
            Some(CachedAsset::Image(_)) => LoadState::Loaded,
            Some(CachedAsset::Placeholder) => LoadState::Failed,
            None => LoadState::NotRequested,
        }
    }

    /// Non-blocking lookup. A key in `NotRequested` moves to `Loading` and
    /// its load is issued; at most one load per key is ever in flight.
    pub fn get<A: HostAssets + ?Sized>(&mut self, key: u32, assets: &mut A) -> AssetLookup {
        match self.entries.get(&key) {
            Some(CachedAsset::Image(image)) => return AssetLookup::Loaded(image.clone()),
            Some(CachedAsset::Placeholder) => return AssetLookup::Placeholder,
            None => {}
        }
        if !self.loading.contains_key(&key) {
            self.next_generation += 1;
            let generation = self.next_generation;
            self.loading.insert(key, generation);
            self.loads_issued += 1;
            debug!(key, generation, "issuing asset load");
            assets.request_image(&Self::asset_url(key), key, generation);
        }
        AssetLookup::Placeholder
    }

    /// Record a load completion. Returns `true` when it was accepted, i.e. it
    /// belongs to the load currently in flight for `key`.
    pub fn complete(&mut self, key: u32, generation: u64, result: Result<AssetImage>) -> bool {
        if self.loading.get(&key) != Some(&generation) {
            debug!(key, generation, "ignoring stale asset completion");
            return false;
        }
        self.loading.remove(&key);

        let value = match result {
            Ok(image) => {
                info!(key, width = image.width, height = image.height, "asset loaded");
                CachedAsset::Image(image)
            }
            Err(e) => {
                warn!(key, error = %e, "asset failed to load; caching placeholder");
                CachedAsset::Placeholder
            }
        };
        // Evicted keys fall back to NotRequested and may be reloaded later.
        self.entries.insert(key, value);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads issued since creation.
    pub fn loads_issued(&self) -> u64 {
        self.loads_issued
    }
}

// ---------------------------------------------------------------------------
// Redraw debouncing
// ---------------------------------------------------------------------------

/// Coalesces redraw requests into at most one pending animation frame.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    pending: bool,
}

impl RedrawScheduler {
    /// Request a redraw. Returns `true` if this call scheduled a frame.
    pub fn request<A: HostAssets + ?Sized>(&mut self, assets: &mut A) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        assets.request_animation_frame();
        true
    }

    /// Consume the pending redraw, if any, when the frame arrives.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
