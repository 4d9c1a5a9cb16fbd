// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recent-files list, persisted as JSON inside the store namespace.

use chrono::{DateTime, Utc};
use sheetbridge_core::error::Result;
use sheetbridge_core::types::RecentFile;
use tracing::{debug, warn};

use crate::store::PersistentStore;
use crate::traits::HostStorage;

/// Item key (inside the namespace) holding the list.
pub const RECENT_KEY: &str = "recent";

/// Newest-first list of opened files, capped at `max` entries.
#[derive(Debug, Clone)]
pub struct RecentFiles {
    max: usize,
}

impl RecentFiles {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    /// Read the list. A missing or unreadable list is treated as empty.
    pub fn load<S: HostStorage + ?Sized>(&self, store: &PersistentStore, storage: &S) -> Vec<RecentFile> {
        let raw = match store.get_item(storage, RECENT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "recent files unavailable");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "discarding corrupt recent-files list");
            Vec::new()
        })
    }

    /// Move `name` to the front of the list, stamped with `at`.
    pub fn record<S: HostStorage + ?Sized>(
        &self,
        store: &mut PersistentStore,
        storage: &mut S,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<RecentFile>> {
        let mut files = self.load(store, storage);
        files.retain(|f| f.name != name);
        files.insert(
            0,
            RecentFile {
                name: name.to_string(),
                opened_at: at,
            },
        );
        files.truncate(self.max);
        store.set_item(storage, RECENT_KEY, &serde_json::to_string(&files)?)?;
        debug!(file = %name, entries = files.len(), "recent files updated");
        Ok(files)
    }
}
