// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Short-lived cache of the stored-file listing.

use std::time::{Duration, Instant};

use tracing::debug;

/// Snapshot of a namespace listing with a TTL.
///
/// Writes and deletes invalidate it explicitly; otherwise it expires once
/// `now - captured_at > ttl`.
#[derive(Debug)]
pub struct DirectoryListingCache {
    snapshot: Option<(Vec<String>, Instant)>,
    ttl: Duration,
}

impl DirectoryListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self { snapshot: None, ttl }
    }

    /// The cached entries, if still fresh at `now`.
    pub fn get(&self, now: Instant) -> Option<&[String]> {
        let (entries, captured_at) = self.snapshot.as_ref()?;
        if now.saturating_duration_since(*captured_at) > self.ttl {
            return None;
        }
        Some(entries)
    }

    pub fn store(&mut self, entries: Vec<String>, now: Instant) {
        self.snapshot = Some((entries, now));
    }

    pub fn invalidate(&mut self) {
        if self.snapshot.take().is_some() {
            debug!("listing cache invalidated");
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
