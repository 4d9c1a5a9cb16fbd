// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Clipboard calls. Writing is best-effort with a legacy fallback; reading
// suspends and degrades to null.

use tracing::{debug, info, warn};

use crate::context::BridgeContext;
use crate::ownership::BufferHandle;
use crate::suspension::Resumption;
use crate::traits::{HostPlatform, NativeCore};

impl<H: HostPlatform, N: NativeCore> BridgeContext<H, N> {
    /// Copy `text` to the system clipboard. Falls back to the legacy copy
    /// path when the clipboard API is missing or rejects the write.
    pub fn set_clipboard_text(&mut self, text: BufferHandle) {
        let text = self.arg(text);
        match self.host.clipboard_write(&text) {
            Ok(()) => debug!(chars = text.chars().count(), "clipboard written"),
            Err(e) => {
                info!(error = %e, "clipboard API unavailable; using legacy copy");
                if let Err(e) = self.host.clipboard_write_legacy(&text) {
                    warn!(error = %e, "legacy clipboard copy failed");
                }
            }
        }
    }

    /// Read the system clipboard into a core-owned string. Null when the
    /// host cannot read it (no API, permission denied).
    pub fn get_clipboard_text(&mut self) -> BufferHandle {
        let outcome = self
            .suspension
            .suspend(&mut self.host, "clipboard_read", String::new(), |host, resolver| {
                // On error the resolver has been dropped, which the broker
                // reports as failure.
                if let Err(e) = host.clipboard_read(resolver) {
                    info!(error = %e, "clipboard read unavailable");
                }
            });
        match outcome {
            Ok(Resumption::Primary(text)) => self.owned_string(&text),
            Ok(Resumption::Sentinel(_)) => BufferHandle::NULL,
            Err(e) => {
                warn!(error = %e, "clipboard read not started");
                BufferHandle::NULL
            }
        }
    }
}
