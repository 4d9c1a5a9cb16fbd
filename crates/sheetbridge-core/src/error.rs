// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for SheetBridge.
//
// None of these ever cross the boundary into the native core: the bridge
// context converts them into zero/null/sentinel return values and a
// user-visible notification.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Ownership broker --
    #[error("out of memory: could not allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("invalid or released buffer handle at address {address:#x}")]
    InvalidHandle { address: u32 },

    // -- Persistent store --
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload encoding error: {0}")]
    Encoding(String),

    // -- Arguments from the native core --
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("file too large: {size} bytes (maximum {max})")]
    FileTooLarge { size: u64, max: u64 },

    // -- Host resources --
    #[error("external resource failure: {0}")]
    ExternalResource(String),

    #[error("a suspending call is already outstanding")]
    AlreadySuspended,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feature not available on this host")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
