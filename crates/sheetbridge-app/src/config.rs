// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration resolution for the session runner.

use std::path::PathBuf;

use sheetbridge_core::BridgeConfig;
use sheetbridge_core::error::{BridgeError, Result};

/// Environment variable naming a JSON config file.
const CONFIG_ENV: &str = "SHEETBRIDGE_CONFIG";

/// Load the configuration from `arg`, else `$SHEETBRIDGE_CONFIG`, else the
/// defaults. Files may hold a partial document; missing fields keep their
/// defaults.
pub fn load(arg: Option<String>) -> Result<BridgeConfig> {
    let Some(path) = arg.or_else(|| std::env::var(CONFIG_ENV).ok()).map(PathBuf::from) else {
        tracing::info!("no config file given; using defaults");
        return Ok(BridgeConfig::default());
    };
    let json = std::fs::read_to_string(&path)
        .map_err(|e| BridgeError::Storage(format!("{}: {e}", path.display())))?;
    let config = BridgeConfig::from_json(&json)?;
    tracing::info!(path = %path.display(), "configuration loaded");
    Ok(config)
}
