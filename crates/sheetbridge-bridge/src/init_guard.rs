// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run-once guards for registration entry points.

use std::collections::HashSet;

use tracing::{debug, info};

/// Named flags that make registration idempotent.
#[derive(Debug, Default)]
pub struct InitGuards {
    done: HashSet<&'static str>,
}

impl InitGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` the first time `name` is seen and return `true`; later
    /// calls do nothing and return `false`.
    pub fn init_once(&mut self, name: &'static str, body: impl FnOnce()) -> bool {
        if !self.done.insert(name) {
            debug!(guard = name, "already initialised; skipping");
            return false;
        }
        body();
        info!(guard = name, "initialised");
        true
    }

    pub fn is_done(&self, name: &str) -> bool {
        self.done.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_runs_once_per_name() {
        let mut guards = InitGuards::new();
        let mut runs = 0;
        assert!(guards.init_once("input", || runs += 1));
        assert!(!guards.init_once("input", || runs += 1));
        assert!(guards.init_once("resize", || runs += 1));
        assert_eq!(runs, 2);
        assert!(guards.is_done("input"));
        assert!(!guards.is_done("menus"));
    }
}
