// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Suspension broker — synchronous call contract over asynchronous host
// operations.
//
// A suspending call hands the host a `Resolver`, then runs the host's event
// loop one turn at a time until the resolver fires. The resolver is the only
// resolution point: `resolve`, `cancel` and `fail` consume it, and dropping it
// unresolved counts as failure. Every suspension therefore ends exactly once,
// with either the host's value or the caller's sentinel.
//
// State machine: Idle -> Suspended -> Idle. Only one suspension may be
// outstanding; the native core is single-threaded and blocked on it.

use sheetbridge_core::error::{BridgeError, Result};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

/// What the host delivered through a resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOutcome<T> {
    Value(T),
    /// The user chose the dialog's negative action.
    Cancelled,
    /// The host operation failed (or its resolver was dropped).
    Failed(String),
}

/// One-shot continuation handed to the host.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: oneshot::Sender<HostOutcome<T>>,
    operation: &'static str,
}

impl<T> Resolver<T> {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Primary-action continuation.
    pub fn resolve(self, value: T) {
        self.send(HostOutcome::Value(value));
    }

    /// Negative-action continuation (cancel button, escape key).
    pub fn cancel(self) {
        self.send(HostOutcome::Cancelled);
    }

    /// Failure continuation of the host API.
    pub fn fail(self, reason: impl Into<String>) {
        self.send(HostOutcome::Failed(reason.into()));
    }

    fn send(self, outcome: HostOutcome<T>) {
        if self.tx.send(outcome).is_err() {
            // Only possible if the broker gave up on the suspension already.
            warn!(operation = self.operation, "resolution arrived after the suspension ended");
        }
    }
}

/// One turn of the host's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Events may still arrive.
    Running,
    /// The loop has shut down; nothing pending will ever resolve.
    Terminated,
}

/// Drives the host's own event loop while native execution is suspended.
pub trait EventPump {
    fn pump(&mut self) -> PumpStatus;
}

/// How a suspension ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Resumption<T> {
    /// The primary action's value.
    Primary(T),
    /// The caller's sentinel, after cancellation or failure.
    Sentinel(T),
}

impl<T> Resumption<T> {
    pub fn into_value(self) -> T {
        match self {
            Resumption::Primary(v) | Resumption::Sentinel(v) => v,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Resumption::Primary(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionState {
    Idle,
    Suspended { operation: &'static str },
}

/// Broker for suspending calls.
#[derive(Debug)]
pub struct SuspensionBroker {
    state: SuspensionState,
    resumptions: u64,
}

impl Default for SuspensionBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspensionBroker {
    pub fn new() -> Self {
        Self {
            state: SuspensionState::Idle,
            resumptions: 0,
        }
    }

    pub fn state(&self) -> SuspensionState {
        self.state
    }

    /// Suspensions completed since creation.
    pub fn resumptions(&self) -> u64 {
        self.resumptions
    }

    /// Suspend until the host resolves the operation `start` begins.
    ///
    /// `start` receives the host and the resolver; it must register the
    /// resolver with both a success and a failure path. The broker has no
    /// timeout. A cancelled or failed operation resumes with `sentinel`.
    ///
    /// Returns `Err(AlreadySuspended)` without calling `start` if another
    /// suspension is outstanding.
    pub fn suspend<H, T, F>(
        &mut self,
        host: &mut H,
        operation: &'static str,
        sentinel: T,
        start: F,
    ) -> Result<Resumption<T>>
    where
        H: EventPump + ?Sized,
        F: FnOnce(&mut H, Resolver<T>),
    {
        if let SuspensionState::Suspended { operation: active } = self.state {
            warn!(operation, active, "suspending call while another is outstanding");
            return Err(BridgeError::AlreadySuspended);
        }

        let (tx, mut rx) = oneshot::channel();
        self.state = SuspensionState::Suspended { operation };
        debug!(operation, "suspended");

        start(host, Resolver { tx, operation });

        let outcome = loop {
            match rx.try_recv() {
                Ok(outcome) => break outcome,
                Err(TryRecvError::Closed) => {
                    break HostOutcome::Failed("resolver dropped without resolution".into());
                }
                Err(TryRecvError::Empty) => {}
            }
            if host.pump() == PumpStatus::Terminated {
                break rx.try_recv().unwrap_or_else(|_| {
                    HostOutcome::Failed("host event loop terminated".into())
                });
            }
        };

        self.state = SuspensionState::Idle;
        self.resumptions += 1;

        Ok(match outcome {
            HostOutcome::Value(value) => {
                debug!(operation, "resumed with value");
                Resumption::Primary(value)
            }
            HostOutcome::Cancelled => {
                debug!(operation, "resumed after cancellation");
                Resumption::Sentinel(sentinel)
            }
            HostOutcome::Failed(reason) => {
                info!(operation, %reason, "host operation failed; resuming with sentinel");
                Resumption::Sentinel(sentinel)
            }
        })
    }
}
