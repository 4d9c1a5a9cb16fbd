// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SheetBridge — boundary layer between a compiled native core and a scripting
// host.
//
// The host's capabilities are expressed as traits (`traits`); the native core
// talks to a single `BridgeContext`, which owns every piece of bridge state:
// linear memory, the suspension broker, rendering state, the asset cache, the
// persistent store and the input router.

pub mod clipboard;
pub mod context;
pub mod dialogs;
pub mod files;
pub mod graphics;
pub mod init_guard;
pub mod input;
pub mod listing;
pub mod ownership;
pub mod recent;
pub mod resource_cache;
pub mod store;
pub mod stub;
pub mod suspension;
pub mod traits;

pub use context::BridgeContext;
pub use ownership::{BufferHandle, OwnershipBroker};
pub use suspension::{EventPump, PumpStatus, Resolver};
pub use traits::{HostPlatform, NativeCore};
