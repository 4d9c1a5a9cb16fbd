// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ownership broker — allocation and release of buffers in the linear memory
// shared with the native core.
//
// Ownership rules:
//   * buffers the bridge hands to the core (text results, file contents,
//     clipboard text) transfer to the core, which releases them exactly once;
//   * buffers the core hands to the bridge (string arguments, payloads) are
//     borrowed for the duration of the call only.
//
// Address 0 is the null handle and is never allocated. Blocks are 8-byte
// aligned; released blocks go to an address-ordered free list and adjacent
// free blocks are coalesced.

use std::collections::BTreeMap;

use sheetbridge_core::error::{BridgeError, Result};
use tracing::{debug, warn};

const ALIGN: u32 = 8;
/// First usable address. Everything below is reserved so `0` stays null.
const HEAP_BASE: u32 = 8;

/// A region of shared linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub address: u32,
    pub length: u32,
}

impl BufferHandle {
    pub const NULL: BufferHandle = BufferHandle {
        address: 0,
        length: 0,
    };

    pub fn is_null(&self) -> bool {
        self.address == 0
    }
}

/// A live allocation.
#[derive(Debug, Clone, Copy)]
struct Block {
    /// Reserved size (aligned).
    size: u32,
    /// Length requested by the caller.
    length: u32,
}

/// Allocator and accessor for the shared linear memory.
pub struct OwnershipBroker {
    heap: Vec<u8>,
    capacity: u32,
    /// Bump pointer: everything at or above is untouched.
    top: u32,
    live: BTreeMap<u32, Block>,
    /// Free blocks below `top`, keyed by address.
    free: BTreeMap<u32, u32>,
    allocations: u64,
    releases: u64,
}

impl OwnershipBroker {
    /// Create a broker managing `capacity` bytes of linear memory.
    ///
    /// Memory is committed lazily as the bump pointer advances.
    pub fn new(capacity: usize) -> Self {
        let capacity = u32::try_from(capacity).unwrap_or(u32::MAX);
        Self {
            heap: vec![0; HEAP_BASE as usize],
            capacity,
            top: HEAP_BASE,
            live: BTreeMap::new(),
            free: BTreeMap::new(),
            allocations: 0,
            releases: 0,
        }
    }

    /// Allocate `size` bytes. A zero-byte request still reserves a block so
    /// the returned address is unique and releasable.
    pub fn allocate(&mut self, size: usize) -> Result<BufferHandle> {
        let length =
            u32::try_from(size).map_err(|_| BridgeError::OutOfMemory { requested: size })?;
        let block_size = align_up(length.max(1)).ok_or(BridgeError::OutOfMemory { requested: size })?;

        let address = match self.take_free(block_size) {
            Some(address) => address,
            None => self.bump(block_size, size)?,
        };

        // Fresh memory for every allocation; stale bytes from a previous
        // owner never leak into a new buffer.
        let start = address as usize;
        self.heap[start..start + block_size as usize].fill(0);

        self.live.insert(
            address,
            Block {
                size: block_size,
                length,
            },
        );
        self.allocations += 1;
        debug!(address, length, "buffer allocated");
        Ok(BufferHandle { address, length })
    }

    /// Release a buffer. Unknown and already-released addresses are rejected
    /// and leave the broker untouched.
    pub fn release(&mut self, handle: BufferHandle) -> Result<()> {
        let Some(block) = self.live.remove(&handle.address) else {
            warn!(address = handle.address, "release of unknown or released buffer");
            return Err(BridgeError::InvalidHandle {
                address: handle.address,
            });
        };
        self.releases += 1;
        self.insert_free(handle.address, block.size);
        debug!(address = handle.address, "buffer released");
        Ok(())
    }

    /// Allocate a buffer holding a copy of `bytes`.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<BufferHandle> {
        let handle = self.allocate(bytes.len())?;
        let start = handle.address as usize;
        self.heap[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(handle)
    }

    /// Allocate a null-terminated UTF-8 copy of `text`. The handle's length
    /// includes the terminator.
    pub fn alloc_c_string(&mut self, text: &str) -> Result<BufferHandle> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        self.alloc_bytes(&bytes)
    }

    /// Borrow the contents of a live buffer.
    pub fn read(&self, handle: BufferHandle) -> Result<&[u8]> {
        let block = self.live.get(&handle.address).ok_or(BridgeError::InvalidHandle {
            address: handle.address,
        })?;
        if handle.length > block.length {
            return Err(BridgeError::InvalidHandle {
                address: handle.address,
            });
        }
        let start = handle.address as usize;
        Ok(&self.heap[start..start + handle.length as usize])
    }

    /// Decode a string argument starting at `address`, which may point
    /// anywhere inside a live buffer.
    ///
    /// Decoding stops at the first NUL, at `declared_len` bytes, or at the end
    /// of the containing buffer, whichever comes first. Invalid UTF-8 is
    /// replaced rather than failing the call.
    pub fn read_c_string(&self, address: u32, declared_len: Option<usize>) -> Result<String> {
        if address == 0 {
            return Ok(String::new());
        }
        let (base, block) = self
            .live
            .range(..=address)
            .next_back()
            .ok_or(BridgeError::InvalidHandle { address })?;
        let end = base + block.length;
        if address >= end && !(address == *base && block.length == 0) {
            return Err(BridgeError::InvalidHandle { address });
        }

        let region = &self.heap[address as usize..end as usize];
        let limit = declared_len.map_or(region.len(), |n| n.min(region.len()));
        let bounded = &region[..limit];
        let text = match bounded.iter().position(|&b| b == 0) {
            Some(nul) => &bounded[..nul],
            None => bounded,
        };
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// Number of allocations not yet released.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// `(allocations, releases)` since creation.
    pub fn totals(&self) -> (u64, u64) {
        (self.allocations, self.releases)
    }

    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.live.contains_key(&handle.address)
    }

    // -- internals ----------------------------------------------------------

    fn bump(&mut self, block_size: u32, requested: usize) -> Result<u32> {
        let address = self.top;
        let new_top = address
            .checked_add(block_size)
            .filter(|&t| t <= self.capacity)
            .ok_or_else(|| {
                warn!(requested, capacity = self.capacity, "linear memory exhausted");
                BridgeError::OutOfMemory { requested }
            })?;
        self.top = new_top;
        if self.heap.len() < new_top as usize {
            self.heap.resize(new_top as usize, 0);
        }
        Ok(address)
    }

    /// First-fit search of the free list; splits the block if larger.
    fn take_free(&mut self, block_size: u32) -> Option<u32> {
        let (&address, &size) = self.free.iter().find(|(_, size)| **size >= block_size)?;
        self.free.remove(&address);
        if size > block_size {
            self.free.insert(address + block_size, size - block_size);
        }
        Some(address)
    }

    fn insert_free(&mut self, mut address: u32, mut size: u32) {
        // Merge with the preceding free block.
        if let Some((&prev, &prev_size)) = self.free.range(..address).next_back() {
            if prev + prev_size == address {
                self.free.remove(&prev);
                address = prev;
                size += prev_size;
            }
        }
        // Merge with the following free block.
        if let Some(&next_size) = self.free.get(&(address + size)) {
            self.free.remove(&(address + size));
            size += next_size;
        }
        if address + size == self.top {
            // Give the tail back to the bump region.
            self.top = address;
        } else {
            self.free.insert(address, size);
        }
    }
}

fn align_up(n: u32) -> Option<u32> {
    n.checked_add(ALIGN - 1).map(|v| v & !(ALIGN - 1))
}
