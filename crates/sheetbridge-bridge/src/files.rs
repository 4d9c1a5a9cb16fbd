// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File calls: upload, stored-file access, download and external links.

use std::time::Instant;

use chrono::Utc;
use sheetbridge_core::error::{BridgeError, Result};
use sheetbridge_core::types::RecentFile;
use tracing::{debug, info, instrument, warn};

use crate::context::BridgeContext;
use crate::ownership::BufferHandle;
use crate::traits::{HostPlatform, NativeCore, PickedFile};

/// File types offered by the upload picker.
pub const UPLOAD_ACCEPT: &str = ".cts";

impl<H: HostPlatform, N: NativeCore> BridgeContext<H, N> {
    /// Open the host's file picker. The selection arrives in `on_file_picked`.
    pub fn trigger_upload(&mut self) {
        self.host.open_file_picker(UPLOAD_ACCEPT);
    }

    /// Picker completion: validate the size, allocate the borrowed buffers,
    /// keep a copy in the store, then hand name and contents to the core.
    ///
    /// An allocation failure aborts the whole upload: nothing is stored or
    /// recorded.
    #[instrument(skip_all, fields(name = %file.name, size = file.size))]
    pub fn on_file_picked(&mut self, file: PickedFile) {
        let max = self.config.max_upload_bytes;
        let size = file.size.max(file.bytes.len() as u64);
        if size > max {
            self.surface_error(&BridgeError::FileTooLarge { size, max });
            return;
        }

        let (name_buf, data_buf) = match self.alloc_upload(&file.name, &file.bytes) {
            Ok(buffers) => buffers,
            Err(e) => {
                self.surface_error(&e);
                return;
            }
        };

        // A failed save is reported but the file still opens.
        match self.store.save(&mut self.host, &file.name, &file.bytes) {
            Ok(()) => {
                if let Err(e) = self
                    .recent
                    .record(&mut self.store, &mut self.host, &file.name, Utc::now())
                {
                    warn!(error = %e, "recent files not updated");
                }
            }
            Err(e) => self.surface_error(&e),
        }

        self.native.file_loaded(&self.memory, name_buf, data_buf);
        for handle in [data_buf, name_buf] {
            if let Err(e) = self.memory.release(handle) {
                warn!(error = %e, "borrowed upload buffer already released");
            }
        }
        info!(bytes = file.bytes.len(), "file delivered to core");
    }

    /// Name and contents as borrowed buffers. On failure nothing stays
    /// allocated.
    fn alloc_upload(&mut self, name: &str, bytes: &[u8]) -> Result<(BufferHandle, BufferHandle)> {
        let name_buf = self.memory.alloc_c_string(name)?;
        match self.memory.alloc_bytes(bytes) {
            Ok(data_buf) => Ok((name_buf, data_buf)),
            Err(e) => {
                self.memory.release(name_buf)?;
                Err(e)
            }
        }
    }

    /// Contents of a stored file in a core-owned buffer whose handle carries
    /// the length. Null if missing or unreadable.
    #[instrument(skip_all)]
    pub fn read_file(&mut self, name: BufferHandle) -> BufferHandle {
        let name = self.arg(name);
        let bytes = match self.store.load(&self.host, &name) {
            Ok(bytes) => bytes,
            Err(BridgeError::NotFound(_)) => {
                debug!(name = %name, "no such stored file");
                return BufferHandle::NULL;
            }
            Err(e) => {
                self.surface_error(&e);
                return BufferHandle::NULL;
            }
        };
        match self.memory.alloc_bytes(&bytes) {
            Ok(handle) => handle,
            Err(e) => {
                self.surface_error(&e);
                BufferHandle::NULL
            }
        }
    }

    /// Store the borrowed `data` buffer under `name`.
    pub fn save_file(&mut self, name: BufferHandle, data: BufferHandle) -> bool {
        let name = self.arg(name);
        let result = match self.memory.read(data) {
            Ok(bytes) => self.store.save(&mut self.host, &name, bytes),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.surface_error(&e);
                false
            }
        }
    }

    /// Stored file names as a JSON array in a core-owned string.
    pub fn list_files(&mut self) -> BufferHandle {
        self.list_files_at(Instant::now())
    }

    pub fn list_files_at(&mut self, now: Instant) -> BufferHandle {
        let json = self
            .store
            .list(&self.host, now)
            .and_then(|names| Ok(serde_json::to_string(&names)?));
        match json {
            Ok(json) => self.owned_string(&json),
            Err(e) => {
                self.surface_error(&e);
                BufferHandle::NULL
            }
        }
    }

    pub fn delete_file(&mut self, name: BufferHandle) -> bool {
        let name = self.arg(name);
        match self.store.delete(&mut self.host, &name) {
            Ok(()) => true,
            Err(e) => {
                warn!(name = %name, error = %e, "delete failed");
                false
            }
        }
    }

    pub fn recent_files(&self) -> Vec<RecentFile> {
        self.recent.load(&self.store, &self.host)
    }

    /// Offer the borrowed `data` buffer to the user as a download.
    pub fn download_file(&mut self, name: BufferHandle, data: BufferHandle) {
        let name = self.arg(name);
        let result = match self.memory.read(data) {
            Ok(bytes) => self.host.download(&name, bytes),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.surface_error(&e);
        }
    }

    /// Open `url` in a new tab; a blocked pop-up is reported to the user.
    pub fn launch_browser(&mut self, url: BufferHandle) {
        let url = self.arg(url);
        if !self.host.open_url(&url) {
            self.surface_error(&BridgeError::ExternalResource(format!(
                "pop-up blocked while opening {url}"
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sheetbridge_core::config::BridgeConfig;

    use super::*;
    use crate::stub::{LoadedFile, RecordingCore, StubHost};

    fn context() -> BridgeContext<StubHost, RecordingCore> {
        BridgeContext::new(BridgeConfig::default(), StubHost::new(), RecordingCore::new()).unwrap()
    }

    fn picked(name: &str, bytes: Vec<u8>) -> PickedFile {
        PickedFile {
            name: name.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    fn names(ctx: &BridgeContext<StubHost, RecordingCore>, handle: BufferHandle) -> Vec<String> {
        let json = ctx.memory().read_c_string(handle.address, None).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn upload_persists_and_delivers_borrowed_buffers() {
        let mut ctx = context();
        ctx.trigger_upload();
        assert_eq!(ctx.host().picker_opens, [".cts"]);

        ctx.on_file_picked(picked("budget.cts", b"TSFF payload".to_vec()));

        assert_eq!(
            ctx.native().files,
            [LoadedFile {
                name: "budget.cts".into(),
                bytes: b"TSFF payload".to_vec(),
                buffers_live: true,
            }]
        );
        // borrowed buffers are released after the call
        assert_eq!(ctx.memory().outstanding(), 0);
        assert_eq!(ctx.memory().totals(), (2, 2));
        assert!(ctx.host().kv.contains_key("sheetbridge:file:budget.cts"));
        assert_eq!(ctx.recent_files()[0].name, "budget.cts");
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let config = BridgeConfig {
            max_upload_bytes: 1024,
            ..BridgeConfig::default()
        };
        let mut ctx = BridgeContext::new(config, StubHost::new(), RecordingCore::new()).unwrap();
        ctx.on_file_picked(PickedFile {
            name: "huge.cts".into(),
            size: 4096,
            bytes: Vec::new(),
        });
        assert!(ctx.native().files.is_empty());
        assert_eq!(ctx.host().errors[0].0, "File Too Large");
        assert!(ctx.host().kv.is_empty());
    }

    #[test]
    fn upload_over_quota_still_opens() {
        let mut ctx = context();
        ctx.host_mut().quota = Some(64);
        ctx.on_file_picked(picked("big.cts", vec![7; 1000]));
        assert_eq!(ctx.native().files.len(), 1);
        assert_eq!(ctx.host().errors[0].0, "Storage Full");
        assert!(ctx.recent_files().is_empty());
    }

    fn small_heap() -> BridgeContext<StubHost, RecordingCore> {
        let config = BridgeConfig {
            heap_capacity: 256,
            ..BridgeConfig::default()
        };
        BridgeContext::new(config, StubHost::new(), RecordingCore::new()).unwrap()
    }

    #[test]
    fn upload_that_cannot_be_allocated_is_aborted() {
        let mut ctx = small_heap();
        ctx.on_file_picked(picked("big.cts", vec![9; 8000]));

        assert!(ctx.native().files.is_empty());
        assert_eq!(ctx.host().errors.len(), 1);
        assert_eq!(ctx.host().errors[0].0, "Out of Memory");
        assert!(ctx.host().kv.is_empty());
        assert!(ctx.recent_files().is_empty());
        // the name buffer was allocated, then released when the data failed
        assert_eq!(ctx.memory().outstanding(), 0);
        assert_eq!(ctx.memory().totals(), (1, 1));
    }

    #[test]
    fn read_file_out_of_memory_returns_null() {
        let mut ctx = small_heap();
        ctx.host_mut().kv.insert(
            "sheetbridge:file:big.cts".into(),
            crate::store::encode_chunked(&[1; 1000], 3),
        );
        let name = ctx.memory_mut().alloc_c_string("big.cts").unwrap();
        assert!(ctx.read_file(name).is_null());
        assert_eq!(ctx.host().errors[0].0, "Out of Memory");
        ctx.release(name);
        assert_eq!(ctx.memory().outstanding(), 0);
    }

    #[test]
    fn list_files_out_of_memory_returns_null() {
        let mut ctx = small_heap();
        for i in 0..40 {
            ctx.host_mut()
                .kv
                .insert(format!("sheetbridge:file:quarterly-report-{i}.cts"), "AA==".into());
        }
        assert!(ctx.list_files().is_null());
        assert_eq!(ctx.host().errors[0].0, "Out of Memory");
        assert_eq!(ctx.memory().outstanding(), 0);
    }

    #[test]
    fn read_file_carries_length() {
        let mut ctx = context();
        ctx.on_file_picked(picked("a.cts", vec![1, 2, 3, 4, 5]));
        let name = ctx.memory_mut().alloc_c_string("a.cts").unwrap();
        let data = ctx.read_file(name);
        assert_eq!(data.length, 5);
        assert_eq!(ctx.memory().read(data).unwrap(), [1u8, 2, 3, 4, 5]);
        assert!(ctx.release(data));

        let missing = ctx.memory_mut().alloc_c_string("missing.cts").unwrap();
        assert!(ctx.read_file(missing).is_null());
        assert!(ctx.host().errors.is_empty());
    }

    #[test]
    fn save_list_delete_within_ttl() {
        let t0 = Instant::now();
        let mut ctx = context();
        let name = ctx.memory_mut().alloc_c_string("big.cts").unwrap();
        let payload: Vec<u8> = (0..100 * 1024).map(|i| (i % 256) as u8).collect();
        let data = ctx.memory_mut().alloc_bytes(&payload).unwrap();

        assert!(ctx.save_file(name, data));
        let listing = ctx.list_files_at(t0);
        assert_eq!(names(&ctx, listing), ["big.cts"]);
        ctx.release(listing);

        assert!(ctx.delete_file(name));
        let listing = ctx.list_files_at(t0 + Duration::from_millis(100));
        assert!(names(&ctx, listing).is_empty());
        ctx.release(listing);

        ctx.release(name);
        ctx.release(data);
        assert_eq!(ctx.memory().outstanding(), 0);
    }

    #[test]
    fn download_copies_borrowed_payload() {
        let mut ctx = context();
        let name = ctx.memory_mut().alloc_c_string("export.csv").unwrap();
        let data = ctx.memory_mut().alloc_bytes(b"a,b\n1,2\n").unwrap();
        ctx.download_file(name, data);
        assert_eq!(ctx.host().downloads, [("export.csv".to_string(), b"a,b\n1,2\n".to_vec())]);
        assert_eq!(ctx.memory().outstanding(), 2);
    }

    #[test]
    fn blocked_popup_is_reported() {
        let mut ctx = context();
        let url = ctx.memory_mut().alloc_c_string("https://example.org/help").unwrap();
        ctx.launch_browser(url);
        assert_eq!(ctx.host().opened_urls, ["https://example.org/help"]);

        ctx.host_mut().popups_blocked = true;
        ctx.launch_browser(url);
        assert_eq!(ctx.host().errors.len(), 1);
        assert!(ctx.host().errors[0].1.contains("pop-up"));
    }
}
