// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted in-memory host and recording native core, for tests, benches and
// the headless session runner.
//
// `StubHost` resolves pending dialogs and clipboard reads from queued answers
// when its event loop is pumped, so suspensions go through the same
// resolve-later path as on a real host.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use sheetbridge_core::error::{BridgeError, Result};
use sheetbridge_core::types::{KeyEventKind, Modifiers, MouseEventKind, PackedRgb};
use tracing::{debug, warn};

use crate::ownership::{BufferHandle, OwnershipBroker};
use crate::suspension::{EventPump, PumpStatus, Resolver};
use crate::traits::*;

/// A drawing call recorded by the stub surface.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    Rectangle { x: i32, y: i32, w: i32, h: i32 },
    RoundedRectangle { x: i32, y: i32, w: i32, h: i32, radius: i32 },
    Line { x1: i32, y1: i32, x2: i32, y2: i32 },
    Text { text: String, x: i32, y: i32, colour: PackedRgb },
    Image { id: u64, x: i32, y: i32 },
    Placeholder { x: i32, y: i32, size: u32 },
}

/// How the user answers the next modal.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalAnswer {
    Accept(String),
    Cancel,
    /// The host's failure path, e.g. the dialog could not be shown.
    Fail,
}

/// In-memory host with scripted user behaviour.
#[derive(Debug)]
pub struct StubHost {
    // -- canvas --
    pub canvas_ops: Vec<CanvasOp>,
    pub fill_style: Option<PackedRgb>,
    pub stroke_style: (PackedRgb, u32),
    pub font: String,
    pub metrics: TextMetrics,
    pub surface: (u32, u32),

    // -- dialogs --
    pub modal_answers: VecDeque<ModalAnswer>,
    pub modals_shown: Vec<ModalRequest>,
    pending_modal: Option<Resolver<String>>,
    pub errors: Vec<(String, String)>,

    // -- clipboard --
    pub clipboard: Option<String>,
    /// Whether the asynchronous clipboard API exists.
    pub clipboard_api: bool,
    pub clipboard_write_rejected: bool,
    pub clipboard_read_denied: bool,
    pub legacy_copies: usize,
    pending_clipboard_read: Option<Resolver<String>>,

    // -- storage --
    pub kv: BTreeMap<String, String>,
    /// Total bytes (keys plus values) the store accepts.
    pub quota: Option<usize>,

    // -- files, assets, events, shell --
    pub picker_opens: Vec<String>,
    pub downloads: Vec<(String, Vec<u8>)>,
    pub image_requests: Vec<(String, u32, u64)>,
    pub animation_frames_requested: usize,
    pub listeners: Vec<(ListenerTarget, &'static str)>,
    pub timers: Vec<Duration>,
    pub popups_blocked: bool,
    pub opened_urls: Vec<String>,

    // -- event loop --
    pub pump_turns: usize,
    /// The loop reports `Terminated` after this many turns.
    pub max_pump_turns: usize,
}

impl Default for StubHost {
    fn default() -> Self {
        Self::new()
    }
}

impl StubHost {
    pub fn new() -> Self {
        Self {
            canvas_ops: Vec::new(),
            fill_style: None,
            stroke_style: (PackedRgb::BLACK, 1),
            font: String::new(),
            metrics: TextMetrics::default(),
            surface: (1024, 768),
            modal_answers: VecDeque::new(),
            modals_shown: Vec::new(),
            pending_modal: None,
            errors: Vec::new(),
            clipboard: None,
            clipboard_api: true,
            clipboard_write_rejected: false,
            clipboard_read_denied: false,
            legacy_copies: 0,
            pending_clipboard_read: None,
            kv: BTreeMap::new(),
            quota: None,
            picker_opens: Vec::new(),
            downloads: Vec::new(),
            image_requests: Vec::new(),
            animation_frames_requested: 0,
            listeners: Vec::new(),
            timers: Vec::new(),
            popups_blocked: false,
            opened_urls: Vec::new(),
            pump_turns: 0,
            max_pump_turns: 1000,
        }
    }

    /// Queue the user's answer to the next modal.
    pub fn answer(&mut self, answer: ModalAnswer) -> &mut Self {
        self.modal_answers.push_back(answer);
        self
    }

    pub fn listener_count(&self, target: ListenerTarget, event: &str) -> usize {
        self.listeners
            .iter()
            .filter(|(t, e)| *t == target && *e == event)
            .count()
    }

    fn storage_used_without(&self, key: &str) -> usize {
        self.kv
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl HostPlatform for StubHost {
    fn platform_name(&self) -> &str {
        "Stub"
    }
}

impl EventPump for StubHost {
    fn pump(&mut self) -> PumpStatus {
        self.pump_turns += 1;
        if self.pump_turns > self.max_pump_turns {
            warn!(turns = self.pump_turns, "stub event loop terminated");
            return PumpStatus::Terminated;
        }

        if let Some(resolver) = self.pending_modal.take() {
            match self.modal_answers.pop_front() {
                Some(ModalAnswer::Accept(value)) => resolver.resolve(value),
                Some(ModalAnswer::Cancel) => resolver.cancel(),
                Some(ModalAnswer::Fail) => resolver.fail("modal could not be shown"),
                // Nobody answers: the dialog stays open.
                None => self.pending_modal = Some(resolver),
            }
        }

        if let Some(resolver) = self.pending_clipboard_read.take() {
            if self.clipboard_read_denied {
                resolver.fail("clipboard permission denied");
            } else {
                resolver.resolve(self.clipboard.clone().unwrap_or_default());
            }
        }
        PumpStatus::Running
    }
}

impl HostCanvas for StubHost {
    fn draw_rectangle(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.canvas_ops.push(CanvasOp::Rectangle { x, y, w, h });
    }

    fn draw_rounded_rectangle(&mut self, x: i32, y: i32, w: i32, h: i32, radius: i32) {
        self.canvas_ops.push(CanvasOp::RoundedRectangle { x, y, w, h, radius });
    }

    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.canvas_ops.push(CanvasOp::Line { x1, y1, x2, y2 });
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32, colour: PackedRgb) {
        self.canvas_ops.push(CanvasOp::Text {
            text: text.to_string(),
            x,
            y,
            colour,
        });
    }

    fn draw_image(&mut self, image: &AssetImage, x: i32, y: i32) {
        self.canvas_ops.push(CanvasOp::Image { id: image.id, x, y });
    }

    fn draw_placeholder(&mut self, x: i32, y: i32, size: u32) {
        self.canvas_ops.push(CanvasOp::Placeholder { x, y, size });
    }

    fn set_fill_style(&mut self, colour: Option<PackedRgb>) {
        self.fill_style = colour;
    }

    fn set_stroke_style(&mut self, colour: PackedRgb, line_width: u32) {
        self.stroke_style = (colour, line_width);
    }

    fn set_font(&mut self, css_font: &str) {
        self.font = css_font.to_string();
    }

    fn measure_text(&mut self, _text: &str) -> TextMetrics {
        self.metrics
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }
}

impl HostDialogs for StubHost {
    fn present_modal(&mut self, request: ModalRequest, resolver: Resolver<String>) {
        debug!(title = %request.title, "stub modal shown");
        self.modals_shown.push(request);
        self.pending_modal = Some(resolver);
    }

    fn notify_error(&mut self, title: &str, body: &str) {
        self.errors.push((title.to_string(), body.to_string()));
    }
}

impl HostClipboard for StubHost {
    fn clipboard_write(&mut self, text: &str) -> Result<()> {
        if !self.clipboard_api {
            return Err(BridgeError::PlatformUnavailable);
        }
        if self.clipboard_write_rejected {
            return Err(BridgeError::ExternalResource("clipboard write rejected".into()));
        }
        self.clipboard = Some(text.to_string());
        Ok(())
    }

    fn clipboard_write_legacy(&mut self, text: &str) -> Result<()> {
        self.legacy_copies += 1;
        self.clipboard = Some(text.to_string());
        Ok(())
    }

    fn clipboard_read(&mut self, resolver: Resolver<String>) -> Result<()> {
        if !self.clipboard_api {
            return Err(BridgeError::PlatformUnavailable);
        }
        self.pending_clipboard_read = Some(resolver);
        Ok(())
    }
}

impl HostStorage for StubHost {
    fn storage_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.get(key).cloned())
    }

    fn storage_set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.storage_used_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(BridgeError::QuotaExceeded(format!(
                    "{needed} bytes needed, {quota} available"
                )));
            }
        }
        self.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn storage_remove(&mut self, key: &str) -> Result<()> {
        self.kv.remove(key);
        Ok(())
    }

    fn storage_keys(&self) -> Result<Vec<String>> {
        Ok(self.kv.keys().cloned().collect())
    }
}

impl HostFiles for StubHost {
    fn open_file_picker(&mut self, accept: &str) {
        self.picker_opens.push(accept.to_string());
    }

    fn download(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.downloads.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

impl HostAssets for StubHost {
    fn request_image(&mut self, url: &str, key: u32, generation: u64) {
        self.image_requests.push((url.to_string(), key, generation));
    }

    fn request_animation_frame(&mut self) {
        self.animation_frames_requested += 1;
    }
}

impl HostEvents for StubHost {
    fn add_listener(&mut self, target: ListenerTarget, event: &'static str) {
        self.listeners.push((target, event));
    }

    fn schedule_timer(&mut self, delay: Duration) {
        self.timers.push(delay);
    }
}

impl HostShell for StubHost {
    fn open_url(&mut self, url: &str) -> bool {
        if self.popups_blocked {
            return false;
        }
        self.opened_urls.push(url.to_string());
        true
    }
}

// ---------------------------------------------------------------------------
// Native core double
// ---------------------------------------------------------------------------

/// A file delivery as the core saw it, plus whether its buffers were live
/// during the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub buffers_live: bool,
}

/// Native core that records every entry-point call.
#[derive(Debug, Default)]
pub struct RecordingCore {
    pub files: Vec<LoadedFile>,
    pub mouse: Vec<(MouseEventKind, i32, i32, Modifiers)>,
    pub keys: Vec<(KeyEventKind, u32, Modifiers)>,
    pub resizes: Vec<(u32, u32)>,
    pub actions: Vec<i32>,
}

impl RecordingCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_calls(&self) -> usize {
        self.files.len() + self.mouse.len() + self.keys.len() + self.resizes.len() + self.actions.len()
    }
}

impl NativeCore for RecordingCore {
    fn file_loaded(&mut self, memory: &OwnershipBroker, name: BufferHandle, data: BufferHandle) {
        // Copy out: the buffers are borrowed for this call only.
        self.files.push(LoadedFile {
            name: memory
                .read_c_string(name.address, Some(name.length as usize))
                .unwrap_or_default(),
            bytes: memory.read(data).map(<[u8]>::to_vec).unwrap_or_default(),
            buffers_live: memory.is_live(name) && memory.is_live(data),
        });
    }

    fn mouse(&mut self, kind: MouseEventKind, x: i32, y: i32, modifiers: Modifiers) {
        self.mouse.push((kind, x, y, modifiers));
    }

    fn key(&mut self, kind: KeyEventKind, key_code: u32, modifiers: Modifiers) {
        self.keys.push((kind, key_code, modifiers));
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
    }

    fn action(&mut self, id: i32) {
        self.actions.push(id);
    }
}
