// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for the scripting host, plus the native-core entry points
// the bridge calls back into.
//
// Host operations that complete later (prompts, clipboard reads) take a
// `Resolver` and must wire both a success and a failure continuation to it.
// Operations that complete through a host event (file picker, asset loads,
// animation frames, timers) report back by calling the matching
// `BridgeContext::on_*` method.

use std::time::Duration;

use sheetbridge_core::error::Result;
use sheetbridge_core::types::{KeyEventKind, Modifiers, MouseEventKind, PackedRgb};

use crate::ownership::{BufferHandle, OwnershipBroker};
use crate::suspension::{EventPump, Resolver};

/// Unified host that groups every capability the bridge needs.
pub trait HostPlatform:
    HostCanvas
    + HostDialogs
    + HostClipboard
    + HostStorage
    + HostFiles
    + HostAssets
    + HostEvents
    + HostShell
    + EventPump
{
    /// Human-readable host name (e.g. "Firefox 131", "Stub").
    fn platform_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Rendering surface
// ---------------------------------------------------------------------------

/// Raw text metrics as reported by the host's text measurement API.
///
/// Bounding-box fields are optional because older hosts do not report them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub font_ascent: Option<f64>,
    pub font_descent: Option<f64>,
    pub actual_ascent: Option<f64>,
    pub actual_descent: Option<f64>,
}

/// A decoded bitmap owned by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetImage {
    /// Opaque host-side identifier for the decoded image.
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// 2D drawing surface.
pub trait HostCanvas {
    /// Fill with the current fill style, then stroke with the current pen.
    fn draw_rectangle(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn draw_rounded_rectangle(&mut self, x: i32, y: i32, w: i32, h: i32, radius: i32);
    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32);
    /// Draw text with an explicit fill colour.
    fn fill_text(&mut self, text: &str, x: i32, y: i32, colour: PackedRgb);
    fn draw_image(&mut self, image: &AssetImage, x: i32, y: i32);
    /// Light square with a border, drawn while an asset is unavailable.
    fn draw_placeholder(&mut self, x: i32, y: i32, size: u32);

    /// `None` selects a transparent fill.
    fn set_fill_style(&mut self, colour: Option<PackedRgb>);
    fn set_stroke_style(&mut self, colour: PackedRgb, line_width: u32);
    /// CSS font shorthand.
    fn set_font(&mut self, css_font: &str);

    fn measure_text(&mut self, text: &str) -> TextMetrics;
    /// Current backing-store size of the surface in pixels.
    fn surface_size(&self) -> (u32, u32);
}

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

/// Input control shown inside a modal.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalInput {
    /// Message only, single OK button.
    None,
    Text { default: String },
    Number { default: f64, min: f64, max: f64 },
    Choice { choices: Vec<String> },
    /// `#rrggbb` initial value of a colour input.
    Colour { default: String },
}

/// A modal dialog request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalRequest {
    pub title: String,
    pub message: String,
    pub input: ModalInput,
}

/// Modal dialogs.
pub trait HostDialogs {
    /// Show a modal and wire its buttons to `resolver`.
    ///
    /// The primary button resolves with the raw input value (an empty string
    /// for `ModalInput::None`, the selected index for choices); the cancel
    /// button and escape key cancel.
    fn present_modal(&mut self, request: ModalRequest, resolver: Resolver<String>);

    /// Non-blocking error modal.
    fn notify_error(&mut self, title: &str, body: &str);
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

pub trait HostClipboard {
    /// Asynchronous clipboard API write. `Err` when the API is missing or the
    /// write was rejected.
    fn clipboard_write(&mut self, text: &str) -> Result<()>;

    /// Legacy hidden-textarea + copy-command path.
    fn clipboard_write_legacy(&mut self, text: &str) -> Result<()>;

    /// Start an asynchronous read. `Err(PlatformUnavailable)` when the host
    /// has no read API, in which case `resolver` has been dropped.
    fn clipboard_read(&mut self, resolver: Resolver<String>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Persistent key/value storage
// ---------------------------------------------------------------------------

/// Quota-limited, string-valued key/value store shared with unrelated data.
pub trait HostStorage {
    fn storage_get(&self, key: &str) -> Result<Option<String>>;
    /// `Err(QuotaExceeded)` when the value does not fit.
    fn storage_set(&mut self, key: &str, value: &str) -> Result<()>;
    fn storage_remove(&mut self, key: &str) -> Result<()>;
    /// Every key in the store, including foreign ones.
    fn storage_keys(&self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// A file chosen in the host's picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub name: String,
    /// Size reported by the picker before the contents are read.
    pub size: u64,
    pub bytes: Vec<u8>,
}

pub trait HostFiles {
    /// Open the picker. The selection arrives via `BridgeContext::on_file_picked`.
    fn open_file_picker(&mut self, accept: &str);

    /// Offer `bytes` to the user as a download named `name`.
    fn download(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Assets and frame scheduling
// ---------------------------------------------------------------------------

pub trait HostAssets {
    /// Start loading `url`. Completion arrives via
    /// `BridgeContext::on_asset_loaded(key, generation, ..)`.
    fn request_image(&mut self, url: &str, key: u32, generation: u64);

    /// Ask for one `BridgeContext::on_animation_frame` callback.
    fn request_animation_frame(&mut self);
}

// ---------------------------------------------------------------------------
// Event sources
// ---------------------------------------------------------------------------

/// Where an event listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    Canvas,
    Window,
}

pub trait HostEvents {
    /// Attach a listener that forwards `event` to the bridge's dispatch.
    fn add_listener(&mut self, target: ListenerTarget, event: &'static str);

    /// Ask for one `BridgeContext::on_timer` callback after `delay`.
    fn schedule_timer(&mut self, delay: Duration);
}

/// Navigation outside the application.
pub trait HostShell {
    /// Open `url` in a new tab. `false` when a pop-up blocker refused.
    fn open_url(&mut self, url: &str) -> bool;
}

// ---------------------------------------------------------------------------
// Native core
// ---------------------------------------------------------------------------

/// Entry points exported by the native core.
///
/// Buffers passed in are borrowed for the duration of the call: the core
/// must copy anything it wants to keep and must not release them.
pub trait NativeCore {
    fn file_loaded(&mut self, memory: &OwnershipBroker, name: BufferHandle, data: BufferHandle);
    fn mouse(&mut self, kind: MouseEventKind, x: i32, y: i32, modifiers: Modifiers);
    fn key(&mut self, kind: KeyEventKind, key_code: u32, modifiers: Modifiers);
    fn resize(&mut self, width: u32, height: u32);
    fn action(&mut self, id: i32);
}
