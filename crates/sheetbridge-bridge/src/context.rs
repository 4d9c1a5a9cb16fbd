// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge context — the one object the native core calls into.
//
// Failures never cross into the core. Every public call converts errors into
// a zero/null/sentinel return value; failures the user should know about are
// humanised and shown through the host's error modal.
//
// Dialog, clipboard and file calls live in `dialogs`, `clipboard` and
// `files`; this module holds construction, rendering, storage passthrough and
// event dispatch.

use std::time::Instant;

use sheetbridge_core::config::BridgeConfig;
use sheetbridge_core::error::{BridgeError, Result};
use sheetbridge_core::human_errors::humanize_error;
use sheetbridge_core::types::{KeyEventKind, Modifiers, MouseEventKind, PackedRgb, WheelDeltaMode};
use tracing::{debug, error, info, instrument, warn};

use crate::graphics::RenderState;
use crate::init_guard::InitGuards;
use crate::input::{InputRouter, NativeEvent, suppresses_default};
use crate::ownership::{BufferHandle, OwnershipBroker};
use crate::recent::RecentFiles;
use crate::resource_cache::{AssetLookup, ImageCache, RedrawScheduler};
use crate::store::PersistentStore;
use crate::suspension::SuspensionBroker;
use crate::traits::{AssetImage, HostPlatform, ListenerTarget, NativeCore};

/// Guard name for input wiring.
pub const INPUT_GUARD: &str = "input";

/// Listeners attached by `init_input`.
pub const INPUT_LISTENERS: [(ListenerTarget, &str); 10] = [
    (ListenerTarget::Canvas, "mousedown"),
    (ListenerTarget::Canvas, "mouseup"),
    (ListenerTarget::Canvas, "mousemove"),
    (ListenerTarget::Canvas, "wheel"),
    (ListenerTarget::Canvas, "touchstart"),
    (ListenerTarget::Canvas, "touchmove"),
    (ListenerTarget::Canvas, "touchend"),
    (ListenerTarget::Window, "keydown"),
    (ListenerTarget::Window, "keyup"),
    (ListenerTarget::Window, "resize"),
];

/// Owns all bridge state for one native core running on one host.
pub struct BridgeContext<H: HostPlatform, N: NativeCore> {
    pub(crate) config: BridgeConfig,
    pub(crate) host: H,
    pub(crate) native: N,
    pub(crate) memory: OwnershipBroker,
    pub(crate) suspension: SuspensionBroker,
    pub(crate) render: RenderState,
    pub(crate) images: ImageCache,
    pub(crate) redraw: RedrawScheduler,
    pub(crate) store: PersistentStore,
    pub(crate) recent: RecentFiles,
    pub(crate) guards: InitGuards,
    pub(crate) input: InputRouter,
}

impl<H: HostPlatform, N: NativeCore> BridgeContext<H, N> {
    /// Validate `config` and bind a context to `host` and `native`.
    pub fn new(config: BridgeConfig, mut host: H, native: N) -> Result<Self> {
        config.validate()?;
        let render = RenderState::default();
        render.apply(&mut host);
        info!(platform = host.platform_name(), "bridge context created");
        Ok(Self {
            memory: OwnershipBroker::new(config.heap_capacity),
            suspension: SuspensionBroker::new(),
            images: ImageCache::new(config.max_image_cache_size, config.cache_eviction_fraction),
            redraw: RedrawScheduler::default(),
            store: PersistentStore::new(&config),
            recent: RecentFiles::new(config.max_recent_files),
            guards: InitGuards::new(),
            input: InputRouter::new(config.resize_debounce()),
            render,
            config,
            host,
            native,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }

    pub fn memory(&self) -> &OwnershipBroker {
        &self.memory
    }

    /// The core's view of linear memory, for writing arguments.
    pub fn memory_mut(&mut self) -> &mut OwnershipBroker {
        &mut self.memory
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn suspension(&self) -> &SuspensionBroker {
        &self.suspension
    }

    // -- ownership ----------------------------------------------------------

    /// Release a buffer the bridge handed to the core. `false` if the handle
    /// was unknown or already released.
    pub fn release(&mut self, handle: BufferHandle) -> bool {
        self.memory.release(handle).is_ok()
    }

    /// Decode a borrowed string argument. Invalid handles decode as empty.
    pub(crate) fn arg(&self, handle: BufferHandle) -> String {
        let declared = (handle.length > 0).then_some(handle.length as usize);
        self.memory
            .read_c_string(handle.address, declared)
            .unwrap_or_else(|e| {
                warn!(error = %e, "unreadable string argument");
                String::new()
            })
    }

    /// Copy `text` into a new core-owned buffer, or null on failure.
    pub(crate) fn owned_string(&mut self, text: &str) -> BufferHandle {
        match self.memory.alloc_c_string(text) {
            Ok(handle) => handle,
            Err(e) => {
                self.surface_error(&e);
                BufferHandle::NULL
            }
        }
    }

    /// Log a failure and show it to the user.
    pub(crate) fn surface_error(&mut self, err: &BridgeError) {
        error!(error = %err, "bridge operation failed");
        let human = humanize_error(err);
        self.host.notify_error(&human.title, &human.body());
    }

    // -- rendering ----------------------------------------------------------

    pub fn draw_rectangle(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.host.draw_rectangle(x, y, w, h);
    }

    pub fn draw_rounded_rectangle(&mut self, x: i32, y: i32, w: i32, h: i32, radius: i32) {
        self.host.draw_rounded_rectangle(x, y, w, h, radius);
    }

    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.host.draw_line(x1, y1, x2, y2);
    }

    pub fn draw_text(&mut self, text: BufferHandle, x: i32, y: i32) {
        let text = self.arg(text);
        self.render.draw_text(&mut self.host, &text, x, y);
    }

    /// Draw icon `index`, or a placeholder until it has loaded.
    pub fn draw_bitmap(&mut self, index: u32, x: i32, y: i32) {
        match self.images.get(index, &mut self.host) {
            AssetLookup::Loaded(image) => self.host.draw_image(&image, x, y),
            AssetLookup::Placeholder => {
                self.host.draw_placeholder(x, y, self.config.placeholder_size);
            }
        }
    }

    pub fn set_pen_color(&mut self, packed: u32) {
        self.render.set_pen_colour(&mut self.host, PackedRgb(packed));
    }

    pub fn set_brush_color(&mut self, packed: u32) {
        self.render.set_brush_colour(&mut self.host, PackedRgb(packed));
    }

    pub fn set_text_color(&mut self, packed: u32) {
        self.render.set_text_colour(PackedRgb(packed));
    }

    /// Unknown codes keep the current pen.
    pub fn set_pen(&mut self, code: i32) {
        self.render.set_pen(&mut self.host, code).ok();
    }

    /// Unknown codes keep the current brush.
    pub fn set_brush(&mut self, code: i32) {
        self.render.set_brush(&mut self.host, code).ok();
    }

    pub fn set_font(&mut self, size_px: i32, style_bits: u32) {
        self.render.set_font(&mut self.host, size_px, style_bits);
    }

    pub fn measure_text_width(&mut self, text: BufferHandle) -> i32 {
        let text = self.arg(text);
        self.render.text_width(&mut self.host, &text)
    }

    pub fn measure_text_height(&mut self, text: BufferHandle) -> i32 {
        let text = self.arg(text);
        self.render.text_height(&mut self.host, &text)
    }

    pub fn char_height(&mut self) -> i32 {
        self.render.char_height(&mut self.host)
    }

    // -- key/value passthrough ----------------------------------------------

    /// `false` (with a user-visible error) when the value did not fit.
    pub fn set_item(&mut self, key: BufferHandle, value: BufferHandle) -> bool {
        let (key, value) = (self.arg(key), self.arg(value));
        match self.store.set_item(&mut self.host, &key, &value) {
            Ok(()) => true,
            Err(e) => {
                self.surface_error(&e);
                false
            }
        }
    }

    /// Core-owned copy of the value, or null if absent.
    pub fn get_item(&mut self, key: BufferHandle) -> BufferHandle {
        let key = self.arg(key);
        match self.store.get_item(&self.host, &key) {
            Ok(Some(value)) => self.owned_string(&value),
            Ok(None) => BufferHandle::NULL,
            Err(e) => {
                warn!(key = %key, error = %e, "get_item failed");
                BufferHandle::NULL
            }
        }
    }

    pub fn remove_item(&mut self, key: BufferHandle) {
        let key = self.arg(key);
        if let Err(e) = self.store.remove_item(&mut self.host, &key) {
            warn!(key = %key, error = %e, "remove_item failed");
        }
    }

    /// Remove every key in the namespace; foreign keys are untouched.
    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear(&mut self.host) {
            self.surface_error(&e);
        }
    }

    // -- event wiring -------------------------------------------------------

    /// Attach input listeners and tell the core the initial surface size.
    /// Only the first call has any effect.
    pub fn init_input(&mut self) -> bool {
        let (host, native) = (&mut self.host, &mut self.native);
        self.guards.init_once(INPUT_GUARD, || {
            for (target, event) in INPUT_LISTENERS {
                host.add_listener(target, event);
            }
            let (width, height) = host.surface_size();
            debug!(width, height, "initial surface size");
            native.resize(width, height);
        })
    }

    pub fn on_pointer_move(&mut self, x: i32, y: i32, modifiers: Modifiers) {
        self.input.pointer_move(&mut self.host, x, y, modifiers);
    }

    pub fn on_pointer_button(&mut self, kind: MouseEventKind, x: i32, y: i32, modifiers: Modifiers) {
        let events = self.input.pointer_button(kind, x, y, modifiers);
        self.deliver(events);
    }

    pub fn on_wheel(&mut self, delta: f64, mode: WheelDeltaMode, modifiers: Modifiers) {
        let events = self.input.wheel(delta, mode, modifiers);
        self.deliver(events);
    }

    /// Deliver a key event. Returns `true` when the host should prevent its
    /// default action for the key.
    pub fn on_key(&mut self, kind: KeyEventKind, key_code: u32, key: &str, modifiers: Modifiers) -> bool {
        let suppress = kind == KeyEventKind::Down && suppresses_default(key, modifiers);
        let events = self.input.key(kind, key_code, modifiers);
        self.deliver(events);
        suppress
    }

    pub fn on_touch_start(&mut self, touches: &[(i32, i32)]) {
        let events = self.input.touch_start(touches);
        self.deliver(events);
    }

    pub fn on_touch_move(&mut self, touches: &[(i32, i32)]) {
        let events = self.input.touch_move(&mut self.host, touches);
        self.deliver(events);
    }

    pub fn on_touch_end(&mut self, remaining: usize) {
        let events = self.input.touch_end(remaining);
        self.deliver(events);
    }

    pub fn on_window_resize(&mut self, width: u32, height: u32) {
        self.on_window_resize_at(width, height, Instant::now());
    }

    pub fn on_window_resize_at(&mut self, width: u32, height: u32, now: Instant) {
        self.input.resize(&mut self.host, width, height, now);
    }

    pub fn on_timer(&mut self) {
        self.on_timer_at(Instant::now());
    }

    pub fn on_timer_at(&mut self, now: Instant) {
        if let Some(event) = self.input.on_timer(&mut self.host, now) {
            self.deliver(vec![event]);
        }
    }

    /// Animation frame: deliver the coalesced pointer move, then redraw if
    /// one is pending.
    pub fn on_animation_frame(&mut self) {
        if let Some(event) = self.input.on_frame() {
            self.deliver(vec![event]);
        }
        if self.redraw.take_pending() {
            let (width, height) = self.host.surface_size();
            debug!(width, height, "redraw");
            self.native.resize(width, height);
        }
    }

    /// Completion of an asset load issued by `draw_bitmap`.
    #[instrument(skip_all, fields(key = key, generation = generation))]
    pub fn on_asset_loaded(&mut self, key: u32, generation: u64, result: Result<AssetImage>) {
        if self.images.complete(key, generation, result) {
            self.redraw.request(&mut self.host);
        }
    }

    /// Menu or toolbar command chosen in the presentation layer.
    pub fn on_action(&mut self, id: i32) {
        debug!(id, "action");
        self.native.action(id);
    }

    fn deliver(&mut self, events: Vec<NativeEvent>) {
        for event in events {
            match event {
                NativeEvent::Mouse { kind, x, y, modifiers } => self.native.mouse(kind, x, y, modifiers),
                NativeEvent::Key {
                    kind,
                    key_code,
                    modifiers,
                } => self.native.key(kind, key_code, modifiers),
                NativeEvent::Resize { width, height } => self.native.resize(width, height),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sheetbridge_core::error::BridgeError;

    use super::*;
    use crate::resource_cache::LoadState;
    use crate::stub::{CanvasOp, RecordingCore, StubHost};

    fn context() -> BridgeContext<StubHost, RecordingCore> {
        BridgeContext::new(BridgeConfig::default(), StubHost::new(), RecordingCore::new()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BridgeConfig {
            base64_chunk_size: 1000,
            ..BridgeConfig::default()
        };
        let err = BridgeContext::new(config, StubHost::new(), RecordingCore::new()).err();
        assert!(matches!(err, Some(BridgeError::MalformedInput(_))));
    }

    #[test]
    fn init_input_registers_listeners_once() {
        let mut ctx = context();
        assert!(ctx.init_input());
        assert!(!ctx.init_input());
        assert!(!ctx.init_input());
        assert_eq!(ctx.host().listeners.len(), INPUT_LISTENERS.len());
        assert_eq!(ctx.host().listener_count(ListenerTarget::Canvas, "mousedown"), 1);
        assert_eq!(ctx.host().listener_count(ListenerTarget::Window, "keydown"), 1);
        // the initial size is delivered once, at wiring time
        assert_eq!(ctx.native().resizes, [(1024, 768)]);

        // one host event, one native call
        ctx.on_pointer_button(MouseEventKind::Down, 1, 2, Modifiers::default());
        assert_eq!(ctx.native().total_calls(), 2);
    }

    #[test]
    fn unknown_pen_and_brush_codes_keep_current_style() {
        let mut ctx = context();
        ctx.set_pen(1);
        ctx.set_brush(1);
        let before = (ctx.host().stroke_style, ctx.host().fill_style);
        ctx.set_pen(99);
        ctx.set_brush(-4);
        assert_eq!((ctx.host().stroke_style, ctx.host().fill_style), before);
        assert!(ctx.host().errors.is_empty());
    }

    #[test]
    fn key_events_report_suppression() {
        let mut ctx = context();
        let ctrl = Modifiers::new(true, false, false, false);
        assert!(ctx.on_key(KeyEventKind::Down, 83, "s", ctrl));
        assert!(!ctx.on_key(KeyEventKind::Up, 83, "s", ctrl));
        assert!(!ctx.on_key(KeyEventKind::Down, 81, "q", ctrl));
        assert_eq!(ctx.native().keys.len(), 3);
        assert_eq!(ctx.native().keys[0], (KeyEventKind::Down, 83, ctrl));
    }

    #[test]
    fn frame_delivers_latest_move_then_button_order_holds() {
        let mut ctx = context();
        ctx.on_pointer_move(1, 1, Modifiers::default());
        ctx.on_pointer_move(2, 2, Modifiers::default());
        ctx.on_pointer_button(MouseEventKind::Up, 3, 3, Modifiers::default());
        ctx.on_animation_frame();
        let kinds: Vec<_> = ctx.native().mouse.iter().map(|m| (m.0, m.1)).collect();
        assert_eq!(kinds, [(MouseEventKind::Move, 2), (MouseEventKind::Up, 3)]);
    }

    #[test]
    fn resize_reaches_core_after_quiescence() {
        let t0 = Instant::now();
        let mut ctx = context();
        ctx.on_window_resize_at(640, 480, t0);
        ctx.on_window_resize_at(800, 600, t0 + Duration::from_millis(50));
        ctx.on_timer_at(t0 + Duration::from_millis(100));
        assert!(ctx.native().resizes.is_empty());
        ctx.on_timer_at(t0 + Duration::from_millis(150));
        assert_eq!(ctx.native().resizes, [(800, 600)]);
    }

    #[test]
    fn bitmap_loads_once_and_redraws() {
        let mut ctx = context();
        ctx.draw_bitmap(4, 10, 20);
        ctx.draw_bitmap(4, 30, 20);
        assert_eq!(ctx.host().image_requests.len(), 1);
        assert_eq!(
            ctx.host().canvas_ops,
            [
                CanvasOp::Placeholder { x: 10, y: 20, size: 16 },
                CanvasOp::Placeholder { x: 30, y: 20, size: 16 },
            ]
        );

        let (_, key, generation) = ctx.host().image_requests[0].clone();
        let image = AssetImage {
            id: 77,
            width: 16,
            height: 16,
        };
        ctx.on_asset_loaded(key, generation, Ok(image));
        assert_eq!(ctx.images().state(4), LoadState::Loaded);
        assert_eq!(ctx.host().animation_frames_requested, 1);

        ctx.on_animation_frame();
        assert_eq!(ctx.native().resizes, [(1024, 768)]);

        ctx.draw_bitmap(4, 0, 0);
        assert_eq!(ctx.host().canvas_ops.last(), Some(&CanvasOp::Image { id: 77, x: 0, y: 0 }));
    }

    #[test]
    fn text_uses_text_colour_and_decodes_argument() {
        let mut ctx = context();
        let text = ctx.memory_mut().alloc_c_string("Σ total").unwrap();
        ctx.set_text_color(0x336699);
        ctx.set_brush_color(0xFF0000);
        ctx.draw_text(text, 4, 8);
        assert_eq!(
            ctx.host().canvas_ops,
            [CanvasOp::Text {
                text: "Σ total".into(),
                x: 4,
                y: 8,
                colour: PackedRgb(0x336699),
            }]
        );
        assert_eq!(ctx.host().fill_style, Some(PackedRgb(0xFF0000)));
        assert!(ctx.release(text));
    }

    #[test]
    fn item_passthrough_round_trip() {
        let mut ctx = context();
        let key = ctx.memory_mut().alloc_c_string("zoom").unwrap();
        let value = ctx.memory_mut().alloc_c_string("150").unwrap();
        assert!(ctx.set_item(key, value));

        let got = ctx.get_item(key);
        assert_eq!(ctx.memory().read_c_string(got.address, None).unwrap(), "150");
        assert!(ctx.release(got));
        assert!(!ctx.release(got));

        ctx.remove_item(key);
        assert!(ctx.get_item(key).is_null());
        ctx.release(key);
        ctx.release(value);
        assert_eq!(ctx.memory().outstanding(), 0);
    }

    #[test]
    fn get_item_out_of_memory_returns_null() {
        let config = BridgeConfig {
            heap_capacity: 256,
            ..BridgeConfig::default()
        };
        let mut ctx = BridgeContext::new(config, StubHost::new(), RecordingCore::new()).unwrap();
        ctx.host_mut().kv.insert("sheetbridge:notes".into(), "n".repeat(1000));
        let key = ctx.memory_mut().alloc_c_string("notes").unwrap();
        assert!(ctx.get_item(key).is_null());
        assert_eq!(ctx.host().errors[0].0, "Out of Memory");
        assert!(ctx.release(key));
        assert_eq!(ctx.memory().outstanding(), 0);
    }

    #[test]
    fn quota_failure_surfaces_actionable_error() {
        let mut ctx = context();
        ctx.host_mut().quota = Some(32);
        let key = ctx.memory_mut().alloc_c_string("big").unwrap();
        let value = ctx.memory_mut().alloc_c_string(&"x".repeat(100)).unwrap();
        assert!(!ctx.set_item(key, value));
        let (title, body) = &ctx.host().errors[0];
        assert_eq!(title, "Storage Full");
        assert!(body.contains("export"));
    }

    #[test]
    fn clear_keeps_foreign_keys() {
        let mut ctx = context();
        ctx.host_mut().kv.insert("elsewhere".into(), "1".into());
        ctx.host_mut().kv.insert("sheetbridge:a".into(), "1".into());
        ctx.clear();
        assert_eq!(ctx.host().kv.keys().collect::<Vec<_>>(), ["elsewhere"]);
    }
}
