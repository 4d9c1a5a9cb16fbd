// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted session: the reference wiring of a `BridgeContext`.
//
// The script plays the part of both the user (queued dialog answers, picked
// files, pointer and key input) and the native core (drawing, prompts,
// clipboard, stored files).

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use sheetbridge_bridge::BridgeContext;
use sheetbridge_bridge::stub::{ModalAnswer, RecordingCore, StubHost};
use sheetbridge_bridge::traits::{AssetImage, PickedFile};
use sheetbridge_core::BridgeConfig;
use sheetbridge_core::error::Result;
use sheetbridge_core::types::{FontStyle, KeyEventKind, Modifiers, MouseEventKind, WheelDeltaMode};

type Context = BridgeContext<StubHost, RecordingCore>;

pub fn run(config: BridgeConfig) -> Result<Value> {
    let mut host = StubHost::new();
    host.answer(ModalAnswer::Accept("Quarterly budget".into()))
        .answer(ModalAnswer::Cancel)
        .answer(ModalAnswer::Accept("1".into()));
    host.clipboard = Some("pasted from elsewhere".into());

    let mut ctx = BridgeContext::new(config, host, RecordingCore::new())?;
    ctx.init_input();
    ctx.init_input();

    paint(&mut ctx)?;
    interact(&mut ctx);
    let prompts = prompt(&mut ctx)?;
    let clipboard = clipboard(&mut ctx)?;
    let stored = files(&mut ctx)?;

    let host = ctx.host();
    let native = ctx.native();
    Ok(json!({
        "platform": "Stub",
        "listeners": host.listeners.len(),
        "canvas_ops": host.canvas_ops.len(),
        "image_requests": host.image_requests.len(),
        "prompts": prompts,
        "clipboard": clipboard,
        "stored_files": stored,
        "recent_files": ctx.recent_files().iter().map(|f| f.name.clone()).collect::<Vec<_>>(),
        "errors": host.errors.iter().map(|(title, _)| title.clone()).collect::<Vec<_>>(),
        "native": {
            "mouse_events": native.mouse.len(),
            "key_events": native.keys.len(),
            "resizes": native.resizes,
            "files_loaded": native.files.len(),
        },
        "outstanding_buffers": ctx.memory().outstanding(),
    }))
}

/// One frame of drawing, including an icon that loads after the first draw.
fn paint(ctx: &mut Context) -> Result<()> {
    ctx.set_font(13, FontStyle::BOLD);
    ctx.set_pen(0);
    ctx.set_brush(1);
    ctx.draw_rectangle(0, 0, 200, 24);
    ctx.set_text_color(0x202020);
    let label = ctx.memory_mut().alloc_c_string("Revenue")?;
    ctx.draw_text(label, 4, 16);
    ctx.measure_text_width(label);
    ctx.release(label);

    ctx.draw_bitmap(3, 180, 4);
    if let Some((_, key, generation)) = ctx.host().image_requests.first().cloned() {
        let image = AssetImage {
            id: u64::from(key),
            width: 16,
            height: 16,
        };
        ctx.on_asset_loaded(key, generation, Ok(image));
        ctx.on_animation_frame();
        ctx.draw_bitmap(3, 180, 4);
    }
    Ok(())
}

/// Pointer, wheel, key and resize input through the router.
fn interact(ctx: &mut Context) {
    for x in 0..20 {
        ctx.on_pointer_move(x, 10, Modifiers::default());
    }
    ctx.on_pointer_button(MouseEventKind::Down, 20, 10, Modifiers::default());
    ctx.on_pointer_button(MouseEventKind::Up, 20, 10, Modifiers::default());
    ctx.on_animation_frame();
    ctx.on_wheel(-3.0, WheelDeltaMode::Line, Modifiers::default());

    let ctrl = Modifiers::new(true, false, false, false);
    if ctx.on_key(KeyEventKind::Down, 83, "s", ctrl) {
        tracing::debug!("browser save dialog suppressed");
    }
    ctx.on_key(KeyEventKind::Up, 83, "s", ctrl);

    let t0 = Instant::now();
    ctx.on_window_resize_at(1280, 720, t0);
    ctx.on_window_resize_at(1300, 740, t0 + Duration::from_millis(30));
    ctx.on_timer_at(t0 + Duration::from_millis(130));
}

fn prompt(ctx: &mut Context) -> Result<Value> {
    let memory = ctx.memory_mut();
    let title = memory.alloc_c_string("Rename sheet")?;
    let message = memory.alloc_c_string("New name:")?;
    let default = memory.alloc_c_string("Sheet1")?;
    let choices = memory.alloc_c_string(r#"["Name","Date","Size"]"#)?;

    let renamed = ctx.ask_text(title, message, default);
    let renamed_text = ctx.memory().read_c_string(renamed.address, None)?;
    ctx.release(renamed);
    let zoom = ctx.ask_number(title, message, 5.0, 1.0, 10.0);
    let sort = ctx.single_choice(title, message, choices);

    for handle in [title, message, default, choices] {
        ctx.release(handle);
    }
    Ok(json!({ "renamed": renamed_text, "zoom": zoom, "sort": sort }))
}

fn clipboard(ctx: &mut Context) -> Result<Value> {
    let copied = ctx.memory_mut().alloc_c_string("A1:C3")?;
    ctx.set_clipboard_text(copied);
    ctx.release(copied);

    let pasted = ctx.get_clipboard_text();
    let text = if pasted.is_null() {
        None
    } else {
        let text = ctx.memory().read_c_string(pasted.address, None)?;
        ctx.release(pasted);
        Some(text)
    };
    Ok(json!({ "pasted": text }))
}

/// Upload a file, read it back, then list stored files.
fn files(ctx: &mut Context) -> Result<Value> {
    ctx.trigger_upload();
    let bytes: Vec<u8> = (0..100 * 1024).map(|i| (i % 256) as u8).collect();
    ctx.on_file_picked(PickedFile {
        name: "budget.cts".into(),
        size: bytes.len() as u64,
        bytes,
    });

    let name = ctx.memory_mut().alloc_c_string("budget.cts")?;
    let contents = ctx.read_file(name);
    let read_back = contents.length;
    ctx.release(contents);
    ctx.release(name);

    let listing = ctx.list_files();
    let names: Vec<String> = if listing.is_null() {
        Vec::new()
    } else {
        let json = ctx.memory().read_c_string(listing.address, None)?;
        ctx.release(listing);
        serde_json::from_str(&json)?
    };
    Ok(json!({ "names": names, "read_back_bytes": read_back }))
}
