// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Suspending dialog calls.
//
// Cancellation and host failure resolve to the documented sentinels:
//   ask_text      -> ""
//   ask_number    -> the default
//   single_choice -> 0
//   pick_color    -> the default
//   select_font   -> null name, size 0
// Owned results are allocated only after the suspension has resumed.

use sheetbridge_core::error::BridgeError;
use sheetbridge_core::types::PackedRgb;
use tracing::{debug, instrument, warn};

use crate::context::BridgeContext;
use crate::ownership::BufferHandle;
use crate::suspension::Resumption;
use crate::traits::{HostPlatform, ModalInput, ModalRequest, NativeCore};

/// Faces offered by the font dialog.
pub const FONT_FACES: [&str; 13] = [
    "Arial",
    "Helvetica",
    "Times New Roman",
    "Georgia",
    "Verdana",
    "Courier New",
    "Consolas",
    "Monaco",
    "Lucida Console",
    "Trebuchet MS",
    "Tahoma",
    "Impact",
    "Comic Sans MS",
];

/// Point sizes the font dialog accepts.
pub const FONT_DIALOG_SIZES: (i32, i32) = (8, 72);

/// Outcome of `select_font`. `name` is core-owned; null when cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedFont {
    pub name: BufferHandle,
    pub size: i32,
}

impl SelectedFont {
    pub const CANCELLED: SelectedFont = SelectedFont {
        name: BufferHandle::NULL,
        size: 0,
    };

    pub fn is_cancelled(&self) -> bool {
        self.name.is_null()
    }
}

impl<H: HostPlatform, N: NativeCore> BridgeContext<H, N> {
    /// Present a modal and suspend until it closes. `None` on cancellation,
    /// host failure, or a rejected nested suspension.
    fn modal(&mut self, operation: &'static str, request: ModalRequest) -> Option<String> {
        let outcome = self
            .suspension
            .suspend(&mut self.host, operation, String::new(), |host, resolver| {
                host.present_modal(request, resolver)
            });
        match outcome {
            Ok(Resumption::Primary(value)) => Some(value),
            Ok(Resumption::Sentinel(_)) => None,
            Err(e) => {
                warn!(operation, error = %e, "modal not shown");
                None
            }
        }
    }

    /// Message with a single OK button.
    pub fn show_message(&mut self, title: BufferHandle, text: BufferHandle) {
        let request = ModalRequest {
            title: self.arg(title),
            message: self.arg(text),
            input: ModalInput::None,
        };
        self.modal("show_message", request);
    }

    /// Text prompt. Always returns a core-owned string ("" on cancel), or
    /// null if it could not be allocated.
    #[instrument(skip_all)]
    pub fn ask_text(&mut self, title: BufferHandle, text: BufferHandle, default: BufferHandle) -> BufferHandle {
        let request = ModalRequest {
            title: self.arg(title),
            message: self.arg(text),
            input: ModalInput::Text {
                default: self.arg(default),
            },
        };
        let answer = self.modal("ask_text", request).unwrap_or_default();
        self.owned_string(&answer)
    }

    /// Numeric prompt. An accepted value is clamped to `[min, max]`; cancel
    /// or an unparsable entry yields `default`.
    #[instrument(skip_all, fields(default = default, min = min, max = max))]
    pub fn ask_number(&mut self, title: BufferHandle, text: BufferHandle, default: f64, min: f64, max: f64) -> f64 {
        let request = ModalRequest {
            title: self.arg(title),
            message: self.arg(text),
            input: ModalInput::Number { default, min, max },
        };
        let Some(raw) = self.modal("ask_number", request) else {
            return default;
        };
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => {
                if min <= max {
                    value.clamp(min, max)
                } else {
                    warn!(min, max, "inverted number range; not clamping");
                    value
                }
            }
            _ => {
                debug!(entry = %raw, "unparsable number entry; using default");
                default
            }
        }
    }

    /// Choice among the entries of a JSON string array. Returns the chosen
    /// index, or 0 on cancel. Malformed JSON shows an error and returns 0.
    #[instrument(skip_all)]
    pub fn single_choice(&mut self, title: BufferHandle, text: BufferHandle, choices_json: BufferHandle) -> i32 {
        let json = self.arg(choices_json);
        let choices: Vec<String> = match serde_json::from_str(&json) {
            Ok(choices) => choices,
            Err(e) => {
                warn!(payload = %json, "malformed choice list");
                self.surface_error(&BridgeError::MalformedInput(format!("choice list: {e}")));
                return 0;
            }
        };
        if choices.is_empty() {
            warn!("empty choice list");
            return 0;
        }

        let count = choices.len();
        let request = ModalRequest {
            title: self.arg(title),
            message: self.arg(text),
            input: ModalInput::Choice { choices },
        };
        let Some(raw) = self.modal("single_choice", request) else {
            return 0;
        };
        match raw.trim().parse::<usize>() {
            Ok(index) if index < count => index as i32,
            _ => {
                warn!(entry = %raw, count, "choice out of range");
                0
            }
        }
    }

    /// Colour picker seeded with `default`; cancel returns `default`.
    pub fn pick_color(&mut self, default: u32) -> u32 {
        let default = PackedRgb(default);
        let request = ModalRequest {
            title: "Pick a colour".into(),
            message: String::new(),
            input: ModalInput::Colour {
                default: default.to_hex(),
            },
        };
        let Some(raw) = self.modal("pick_color", request) else {
            return default.0;
        };
        match PackedRgb::from_hex(raw.trim()) {
            Some(colour) => colour.0,
            None => {
                warn!(entry = %raw, "unparsable colour; keeping default");
                default.0
            }
        }
    }

    /// Font dialog: a face from `FONT_FACES`, then a size within
    /// `FONT_DIALOG_SIZES`. Name and size come back together; cancelling
    /// either step, or an invalid entry, yields `SelectedFont::CANCELLED`.
    #[instrument(skip_all, fields(default_size = default_size))]
    pub fn select_font(&mut self, default_name: BufferHandle, default_size: i32) -> SelectedFont {
        let current = self.arg(default_name);
        let face_request = ModalRequest {
            title: "Select font".into(),
            message: format!("Current font: {current}"),
            input: ModalInput::Choice {
                choices: FONT_FACES.iter().map(|f| f.to_string()).collect(),
            },
        };
        let Some(raw) = self.modal("select_font", face_request) else {
            return SelectedFont::CANCELLED;
        };
        let Some(face) = raw.trim().parse::<usize>().ok().and_then(|i| FONT_FACES.get(i)) else {
            warn!(entry = %raw, "no such font face");
            return SelectedFont::CANCELLED;
        };

        let (min, max) = FONT_DIALOG_SIZES;
        let size_request = ModalRequest {
            title: "Select font".into(),
            message: format!("Font size ({min}-{max}):"),
            input: ModalInput::Number {
                default: f64::from(default_size.clamp(min, max)),
                min: f64::from(min),
                max: f64::from(max),
            },
        };
        let Some(raw) = self.modal("select_font_size", size_request) else {
            return SelectedFont::CANCELLED;
        };
        let size = match raw.trim().parse::<i32>() {
            Ok(size) if (min..=max).contains(&size) => size,
            _ => {
                warn!(entry = %raw, "font size rejected");
                return SelectedFont::CANCELLED;
            }
        };

        let name = self.owned_string(face);
        if name.is_null() {
            return SelectedFont::CANCELLED;
        }
        debug!(face, size, "font selected");
        SelectedFont { name, size }
    }
}

#[cfg(test)]
mod tests {
    use sheetbridge_core::config::BridgeConfig;

    use super::*;
    use crate::stub::{ModalAnswer, RecordingCore, StubHost};
    use crate::suspension::SuspensionState;

    fn context() -> BridgeContext<StubHost, RecordingCore> {
        BridgeContext::new(BridgeConfig::default(), StubHost::new(), RecordingCore::new()).unwrap()
    }

    fn s(ctx: &mut BridgeContext<StubHost, RecordingCore>, text: &str) -> BufferHandle {
        ctx.memory_mut().alloc_c_string(text).unwrap()
    }

    #[test]
    fn ask_number_cancel_returns_default() {
        let mut ctx = context();
        ctx.host_mut().answer(ModalAnswer::Cancel);
        let (title, text) = (s(&mut ctx, "Zoom"), s(&mut ctx, "Percent"));
        assert_eq!(ctx.ask_number(title, text, 5.0, 1.0, 10.0), 5.0);
        assert_eq!(ctx.suspension().state(), SuspensionState::Idle);
        assert_eq!(ctx.suspension().resumptions(), 1);
        assert_eq!(
            ctx.host().modals_shown[0].input,
            ModalInput::Number {
                default: 5.0,
                min: 1.0,
                max: 10.0
            }
        );
    }

    #[test]
    fn ask_number_accepts_and_clamps() {
        let mut ctx = context();
        let (title, text) = (s(&mut ctx, "t"), s(&mut ctx, "m"));
        ctx.host_mut()
            .answer(ModalAnswer::Accept(" 7.5 ".into()))
            .answer(ModalAnswer::Accept("99".into()))
            .answer(ModalAnswer::Accept("lots".into()));
        assert_eq!(ctx.ask_number(title, text, 5.0, 1.0, 10.0), 7.5);
        assert_eq!(ctx.ask_number(title, text, 5.0, 1.0, 10.0), 10.0);
        assert_eq!(ctx.ask_number(title, text, 5.0, 1.0, 10.0), 5.0);
    }

    #[test]
    fn ask_number_host_failure_returns_default() {
        let mut ctx = context();
        ctx.host_mut().answer(ModalAnswer::Fail);
        let (title, text) = (s(&mut ctx, "t"), s(&mut ctx, "m"));
        assert_eq!(ctx.ask_number(title, text, 3.0, 0.0, 9.0), 3.0);
    }

    #[test]
    fn unanswered_dialog_resolves_when_loop_ends() {
        let mut ctx = context();
        ctx.host_mut().max_pump_turns = 5;
        let (title, text) = (s(&mut ctx, "t"), s(&mut ctx, "m"));
        assert_eq!(ctx.ask_number(title, text, 2.0, 0.0, 9.0), 2.0);
        assert_eq!(ctx.suspension().state(), SuspensionState::Idle);
    }

    #[test]
    fn ask_text_returns_owned_string() {
        let mut ctx = context();
        ctx.host_mut().answer(ModalAnswer::Accept("Budget 2026".into()));
        let (title, text, default) = (s(&mut ctx, "Rename"), s(&mut ctx, "New name"), s(&mut ctx, "Sheet1"));
        let before = ctx.memory().outstanding();

        let result = ctx.ask_text(title, text, default);
        assert_eq!(ctx.memory().read_c_string(result.address, None).unwrap(), "Budget 2026");
        assert_eq!(ctx.memory().outstanding(), before + 1);
        assert!(ctx.release(result));
        assert_eq!(
            ctx.host().modals_shown[0].input,
            ModalInput::Text {
                default: "Sheet1".into()
            }
        );
    }

    #[test]
    fn ask_text_cancel_is_empty_string() {
        let mut ctx = context();
        ctx.host_mut().answer(ModalAnswer::Cancel);
        let (title, text, default) = (s(&mut ctx, "t"), s(&mut ctx, "m"), s(&mut ctx, "d"));
        let result = ctx.ask_text(title, text, default);
        assert!(!result.is_null());
        assert_eq!(ctx.memory().read_c_string(result.address, None).unwrap(), "");
        ctx.release(result);
    }

    #[test]
    fn ask_text_out_of_memory_returns_null() {
        let config = BridgeConfig {
            heap_capacity: 256,
            ..BridgeConfig::default()
        };
        let mut ctx = BridgeContext::new(config, StubHost::new(), RecordingCore::new()).unwrap();
        ctx.host_mut().answer(ModalAnswer::Accept("x".repeat(1000)));
        let (title, text, default) = (s(&mut ctx, "t"), s(&mut ctx, "m"), s(&mut ctx, "d"));

        assert!(ctx.ask_text(title, text, default).is_null());
        assert_eq!(ctx.host().errors.len(), 1);
        assert_eq!(ctx.host().errors[0].0, "Out of Memory");
        for handle in [title, text, default] {
            assert!(ctx.release(handle));
        }
        assert_eq!(ctx.memory().outstanding(), 0);
    }

    #[test]
    fn single_choice_index_and_cancel() {
        let mut ctx = context();
        let (title, text) = (s(&mut ctx, "Sort"), s(&mut ctx, "By"));
        let choices = s(&mut ctx, r#"["Name","Date","Size"]"#);
        ctx.host_mut()
            .answer(ModalAnswer::Accept("2".into()))
            .answer(ModalAnswer::Cancel)
            .answer(ModalAnswer::Accept("7".into()));
        assert_eq!(ctx.single_choice(title, text, choices), 2);
        assert_eq!(ctx.single_choice(title, text, choices), 0);
        assert_eq!(ctx.single_choice(title, text, choices), 0);
        assert!(ctx.host().errors.is_empty());
    }

    #[test]
    fn single_choice_malformed_json_shows_error() {
        let mut ctx = context();
        let (title, text) = (s(&mut ctx, "t"), s(&mut ctx, "m"));
        let choices = s(&mut ctx, "[\"unterminated");
        assert_eq!(ctx.single_choice(title, text, choices), 0);
        assert!(ctx.host().modals_shown.is_empty());
        assert_eq!(ctx.host().errors.len(), 1);
        assert_eq!(ctx.host().errors[0].0, "Invalid Data");
    }

    #[test]
    fn pick_color_round_trips_hex() {
        let mut ctx = context();
        ctx.host_mut()
            .answer(ModalAnswer::Accept("#1A2b3C".into()))
            .answer(ModalAnswer::Cancel)
            .answer(ModalAnswer::Accept("teal".into()));
        assert_eq!(ctx.pick_color(0xFFFFFF), 0x1A2B3C);
        assert_eq!(ctx.pick_color(0x123456), 0x123456);
        assert_eq!(ctx.pick_color(0x654321), 0x654321);
        assert_eq!(
            ctx.host().modals_shown[1].input,
            ModalInput::Colour {
                default: "#123456".into()
            }
        );
    }

    #[test]
    fn select_font_returns_name_and_size_together() {
        let mut ctx = context();
        let current = s(&mut ctx, "Arial");
        ctx.host_mut()
            .answer(ModalAnswer::Accept("3".into()))
            .answer(ModalAnswer::Accept("14".into()));
        let before = ctx.memory().outstanding();

        let font = ctx.select_font(current, 12);
        assert_eq!(font.size, 14);
        assert_eq!(ctx.memory().read_c_string(font.name.address, None).unwrap(), "Georgia");
        assert_eq!(ctx.memory().outstanding(), before + 1);
        assert_eq!(
            ctx.host().modals_shown[1].input,
            ModalInput::Number {
                default: 12.0,
                min: 8.0,
                max: 72.0
            }
        );
        assert!(ctx.release(font.name));
    }

    #[test]
    fn select_font_cancel_at_either_step() {
        let mut ctx = context();
        let current = s(&mut ctx, "Arial");
        ctx.host_mut()
            .answer(ModalAnswer::Cancel)
            .answer(ModalAnswer::Accept("0".into()))
            .answer(ModalAnswer::Cancel);
        let before = ctx.memory().outstanding();

        assert_eq!(ctx.select_font(current, 12), SelectedFont::CANCELLED);
        assert_eq!(ctx.host().modals_shown.len(), 1);
        assert!(ctx.select_font(current, 12).is_cancelled());
        assert_eq!(ctx.host().modals_shown.len(), 3);
        assert_eq!(ctx.memory().outstanding(), before);
    }

    #[test]
    fn select_font_rejects_invalid_entries() {
        let mut ctx = context();
        let current = s(&mut ctx, "Arial");
        ctx.host_mut()
            .answer(ModalAnswer::Accept("13".into()))
            .answer(ModalAnswer::Accept("1".into()))
            .answer(ModalAnswer::Accept("100".into()));
        assert!(ctx.select_font(current, 12).is_cancelled());
        assert!(ctx.select_font(current, 300).is_cancelled());
        // an oversized default is offered clamped to the range
        assert_eq!(
            ctx.host().modals_shown[2].input,
            ModalInput::Number {
                default: 72.0,
                min: 8.0,
                max: 72.0
            }
        );
        assert!(ctx.host().errors.is_empty());
    }

    #[test]
    fn show_message_waits_for_acknowledgement() {
        let mut ctx = context();
        ctx.host_mut().answer(ModalAnswer::Accept(String::new()));
        let (title, text) = (s(&mut ctx, "Saved"), s(&mut ctx, "All changes saved."));
        ctx.show_message(title, text);
        assert_eq!(ctx.host().modals_shown[0].title, "Saved");
        assert_eq!(ctx.host().modals_shown[0].message, "All changes saved.");
        assert!(ctx.host().pump_turns >= 1);
    }
}
