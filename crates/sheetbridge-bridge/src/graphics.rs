// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering state: pen, brush, text colour and font of the drawing surface.
//
// Text colour is tracked on its own and applied per `fill_text` call, so a
// brush change never recolours text drawn afterwards.

use sheetbridge_core::error::Result;
use sheetbridge_core::types::{BrushStyle, FontStyle, PackedRgb, PenStyle};
use tracing::{debug, warn};

use crate::traits::HostCanvas;

pub const DEFAULT_FONT_SIZE: u32 = 12;
pub const MIN_FONT_SIZE: u32 = 6;
pub const MAX_FONT_SIZE: u32 = 200;

/// Probe glyph for `char_height`.
const CHAR_HEIGHT_PROBE: &str = "M";

/// Clamp a requested font size; non-positive sizes fall back to the default.
pub fn clamp_font_size(size: i32) -> u32 {
    if size <= 0 {
        return DEFAULT_FONT_SIZE;
    }
    (size as u32).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pen: PackedRgb,
    pen_width: u32,
    brush: Option<PackedRgb>,
    text: PackedRgb,
    font_size: u32,
    font_style: FontStyle,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            pen: PackedRgb::BLACK,
            pen_width: 1,
            brush: Some(PackedRgb::WHITE),
            text: PackedRgb::BLACK,
            font_size: DEFAULT_FONT_SIZE,
            font_style: FontStyle::default(),
        }
    }
}

impl RenderState {
    pub fn pen(&self) -> (PackedRgb, u32) {
        (self.pen, self.pen_width)
    }

    pub fn brush(&self) -> Option<PackedRgb> {
        self.brush
    }

    pub fn text_colour(&self) -> PackedRgb {
        self.text
    }

    pub fn font(&self) -> (u32, FontStyle) {
        (self.font_size, self.font_style)
    }

    /// Push the whole state to a fresh surface.
    pub fn apply<C: HostCanvas + ?Sized>(&self, canvas: &mut C) {
        canvas.set_stroke_style(self.pen, self.pen_width);
        canvas.set_fill_style(self.brush);
        canvas.set_font(&self.font_style.css_font(self.font_size));
    }

    pub fn set_pen_colour<C: HostCanvas + ?Sized>(&mut self, canvas: &mut C, colour: PackedRgb) {
        self.pen = colour;
        canvas.set_stroke_style(self.pen, self.pen_width);
    }

    pub fn set_brush_colour<C: HostCanvas + ?Sized>(&mut self, canvas: &mut C, colour: PackedRgb) {
        self.brush = Some(colour);
        canvas.set_fill_style(self.brush);
    }

    pub fn set_text_colour(&mut self, colour: PackedRgb) {
        self.text = colour;
    }

    /// Select a stock pen. An unknown code is rejected and the current pen kept.
    pub fn set_pen<C: HostCanvas + ?Sized>(&mut self, canvas: &mut C, code: i32) -> Result<()> {
        let pen = PenStyle::try_from(code).inspect_err(|e| warn!(code, error = %e, "keeping current pen"))?;
        let (colour, width) = pen.stroke();
        self.pen = colour;
        self.pen_width = width;
        canvas.set_stroke_style(colour, width);
        debug!(?pen, "pen selected");
        Ok(())
    }

    /// Select a stock brush. An unknown code is rejected and the current brush kept.
    pub fn set_brush<C: HostCanvas + ?Sized>(&mut self, canvas: &mut C, code: i32) -> Result<()> {
        let brush =
            BrushStyle::try_from(code).inspect_err(|e| warn!(code, error = %e, "keeping current brush"))?;
        self.brush = brush.fill();
        canvas.set_fill_style(self.brush);
        debug!(?brush, "brush selected");
        Ok(())
    }

    pub fn set_font<C: HostCanvas + ?Sized>(&mut self, canvas: &mut C, size: i32, style_bits: u32) {
        self.font_size = clamp_font_size(size);
        self.font_style = FontStyle::from_bits(style_bits);
        canvas.set_font(&self.font_style.css_font(self.font_size));
    }

    pub fn draw_text<C: HostCanvas + ?Sized>(&self, canvas: &mut C, text: &str, x: i32, y: i32) {
        canvas.fill_text(text, x, y, self.text);
    }

    pub fn text_width<C: HostCanvas + ?Sized>(&self, canvas: &mut C, text: &str) -> i32 {
        canvas.measure_text(text).width.ceil() as i32
    }

    /// Height of `text`: the actual bounding box if the host reports one,
    /// else the font bounding box, else the font size.
    pub fn text_height<C: HostCanvas + ?Sized>(&self, canvas: &mut C, text: &str) -> i32 {
        let m = canvas.measure_text(text);
        let sum = |a: Option<f64>, d: Option<f64>| match (a, d) {
            (Some(a), Some(d)) if a + d >= 1.0 => Some(a + d),
            _ => None,
        };
        let height = sum(m.actual_ascent, m.actual_descent)
            .or_else(|| sum(m.font_ascent, m.font_descent))
            .unwrap_or(self.font_size as f64);
        height.ceil() as i32
    }

    pub fn char_height<C: HostCanvas + ?Sized>(&self, canvas: &mut C) -> i32 {
        self.text_height(canvas, CHAR_HEIGHT_PROBE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{CanvasOp, StubHost};
    use crate::traits::TextMetrics;

    #[test]
    fn font_size_is_clamped() {
        assert_eq!(clamp_font_size(0), 12);
        assert_eq!(clamp_font_size(-4), 12);
        assert_eq!(clamp_font_size(3), 6);
        assert_eq!(clamp_font_size(14), 14);
        assert_eq!(clamp_font_size(1000), 200);
    }

    #[test]
    fn brush_change_does_not_recolour_text() {
        let mut host = StubHost::new();
        let mut state = RenderState::default();
        state.set_text_colour(PackedRgb(0x0000FF));
        state.set_brush_colour(&mut host, PackedRgb(0xFF0000));
        state.draw_text(&mut host, "cell", 1, 2);
        assert_eq!(
            host.canvas_ops.last(),
            Some(&CanvasOp::Text {
                text: "cell".into(),
                x: 1,
                y: 2,
                colour: PackedRgb(0x0000FF),
            })
        );
    }

    #[test]
    fn unknown_pen_keeps_current() {
        let mut host = StubHost::new();
        let mut state = RenderState::default();
        state.set_pen(&mut host, 4).unwrap();
        assert_eq!(state.pen(), (PackedRgb(0xFF0000), 1));
        assert!(state.set_pen(&mut host, 99).is_err());
        assert_eq!(state.pen(), (PackedRgb(0xFF0000), 1));
        assert!(state.set_brush(&mut host, -1).is_err());
        assert_eq!(state.brush(), Some(PackedRgb::WHITE));
        state.set_brush(&mut host, 0).unwrap();
        assert_eq!(state.brush(), None);
    }

    #[test]
    fn font_css_reaches_canvas() {
        let mut host = StubHost::new();
        let mut state = RenderState::default();
        state.set_font(&mut host, 14, FontStyle::BOLD | FontStyle::ITALIC);
        assert_eq!(host.font, "italic bold 14px sans-serif");
    }

    #[test]
    fn text_height_fallback_chain() {
        let mut host = StubHost::new();
        let mut state = RenderState::default();
        state.set_font(&mut host, 20, 0);

        host.metrics = TextMetrics {
            width: 10.2,
            actual_ascent: Some(9.5),
            actual_descent: Some(2.1),
            font_ascent: Some(15.0),
            font_descent: Some(5.0),
        };
        assert_eq!(state.text_height(&mut host, "Ag"), 12);
        assert_eq!(state.text_width(&mut host, "Ag"), 11);

        host.metrics.actual_ascent = None;
        assert_eq!(state.char_height(&mut host), 20);

        host.metrics = TextMetrics::default();
        assert_eq!(state.char_height(&mut host), 20);
    }
}
