// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value types shared across the call boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// A colour split into its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// 24-bit packed colour as exchanged with the native core: `0xRRGGBB`.
///
/// [`PackedRgb::decode`] is the only place channels are extracted; hex and
/// CSS renderings are derived from it so the channel order cannot drift
/// between helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedRgb(pub u32);

impl PackedRgb {
    pub const BLACK: PackedRgb = PackedRgb(0x000000);
    pub const WHITE: PackedRgb = PackedRgb(0xFFFFFF);

    /// Split into channels. Bits above the low 24 are ignored.
    pub fn decode(self) -> Rgb {
        Rgb {
            r: ((self.0 >> 16) & 0xFF) as u8,
            g: ((self.0 >> 8) & 0xFF) as u8,
            b: (self.0 & 0xFF) as u8,
        }
    }

    pub fn encode(rgb: Rgb) -> Self {
        PackedRgb(((rgb.r as u32) << 16) | ((rgb.g as u32) << 8) | rgb.b as u32)
    }

    /// `#rrggbb`, lowercase.
    pub fn to_hex(self) -> String {
        let c = self.decode();
        format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
    }

    /// Parse `#rrggbb` (either case). Anything else is `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::encode(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        }))
    }

    /// `rgb(r,g,b)` for canvas style properties.
    pub fn to_css(self) -> String {
        let c = self.decode();
        format!("rgb({},{},{})", c.r, c.g, c.b)
    }
}

// ---------------------------------------------------------------------------
// Fonts, pens, brushes
// ---------------------------------------------------------------------------

/// Font style bitmask as sent by the native core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontStyle(u32);

impl FontStyle {
    pub const BOLD: u32 = 1;
    pub const ITALIC: u32 = 2;
    pub const MONOSPACE: u32 = 4;

    /// Keep the known bits; underline/strikethrough bits from the core are
    /// not renderable on a canvas and are dropped.
    pub fn from_bits(bits: u32) -> Self {
        FontStyle(bits & (Self::BOLD | Self::ITALIC | Self::MONOSPACE))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_bold(self) -> bool {
        self.0 & Self::BOLD != 0
    }

    pub fn is_italic(self) -> bool {
        self.0 & Self::ITALIC != 0
    }

    pub fn is_monospace(self) -> bool {
        self.0 & Self::MONOSPACE != 0
    }

    /// CSS font shorthand, e.g. `italic bold 14px monospace`.
    pub fn css_font(self, size_px: u32) -> String {
        let mut font = String::new();
        if self.is_italic() {
            font.push_str("italic ");
        }
        if self.is_bold() {
            font.push_str("bold ");
        }
        font.push_str(&format!("{size_px}px "));
        font.push_str(if self.is_monospace() { "monospace" } else { "sans-serif" });
        font
    }
}

/// Stock pens the native core selects by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenStyle {
    GridLines,
    TinyGridLines,
    ThinSelect,
    TinyText,
    Red,
    LightGrey,
    Black,
    White,
    Grey,
}

impl PenStyle {
    /// Stroke colour and line width.
    pub fn stroke(self) -> (PackedRgb, u32) {
        let colour = match self {
            PenStyle::GridLines => 0xC8C8C8,
            PenStyle::TinyGridLines => 0xE6E6E6,
            PenStyle::ThinSelect => 0x0078D7,
            PenStyle::TinyText => 0x646464,
            PenStyle::Red => 0xFF0000,
            PenStyle::LightGrey => 0xD3D3D3,
            PenStyle::Black => 0x000000,
            PenStyle::White => 0xFFFFFF,
            PenStyle::Grey => 0x808080,
        };
        (PackedRgb(colour), 1)
    }
}

impl TryFrom<i32> for PenStyle {
    type Error = BridgeError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => PenStyle::GridLines,
            1 => PenStyle::TinyGridLines,
            2 => PenStyle::ThinSelect,
            3 => PenStyle::TinyText,
            4 => PenStyle::Red,
            5 => PenStyle::LightGrey,
            6 => PenStyle::Black,
            7 => PenStyle::White,
            8 => PenStyle::Grey,
            other => return Err(BridgeError::MalformedInput(format!("unknown pen code {other}"))),
        })
    }
}

/// Stock brushes the native core selects by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushStyle {
    Transparent,
    White,
    Black,
    LightGrey,
}

impl BrushStyle {
    /// Fill colour; `None` means a transparent fill.
    pub fn fill(self) -> Option<PackedRgb> {
        match self {
            BrushStyle::Transparent => None,
            BrushStyle::White => Some(PackedRgb::WHITE),
            BrushStyle::Black => Some(PackedRgb::BLACK),
            BrushStyle::LightGrey => Some(PackedRgb(0xD3D3D3)),
        }
    }
}

impl TryFrom<i32> for BrushStyle {
    type Error = BridgeError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => BrushStyle::Transparent,
            1 => BrushStyle::White,
            2 => BrushStyle::Black,
            3 => BrushStyle::LightGrey,
            other => {
                return Err(BridgeError::MalformedInput(format!("unknown brush code {other}")));
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Keyboard modifier flags passed alongside every input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const CTRL: u8 = 1;
    pub const SHIFT: u8 = 2;
    pub const ALT: u8 = 4;
    pub const META: u8 = 8;

    pub fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        let mut bits = 0;
        if ctrl {
            bits |= Self::CTRL;
        }
        if shift {
            bits |= Self::SHIFT;
        }
        if alt {
            bits |= Self::ALT;
        }
        if meta {
            bits |= Self::META;
        }
        Modifiers(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Ctrl or Cmd held (the "shortcut" modifier).
    pub fn command(self) -> bool {
        self.0 & (Self::CTRL | Self::META) != 0
    }
}

/// Mouse event type codes understood by the native core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Move = 0,
    Down = 1,
    Up = 2,
    Wheel = 3,
}

/// Key event type codes understood by the native core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down = 0,
    Up = 1,
}

/// Unit of a wheel delta as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDeltaMode {
    Pixel,
    Line,
    Page,
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// One entry in the recent-files list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFile {
    pub name: String,
    pub opened_at: DateTime<Utc>,
}
