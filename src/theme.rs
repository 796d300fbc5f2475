//! Theme loading: btop-style `theme[key]="value"` files and hex → ratatui Color.

use crate::board::BlockColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Theme keys for the block colours, in [`BlockColor::ALL`] order.
const BLOCK_KEYS: [&str; 8] = [
    "block_red",
    "block_blue",
    "block_emerald",
    "block_amber",
    "block_violet",
    "block_pink",
    "block_cyan",
    "block_lime",
];

const DEFAULT_BLOCKS: [Color; 8] = [
    Color::Rgb(0xEF, 0x44, 0x44),
    Color::Rgb(0x3B, 0x82, 0xF6),
    Color::Rgb(0x10, 0xB9, 0x81),
    Color::Rgb(0xF5, 0x9E, 0x0B),
    Color::Rgb(0x8B, 0x5C, 0xF6),
    Color::Rgb(0xEC, 0x48, 0x99),
    Color::Rgb(0x06, 0xB6, 0xD4),
    Color::Rgb(0x84, 0xCC, 0x16),
];

/// Saturated colours for dark terminals.
const HIGH_CONTRAST_BLOCKS: [Color; 8] = [
    Color::Rgb(0xFF, 0x00, 0x00),
    Color::Rgb(0x00, 0x88, 0xFF),
    Color::Rgb(0x00, 0xFF, 0x00),
    Color::Rgb(0xFF, 0xFF, 0x00),
    Color::Rgb(0xAA, 0x00, 0xFF),
    Color::Rgb(0xFF, 0x00, 0xFF),
    Color::Rgb(0x00, 0xFF, 0xFF),
    Color::Rgb(0xFF, 0xFF, 0xFF),
];

/// Okabe–Ito plus two extra distinguishable tones.
const COLORBLIND_BLOCKS: [Color; 8] = [
    Color::Rgb(0xD5, 0x5E, 0x00),
    Color::Rgb(0x00, 0x72, 0xB2),
    Color::Rgb(0x00, 0x9E, 0x73),
    Color::Rgb(0xE6, 0x9F, 0x00),
    Color::Rgb(0xCC, 0x79, 0xA7),
    Color::Rgb(0x56, 0xB4, 0xE9),
    Color::Rgb(0xF0, 0xE4, 0x42),
    Color::Rgb(0xBB, 0xBB, 0xBB),
];

/// Block colours and UI colours.
#[derive(Debug, Clone)]
pub struct Theme {
    /// One colour per [`BlockColor`].
    pub blocks: [Color; 8],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text.
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Empty cells, locked cards.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Theme {
    /// Slate UI with the eight block colours.
    pub fn builtin() -> Self {
        Self {
            blocks: DEFAULT_BLOCKS,
            bg: Color::Rgb(0x1E, 0x29, 0x3B),
            div_line: Color::Rgb(0x47, 0x55, 0x69),
            main_fg: Color::Rgb(0xE2, 0xE8, 0xF0),
            title: Color::Rgb(0xF5, 0x9E, 0x0B),
            inactive_fg: Color::Rgb(0x64, 0x74, 0x8B),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the built-in theme if path is None or the file does not exist.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Built-in theme with a palette variant applied.
    pub fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::builtin();
        t.apply_palette(palette);
        t
    }

    /// Override block colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.blocks = HIGH_CONTRAST_BLOCKS,
            crate::Palette::Colorblind => self.blocks = COLORBLIND_BLOCKS,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::builtin();
        let mut blocks = base.blocks;
        for (slot, key) in blocks.iter_mut().zip(BLOCK_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        // btop keys as fallbacks so stock btop themes still tint the UI.
        Self {
            blocks,
            bg: get("bg").or_else(|| get("meter_bg")).unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
        }
    }

    #[inline]
    pub fn block(&self, color: BlockColor) -> Color {
        self.blocks[color.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}
