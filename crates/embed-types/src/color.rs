//! Named color palette and color-token parsing.

use crate::errors::ValidationError;

/// Color used for new documents and as the silent fallback of the first
/// creation step.
pub const DEFAULT_COLOR: u32 = 0x3498DB;

/// Color of error notices.
pub const ERROR_COLOR: u32 = 0xE74C3C;

/// Color of success notices.
pub const SUCCESS_COLOR: u32 = 0x2ECC71;

const MAX_COLOR: u32 = 0xFF_FFFF;

/// Palette names accepted case-insensitively by [`parse_color`].
pub const PALETTE: &[(&str, u32)] = &[
    ("RED", 0xE74C3C),
    ("GREEN", 0x2ECC71),
    ("BLUE", 0x3498DB),
    ("YELLOW", 0xF39C12),
    ("PURPLE", 0x9B59B6),
    ("CYAN", 0x1ABC9C),
    ("GRAY", 0x95A5A6),
    ("DARK_GRAY", 0x34495E),
];

/// Parse a palette name (`red`, `DARK_GRAY`) or a 24-bit hex literal
/// (`FF0000`, `0xFF0000`, `#ff0000`).
pub fn parse_color(token: &str) -> Result<u32, ValidationError> {
    let trimmed = token.trim();
    let upper = trimmed.to_uppercase();

    if let Some((_, value)) = PALETTE.iter().find(|(name, _)| *name == upper) {
        return Ok(*value);
    }

    let digits = upper
        .strip_prefix("0X")
        .or_else(|| upper.strip_prefix('#'))
        .unwrap_or(&upper);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidColor(trimmed.to_string()));
    }

    match u32::from_str_radix(digits, 16) {
        Ok(value) if value <= MAX_COLOR => Ok(value),
        _ => Err(ValidationError::InvalidColor(trimmed.to_string())),
    }
}

/// Lenient variant used by the first creation step: an empty or
/// unparseable token yields [`DEFAULT_COLOR`].
pub fn parse_color_or_default(token: Option<&str>) -> u32 {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => parse_color(t).unwrap_or(DEFAULT_COLOR),
        None => DEFAULT_COLOR,
    }
}

/// Render a color as `#RRGGBB`.
pub fn format_hex(color: u32) -> String {
    format!("#{:06X}", color)
}

/// Comma-separated palette names, for prompts.
pub fn palette_names() -> String {
    PALETTE
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}
