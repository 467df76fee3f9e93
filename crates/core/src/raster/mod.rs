//! Pure mapping from text and icon names to pixel matrices.
//!
//! Nothing in here touches a [`Framebuffer`](crate::Framebuffer); the display
//! engine decides where and in which colour a matrix lands.

pub mod font;
pub mod icons;

use crate::framebuffer::{PixelMatrix, DISPLAY_SIZE};

pub use icons::{icon_names, DEFAULT_ICON};

/// Total lookup: the value stored under `key`, or `default` when the table
/// has no such entry.
pub fn lookup_or<'a, K, V>(table: &'a [(K, V)], key: &K, default: &'a V) -> &'a V
where
    K: PartialEq,
{
    table
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| value)
        .unwrap_or(default)
}

/// Renders `text` into a display-height filmstrip, one blank column between
/// characters. Characters without a glyph render blank.
pub fn text_filmstrip(text: &str) -> PixelMatrix {
    let glyphs: Vec<&[u8; font::GLYPH_WIDTH]> = text
        .chars()
        .map(|c| font::glyph(c).unwrap_or(&font::BLANK_GLYPH))
        .collect();

    let width = match glyphs.len() {
        0 => 0,
        n => n * font::GLYPH_WIDTH + (n - 1),
    };
    let mut strip = PixelMatrix::new(width, DISPLAY_SIZE);

    for (index, columns) in glyphs.iter().enumerate() {
        let left = index * (font::GLYPH_WIDTH + 1);
        for (dx, column) in columns.iter().enumerate() {
            for y in 0..font::GLYPH_HEIGHT {
                if column & (1 << y) != 0 {
                    strip.set(left + dx, y, true);
                }
            }
        }
    }
    strip
}

/// Display-sized matrix for a named icon, falling back to [`DEFAULT_ICON`].
pub fn icon_matrix(name: &str) -> PixelMatrix {
    let key = icons::normalise_name(name);
    let rows = lookup_or(&icons::ICONS, &key.as_str(), default_icon_rows());
    if !is_known_icon(name) {
        tracing::debug!(icon = name, fallback = DEFAULT_ICON, "unknown icon");
    }
    PixelMatrix::from_rows(rows)
}

pub fn is_known_icon(name: &str) -> bool {
    let key = icons::normalise_name(name);
    icons::ICONS.iter().any(|(candidate, _)| *candidate == key)
}

fn default_icon_rows() -> &'static [u8; DISPLAY_SIZE] {
    icons::ICONS
        .iter()
        .find(|(name, _)| *name == DEFAULT_ICON)
        .map(|(_, rows)| rows)
        .unwrap_or(&[0; DISPLAY_SIZE])
}
