use crate::framebuffer::DISPLAY_SIZE;

/// Icon drawn when a lesson names one that does not exist.
pub const DEFAULT_ICON: &str = "heart";

/// Built-in icons, one row byte per display row with bit 7 on the left.
#[rustfmt::skip]
pub const ICONS: [(&str, [u8; DISPLAY_SIZE]); 15] = [
    ("heart",       [0x66, 0xff, 0xff, 0xff, 0x7e, 0x3c, 0x18, 0x00]),
    ("small_heart", [0x00, 0x24, 0x7e, 0x7e, 0x3c, 0x18, 0x00, 0x00]),
    ("happy",       [0x3c, 0x42, 0xa5, 0x81, 0xa5, 0x99, 0x42, 0x3c]),
    ("sad",         [0x3c, 0x42, 0xa5, 0x81, 0x99, 0xa5, 0x42, 0x3c]),
    ("yes",         [0x00, 0x01, 0x03, 0x06, 0x8c, 0xd8, 0x70, 0x20]),
    ("no",          [0x81, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x81]),
    ("arrow_up",    [0x18, 0x3c, 0x7e, 0xdb, 0x18, 0x18, 0x18, 0x18]),
    ("arrow_down",  [0x18, 0x18, 0x18, 0x18, 0xdb, 0x7e, 0x3c, 0x18]),
    ("arrow_left",  [0x10, 0x30, 0x60, 0xff, 0xff, 0x60, 0x30, 0x10]),
    ("arrow_right", [0x08, 0x0c, 0x06, 0xff, 0xff, 0x06, 0x0c, 0x08]),
    ("square",      [0xff, 0x81, 0x81, 0x81, 0x81, 0x81, 0x81, 0xff]),
    ("diamond",     [0x18, 0x3c, 0x7e, 0xff, 0xff, 0x7e, 0x3c, 0x18]),
    ("ghost",       [0x3c, 0x7e, 0xdb, 0xff, 0xff, 0xff, 0xff, 0xaa]),
    ("music",       [0x0c, 0x0e, 0x0b, 0x08, 0x08, 0x78, 0xf8, 0x70]),
    ("full",        [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
];

/// Canonical table key: lower case with `-` and spaces folded to `_`.
pub fn normalise_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub fn icon_names() -> impl Iterator<Item = &'static str> {
    ICONS.iter().map(|(name, _)| *name)
}
