//! 8×8 icon bitmaps for the LED matrix.
//!
//! One byte per row, top row first, bit 7 is the leftmost column.  The
//! controller selects an icon by its index in [`ICONS`].

pub struct Icon {
    pub name: &'static str,
    pub rows: [u8; 8],
}

#[rustfmt::skip]
pub static ICONS: [Icon; 19] = [
    Icon { name: "account-login",  rows: [0x0F, 0x09, 0x29, 0xF9, 0x29, 0x09, 0x0F, 0x00] },
    Icon { name: "ban",            rows: [0x3C, 0x42, 0xA1, 0x91, 0x89, 0x85, 0x42, 0x3C] },
    Icon { name: "battery-empty",  rows: [0x00, 0xFE, 0x82, 0x83, 0x83, 0x82, 0xFE, 0x00] },
    Icon { name: "battery-full",   rows: [0x00, 0xFE, 0xFE, 0xFF, 0xFF, 0xFE, 0xFE, 0x00] },
    Icon { name: "bell",           rows: [0x18, 0x3C, 0x3C, 0x3C, 0x7E, 0xFF, 0x00, 0x18] },
    Icon { name: "calendar",       rows: [0x24, 0xFF, 0x81, 0xA5, 0x81, 0xA5, 0x81, 0xFF] },
    Icon { name: "camera-slr",     rows: [0x00, 0x3C, 0xFF, 0xC3, 0xDB, 0xC3, 0xFF, 0x00] },
    Icon { name: "clock",          rows: [0x3C, 0x42, 0x91, 0x91, 0x9D, 0x81, 0x42, 0x3C] },
    Icon { name: "cloudy",         rows: [0x00, 0x0C, 0x32, 0x42, 0x81, 0x81, 0x7E, 0x00] },
    Icon { name: "dollar",         rows: [0x10, 0x7C, 0x90, 0x7C, 0x12, 0x7C, 0x10, 0x00] },
    Icon { name: "envelope",       rows: [0x00, 0xFF, 0xC3, 0xA5, 0x99, 0x81, 0xFF, 0x00] },
    Icon { name: "eye",            rows: [0x00, 0x3C, 0x42, 0x99, 0x99, 0x42, 0x3C, 0x00] },
    Icon { name: "heart",          rows: [0x00, 0x66, 0xFF, 0xFF, 0x7E, 0x3C, 0x18, 0x00] },
    Icon { name: "home",           rows: [0x18, 0x3C, 0x7E, 0xFF, 0x42, 0x5A, 0x5A, 0x7E] },
    Icon { name: "lock-locked",    rows: [0x3C, 0x42, 0x42, 0xFF, 0xFF, 0xE7, 0xFF, 0xFF] },
    Icon { name: "lock-unlocked",  rows: [0x3C, 0x42, 0x40, 0xFF, 0xFF, 0xE7, 0xFF, 0xFF] },
    Icon { name: "rain",           rows: [0x3C, 0x42, 0x81, 0x7E, 0x00, 0x49, 0x92, 0x24] },
    Icon { name: "sun",            rows: [0x91, 0x42, 0x18, 0x3D, 0xBC, 0x18, 0x42, 0x89] },
    Icon { name: "warning",        rows: [0x18, 0x18, 0x3C, 0x24, 0x66, 0x42, 0xDB, 0xFF] },
];

pub fn icon(index: u8) -> Option<&'static Icon> {
    ICONS.get(usize::from(index))
}

pub fn find(name: &str) -> Option<u8> {
    ICONS.iter().position(|i| i.name == name).map(|i| i as u8)
}
