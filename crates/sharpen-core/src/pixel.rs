//! Packed ARGB pixel helpers.
//!
//! Pixels travel through the pipeline as a single `u32` per pixel:
//!
//! ```text
//! bit  31      24 23      16 15       8 7        0
//!      [ alpha  ] [  red   ] [ green  ] [  blue  ]
//! ```
//!
//! The helpers here only pack and unpack channels. No color-space
//! interpretation happens at this layer.
//!
//! # Example
//!
//! ```
//! use sharpen_core::pixel::{pack_argb, unpack_argb, red};
//!
//! let p = pack_argb(255, 200, 100, 50);
//! assert_eq!(p, 0xFFC8_6432);
//! assert_eq!(red(p), 200);
//! assert_eq!(unpack_argb(p), [255, 200, 100, 50]);
//! ```

/// Mask selecting the alpha byte of a packed pixel.
pub const ALPHA_MASK: u32 = 0xFF00_0000;

/// Fully opaque black.
pub const OPAQUE_BLACK: u32 = ALPHA_MASK;

/// Bit offsets of the A, R, G, B channels, in that order.
pub const CHANNEL_SHIFTS: [u32; 4] = [24, 16, 8, 0];

/// Packs four 8-bit channels into one pixel.
#[inline]
pub const fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Splits a pixel into `[a, r, g, b]`.
#[inline]
pub const fn unpack_argb(p: u32) -> [u8; 4] {
    [alpha(p), red(p), green(p), blue(p)]
}

/// Alpha channel of a packed pixel.
#[inline]
pub const fn alpha(p: u32) -> u8 {
    (p >> 24) as u8
}

/// Red channel of a packed pixel.
#[inline]
pub const fn red(p: u32) -> u8 {
    (p >> 16) as u8
}

/// Green channel of a packed pixel.
#[inline]
pub const fn green(p: u32) -> u8 {
    (p >> 8) as u8
}

/// Blue channel of a packed pixel.
#[inline]
pub const fn blue(p: u32) -> u8 {
    p as u8
}

/// Clamps an integer channel value into `[0, 255]`.
///
/// Values are saturated, never wrapped: `300 -> 255`, `-4 -> 0`.
#[inline]
pub const fn clamp_channel(v: i32) -> u8 {
    if v < 0 {
        0
    } else if v > 255 {
        255
    } else {
        v as u8
    }
}

/// Converts a pixel into interleaved `[r, g, b, a]` bytes.
#[inline]
pub const fn to_rgba(p: u32) -> [u8; 4] {
    [red(p), green(p), blue(p), alpha(p)]
}

/// Builds a pixel from interleaved `[r, g, b, a]` bytes.
#[inline]
pub const fn from_rgba(px: [u8; 4]) -> u32 {
    pack_argb(px[3], px[0], px[1], px[2])
}
