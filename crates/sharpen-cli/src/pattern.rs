//! Synthetic probe images.

use crate::Pattern;
use anyhow::{Context, Result};
use sharpen_core::PixelBuffer;
use sharpen_core::pixel::pack_argb;

const CELL: u32 = 8;

impl Pattern {
    /// Renders the pattern at `width` x `height`.
    pub fn render(self, width: u32, height: u32, seed: u32) -> Result<PixelBuffer> {
        let buffer = match self {
            Pattern::Checker => PixelBuffer::from_fn(width, height, |x, y| {
                if (x / CELL + y / CELL) % 2 == 0 {
                    pack_argb(255, 40, 40, 40)
                } else {
                    pack_argb(255, 215, 215, 215)
                }
            }),
            Pattern::Gradient => {
                let sx = width.saturating_sub(1).max(1);
                let sy = height.saturating_sub(1).max(1);
                PixelBuffer::from_fn(width, height, |x, y| {
                    let r = (x as u64 * 255 / sx as u64) as u8;
                    let g = (y as u64 * 255 / sy as u64) as u8;
                    pack_argb(255, r, g, 128)
                })
            }
            Pattern::Noise => {
                let mut state = seed.max(1);
                PixelBuffer::from_fn(width, height, |_, _| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    state
                })
            }
        };
        buffer.with_context(|| format!("Cannot build {width}x{height} {self:?} image"))
    }
}
