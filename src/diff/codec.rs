//! Image codec adapter.
//!
//! Converts between encoded image bytes (PNG on disk) and [`PixelGrid`], the
//! row-major RGBA buffer every other part of the crate works with. The grid
//! also carries a small drawing API used to build fixtures:
//! - `fill()` - Fill the entire grid with a color
//! - `draw_rect()` - Draw a filled rectangle
//! - `draw_text()` - Draw text using font8x8 glyphs
//! - `get_pixel()` / `set_pixel()` - Direct pixel access

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbaImage};
use std::io::Cursor;

use super::types::{Dimensions, VisualError, VisualResult};

/// Decoded image: width, height and `width * height * 4` RGBA bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    /// RGBA pixel buffer (row-major, 4 bytes per pixel)
    buffer: Vec<u8>,
}

/// Decode image bytes into a pixel grid
pub fn decode(bytes: &[u8]) -> VisualResult<PixelGrid> {
    PixelGrid::from_png_bytes(bytes)
}

/// Encode a pixel grid as PNG bytes
pub fn encode(grid: &PixelGrid) -> VisualResult<Vec<u8>> {
    grid.to_png()
}

impl PixelGrid {
    /// Create a new grid with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; width as usize * height as usize * 4];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a grid initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut grid = Self::new(width, height);
        grid.fill(color);
        grid
    }

    /// Load a grid from encoded image bytes
    pub fn from_png_bytes(data: &[u8]) -> VisualResult<Self> {
        if data.is_empty() {
            return Err(VisualError::Decode("empty image buffer".to_string()));
        }
        let img = image::load_from_memory(data)
            .map_err(|e| VisualError::Decode(format!("Failed to load image: {}", e)))?;
        Ok(Self::from_image(img.to_rgba8()))
    }

    pub(crate) fn from_image(img: RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            buffer: img.into_raw(),
        }
    }

    /// Load a grid from raw RGBA bytes
    pub fn from_raw_rgba(width: u32, height: u32, data: Vec<u8>) -> VisualResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(VisualError::Decode(format!(
                "Buffer size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            buffer: data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Fill the entire grid with a color
    pub fn fill(&mut self, color: [u8; 4]) {
        for chunk in self.buffer.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the grid
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 4], bg: [u8; 4]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 4], bg: [u8; 4]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            if py >= self.height {
                break;
            }
            for bit in 0..8 {
                let px = x + bit;
                if px >= self.width {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                let is_fg = (row >> bit) & 1 == 1;
                self.set_pixel(px, py, if is_fg { fg } else { bg });
            }
        }
    }

    /// Get the color of a pixel; out-of-bounds reads return transparent black
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = self.offset(x, y);
        [
            self.buffer[idx],
            self.buffer[idx + 1],
            self.buffer[idx + 2],
            self.buffer[idx + 3],
        ]
    }

    /// Set the color of a pixel; out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.offset(x, y);
        self.buffer[idx..idx + 4].copy_from_slice(&color);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Get the raw RGBA buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Convert to an image buffer
    pub fn to_image(&self) -> VisualResult<RgbaImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| VisualError::Encode("buffer size does not match dimensions".to_string()))
    }

    /// Encode the grid as PNG bytes
    pub fn to_png(&self) -> VisualResult<Vec<u8>> {
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| VisualError::Encode(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    #[test]
    fn test_pixel_grid_new() {
        let grid = PixelGrid::new(100, 50);
        assert_eq!(grid.dimensions(), Dimensions::new(100, 50));
        assert_eq!(grid.as_bytes().len(), 100 * 50 * 4);
        assert_eq!(grid.get_pixel(99, 49), [0, 0, 0, 0]);
    }

    #[test]
    fn test_draw_rect_clips() {
        let mut grid = PixelGrid::with_color(20, 20, BLACK);
        grid.draw_rect(15, 15, 10, 10, RED);

        assert_eq!(grid.get_pixel(14, 14), BLACK);
        assert_eq!(grid.get_pixel(15, 15), RED);
        assert_eq!(grid.get_pixel(19, 19), RED);
    }

    #[test]
    fn test_draw_text_has_foreground() {
        let mut grid = PixelGrid::with_color(80, 16, BLACK);
        grid.draw_text(0, 0, "Hi", [255, 255, 255, 255], BLACK);

        let has_white = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .any(|(x, y)| grid.get_pixel(x, y) == [255, 255, 255, 255]);
        assert!(has_white, "Character 'H' should have some foreground pixels");
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let mut grid = PixelGrid::with_color(32, 32, [100, 150, 200, 255]);
        grid.draw_rect(8, 8, 16, 16, RED);
        grid.set_pixel(0, 31, [10, 20, 30, 128]);

        let png = encode(&grid).unwrap();
        assert_eq!(&png[0..4], &[0x89, 0x50, 0x4E, 0x47]);

        let decoded = decode(&png).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not a png"), Err(VisualError::Decode(_))));
        assert!(matches!(decode(&[]), Err(VisualError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let png = encode(&PixelGrid::with_color(16, 16, RED)).unwrap();
        let truncated = &png[..png.len() / 2];
        assert!(matches!(decode(truncated), Err(VisualError::Decode(_))));
    }

    #[test]
    fn test_from_raw_rgba_checks_length() {
        assert!(PixelGrid::from_raw_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(PixelGrid::from_raw_rgba(2, 2, vec![0; 12]).is_err());
    }
}
