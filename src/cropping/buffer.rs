use crate::error::CropError;

/// An owned rectangular pixel buffer with interleaved channels.
///
/// The buffer always holds exactly `width * height * channels` bytes and never
/// aliases another buffer's storage: every crop or copy is a fresh allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled buffer.
    pub fn blank(width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            data: vec![0u8; len],
        }
    }

    /// Wrap decoded pixel data, verifying it matches the stated dimensions.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
    ) -> Result<Self, CropError> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(CropError::BufferSize {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Channel bytes of the pixel at `(x, y)`.
    ///
    /// Panics if the coordinate is outside the buffer.
    #[allow(dead_code)]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        assert!(x < self.width && y < self.height);
        let ch = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * ch;
        &self.data[start..start + ch]
    }

    /// Extract the window at `(x, y)` with size `win_w`x`win_h`.
    ///
    /// The result is a new buffer of the canvas size (window size when no
    /// canvas is given) with the window centered on it. Source pixels outside
    /// the image are skipped, leaving the zero fill or the background bytes in
    /// place; out-of-bounds geometry is never an error. A supplied background
    /// is consumed and returned as the composited result, so it must match the
    /// canvas dimensions and channel count.
    pub fn crop_rect(
        &self,
        x: i64,
        y: i64,
        win_w: u32,
        win_h: u32,
        background: Option<PixelBuffer>,
        canvas: Option<(u32, u32)>,
    ) -> Result<PixelBuffer, CropError> {
        self.crop_window(x, y, win_w, win_h, background, canvas, false)
    }

    /// Like [`crop_rect`](Self::crop_rect), but only copies pixels inside the
    /// ellipse inscribed in the window rectangle. Pixels outside the ellipse
    /// are left as fill, exactly like out-of-bounds pixels.
    pub fn crop_ellipse(
        &self,
        x: i64,
        y: i64,
        win_w: u32,
        win_h: u32,
        background: Option<PixelBuffer>,
        canvas: Option<(u32, u32)>,
    ) -> Result<PixelBuffer, CropError> {
        self.crop_window(x, y, win_w, win_h, background, canvas, true)
    }

    fn crop_window(
        &self,
        x: i64,
        y: i64,
        win_w: u32,
        win_h: u32,
        background: Option<PixelBuffer>,
        canvas: Option<(u32, u32)>,
        elliptical: bool,
    ) -> Result<PixelBuffer, CropError> {
        let (canvas_w, canvas_h) = canvas.unwrap_or((win_w, win_h));

        let mut out = match background {
            Some(bg) => {
                if bg.width != canvas_w || bg.height != canvas_h || bg.channels != self.channels {
                    return Err(CropError::BackgroundMismatch {
                        background_width: bg.width,
                        background_height: bg.height,
                        background_channels: bg.channels,
                        canvas_width: canvas_w,
                        canvas_height: canvas_h,
                        channels: self.channels,
                    });
                }
                bg
            }
            None => PixelBuffer::blank(canvas_w, canvas_h, self.channels),
        };

        // The window sits centered on the canvas; a canvas smaller than the
        // window clips it.
        let offset_x = (canvas_w as i64 - win_w as i64) / 2;
        let offset_y = (canvas_h as i64 - win_h as i64) / 2;

        let ch = self.channels as usize;
        let src_w = self.width as i64;
        let src_h = self.height as i64;
        let dst_w = canvas_w as i64;
        let dst_h = canvas_h as i64;
        let rx = win_w as f64 / 2.0;
        let ry = win_h as f64 / 2.0;

        for row in 0..win_h as i64 {
            let src_y = y + row;
            if src_y < 0 || src_y >= src_h {
                continue;
            }
            let dst_y = offset_y + row;
            if dst_y < 0 || dst_y >= dst_h {
                continue;
            }

            if elliptical {
                let dy = row as f64 + 0.5 - ry;
                for col in 0..win_w as i64 {
                    let dx = col as f64 + 0.5 - rx;
                    if (dx / rx).powi(2) + (dy / ry).powi(2) > 1.0 {
                        continue;
                    }
                    let src_x = x + col;
                    if src_x < 0 || src_x >= src_w {
                        continue;
                    }
                    let dst_x = offset_x + col;
                    if dst_x < 0 || dst_x >= dst_w {
                        continue;
                    }
                    let src_at = (src_y * src_w + src_x) as usize * ch;
                    let dst_at = (dst_y * dst_w + dst_x) as usize * ch;
                    out.data[dst_at..dst_at + ch].copy_from_slice(&self.data[src_at..src_at + ch]);
                }
            } else {
                // Whole visible span of this row in one copy.
                let col_lo = 0.max(-x).max(-offset_x);
                let col_hi = (win_w as i64).min(src_w - x).min(dst_w - offset_x);
                if col_lo >= col_hi {
                    continue;
                }
                let len = (col_hi - col_lo) as usize * ch;
                let src_at = (src_y * src_w + (x + col_lo)) as usize * ch;
                let dst_at = (dst_y * dst_w + (offset_x + col_lo)) as usize * ch;
                out.data[dst_at..dst_at + len].copy_from_slice(&self.data[src_at..src_at + len]);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        PixelBuffer::from_raw(width, height, 3, data).unwrap()
    }

    fn filled_buffer(width: u32, height: u32, channels: u8, value: u8) -> PixelBuffer {
        let len = width as usize * height as usize * channels as usize;
        PixelBuffer::from_raw(width, height, channels, vec![value; len]).unwrap()
    }

    #[test]
    fn test_blank_is_zeroed() {
        let buf = PixelBuffer::blank(4, 3, 2);
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.height(), 3);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.as_bytes().len(), 24);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        let result = PixelBuffer::from_raw(4, 4, 3, vec![0u8; 47]);
        assert!(matches!(result, Err(CropError::BufferSize { .. })));
    }

    #[test]
    fn test_interior_crop_matches_source() {
        let src = gradient_buffer(100, 100);
        let crop = src.crop_rect(40, 40, 20, 20, None, None).unwrap();

        assert_eq!(crop.width(), 20);
        assert_eq!(crop.height(), 20);
        assert_eq!(crop.channels(), 3);
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(crop.pixel(x, y), src.pixel(x + 40, y + 40));
            }
        }
    }

    #[test]
    fn test_crop_clips_at_edges() {
        let src = filled_buffer(10, 10, 3, 200);
        // Window half off the top-left corner.
        let crop = src.crop_rect(-5, -5, 10, 10, None, None).unwrap();

        assert_eq!(crop.width(), 10);
        assert_eq!(crop.height(), 10);
        for y in 0..10u32 {
            for x in 0..10u32 {
                let expected = if x >= 5 && y >= 5 { 200 } else { 0 };
                assert_eq!(crop.pixel(x, y), [expected; 3]);
            }
        }
    }

    #[test]
    fn test_crop_clips_past_far_edge() {
        let src = gradient_buffer(10, 10);
        let crop = src.crop_rect(8, 8, 4, 4, None, None).unwrap();

        assert_eq!(crop.pixel(0, 0), src.pixel(8, 8));
        assert_eq!(crop.pixel(1, 1), src.pixel(9, 9));
        // Past the source, fill stays zero.
        assert_eq!(crop.pixel(2, 2), [0, 0, 0]);
        assert_eq!(crop.pixel(3, 0), [0, 0, 0]);
    }

    #[test]
    fn test_fully_outside_window_is_blank() {
        let src = filled_buffer(10, 10, 1, 77);
        let crop = src.crop_rect(100, 100, 5, 5, None, None).unwrap();
        assert!(crop.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_window_centered_on_canvas() {
        let src = filled_buffer(10, 10, 3, 128);
        let crop = src.crop_rect(4, 4, 2, 2, None, Some((6, 6))).unwrap();

        assert_eq!(crop.width(), 6);
        assert_eq!(crop.height(), 6);
        for y in 0..6u32 {
            for x in 0..6u32 {
                let inside = (2..4).contains(&x) && (2..4).contains(&y);
                let expected = if inside { 128 } else { 0 };
                assert_eq!(crop.pixel(x, y), [expected; 3]);
            }
        }
    }

    #[test]
    fn test_background_shows_through() {
        let src = filled_buffer(10, 10, 3, 255);
        let bg = filled_buffer(8, 8, 3, 9);
        let crop = src.crop_rect(4, 4, 2, 2, Some(bg), Some((8, 8))).unwrap();

        assert_eq!(crop.pixel(0, 0), [9, 9, 9]);
        assert_eq!(crop.pixel(7, 7), [9, 9, 9]);
        assert_eq!(crop.pixel(3, 3), [255, 255, 255]);
        assert_eq!(crop.pixel(4, 4), [255, 255, 255]);
    }

    #[test]
    fn test_background_fills_clipped_pixels() {
        let src = filled_buffer(10, 10, 3, 255);
        let bg = filled_buffer(6, 6, 3, 42);
        // Window sticks out past the source's right/bottom edge.
        let crop = src.crop_rect(7, 7, 6, 6, Some(bg), None).unwrap();

        assert_eq!(crop.pixel(0, 0), [255, 255, 255]);
        assert_eq!(crop.pixel(2, 2), [255, 255, 255]);
        assert_eq!(crop.pixel(3, 3), [42, 42, 42]);
        assert_eq!(crop.pixel(5, 5), [42, 42, 42]);
    }

    #[test]
    fn test_background_mismatch_is_rejected() {
        let src = filled_buffer(10, 10, 3, 255);
        let bg = filled_buffer(5, 5, 3, 0);
        let result = src.crop_rect(0, 0, 4, 4, Some(bg), Some((8, 8)));
        assert!(matches!(result, Err(CropError::BackgroundMismatch { .. })));

        let bg = filled_buffer(8, 8, 1, 0);
        let result = src.crop_rect(0, 0, 4, 4, Some(bg), Some((8, 8)));
        assert!(matches!(result, Err(CropError::BackgroundMismatch { .. })));
    }

    #[test]
    fn test_ellipse_keeps_cardinals_drops_corners() {
        let src = filled_buffer(20, 20, 1, 255);
        let crop = src.crop_ellipse(2, 2, 8, 8, None, None).unwrap();

        // Midpoints of the four edges are inside the ellipse.
        assert_eq!(crop.pixel(0, 4), [255]);
        assert_eq!(crop.pixel(7, 4), [255]);
        assert_eq!(crop.pixel(4, 0), [255]);
        assert_eq!(crop.pixel(4, 7), [255]);
        // The four corners are outside.
        assert_eq!(crop.pixel(0, 0), [0]);
        assert_eq!(crop.pixel(7, 0), [0]);
        assert_eq!(crop.pixel(0, 7), [0]);
        assert_eq!(crop.pixel(7, 7), [0]);
        // Center is inside.
        assert_eq!(crop.pixel(4, 4), [255]);
    }

    #[test]
    fn test_ellipse_clips_against_source_bounds() {
        let src = filled_buffer(10, 10, 1, 255);
        // Ellipse window half off the left edge: left half clipped away.
        let crop = src.crop_ellipse(-4, 1, 8, 8, None, None).unwrap();
        assert_eq!(crop.pixel(1, 4), [0]);
        assert_eq!(crop.pixel(4, 4), [255]);
        assert_eq!(crop.pixel(7, 4), [255]);
    }

    #[test]
    fn test_crops_are_independent_allocations() {
        let src = gradient_buffer(30, 30);
        let a = src.crop_rect(5, 5, 10, 10, None, None).unwrap();
        let b = src.crop_rect(5, 5, 10, 10, None, None).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.as_bytes().as_ptr(), b.as_bytes().as_ptr());
        assert_ne!(a.as_bytes().as_ptr(), src.as_bytes().as_ptr());
    }

    #[test]
    fn test_single_channel_and_four_channel() {
        for channels in [1u8, 2, 3, 4] {
            let src = filled_buffer(6, 6, channels, 50);
            let crop = src.crop_rect(1, 1, 4, 4, None, None).unwrap();
            assert_eq!(crop.channels(), channels);
            assert_eq!(crop.as_bytes().len(), 16 * channels as usize);
            assert!(crop.as_bytes().iter().all(|&b| b == 50));
        }
    }

    #[test]
    fn test_zero_sized_window() {
        let src = gradient_buffer(10, 10);
        let crop = src.crop_rect(5, 5, 0, 0, None, None).unwrap();
        assert_eq!(crop.width(), 0);
        assert_eq!(crop.height(), 0);
        assert!(crop.as_bytes().is_empty());
    }

    #[test]
    fn test_canvas_smaller_than_window_clips_destination() {
        let src = gradient_buffer(20, 20);
        let crop = src.crop_rect(0, 0, 10, 10, None, Some((4, 4))).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 4);
        // Offset is (4 - 10) / 2 = -3, so canvas (0,0) maps to window (3,3).
        assert_eq!(crop.pixel(0, 0), src.pixel(3, 3));
        assert_eq!(crop.pixel(3, 3), src.pixel(6, 6));
    }
}
