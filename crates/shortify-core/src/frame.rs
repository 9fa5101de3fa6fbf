// crates/shortify-core/src/frame.rs
//
// RgbFrame: a packed RGB24 byte buffer with no stride padding — each row is
// exactly width * 3 bytes. shortify-media strips FFmpeg strides on the way
// in and re-applies them on the way out, so everything in this crate can use
// plain row arithmetic.

/// One packed RGB24 frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbFrame {
    pub width:  u32,
    pub height: u32,
    /// `width * height * 3` bytes, row-major, no padding.
    pub data:   Vec<u8>,
}

pub const CHANNELS: usize = 3;

impl RgbFrame {
    /// Allocate a black frame.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * CHANNELS],
        }
    }

    /// Wrap an existing packed buffer.
    ///
    /// Panics in debug builds if the buffer length does not match the
    /// dimensions — a stride was probably left in.
    pub fn from_packed(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * CHANNELS,
            "from_packed: buffer length {} ≠ expected for {}×{}",
            data.len(), width, height,
        );
        Self { width, height, data }
    }

    /// Bytes per row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Borrow row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let rb = self.row_bytes();
        &self.data[y * rb..(y + 1) * rb]
    }

    /// Mutably borrow row `y`.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let rb = self.row_bytes();
        &mut self.data[y * rb..(y + 1) * rb]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_frame_is_all_zero() {
        let f = RgbFrame::black(4, 3);
        assert_eq!(f.data.len(), 4 * 3 * 3);
        assert!(f.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn row_accessors_line_up() {
        let mut f = RgbFrame::black(2, 2);
        f.row_mut(1).fill(7);
        assert!(f.row(0).iter().all(|&b| b == 0));
        assert!(f.row(1).iter().all(|&b| b == 7));
        assert_eq!(f.row(1).len(), 6);
    }
}
