/// One RGB triplet as it arrives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Fixed-capacity pixel store shared by the packet source (writer), the
/// timing logic (clearer) and the renderer (reader).
///
/// Pixels are kept as raw wire bytes, three per pixel, so a datagram payload
/// can be copied in without conversion. The capacity is set at construction
/// and never changes: oversized writes are clamped, not grown.
pub struct PixelBuffer {
    bytes: Box<[u8]>,
}

impl PixelBuffer {
    /// Creates an all-black buffer holding `capacity` pixels.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity * 3].into_boxed_slice(),
        }
    }

    /// Number of pixels the buffer holds.
    pub fn capacity(&self) -> usize {
        self.bytes.len() / 3
    }

    /// Capacity in bytes (`capacity * 3`).
    pub fn byte_capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Copies `data` byte-for-byte starting at pixel 0.
    ///
    /// Returns the number of bytes copied, at most [`Self::byte_capacity`].
    /// Pixels past the copied range keep their previous values.
    pub fn write_from(&mut self, data: &[u8]) -> usize {
        let len = data.len().min(self.bytes.len());
        self.bytes[..len].copy_from_slice(&data[..len]);
        len
    }

    /// Pixel at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<Rgb> {
        let chunk = self.bytes.get(index * 3..index * 3 + 3)?;
        Some(Rgb::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Sets the pixel at `index`; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, color: Rgb) {
        if let Some(chunk) = self.bytes.get_mut(index * 3..index * 3 + 3) {
            chunk.copy_from_slice(&[color.r, color.g, color.b]);
        }
    }

    /// Blanks every pixel.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.bytes.chunks_exact(3).map(|c| Rgb::new(c[0], c[1], c[2]))
    }
}
