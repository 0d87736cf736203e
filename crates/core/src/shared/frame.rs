use ndarray::{ArrayView3, ArrayViewMut3};

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Owned by exactly one processing cycle at a time; annotation mutates it
/// in place and ownership moves to the display sink at handoff.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
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

    /// Bytes per row. Rows are packed; there is no padding.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// Capture-order frame number.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Shrinks the frame in place by an integer factor (nearest neighbor).
    ///
    /// A factor of 1 is a no-op. The factor comes from configuration and
    /// trades detection accuracy for per-cycle cost.
    pub fn downscale(&mut self, factor: u32) {
        if factor <= 1 {
            return;
        }
        let new_w = (self.width / factor).max(1);
        let new_h = (self.height / factor).max(1);
        let ch = self.channels as usize;
        let src_stride = self.stride();

        let mut out = vec![0u8; new_w as usize * new_h as usize * ch];
        for y in 0..new_h as usize {
            let src_y = (y as u32 * factor).min(self.height - 1) as usize;
            for x in 0..new_w as usize {
                let src_x = (x as u32 * factor).min(self.width - 1) as usize;
                let src = src_y * src_stride + src_x * ch;
                let dst = (y * new_w as usize + x) * ch;
                out[dst..dst + ch].copy_from_slice(&self.data[src..src + ch]);
            }
        }

        self.data = out;
        self.width = new_w;
        self.height = new_h;
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
