//! Plain image containers and pixel rectangles.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Interleaved 8-bit RGB frame as delivered by a camera.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h*3
}

impl RgbFrame {
    /// Wrap a raw RGB buffer, checking its length.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        let expected = width.checked_mul(height)?.checked_mul(3)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Frame filled with a single color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Paint `rect` with `rgb`, ignoring the parts that fall outside the frame.
    pub fn fill_rect(&mut self, rect: PixelRect, rgb: [u8; 3]) {
        let x0 = rect.x.max(0) as usize;
        let y0 = rect.y.max(0) as usize;
        let x1 = (rect.right().max(0) as usize).min(self.width);
        let y1 = (rect.bottom().max(0) as usize).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let i = (y * self.width + x) * 3;
                self.data[i..i + 3].copy_from_slice(&rgb);
            }
        }
    }

    /// Copy out the pixels covered by `roi`.
    ///
    /// Returns `None` when the region is empty or not fully inside the frame.
    pub fn crop(&self, roi: &RegionOfInterest) -> Option<RgbFrame> {
        if !roi.fits_within(self.width, self.height) {
            return None;
        }
        let (x0, y0) = (roi.x0 as usize, roi.y0 as usize);
        let (w, h) = (roi.width() as usize, roi.height() as usize);
        let mut data = Vec::with_capacity(w * h * 3);
        for y in y0..y0 + h {
            let start = (y * self.width + x0) * 3;
            data.extend_from_slice(&self.data[start..start + w * 3]);
        }
        Some(RgbFrame {
            width: w,
            height: h,
            data,
        })
    }
}

/// Axis-aligned pixel rectangle in `(x, y, width, height)` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Corner-form rectangle `[x0, x1) x [y0, y1)` in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionOfInterest {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl RegionOfInterest {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn full_frame(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// True when the region is non-empty and lies inside a `width x height` frame.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        !self.is_empty()
            && self.x0 >= 0
            && self.y0 >= 0
            && i64::from(self.x1) <= width as i64
            && i64::from(self.y1) <= height as i64
    }

    /// Smallest region covering every rectangle, or `None` for an empty input.
    pub fn bounding<I>(rects: I) -> Option<Self>
    where
        I: IntoIterator<Item = PixelRect>,
    {
        rects.into_iter().fold(None, |acc, r| {
            let roi = Self::new(r.x, r.y, r.right(), r.bottom());
            Some(match acc {
                None => roi,
                Some(a) => Self::new(
                    a.x0.min(roi.x0),
                    a.y0.min(roi.y0),
                    a.x1.max(roi.x1),
                    a.y1.max(roi.y1),
                ),
            })
        })
    }

    /// Grow the region by `margin` pixels on every side.
    pub fn expanded(self, margin: i32) -> Self {
        Self::new(
            self.x0 - margin,
            self.y0 - margin,
            self.x1 + margin,
            self.y1 + margin,
        )
    }

    /// Clip the region to a `width x height` frame.
    pub fn clamped(self, width: usize, height: usize) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self::new(
            self.x0.clamp(0, w),
            self.y0.clamp(0, h),
            self.x1.clamp(0, w),
            self.y1.clamp(0, h),
        )
    }
}
