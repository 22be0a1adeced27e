//! Frame preprocessing: RGB -> luma -> median filter -> inverted Otsu binarisation.
//!
//! The output marks marker material (dark on a light surface) as `255` and
//! everything else as `0`, ready for contour tracing.

use serde::{Deserialize, Serialize};

use crate::image::{GrayImage, GrayImageView, RgbFrame};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Preprocessing settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Side of the square median-filter aperture (odd).
    pub median_aperture: usize,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self { median_aperture: 9 }
    }
}

/// Convert an RGB frame to 8-bit luma (BT.601 weights, 14-bit fixed point).
pub fn grayscale(frame: &RgbFrame) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const ROUND: u32 = 1 << 13;

    let data = frame
        .data
        .chunks_exact(3)
        .map(|px| {
            let y = px[0] as u32 * R + px[1] as u32 * G + px[2] as u32 * B + ROUND;
            (y >> 14) as u8
        })
        .collect();
    GrayImage {
        width: frame.width,
        height: frame.height,
        data,
    }
}

/// Square median filter with replicated borders.
///
/// Uses a sliding 256-bin histogram per row, so the cost per pixel is linear
/// in the aperture side rather than its area.
pub fn median_blur(src: &GrayImageView<'_>, aperture: usize) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    let r = (aperture / 2) as isize;
    let side = 2 * r + 1;
    let rank = (side * side / 2) as u32;
    let cx = |x: isize| x.clamp(0, w as isize - 1) as usize;
    let cy = |y: isize| y.clamp(0, h as isize - 1) as usize;

    for y in 0..h {
        let rows: Vec<usize> = (-r..=r).map(|dy| cy(y as isize + dy) * w).collect();

        let mut hist = [0u32; 256];
        for &row in &rows {
            for dx in -r..=r {
                hist[src.data[row + cx(dx)] as usize] += 1;
            }
        }
        out.data[y * w] = median_from_hist(&hist, rank);

        for x in 1..w {
            let leaving = cx(x as isize - r - 1);
            let entering = cx(x as isize + r);
            for &row in &rows {
                hist[src.data[row + leaving] as usize] -= 1;
                hist[src.data[row + entering] as usize] += 1;
            }
            out.data[y * w + x] = median_from_hist(&hist, rank);
        }
    }

    out
}

#[inline]
fn median_from_hist(hist: &[u32; 256], rank: u32) -> u8 {
    let mut seen = 0u32;
    for (v, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > rank {
            return v as u8;
        }
    }
    255
}

/// Otsu threshold of an 8-bit image: the `t` maximising the between-class
/// variance of `{v <= t}` and `{v > t}`.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }

    let min_v = hist.iter().position(|&h| h > 0).unwrap_or(0) as u8;
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(255) as u8;
    if min_v == max_v {
        return min_v;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Inverted binary threshold: `v > thresh -> 0`, otherwise `255`.
pub fn threshold_inv(src: &GrayImageView<'_>, thresh: u8) -> GrayImage {
    GrayImage {
        width: src.width,
        height: src.height,
        data: src
            .data
            .iter()
            .map(|&v| if v > thresh { 0 } else { 255 })
            .collect(),
    }
}

/// Full preprocessing chain for one frame.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame, params), fields(width = frame.width, height = frame.height))
)]
pub fn binarize(frame: &RgbFrame, params: &PreprocessParams) -> GrayImage {
    let gray = grayscale(frame);
    let smooth = median_blur(&gray.view(), params.median_aperture);
    let t = otsu_threshold(&smooth.data);
    threshold_inv(&smooth.view(), t)
}
