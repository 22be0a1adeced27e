//! Suzuki-Abe border following on binary images.
//!
//! Every outer border and every hole border is reported (no hierarchy), with
//! one point per boundary pixel in tracing order.

use nalgebra::Point2;

use crate::image::GrayImageView;

/// Offsets for the 8-neighbourhood, counter-clockwise starting at east.
const NEIGHBORHOOD: [[i32; 2]; 8] = [
    [1, 0],
    [1, -1],
    [0, -1],
    [-1, -1],
    [-1, 0],
    [-1, 1],
    [0, 1],
    [1, 1],
];

/// One traced border.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContourTrace {
    /// Boundary pixels in tracing order.
    pub points: Vec<Point2<i32>>,
    /// True if this border encloses a hole of another component.
    pub hole: bool,
}

/// Copy `src` into a zero-padded label buffer of size `(w + 2) * (h + 2)`,
/// mapping non-zero pixels to `1`.
fn padded_labels(src: &GrayImageView<'_>) -> Vec<i32> {
    let stride = src.width + 2;
    let mut dst = vec![0i32; stride * (src.height + 2)];
    for y in 0..src.height {
        let row = &src.data[y * src.width..(y + 1) * src.width];
        let out = &mut dst[(y + 1) * stride + 1..(y + 1) * stride + 1 + src.width];
        for (d, &s) in out.iter_mut().zip(row) {
            *d = i32::from(s != 0);
        }
    }
    dst
}

/// Flat index offsets for the 8-neighbourhood, duplicated so that a search
/// can run past index 7 without wrapping explicitly.
fn neighborhood_deltas(stride: isize) -> [isize; 16] {
    let mut deltas = [0isize; 16];
    for (i, [dx, dy]) in NEIGHBORHOOD.iter().enumerate() {
        let d = *dx as isize + *dy as isize * stride;
        deltas[i] = d;
        deltas[i + 8] = d;
    }
    deltas
}

#[inline]
fn offset(pos: usize, delta: isize) -> usize {
    (pos as isize + delta) as usize
}

/// Trace one border starting at `start`, labelling visited pixels with `nbd`.
fn follow_border(
    labels: &mut [i32],
    start: usize,
    nbd: i32,
    mut point: Point2<i32>,
    hole: bool,
    deltas: &[isize; 16],
) -> ContourTrace {
    let mut trace = ContourTrace {
        points: Vec::new(),
        hole,
    };

    // Search clockwise from the background neighbour that triggered the trace.
    let mut s: usize = if hole { 0 } else { 4 };
    let mut s_end = s;
    let mut first;
    loop {
        s = s.wrapping_sub(1) & 7;
        first = offset(start, deltas[s]);
        if labels[first] != 0 || s == s_end {
            break;
        }
    }

    if labels[first] == 0 {
        // Isolated pixel.
        labels[start] = -nbd;
        trace.points.push(point);
        return trace;
    }

    let mut current = start;
    loop {
        s_end = s;
        let mut next;
        loop {
            s += 1;
            next = offset(current, deltas[s]);
            if labels[next] != 0 {
                break;
            }
        }
        s &= 7;

        // The east neighbour was examined and found empty iff the
        // counter-clockwise search wrapped past it.
        if s.wrapping_sub(1) < s_end {
            labels[current] = -nbd;
        } else if labels[current] == 1 {
            labels[current] = nbd;
        }

        trace.points.push(point);
        point.x += NEIGHBORHOOD[s][0];
        point.y += NEIGHBORHOOD[s][1];

        if next == start && current == first {
            break;
        }

        current = next;
        s = (s + 4) & 7;
    }

    trace
}

/// Trace all borders of the non-zero regions in `binary`.
///
/// Tracing order is raster order of each border's starting pixel.
pub fn find_contours(binary: &GrayImageView<'_>) -> Vec<ContourTrace> {
    let (width, height) = (binary.width, binary.height);
    let mut traces = Vec::new();
    if width == 0 || height == 0 {
        return traces;
    }

    let stride = width + 2;
    let mut labels = padded_labels(binary);
    let deltas = neighborhood_deltas(stride as isize);

    let mut nbd = 1;
    let mut pos = stride + 1;
    for y in 0..height {
        for x in 0..width {
            let pix = labels[pos];
            if pix != 0 {
                let outer = pix == 1 && labels[pos - 1] == 0;
                let hole = !outer && pix >= 1 && labels[pos + 1] == 0;
                if outer || hole {
                    nbd += 1;
                    let start = Point2::new(x as i32, y as i32);
                    traces.push(follow_border(&mut labels, pos, nbd, start, hole, &deltas));
                }
            }
            pos += 1;
        }
        pos += 2;
    }

    traces
}
