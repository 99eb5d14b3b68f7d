// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Gaussian confidence heatmap rasterization.
//!
//! Grid cell `(gx, gy)` of a stride-`s` map samples the input-image position
//! `(gx * s + s / 2 - 0.5, gy * s + s / 2 - 0.5)`, i.e. the center of the `s x s` block it
//! covers. `sigma` is expressed in input pixels so the bump has the same physical extent at
//! every stride. Stamps combine with a per-pixel max, which keeps every value in `[0, 1]`.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use ndarray::{Array3, ArrayViewMut2, Axis};

/// Exponent above which a contribution is dropped (`exp(-4.6052) ≈ 0.01`).
const EXPONENT_CUTOFF: f32 = 4.6052;

/// Grid dimensions `(height, width)` of a stride-`stride` map over an image.
#[must_use]
pub const fn grid_size(height: u32, width: u32, stride: usize) -> (usize, usize) {
    (height as usize / stride, width as usize / stride)
}

/// Stamp a Gaussian bump centered at image position `(x, y)` into `channel`.
///
/// Only the cells within the cutoff radius are visited; cells outside the grid are
/// clamped away. Existing values are kept where they are larger.
///
/// # Arguments
///
/// * `channel` - Target `(H, W)` grid.
/// * `x`, `y` - Landmark position in input pixels.
/// * `stride` - Input pixels per grid cell.
/// * `sigma` - Standard deviation in input pixels.
pub fn put_gaussian(channel: &mut ArrayViewMut2<'_, f32>, x: f32, y: f32, stride: usize, sigma: f32) {
    debug_assert!(stride > 0 && sigma > 0.0);
    let (grid_h, grid_w) = channel.dim();
    if grid_h == 0 || grid_w == 0 {
        return;
    }

    let stride_f = stride as f32;
    let start = stride_f / 2.0 - 0.5;
    let radius = sigma * (2.0 * EXPONENT_CUTOFF).sqrt();

    let Some((gx0, gx1)) = cell_range(x - radius, x + radius, start, stride_f, grid_w) else {
        return;
    };
    let Some((gy0, gy1)) = cell_range(y - radius, y + radius, start, stride_f, grid_h) else {
        return;
    };

    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);
    for gy in gy0..=gy1 {
        let py = start + gy as f32 * stride_f;
        let dy2 = (py - y) * (py - y);
        for gx in gx0..=gx1 {
            let px = start + gx as f32 * stride_f;
            let exponent = ((px - x) * (px - x) + dy2) * inv_two_sigma2;
            if exponent > EXPONENT_CUTOFF {
                continue;
            }
            let cell = &mut channel[[gy, gx]];
            *cell = cell.max((-exponent).exp());
        }
    }
}

/// Inclusive cell index range whose sample positions fall in `[lo, hi]`, clamped to the grid.
fn cell_range(lo: f32, hi: f32, start: f32, stride: f32, len: usize) -> Option<(usize, usize)> {
    let first = ((lo - start) / stride).ceil().max(0.0);
    let last = ((hi - start) / stride).floor().min(len as f32 - 1.0);
    if !first.is_finite() || !last.is_finite() || first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

/// Fill the last channel with the per-pixel max of all other channels.
///
/// # Panics
///
/// Panics if `heatmap` has no channel.
pub fn fill_background(heatmap: &mut Array3<f32>) {
    let channels = heatmap.len_of(Axis(0));
    assert!(channels > 0, "heatmap needs at least the background channel");

    let (foreground, background) = heatmap.view_mut().split_at(Axis(0), channels - 1);
    let mut background = background.index_axis_move(Axis(0), 0);
    background.fill(0.0);
    for channel in foreground.outer_iter() {
        background.zip_mut_with(&channel, |b, &v| *b = b.max(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_grid_size() {
        assert_eq!(grid_size(256, 256, 8), (32, 32));
        assert_eq!(grid_size(100, 61, 16), (6, 3));
    }

    #[test]
    fn test_peak_at_landmark() {
        let mut map = Array2::<f32>::zeros((32, 32));
        // Cell (10, 12) samples image position (12*8 + 3.5, 10*8 + 3.5)
        put_gaussian(&mut map.view_mut(), 99.5, 83.5, 8, 7.0);
        assert!((map[[10, 12]] - 1.0).abs() < 1e-6);
        assert!(map[[10, 13]] < 1.0 && map[[10, 13]] > 0.0);
        // Far away cells untouched
        assert!(map[[0, 0]].abs() < f32::EPSILON);
        assert!(map.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_gaussian_value() {
        let mut map = Array2::<f32>::zeros((20, 20));
        put_gaussian(&mut map.view_mut(), 5.0, 5.0, 1, 2.0);
        // stride 1 samples at integer positions; one pixel away: exp(-1/8)
        assert!((map[[5, 6]] - (-1.0f32 / 8.0).exp()).abs() < 1e-6);
        // Beyond the cutoff radius (~6.07 px) nothing is written
        assert!(map[[5, 12]].abs() < f32::EPSILON);
    }

    #[test]
    fn test_overlap_uses_max() {
        let mut map = Array2::<f32>::zeros((16, 16));
        put_gaussian(&mut map.view_mut(), 8.0, 8.0, 1, 2.0);
        put_gaussian(&mut map.view_mut(), 9.0, 8.0, 1, 2.0);
        assert!((map[[8, 8]] - 1.0).abs() < 1e-6);
        assert!((map[[8, 9]] - 1.0).abs() < 1e-6);
        assert!(map.iter().all(|&v| v <= 1.0));
    }

    #[test]
    fn test_off_grid_landmark() {
        let mut map = Array2::<f32>::zeros((8, 8));
        put_gaussian(&mut map.view_mut(), -500.0, 20.0, 4, 7.0);
        assert!(map.iter().all(|&v| v == 0.0));

        // Partially outside: the visible tail is still written
        put_gaussian(&mut map.view_mut(), -4.0, 10.0, 4, 7.0);
        assert!(map[[2, 0]] > 0.0);
    }

    #[test]
    fn test_fill_background() {
        let mut heatmap = Array3::<f32>::zeros((3, 4, 4));
        heatmap[[0, 1, 1]] = 0.4;
        heatmap[[1, 1, 1]] = 0.9;
        heatmap[[1, 2, 3]] = 0.3;
        heatmap[[2, 0, 0]] = 0.7; // stale value is overwritten
        fill_background(&mut heatmap);
        assert!((heatmap[[2, 1, 1]] - 0.9).abs() < 1e-6);
        assert!((heatmap[[2, 2, 3]] - 0.3).abs() < 1e-6);
        assert!(heatmap[[2, 0, 0]].abs() < f32::EPSILON);
    }
}
