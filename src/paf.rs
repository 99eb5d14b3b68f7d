// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Part-affinity field rasterization.
//!
//! A limb is the segment between two landmarks. Every grid cell that projects onto the
//! segment and lies within `thickness` cells of it receives the unit direction vector of the
//! limb. Endpoints are mapped to the grid by dividing by the stride. A cell stamped twice
//! keeps the last written vector.
//!
//! Cell `g` stands for input position `g * stride`, not the block center
//! `g * stride + stride / 2 - 0.5` that [`crate::heatmap`] samples.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use ndarray::ArrayViewMut2;

/// Segments shorter than this (in grid cells) are treated as degenerate.
const MIN_LIMB_LENGTH: f32 = 1e-6;

/// Stamp the unit vector from `start` to `end` into `channel_x`/`channel_y`.
///
/// # Arguments
///
/// * `channel_x`, `channel_y` - Target `(H, W)` grids for the vector components.
/// * `start`, `end` - Limb endpoints in input pixels.
/// * `stride` - Input pixels per grid cell.
/// * `thickness` - Maximum perpendicular distance to the segment, in grid cells.
///
/// # Returns
///
/// Number of cells written. Zero-length limbs write nothing.
pub fn put_vector(
    channel_x: &mut ArrayViewMut2<'_, f32>,
    channel_y: &mut ArrayViewMut2<'_, f32>,
    start: (f32, f32),
    end: (f32, f32),
    stride: usize,
    thickness: f32,
) -> usize {
    debug_assert!(stride > 0 && thickness > 0.0);
    debug_assert_eq!(channel_x.dim(), channel_y.dim());
    let (grid_h, grid_w) = channel_x.dim();
    if grid_h == 0 || grid_w == 0 {
        return 0;
    }

    let stride_f = stride as f32;
    let (ax, ay) = (start.0 / stride_f, start.1 / stride_f);
    let (bx, by) = (end.0 / stride_f, end.1 / stride_f);

    let (dx, dy) = (bx - ax, by - ay);
    let length = dx.hypot(dy);
    if !(length > MIN_LIMB_LENGTH) {
        return 0;
    }
    let (ux, uy) = (dx / length, dy / length);

    let Some((gx0, gx1)) = window(ax.min(bx) - thickness, ax.max(bx) + thickness, grid_w) else {
        return 0;
    };
    let Some((gy0, gy1)) = window(ay.min(by) - thickness, ay.max(by) + thickness, grid_h) else {
        return 0;
    };

    let mut written = 0;
    for gy in gy0..=gy1 {
        let vy = gy as f32 - ay;
        for gx in gx0..=gx1 {
            let vx = gx as f32 - ax;
            let along = vx * ux + vy * uy;
            if along < 0.0 || along > length {
                continue;
            }
            let across = (vx * uy - vy * ux).abs();
            if across > thickness {
                continue;
            }
            channel_x[[gy, gx]] = ux;
            channel_y[[gy, gx]] = uy;
            written += 1;
        }
    }
    written
}

/// Inclusive cell range covering `[lo, hi]`, clamped to `[0, len)`.
fn window(lo: f32, hi: f32, len: usize) -> Option<(usize, usize)> {
    let first = lo.floor().max(0.0);
    let last = hi.ceil().min(len as f32 - 1.0);
    if !first.is_finite() || !last.is_finite() || first > last {
        return None;
    }
    Some((first as usize, last as usize))
}
