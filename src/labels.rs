// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Dense target assembly.
//!
//! The [`LabelAssembler`] turns augmented keypoints into heatmap and part-affinity tensors
//! with their validity masks, at one stride ([`TargetMode::SingleScale`]) or several
//! ([`TargetMode::MultiScale`]). Tensor layout is `(channels, height / stride, width / stride)`.
//!
//! | Tensor | Channels |
//! |--------|----------|
//! | heatmap / heatmap mask | one per landmark, plus a trailing "any landmark" channel |
//! | paf / paf mask | two per limb (x then y component) |

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use ndarray::{s, Array2, Array3, Axis};

use crate::category::Category;
use crate::config::{LabelConfig, TargetMode};
use crate::error::Result;
use crate::heatmap::{fill_background, grid_size, put_gaussian};
use crate::keypoint::{present_bounds, Keypoint};
use crate::paf::put_vector;
use crate::visibility::ChannelPlan;

/// Heatmaps and masks at one stride.
#[derive(Debug, Clone)]
pub struct HeatmapTargets {
    /// Grid stride in input pixels.
    pub stride: usize,
    /// `(C + 1, H, W)` confidence maps; the last channel is the max of the others.
    pub heatmap: Array3<f32>,
    /// `(C + 1, H, W)` validity mask; the last channel is always 1.
    pub mask: Array3<f32>,
}

/// Part-affinity fields and masks at one stride.
#[derive(Debug, Clone)]
pub struct PafTargets {
    /// Grid stride in input pixels.
    pub stride: usize,
    /// `(2L, H, W)` unit-vector fields.
    pub paf: Array3<f32>,
    /// `(2L, H, W)` validity mask.
    pub mask: Array3<f32>,
}

/// All targets of one sample.
#[derive(Debug, Clone)]
pub enum Targets {
    /// Heatmaps and PAFs at the single-scale stride.
    SingleScale {
        /// Heatmap targets.
        heatmap: HeatmapTargets,
        /// PAF targets.
        paf: PafTargets,
    },
    /// One heatmap set per configured stride, in stride order.
    MultiScale(Vec<HeatmapTargets>),
}

impl Targets {
    /// Heatmap sets, one per stride.
    #[must_use]
    pub fn heatmaps(&self) -> Vec<&HeatmapTargets> {
        match self {
            Self::SingleScale { heatmap, .. } => vec![heatmap],
            Self::MultiScale(sets) => sets.iter().collect(),
        }
    }

    /// Flatten into the tensor order consumed by training.
    ///
    /// Single-scale: `heatmap, paf, heatmap_mask, paf_mask`.
    /// Multi-scale: `heatmap, mask` for each stride in turn.
    #[must_use]
    pub fn into_tensors(self) -> Vec<Array3<f32>> {
        match self {
            Self::SingleScale { heatmap, paf } => {
                vec![heatmap.heatmap, paf.paf, heatmap.mask, paf.mask]
            }
            Self::MultiScale(sets) => sets
                .into_iter()
                .flat_map(|set| [set.heatmap, set.mask])
                .collect(),
        }
    }
}

/// Builds dense targets from augmented keypoints.
#[derive(Debug, Clone, Copy)]
pub struct LabelAssembler<'a> {
    config: &'a LabelConfig,
}

impl<'a> LabelAssembler<'a> {
    /// Create an assembler borrowing the configuration.
    #[must_use]
    pub const fn new(config: &'a LabelConfig) -> Self {
        Self { config }
    }

    /// Build the targets selected by [`LabelConfig::mode`].
    ///
    /// # Arguments
    ///
    /// * `height`, `width` - Size of the augmented image in pixels.
    /// * `category` - Category of the sample.
    /// * `keypoints` - Keypoints in augmented image coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the category is not in the landmark table or the keypoint count
    /// does not match the vocabulary.
    pub fn assemble(
        &self,
        height: u32,
        width: u32,
        category: Category,
        keypoints: &[Keypoint],
    ) -> Result<Targets> {
        let config = self.config;
        let plan = ChannelPlan::resolve(config, category, keypoints)?;

        Ok(match config.mode {
            TargetMode::SingleScale => Targets::SingleScale {
                heatmap: self.heatmaps(&plan, keypoints, height, width, config.stride),
                paf: self.pafs(&plan, keypoints, height, width, config.stride),
            },
            TargetMode::MultiScale => Targets::MultiScale(
                config
                    .multi_scale_strides
                    .iter()
                    .map(|&stride| self.heatmaps(&plan, keypoints, height, width, stride))
                    .collect(),
            ),
        })
    }

    /// Heatmaps and masks at `stride` for a resolved plan.
    #[must_use]
    pub fn heatmaps(
        &self,
        plan: &ChannelPlan,
        keypoints: &[Keypoint],
        height: u32,
        width: u32,
        stride: usize,
    ) -> HeatmapTargets {
        let (grid_h, grid_w) = grid_size(height, width, stride);
        let channels = keypoints.len() + 1;
        let mut heatmap = Array3::<f32>::zeros((channels, grid_h, grid_w));
        let mut mask = Array3::<f32>::zeros((channels, grid_h, grid_w));

        for i in plan.active_landmarks() {
            let k = &keypoints[i];
            mask.index_axis_mut(Axis(0), i).fill(1.0);
            put_gaussian(
                &mut heatmap.index_axis_mut(Axis(0), i),
                k.x,
                k.y,
                stride,
                self.config.sigma,
            );
        }
        fill_background(&mut heatmap);
        mask.index_axis_mut(Axis(0), channels - 1).fill(1.0);

        HeatmapTargets {
            stride,
            heatmap,
            mask,
        }
    }

    /// Part-affinity fields and masks at `stride` for a resolved plan.
    #[must_use]
    pub fn pafs(
        &self,
        plan: &ChannelPlan,
        keypoints: &[Keypoint],
        height: u32,
        width: u32,
        stride: usize,
    ) -> PafTargets {
        let (grid_h, grid_w) = grid_size(height, width, stride);
        let channels = 2 * self.config.limbs.len();
        let mut paf = Array3::<f32>::zeros((channels, grid_h, grid_w));
        let mut mask = Array3::<f32>::zeros((channels, grid_h, grid_w));

        for l in plan.active_limbs() {
            let (a, b) = self.config.limbs[l];
            let (ka, kb) = (&keypoints[a], &keypoints[b]);

            let (mut channel_x, mut channel_y) = paf
                .slice_mut(s![2 * l..2 * l + 2, .., ..])
                .split_at(Axis(0), 1);
            put_vector(
                &mut channel_x.index_axis_mut(Axis(0), 0),
                &mut channel_y.index_axis_mut(Axis(0), 0),
                (ka.x, ka.y),
                (kb.x, kb.y),
                stride,
                self.config.paf_thickness,
            );
            // zero-length limbs stay supervised with zero vectors
            mask.slice_mut(s![2 * l..2 * l + 2, .., ..]).fill(1.0);
        }

        PafTargets { stride, paf, mask }
    }
}

/// Binary `(height, width)` map covering the bounding box of the present keypoints.
///
/// The box is clamped to the image; the right and bottom edges are exclusive.
///
/// # Errors
///
/// Returns [`crate::TargetError::DegenerateKeypoints`] if no keypoint is present.
pub fn object_mask(width: u32, height: u32, keypoints: &[Keypoint]) -> Result<Array2<f32>> {
    let (xmin, ymin, xmax, ymax) = present_bounds(keypoints)?;
    let (w, h) = (width as f32, height as f32);
    let x0 = xmin.clamp(0.0, w) as usize;
    let x1 = xmax.clamp(0.0, w) as usize;
    let y0 = ymin.clamp(0.0, h) as usize;
    let y1 = ymax.clamp(0.0, h) as usize;

    let mut mask = Array2::zeros((height as usize, width as usize));
    if x0 < x1 && y0 < y1 {
        mask.slice_mut(s![y0..y1, x0..x1]).fill(1.0);
    }
    Ok(mask)
}
