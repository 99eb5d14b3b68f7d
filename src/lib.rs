// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Keypoint Training Targets
//!
//! Training-sample preparation for bottom-up keypoint estimation, written in Rust.
//! Given an image and its landmark annotations, the library applies a geometric
//! augmentation that moves image and keypoints together, then synthesizes the dense
//! supervision a pose network regresses: Gaussian confidence heatmaps, part-affinity
//! fields (PAFs) and their validity masks.
//!
//! ## Features
//!
//! - **Co-registered augmentation** - Flip, rotation, scale and crop applied to raster and keypoints through one composed affine
//! - **Heatmaps** - Per-landmark Gaussian maps plus a background channel, at any stride
//! - **Part-affinity fields** - Unit-vector fields along configured limbs
//! - **Masks** - Landmarks that are missing or undefined for a category are never supervised
//! - **Multi-scale** - Heatmap pyramids at strides 4, 8 and 16
//! - **Parallel batches** - `rayon` workers with reproducible per-sample random streams
//!
//! ## Quick Start
//!
//! ```no_run
//! use keypoint_targets::{LabelConfig, SamplePipeline, SampleRecord};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Default preset: 24 apparel landmarks, 5 categories, 368 x 368 crops, stride 8
//!     let pipeline = SamplePipeline::new(LabelConfig::default())?.with_seed(2018);
//!
//!     let cells = ["-1_-1_-1"; 24];
//!     let mut cells = cells.to_vec();
//!     cells[15] = "120_80_1";
//!     cells[16] = "260_84_1";
//!     let record = SampleRecord::from_row("Images/skirt/0001.jpg", "skirt", &cells, 24)?;
//!
//!     let sample = pipeline.process_path("train/Images/skirt/0001.jpg", &record, 0)?;
//!     // image, heatmap, paf, heatmap_mask, paf_mask
//!     let tensors = sample.into_tensors();
//!     println!("heatmap shape: {:?}", tensors[1].shape());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use keypoint_targets::{Category, LabelConfig, TargetMode};
//!
//! let config = LabelConfig::new()
//!     .with_num_landmark(4)
//!     .with_landmarks(Category::Skirt, &[0, 1, 2, 3])
//!     .with_limbs(vec![(0, 1), (2, 3)])
//!     .with_landmark_swap(vec![(0, 1), (2, 3)])
//!     .with_crop_size(256)
//!     .with_mode(TargetMode::MultiScale);
//! assert!(config.validate().is_ok());
//! ```
//!
//! Configurations can also be loaded from JSON with [`LabelConfig::from_json_file`].
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`LabelConfig`] and [`TargetMode`] |
//! | [`category`] | Apparel [`Category`] and landmark names |
//! | [`keypoint`] | [`Keypoint`], [`Visibility`] and annotation parsing |
//! | [`transform`] | [`Affine`] matrices and keypoint mapping |
//! | [`preprocessing`] | Raster flip, warp, resize, padded crop and tensor conversion |
//! | [`augment`] | [`Augmenter`]: flip, rotate, scale, crop |
//! | [`visibility`] | [`ChannelPlan`]: which channels are supervised |
//! | [`heatmap`] | Gaussian heatmap rasterization |
//! | [`paf`] | Part-affinity field rasterization |
//! | [`labels`] | [`LabelAssembler`] and [`Targets`] |
//! | [`pipeline`] | [`SamplePipeline`] for single samples and batches |
//! | [`error`] | Error types ([`TargetError`], [`Result`]) |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod augment;
pub mod category;
pub mod config;
pub mod error;
pub mod heatmap;
pub mod keypoint;
pub mod labels;
pub mod logging;
pub mod paf;
pub mod pipeline;
pub mod preprocessing;
pub mod transform;
pub mod visibility;

// Re-export main types for convenience
pub use augment::{AugmentParams, Augmented, Augmenter};
pub use category::{Category, LANDMARK_NAMES};
pub use config::{LabelConfig, TargetMode};
pub use error::{Result, TargetError};
pub use keypoint::{Keypoint, Visibility, keypoints_to_array, parse_keypoints};
pub use labels::{HeatmapTargets, LabelAssembler, PafTargets, Targets, object_mask};
pub use pipeline::{SamplePipeline, SampleRecord, TrainingSample};
pub use transform::Affine;
pub use visibility::ChannelPlan;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "keypoint-targets");
    }
}
