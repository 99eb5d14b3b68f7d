// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Augmentation and target configuration.
//!
//! This module defines the [`LabelConfig`] struct, which holds the landmark vocabulary,
//! the per-category landmark table, the limb topology, augmentation ranges and the
//! heatmap/PAF rasterization parameters. A configuration is built once (from defaults, the
//! builder, or a JSON file) and then passed by reference to every stage of the pipeline.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{Result, TargetError};

/// Which label variant the assembler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// One heatmap set and one PAF set at [`LabelConfig::stride`].
    #[default]
    SingleScale,
    /// One heatmap set per stride in [`LabelConfig::multi_scale_strides`], no PAF.
    MultiScale,
}

/// Configuration for sample augmentation and dense target synthesis.
///
/// This struct uses a builder pattern for convenient construction. The per-category
/// landmark table is sized by `num_landmark`, so set the vocabulary size before
/// registering categories.
///
/// # Example
///
/// ```rust
/// use keypoint_targets::{Category, LabelConfig, TargetMode};
///
/// let config = LabelConfig::new()
///     .with_num_landmark(4)
///     .with_landmarks(Category::Skirt, &[0, 1, 2, 3])
///     .with_limbs(vec![(0, 1), (2, 3)])
///     .with_landmark_swap(vec![(0, 1), (2, 3)])
///     .with_crop_size(256)
///     .with_mode(TargetMode::MultiScale);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct LabelConfig {
    /// Size of the landmark vocabulary (keypoints per sample).
    pub num_landmark: usize,
    /// Landmark index pairs rasterized as part-affinity fields, in channel order.
    pub limbs: Vec<(usize, usize)>,
    /// Left/right landmark pairs exchanged by a horizontal flip.
    pub landmark_swap: Vec<(usize, usize)>,
    /// Maximum absolute rotation angle in degrees.
    pub rot_max: f32,
    /// Lower bound of the sampled long-edge size in pixels.
    pub scale_min: f32,
    /// Upper bound of the sampled long-edge size in pixels.
    pub scale_max: f32,
    /// Side of the square output image in pixels.
    pub crop_size: u32,
    /// Maximum crop-center jitter per axis in pixels.
    pub crop_center_offset_max: f32,
    /// Color used for regions exposed by rotation or cropping.
    pub fill_value: [u8; 3],
    /// Perpendicular half-width of a limb in grid cells.
    pub paf_thickness: f32,
    /// Label variant to produce.
    pub mode: TargetMode,
    /// Grid stride of the single-scale variant.
    pub stride: usize,
    /// Grid strides of the multi-scale variant.
    pub multi_scale_strides: Vec<usize>,
    /// Gaussian standard deviation in input pixels.
    pub sigma: f32,
    landmark_table: HashMap<Category, Vec<bool>>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let mut config = Self {
            num_landmark: 24,
            limbs: vec![
                (0, 1),
                (0, 2),
                (1, 2),
                (0, 3),
                (1, 4),
                (3, 5),
                (4, 6),
                (3, 10),
                (4, 12),
                (5, 9),
                (6, 11),
                (9, 10),
                (11, 12),
                (5, 13),
                (6, 14),
                (13, 14),
                (5, 7),
                (6, 8),
                (7, 8),
                (7, 17),
                (8, 18),
                (15, 16),
                (15, 17),
                (16, 18),
                (17, 18),
                (15, 21),
                (16, 23),
                (19, 20),
                (19, 22),
                (20, 21),
                (22, 23),
            ],
            landmark_swap: vec![
                (0, 1),
                (3, 4),
                (5, 6),
                (7, 8),
                (9, 11),
                (10, 12),
                (13, 14),
                (15, 16),
                (17, 18),
                (20, 22),
                (21, 23),
            ],
            rot_max: 30.0,
            scale_min: 320.0,
            scale_max: 448.0,
            crop_size: 368,
            crop_center_offset_max: 20.0,
            fill_value: [128, 128, 128],
            paf_thickness: 1.0,
            mode: TargetMode::SingleScale,
            stride: 8,
            multi_scale_strides: vec![4, 8, 16],
            sigma: 7.0,
            landmark_table: HashMap::new(),
        };
        for (category, indices) in default_landmark_idx() {
            config = config.with_landmarks(category, indices);
        }
        config
    }
}

/// Landmarks annotated for each category in the default 24-landmark vocabulary.
fn default_landmark_idx() -> [(Category, &'static [usize]); 5] {
    [
        (
            Category::Blouse,
            &[0, 1, 2, 3, 4, 5, 6, 9, 10, 11, 12, 13, 14],
        ),
        (
            Category::Outwear,
            &[0, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14],
        ),
        (
            Category::Dress,
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 17, 18],
        ),
        (Category::Skirt, &[15, 16, 17, 18]),
        (Category::Trousers, &[15, 16, 19, 20, 21, 22, 23]),
    ]
}

impl LabelConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the landmark vocabulary size and clear the category table.
    #[must_use]
    pub fn with_num_landmark(mut self, num_landmark: usize) -> Self {
        self.num_landmark = num_landmark;
        self.landmark_table.clear();
        self
    }

    /// Register the landmarks annotated for `category`.
    ///
    /// Indices outside the vocabulary are ignored here and reported by [`Self::validate`].
    ///
    /// # Arguments
    ///
    /// * `category` - The garment category.
    /// * `indices` - Landmark indices that are defined for this category.
    #[must_use]
    pub fn with_landmarks(mut self, category: Category, indices: &[usize]) -> Self {
        let mut active = vec![false; self.num_landmark];
        let mut out_of_range = false;
        for &i in indices {
            match active.get_mut(i) {
                Some(slot) => *slot = true,
                None => out_of_range = true,
            }
        }
        if out_of_range {
            // keep the bad row so validate() can report it
            active.push(false);
        }
        self.landmark_table.insert(category, active);
        self
    }

    /// Set the limb topology.
    #[must_use]
    pub fn with_limbs(mut self, limbs: Vec<(usize, usize)>) -> Self {
        self.limbs = limbs;
        self
    }

    /// Set the left/right swap list applied on horizontal flips.
    #[must_use]
    pub fn with_landmark_swap(mut self, swap: Vec<(usize, usize)>) -> Self {
        self.landmark_swap = swap;
        self
    }

    /// Set the maximum rotation angle in degrees.
    #[must_use]
    pub const fn with_rot_max(mut self, degrees: f32) -> Self {
        self.rot_max = degrees;
        self
    }

    /// Set the range of the sampled long-edge size.
    #[must_use]
    pub const fn with_scale_range(mut self, min: f32, max: f32) -> Self {
        self.scale_min = min;
        self.scale_max = max;
        self
    }

    /// Set the output crop size.
    #[must_use]
    pub const fn with_crop_size(mut self, size: u32) -> Self {
        self.crop_size = size;
        self
    }

    /// Set the maximum crop-center jitter.
    #[must_use]
    pub const fn with_crop_center_offset_max(mut self, offset: f32) -> Self {
        self.crop_center_offset_max = offset;
        self
    }

    /// Set the fill color for exposed regions.
    #[must_use]
    pub const fn with_fill_value(mut self, fill: [u8; 3]) -> Self {
        self.fill_value = fill;
        self
    }

    /// Set the limb half-width in grid cells.
    #[must_use]
    pub const fn with_paf_thickness(mut self, thickness: f32) -> Self {
        self.paf_thickness = thickness;
        self
    }

    /// Select single-scale or multi-scale targets.
    #[must_use]
    pub const fn with_mode(mut self, mode: TargetMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the single-scale stride.
    #[must_use]
    pub const fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Set the multi-scale strides.
    #[must_use]
    pub fn with_multi_scale_strides(mut self, strides: Vec<usize>) -> Self {
        self.multi_scale_strides = strides;
        self
    }

    /// Set the Gaussian sigma in input pixels.
    #[must_use]
    pub const fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    /// Per-landmark activity mask for `category`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::UnknownCategory`] if the category has no table entry.
    pub fn landmarks_for(&self, category: Category) -> Result<&[bool]> {
        self.landmark_table
            .get(&category)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                TargetError::UnknownCategory(format!(
                    "'{category}' has no landmark table entry"
                ))
            })
    }

    /// Categories registered in the landmark table.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.landmark_table.keys().copied().collect();
        categories.sort();
        categories
    }

    /// Check every index and numeric range.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::ConfigError`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_landmark;
        if n == 0 {
            return config_err("num_landmark must be positive");
        }
        for (category, active) in &self.landmark_table {
            if active.len() != n {
                return config_err(&format!(
                    "landmark table for '{category}' does not match num_landmark={n}"
                ));
            }
        }
        for &(a, b) in &self.limbs {
            if a >= n || b >= n {
                return config_err(&format!("limb ({a}, {b}) out of range for {n} landmarks"));
            }
        }
        for &(a, b) in &self.landmark_swap {
            if a >= n || b >= n || a == b {
                return config_err(&format!("invalid swap pair ({a}, {b})"));
            }
        }
        if !(self.scale_min > 0.0 && self.scale_min <= self.scale_max) {
            return config_err(&format!(
                "scale range [{}, {}] must be positive and ordered",
                self.scale_min, self.scale_max
            ));
        }
        if self.rot_max < 0.0 || self.crop_center_offset_max < 0.0 {
            return config_err("rot_max and crop_center_offset_max must be non-negative");
        }
        if self.crop_size == 0 {
            return config_err("crop_size must be positive");
        }
        if self.paf_thickness <= 0.0 || self.sigma <= 0.0 {
            return config_err("paf_thickness and sigma must be positive");
        }
        if self.stride == 0
            || self.multi_scale_strides.is_empty()
            || self.multi_scale_strides.contains(&0)
        {
            return config_err("strides must be positive");
        }
        Ok(())
    }

    /// Parse and validate a configuration from a JSON string.
    ///
    /// Fields absent from the document keep their default values.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::ConfigError`] for malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: LabelConfigFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize the configuration to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::ConfigError`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&LabelConfigFile::from(self))?)
    }
}

fn config_err(msg: &str) -> Result<()> {
    Err(TargetError::ConfigError(msg.to_string()))
}

/// On-disk representation of [`LabelConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LabelConfigFile {
    num_landmark: usize,
    landmark_idx: HashMap<Category, Vec<usize>>,
    paf_landmark_pair: Vec<(usize, usize)>,
    landmark_swap: Vec<(usize, usize)>,
    rot_max: f32,
    scale_min: f32,
    scale_max: f32,
    crop_size: u32,
    crop_center_offset_max: f32,
    fill_value: [u8; 3],
    heatmap_thres: f32,
    mode: TargetMode,
    stride: usize,
    multi_scale_strides: Vec<usize>,
    sigma: f32,
}

impl Default for LabelConfigFile {
    fn default() -> Self {
        Self::from(&LabelConfig::default())
    }
}

impl From<&LabelConfig> for LabelConfigFile {
    fn from(config: &LabelConfig) -> Self {
        let landmark_idx = config
            .landmark_table
            .iter()
            .map(|(category, active)| {
                let indices = active
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &on)| on.then_some(i))
                    .collect();
                (*category, indices)
            })
            .collect();
        Self {
            num_landmark: config.num_landmark,
            landmark_idx,
            paf_landmark_pair: config.limbs.clone(),
            landmark_swap: config.landmark_swap.clone(),
            rot_max: config.rot_max,
            scale_min: config.scale_min,
            scale_max: config.scale_max,
            crop_size: config.crop_size,
            crop_center_offset_max: config.crop_center_offset_max,
            fill_value: config.fill_value,
            heatmap_thres: config.paf_thickness,
            mode: config.mode,
            stride: config.stride,
            multi_scale_strides: config.multi_scale_strides.clone(),
            sigma: config.sigma,
        }
    }
}

impl TryFrom<LabelConfigFile> for LabelConfig {
    type Error = TargetError;

    fn try_from(file: LabelConfigFile) -> Result<Self> {
        let mut config = Self::new()
            .with_num_landmark(file.num_landmark)
            .with_limbs(file.paf_landmark_pair)
            .with_landmark_swap(file.landmark_swap)
            .with_rot_max(file.rot_max)
            .with_scale_range(file.scale_min, file.scale_max)
            .with_crop_size(file.crop_size)
            .with_crop_center_offset_max(file.crop_center_offset_max)
            .with_fill_value(file.fill_value)
            .with_paf_thickness(file.heatmap_thres)
            .with_mode(file.mode)
            .with_stride(file.stride)
            .with_multi_scale_strides(file.multi_scale_strides)
            .with_sigma(file.sigma);
        for (category, indices) in &file.landmark_idx {
            if let Some(&bad) = indices.iter().find(|&&i| i >= file.num_landmark) {
                return Err(TargetError::ConfigError(format!(
                    "landmark {bad} of '{category}' out of range for {} landmarks",
                    file.num_landmark
                )));
            }
            config = config.with_landmarks(*category, indices);
        }
        config.validate()?;
        Ok(config)
    }
}
