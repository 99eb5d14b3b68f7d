// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! End-to-end sample preparation.
//!
//! A [`SamplePipeline`] owns the configuration and, for each dataset index, augments the
//! image with its keypoints and assembles the dense targets. Samples are independent, so
//! batches run on the `rayon` thread pool. Every sample draws from its own PCG stream
//! selected by the sample index, which keeps results identical across thread counts.

use std::path::Path;

use colored::Colorize;
use image::RgbImage;
use ndarray::Array3;
use rand::Rng;
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::augment::{AugmentParams, Augmenter};
use crate::category::Category;
use crate::config::LabelConfig;
use crate::error::Result;
use crate::keypoint::{parse_keypoints, Keypoint};
use crate::labels::{LabelAssembler, Targets};
use crate::preprocessing::image_to_tensor;

/// One annotation row: image reference, category and keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Image path relative to the dataset root.
    pub image_id: String,
    /// Apparel category.
    pub category: Category,
    /// One keypoint per landmark of the vocabulary.
    pub keypoints: Vec<Keypoint>,
}

impl SampleRecord {
    /// Create a record from parsed values.
    #[must_use]
    pub fn new(image_id: impl Into<String>, category: Category, keypoints: Vec<Keypoint>) -> Self {
        Self {
            image_id: image_id.into(),
            category,
            keypoints,
        }
    }

    /// Build a record from the raw cells of an annotation row.
    ///
    /// # Arguments
    ///
    /// * `image_id` - Image path relative to the dataset root.
    /// * `category` - Category name, e.g. `"blouse"`.
    /// * `cells` - One `x_y_v` cell per landmark.
    /// * `num_landmark` - Vocabulary size.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::UnknownCategory`] for an unrecognized category, or
    /// [`crate::TargetError::KeypointParseError`] for malformed cells.
    pub fn from_row<S: AsRef<str>>(
        image_id: &str,
        category: &str,
        cells: &[S],
        num_landmark: usize,
    ) -> Result<Self> {
        let category: Category = category.parse()?;
        let keypoints = parse_keypoints(cells, num_landmark)?;
        Ok(Self::new(image_id, category, keypoints))
    }
}

/// A prepared training sample.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    /// `(3, crop_size, crop_size)` image tensor with values in `[0, 1]`.
    pub image: Array3<f32>,
    /// Keypoints in output image coordinates.
    pub keypoints: Vec<Keypoint>,
    /// Dense targets.
    pub targets: Targets,
    /// Augmentation parameters used for this sample.
    pub params: AugmentParams,
}

impl TrainingSample {
    /// Image tensor followed by the target tensors in training order.
    #[must_use]
    pub fn into_tensors(self) -> Vec<Array3<f32>> {
        let mut tensors = vec![self.image];
        tensors.extend(self.targets.into_tensors());
        tensors
    }
}

/// Augmentation and target synthesis for a dataset.
///
/// # Examples
///
/// ```no_run
/// use keypoint_targets::{LabelConfig, SamplePipeline, SampleRecord};
///
/// let pipeline = SamplePipeline::new(LabelConfig::default())?.with_seed(7);
/// let record = SampleRecord::from_row("img/0001.jpg", "skirt", &["-1_-1_-1"; 24], 24)?;
/// let sample = pipeline.process_path("data/train/img/0001.jpg", &record, 0);
/// # Ok::<(), keypoint_targets::TargetError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SamplePipeline {
    config: LabelConfig,
    is_training: bool,
    seed: u64,
}

impl SamplePipeline {
    /// Create a training pipeline with seed 0.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::ConfigError`] if the configuration is inconsistent.
    pub fn new(config: LabelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            is_training: true,
            seed: 0,
        })
    }

    /// Enable or disable random augmentation.
    #[must_use]
    pub const fn with_training(mut self, is_training: bool) -> Self {
        self.is_training = is_training;
        self
    }

    /// Set the base seed of the per-sample random streams.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Whether random augmentation is enabled.
    #[must_use]
    pub const fn is_training(&self) -> bool {
        self.is_training
    }

    /// Random stream for sample `index`.
    #[must_use]
    pub fn rng_for(&self, index: usize) -> Pcg32 {
        Pcg32::new(self.seed, index as u64)
    }

    /// Prepare one sample with the stream of `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if augmentation or target assembly fails.
    pub fn process(&self, image: &RgbImage, record: &SampleRecord, index: usize) -> Result<TrainingSample> {
        self.process_with_rng(image, record, &mut self.rng_for(index))
    }

    /// Prepare one sample with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// Returns an error if augmentation or target assembly fails.
    pub fn process_with_rng<R: Rng + ?Sized>(
        &self,
        image: &RgbImage,
        record: &SampleRecord,
        rng: &mut R,
    ) -> Result<TrainingSample> {
        let augmented =
            Augmenter::new(&self.config).augment(image, &record.keypoints, self.is_training, rng)?;
        let params = augmented.params;
        crate::verbose!(
            "{} ({}): flip={} angle={:.1} scale={:.3} crop=({}, {})",
            record.image_id,
            record.category,
            params.flipped,
            params.angle,
            params.scale_factor,
            params.crop_origin.0,
            params.crop_origin.1
        );

        let (width, height) = augmented.image.dimensions();
        let targets = LabelAssembler::new(&self.config).assemble(
            height,
            width,
            record.category,
            &augmented.keypoints,
        )?;

        Ok(TrainingSample {
            image: image_to_tensor(&augmented.image),
            keypoints: augmented.keypoints,
            targets,
            params,
        })
    }

    /// Decode the image at `path` and prepare the sample.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::ImageError`] if the file cannot be decoded, or any
    /// error of [`Self::process`].
    pub fn process_path<P: AsRef<Path>>(
        &self,
        path: P,
        record: &SampleRecord,
        index: usize,
    ) -> Result<TrainingSample> {
        let image = image::open(path.as_ref())?.to_rgb8();
        self.process(&image, record, index)
    }

    /// Prepare in-memory samples in parallel.
    ///
    /// Each item carries its dataset index, which selects the random stream, so the same
    /// sample gets the same augmentation whichever batch it lands in. Results keep the input
    /// order. Failed samples are reported and returned as errors.
    pub fn process_batch(
        &self,
        items: &[(usize, RgbImage, SampleRecord)],
    ) -> Vec<Result<TrainingSample>> {
        let results: Vec<_> = items
            .par_iter()
            .map(|(index, image, record)| self.process(image, record, *index))
            .collect();
        self.report(items.iter().map(|(_, _, record)| record), &results);
        results
    }

    /// Load and prepare indexed records from a dataset directory in parallel.
    ///
    /// Each record is read from `root.join(image_id)` and uses the stream of its index.
    pub fn process_dir<P: AsRef<Path>>(
        &self,
        root: P,
        records: &[(usize, SampleRecord)],
    ) -> Vec<Result<TrainingSample>> {
        let root = root.as_ref();
        let results: Vec<_> = records
            .par_iter()
            .map(|(index, record)| self.process_path(root.join(&record.image_id), record, *index))
            .collect();
        self.report(records.iter().map(|(_, record)| record), &results);
        results
    }

    fn report<'r>(
        &self,
        records: impl Iterator<Item = &'r SampleRecord>,
        results: &[Result<TrainingSample>],
    ) {
        let mut failed = 0usize;
        for (record, result) in records.zip(results) {
            if let Err(e) = result {
                failed += 1;
                crate::warn!("Skipping {}: {e}", record.image_id);
            }
        }
        let prepared = format!("{}/{}", results.len() - failed, results.len());
        crate::verbose!(
            "Prepared {} samples ({})",
            if failed == 0 { prepared.green() } else { prepared.yellow() },
            if self.is_training { "train" } else { "eval" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TargetError;
    use crate::keypoint::Visibility;
    use image::Rgb;

    fn config() -> LabelConfig {
        LabelConfig::new()
            .with_num_landmark(4)
            .with_landmarks(Category::Skirt, &[0, 1, 2, 3])
            .with_limbs(vec![(0, 1), (2, 3)])
            .with_landmark_swap(vec![(0, 1)])
            .with_scale_range(96.0, 128.0)
            .with_crop_size(96)
            .with_crop_center_offset_max(8.0)
    }

    fn sample() -> (RgbImage, SampleRecord) {
        let image = RgbImage::from_pixel(160, 120, Rgb([30, 60, 90]));
        let record = SampleRecord::new(
            "a.jpg",
            Category::Skirt,
            vec![
                Keypoint::visible(40.0, 30.0),
                Keypoint::visible(120.0, 30.0),
                Keypoint::new(60.0, 100.0, Visibility::Occluded),
                Keypoint::missing(),
            ],
        );
        (image, record)
    }

    #[test]
    fn test_record_from_row() {
        let record = SampleRecord::from_row("x.jpg", "skirt", &["1_2_1", "-1_-1_-1"], 2).unwrap();
        assert_eq!(record.category, Category::Skirt);
        assert_eq!(record.keypoints[0], Keypoint::visible(1.0, 2.0));
        assert!(!record.keypoints[1].is_present());

        assert!(matches!(
            SampleRecord::from_row("x.jpg", "hat", &["1_2_1"], 1),
            Err(TargetError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_process_shapes() {
        let pipeline = SamplePipeline::new(config().with_stride(8)).unwrap();
        let (image, record) = sample();
        let sample = pipeline.process(&image, &record, 0).unwrap();

        assert_eq!(sample.image.shape(), &[3, 96, 96]);
        assert_eq!(sample.keypoints[3], Keypoint::missing());
        let tensors = sample.into_tensors();
        assert_eq!(tensors.len(), 5);
        assert_eq!(tensors[1].shape(), &[5, 12, 12]);
        assert_eq!(tensors[2].shape(), &[4, 12, 12]);
    }

    #[test]
    fn test_same_index_same_sample() {
        let pipeline = SamplePipeline::new(config()).unwrap().with_seed(42);
        let (image, record) = sample();
        let a = pipeline.process(&image, &record, 3).unwrap();
        let b = pipeline.process(&image, &record, 3).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.keypoints, b.keypoints);
    }

    fn indexed(indices: std::ops::Range<usize>) -> Vec<(usize, RgbImage, SampleRecord)> {
        indices
            .map(|i| {
                let (image, record) = sample();
                (i, image, record)
            })
            .collect()
    }

    #[test]
    fn test_batch_matches_sequential() {
        let pipeline = SamplePipeline::new(config()).unwrap().with_seed(9);
        let items = indexed(10..16);
        let batch = pipeline.process_batch(&items);
        assert_eq!(batch.len(), 6);
        for ((index, image, record), result) in items.iter().zip(&batch) {
            let expected = pipeline.process(image, record, *index).unwrap();
            assert_eq!(result.as_ref().unwrap().params, expected.params);
        }
        // Distinct streams per index
        let params: Vec<_> = batch.iter().map(|r| r.as_ref().unwrap().params).collect();
        assert!(params.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_batches_do_not_share_streams() {
        let pipeline = SamplePipeline::new(config()).unwrap().with_seed(5);
        let first = pipeline.process_batch(&indexed(0..4));
        let second = pipeline.process_batch(&indexed(4..8));
        for (a, b) in first.iter().zip(&second) {
            let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
            assert!((a.params.angle - b.params.angle).abs() > f32::EPSILON);
        }

        // A sample keeps its augmentation when it moves to another batch position
        let alone = pipeline.process_batch(&indexed(6..7));
        assert_eq!(
            alone[0].as_ref().unwrap().params,
            second[2].as_ref().unwrap().params
        );
    }

    #[test]
    fn test_batch_reports_failures() {
        let pipeline = SamplePipeline::new(config()).unwrap();
        let (image, mut record) = sample();
        let good = (0, image.clone(), record.clone());
        record.keypoints = vec![Keypoint::missing(); 4];
        let results = pipeline.process_batch(&[good, (1, image, record)]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TargetError::DegenerateKeypoints(_))));
    }

    #[test]
    fn test_process_dir_uses_record_index() {
        let root = std::env::temp_dir().join(format!("keypoint-targets-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let (image, record) = sample();
        image.save(root.join(&record.image_id)).unwrap();

        let pipeline = SamplePipeline::new(config()).unwrap().with_seed(11);
        let results = pipeline.process_dir(&root, &[(42, record.clone())]);
        let expected = pipeline.process(&image, &record, 42).unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(results[0].as_ref().unwrap().params, expected.params);
    }

    #[test]
    fn test_eval_ignores_seed() {
        let (image, record) = sample();
        let a = SamplePipeline::new(config())
            .unwrap()
            .with_training(false)
            .with_seed(1)
            .process(&image, &record, 0)
            .unwrap();
        let b = SamplePipeline::new(config())
            .unwrap()
            .with_training(false)
            .with_seed(2)
            .process(&image, &record, 5)
            .unwrap();
        assert_eq!(a.params, b.params);
        assert!(!a.params.flipped);
    }

    #[test]
    fn test_process_path_missing_file() {
        let pipeline = SamplePipeline::new(config()).unwrap();
        let (_, record) = sample();
        assert!(pipeline
            .process_path("/nonexistent/image.jpg", &record, 0)
            .is_err());
    }
}
