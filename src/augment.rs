// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Geometric augmentation of an image together with its keypoints.
//!
//! The [`Augmenter`] runs flip → rotate → scale → crop. Each step is a pure function that
//! takes an image and a keypoint slice and returns new ones together with the [`Affine`]
//! it applied, so the raster and the landmarks stay co-registered. In evaluation mode the
//! random steps are skipped and the scale/crop use fixed parameters.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use image::RgbImage;
use rand::Rng;

use crate::config::LabelConfig;
use crate::error::{Result, TargetError};
use crate::keypoint::{present_center, Keypoint};
use crate::preprocessing::{crop_with_padding, flip_horizontal, resize, warp_affine};
use crate::transform::{apply_to_keypoints, Affine};

/// Parameters drawn (or fixed) for one augmentation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AugmentParams {
    /// Whether the sample was mirrored.
    pub flipped: bool,
    /// Rotation angle in degrees (0 when not rotated).
    pub angle: f32,
    /// Uniform scale factor applied after rotation.
    pub scale_factor: f32,
    /// Top-left corner of the crop window in the scaled image.
    pub crop_origin: (i64, i64),
}

/// Output of [`Augmenter::augment`].
#[derive(Debug, Clone)]
pub struct Augmented {
    /// `crop_size x crop_size` output image.
    pub image: RgbImage,
    /// Keypoints in output coordinates; missing ones at the sentinel coordinate.
    pub keypoints: Vec<Keypoint>,
    /// Composed transform from input to output coordinates.
    pub transform: Affine,
    /// Parameters of this pass.
    pub params: AugmentParams,
}

/// Joint image/keypoint augmenter driven by a [`LabelConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Augmenter<'a> {
    config: &'a LabelConfig,
}

impl<'a> Augmenter<'a> {
    /// Create an augmenter borrowing the configuration.
    #[must_use]
    pub const fn new(config: &'a LabelConfig) -> Self {
        Self { config }
    }

    /// Augment one sample.
    ///
    /// # Arguments
    ///
    /// * `image` - Source image.
    /// * `keypoints` - One keypoint per landmark of the vocabulary.
    /// * `is_training` - Random flip/rotation/scale/jitter when `true`; deterministic
    ///   long-edge resize to `crop_size` and centered crop when `false`.
    /// * `rng` - Randomness source, owned by the caller so parallel workers stay independent.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::DegenerateKeypoints`] if no keypoint is present, or
    /// [`TargetError::KeypointParseError`] if the keypoint count does not match the vocabulary.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        image: &RgbImage,
        keypoints: &[Keypoint],
        is_training: bool,
        rng: &mut R,
    ) -> Result<Augmented> {
        let config = self.config;
        if keypoints.len() != config.num_landmark {
            return Err(TargetError::KeypointParseError(format!(
                "expected {} keypoints, got {}",
                config.num_landmark,
                keypoints.len()
            )));
        }
        // fail before touching the raster
        present_center(keypoints)?;

        let mut params = AugmentParams {
            flipped: false,
            angle: 0.0,
            scale_factor: 1.0,
            crop_origin: (0, 0),
        };
        let mut transform = Affine::IDENTITY;
        let mut img = image.clone();
        let mut kps = keypoints.to_vec();

        // flip
        if is_training && rng.gen::<f32>() > 0.5 {
            let (flipped_img, flipped_kps, step) = flip(&img, &kps, &config.landmark_swap);
            img = flipped_img;
            kps = flipped_kps;
            transform = transform.then(&step);
            params.flipped = true;
        }

        // rotate
        if is_training {
            let angle = (rng.gen::<f32>() - 0.5) * 2.0 * config.rot_max;
            let (rotated_img, rotated_kps, step) = rotate(&img, &kps, angle, config.fill_value)?;
            img = rotated_img;
            kps = rotated_kps;
            transform = transform.then(&step);
            params.angle = angle;
        }

        // scale
        let target = if is_training {
            rng.gen::<f32>() * (config.scale_max - config.scale_min) + config.scale_min
        } else {
            config.crop_size as f32
        };
        let (scaled_img, scaled_kps, step, factor) = rescale(&img, &kps, target)?;
        img = scaled_img;
        kps = scaled_kps;
        transform = transform.then(&step);
        params.scale_factor = factor;

        // crop
        let jitter = if is_training {
            let max = config.crop_center_offset_max;
            (
                (rng.gen::<f32>() - 0.5) * 2.0 * max,
                (rng.gen::<f32>() - 0.5) * 2.0 * max,
            )
        } else {
            (0.0, 0.0)
        };
        let (cropped_img, cropped_kps, step, origin) =
            crop(&img, &kps, jitter, config.crop_size, config.fill_value)?;
        transform = transform.then(&step);
        params.crop_origin = origin;

        Ok(Augmented {
            image: cropped_img,
            keypoints: restore_missing(&cropped_kps),
            transform,
            params,
        })
    }
}

/// Exchange left/right landmark identities.
#[must_use]
pub fn swap_landmarks(keypoints: &[Keypoint], swap: &[(usize, usize)]) -> Vec<Keypoint> {
    let mut out = keypoints.to_vec();
    for &(i, j) in swap {
        if i < out.len() && j < out.len() {
            out.swap(i, j);
        }
    }
    out
}

/// Mirror the image and keypoints horizontally and swap paired landmarks.
#[must_use]
pub fn flip(
    image: &RgbImage,
    keypoints: &[Keypoint],
    swap: &[(usize, usize)],
) -> (RgbImage, Vec<Keypoint>, Affine) {
    let step = Affine::flip_horizontal(image.width() as f32);
    let mirrored = apply_to_keypoints(&step, keypoints);
    (flip_horizontal(image), swap_landmarks(&mirrored, swap), step)
}

/// Rotate about the center of the present keypoints onto an enlarged canvas.
///
/// # Errors
///
/// Returns an error if no keypoint is present.
pub fn rotate(
    image: &RgbImage,
    keypoints: &[Keypoint],
    angle: f32,
    fill: [u8; 3],
) -> Result<(RgbImage, Vec<Keypoint>, Affine)> {
    let center = present_center(keypoints)?;
    let (step, size) = Affine::rotation(center, angle, image.dimensions());
    let rotated = warp_affine(image, &step, size, fill)?;
    Ok((rotated, apply_to_keypoints(&step, keypoints), step))
}

/// Resize so the long edge becomes `target` pixels.
///
/// # Returns
///
/// The resized image, the scaled keypoints, the scale transform and the factor.
///
/// # Errors
///
/// Returns an error if resizing fails.
pub fn rescale(
    image: &RgbImage,
    keypoints: &[Keypoint],
    target: f32,
) -> Result<(RgbImage, Vec<Keypoint>, Affine, f32)> {
    let max_edge = image.width().max(image.height()) as f32;
    let factor = target / max_edge;
    let step = Affine::scale(factor);
    let resized = resize(image, factor)?;
    Ok((resized, apply_to_keypoints(&step, keypoints), step, factor))
}

/// Crop a `size x size` window around the (jittered) center of the present keypoints.
///
/// # Returns
///
/// The crop, the translated keypoints, the translation and the window origin.
///
/// # Errors
///
/// Returns an error if no keypoint is present.
pub fn crop(
    image: &RgbImage,
    keypoints: &[Keypoint],
    jitter: (f32, f32),
    size: u32,
    fill: [u8; 3],
) -> Result<(RgbImage, Vec<Keypoint>, Affine, (i64, i64))> {
    let (cx, cy) = present_center(keypoints)?;
    let half = size as f32 / 2.0;
    // truncate toward zero, like an integer cast of the window corner
    let x1 = (cx + jitter.0 - half).trunc() as i64;
    let y1 = (cy + jitter.1 - half).trunc() as i64;

    let step = Affine::translation(-(x1 as f32), -(y1 as f32));
    let cropped = crop_with_padding(image, x1, y1, size, fill);
    Ok((
        cropped,
        apply_to_keypoints(&step, keypoints),
        step,
        (x1, y1),
    ))
}

/// Reset every missing keypoint to the sentinel coordinate.
#[must_use]
pub fn restore_missing(keypoints: &[Keypoint]) -> Vec<Keypoint> {
    keypoints
        .iter()
        .map(|k| if k.is_present() { *k } else { Keypoint::missing() })
        .collect()
}
