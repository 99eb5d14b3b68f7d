// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decides which heatmap and PAF channels of a sample carry real supervision.

use crate::category::Category;
use crate::config::LabelConfig;
use crate::error::{Result, TargetError};
use crate::keypoint::Keypoint;

/// Per-channel supervision flags for one sample.
///
/// A landmark channel is supervised when the landmark is defined for the sample's category
/// and not missing. A limb channel pair is supervised when both endpoints are supervised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlan {
    /// One flag per landmark, in vocabulary order.
    pub landmarks: Vec<bool>,
    /// One flag per limb, in configuration order.
    pub limbs: Vec<bool>,
}

impl ChannelPlan {
    /// Resolve the plan for a sample.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration holding the category table and the limb list.
    /// * `category` - Category of the sample.
    /// * `keypoints` - Keypoints of the sample, one per landmark.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::UnknownCategory`] if the category is not in the table,
    /// [`TargetError::ConfigError`] if the table row or a limb does not fit the vocabulary, or
    /// [`TargetError::KeypointParseError`] if the keypoint count does not match.
    pub fn resolve(config: &LabelConfig, category: Category, keypoints: &[Keypoint]) -> Result<Self> {
        let defined = config.landmarks_for(category)?;
        if defined.len() != config.num_landmark {
            return Err(TargetError::ConfigError(format!(
                "landmark table for '{category}' does not match num_landmark={}",
                config.num_landmark
            )));
        }
        if keypoints.len() != defined.len() {
            return Err(TargetError::KeypointParseError(format!(
                "expected {} keypoints, got {}",
                defined.len(),
                keypoints.len()
            )));
        }

        let landmarks: Vec<bool> = defined
            .iter()
            .zip(keypoints)
            .map(|(&on, k)| on && k.is_present())
            .collect();
        let limbs = config
            .limbs
            .iter()
            .map(|&(a, b)| match (landmarks.get(a), landmarks.get(b)) {
                (Some(&on_a), Some(&on_b)) => Ok(on_a && on_b),
                _ => Err(TargetError::ConfigError(format!(
                    "limb ({a}, {b}) out of range for {} landmarks",
                    landmarks.len()
                ))),
            })
            .collect::<Result<Vec<bool>>>()?;

        Ok(Self { landmarks, limbs })
    }

    /// Indices of supervised landmark channels.
    pub fn active_landmarks(&self) -> impl Iterator<Item = usize> + '_ {
        self.landmarks
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
    }

    /// Indices of supervised limbs.
    pub fn active_limbs(&self) -> impl Iterator<Item = usize> + '_ {
        self.limbs
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
    }
}
