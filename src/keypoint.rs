// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Annotated landmark types.
//!
//! A sample carries one [`Keypoint`] per landmark of the vocabulary, in vocabulary order.
//! Landmarks that were not annotated are [`Visibility::Missing`] and sit at the sentinel
//! coordinate [`MISSING_COORD`]; they never take part in any geometric computation.

use ndarray::Array2;

use crate::error::{Result, TargetError};

/// Sentinel coordinate stored in both `x` and `y` of a missing keypoint.
pub const MISSING_COORD: f32 = -1.0;

/// Tri-state visibility flag of an annotated landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Not annotated, or not applicable to the category.
    Missing,
    /// Present but hidden.
    Occluded,
    /// Present and unoccluded.
    Visible,
}

impl Visibility {
    /// Integer code used by annotation files.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Missing => -1,
            Self::Occluded => 0,
            Self::Visible => 1,
        }
    }

    /// Parse the integer annotation code.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::KeypointParseError`] for codes other than -1, 0 and 1.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            -1 => Ok(Self::Missing),
            0 => Ok(Self::Occluded),
            1 => Ok(Self::Visible),
            _ => Err(TargetError::KeypointParseError(format!(
                "visibility must be -1, 0 or 1, got {code}"
            ))),
        }
    }

    /// Whether the landmark exists in the image (visible or occluded).
    #[must_use]
    pub const fn is_present(self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// A single landmark annotation in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate.
    pub y: f32,
    /// Visibility flag.
    pub visibility: Visibility,
}

impl Keypoint {
    /// Create a keypoint. Missing keypoints are normalized to the sentinel coordinate.
    #[must_use]
    pub const fn new(x: f32, y: f32, visibility: Visibility) -> Self {
        match visibility {
            Visibility::Missing => Self::missing(),
            _ => Self { x, y, visibility },
        }
    }

    /// A visible keypoint at `(x, y)`.
    #[must_use]
    pub const fn visible(x: f32, y: f32) -> Self {
        Self::new(x, y, Visibility::Visible)
    }

    /// A missing keypoint at the sentinel coordinate.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            x: MISSING_COORD,
            y: MISSING_COORD,
            visibility: Visibility::Missing,
        }
    }

    /// Whether the keypoint exists in the image.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.visibility.is_present()
    }

    /// Parse an `x_y_v` annotation such as `"231_87_1"` or `"-1_-1_-1"`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::KeypointParseError`] if the string does not contain exactly
    /// three integers or the visibility code is out of range.
    pub fn from_xyv(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('_').collect();
        if parts.len() != 3 {
            return Err(TargetError::KeypointParseError(format!(
                "expected 'x_y_v', got '{s}'"
            )));
        }

        let mut values = [0i32; 3];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse().map_err(|_| {
                TargetError::KeypointParseError(format!("invalid integer '{part}' in '{s}'"))
            })?;
        }

        let visibility = Visibility::from_code(values[2])?;
        #[allow(clippy::cast_precision_loss)]
        Ok(Self::new(values[0] as f32, values[1] as f32, visibility))
    }
}

/// Parse one annotation row of `x_y_v` cells into a keypoint sequence.
///
/// # Arguments
///
/// * `cells` - One cell per landmark, in vocabulary order.
/// * `num_landmark` - Expected vocabulary size.
///
/// # Errors
///
/// Returns an error if the row length differs from `num_landmark` or any cell is malformed.
pub fn parse_keypoints<S: AsRef<str>>(cells: &[S], num_landmark: usize) -> Result<Vec<Keypoint>> {
    if cells.len() != num_landmark {
        return Err(TargetError::KeypointParseError(format!(
            "expected {num_landmark} landmarks, got {}",
            cells.len()
        )));
    }
    cells.iter().map(|c| Keypoint::from_xyv(c.as_ref())).collect()
}

/// Axis-aligned bounds `(xmin, ymin, xmax, ymax)` of the present keypoints.
///
/// # Errors
///
/// Returns [`TargetError::DegenerateKeypoints`] if every keypoint is missing.
pub fn present_bounds(keypoints: &[Keypoint]) -> Result<(f32, f32, f32, f32)> {
    keypoints
        .iter()
        .filter(|k| k.is_present())
        .fold(None, |acc: Option<(f32, f32, f32, f32)>, k| {
            Some(acc.map_or((k.x, k.y, k.x, k.y), |(x0, y0, x1, y1)| {
                (x0.min(k.x), y0.min(k.y), x1.max(k.x), y1.max(k.y))
            }))
        })
        .ok_or_else(|| {
            TargetError::DegenerateKeypoints(
                "sample has no visible or occluded keypoint".to_string(),
            )
        })
}

/// Center of the bounding box of the present keypoints.
///
/// # Errors
///
/// Returns [`TargetError::DegenerateKeypoints`] if every keypoint is missing.
pub fn present_center(keypoints: &[Keypoint]) -> Result<(f32, f32)> {
    let (xmin, ymin, xmax, ymax) = present_bounds(keypoints)?;
    Ok(((xmin + xmax) / 2.0, (ymin + ymax) / 2.0))
}

/// Convert keypoints to an `(N, 3)` array of `(x, y, visibility code)`.
#[must_use]
pub fn keypoints_to_array(keypoints: &[Keypoint]) -> Array2<f32> {
    let mut arr = Array2::zeros((keypoints.len(), 3));
    for (mut row, k) in arr.outer_iter_mut().zip(keypoints) {
        row[0] = k.x;
        row[1] = k.y;
        #[allow(clippy::cast_precision_loss)]
        {
            row[2] = k.visibility.code() as f32;
        }
    }
    arr
}
