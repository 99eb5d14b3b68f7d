// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 2D affine transforms shared by the image raster and the keypoints.
//!
//! Every geometric augmentation step is expressed as an [`Affine`] so that the image warp
//! and the keypoint update use the very same matrix. Steps compose with [`Affine::then`].

use crate::keypoint::Keypoint;

/// A 2x3 affine matrix mapping `(x, y)` to `(m00 x + m01 y + m02, m10 x + m11 y + m12)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    /// Row-major matrix rows.
    pub m: [[f32; 3]; 2],
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    };

    /// Horizontal mirror of an image of the given width: `x' = width - x`.
    #[must_use]
    pub const fn flip_horizontal(width: f32) -> Self {
        Self {
            m: [[-1.0, 0.0, width], [0.0, 1.0, 0.0]],
        }
    }

    /// Uniform scaling about the origin.
    #[must_use]
    pub const fn scale(factor: f32) -> Self {
        Self {
            m: [[factor, 0.0, 0.0], [0.0, factor, 0.0]],
        }
    }

    /// Pure translation.
    #[must_use]
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self {
            m: [[1.0, 0.0, tx], [0.0, 1.0, ty]],
        }
    }

    /// Rotation by `angle` degrees about `center`, re-centered on an enlarged canvas.
    ///
    /// Positive angles rotate counter-clockwise as seen on screen (y axis pointing down).
    /// The returned canvas size `(width, height)` is the axis-aligned extent of the rotated
    /// `size` rectangle, and the matrix moves `center` to the middle of that canvas.
    ///
    /// # Arguments
    ///
    /// * `center` - Rotation center `(x, y)` in source pixels.
    /// * `angle` - Rotation angle in degrees.
    /// * `size` - Source image size `(width, height)`.
    ///
    /// # Returns
    ///
    /// The transform and the canvas size needed to hold the rotated image.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn rotation(center: (f32, f32), angle: f32, size: (u32, u32)) -> (Self, (u32, u32)) {
        let (cx, cy) = center;
        let (sin, cos) = angle.to_radians().sin_cos();
        let (w, h) = (size.0 as f32, size.1 as f32);

        let (abs_cos, abs_sin) = (cos.abs(), sin.abs());
        let new_w = (h * abs_sin + w * abs_cos) as u32;
        let new_h = (h * abs_cos + w * abs_sin) as u32;

        let m = [
            [
                cos,
                sin,
                (1.0 - cos) * cx - sin * cy + (new_w / 2) as f32 - cx,
            ],
            [
                -sin,
                cos,
                sin * cx + (1.0 - cos) * cy + (new_h / 2) as f32 - cy,
            ],
        ];
        (Self { m }, (new_w.max(1), new_h.max(1)))
    }

    /// Compose: the returned transform applies `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        let a = &next.m;
        let b = &self.m;
        let mut m = [[0.0; 3]; 2];
        for (r, row) in m.iter_mut().enumerate() {
            row[0] = a[r][0] * b[0][0] + a[r][1] * b[1][0];
            row[1] = a[r][0] * b[0][1] + a[r][1] * b[1][1];
            row[2] = a[r][0] * b[0][2] + a[r][1] * b[1][2] + a[r][2];
        }
        Self { m }
    }

    /// Map a single point.
    #[must_use]
    pub fn apply(&self, point: (f32, f32)) -> (f32, f32) {
        let (x, y) = point;
        let m = &self.m;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    /// Inverse transform, or `None` if the linear part is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let m = &self.m;
        let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
        if det.abs() < 1e-12 {
            return None;
        }
        let a = m[1][1] / det;
        let b = -m[0][1] / det;
        let c = -m[1][0] / det;
        let d = m[0][0] / det;
        Some(Self {
            m: [
                [a, b, -(a * m[0][2] + b * m[1][2])],
                [c, d, -(c * m[0][2] + d * m[1][2])],
            ],
        })
    }

    /// Row-major 3x3 homogeneous matrix.
    #[must_use]
    pub const fn to_homogeneous(&self) -> [f32; 9] {
        let m = &self.m;
        [
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], 0.0, 0.0, 1.0,
        ]
    }
}

/// Map present keypoints through `affine`; missing keypoints are returned unchanged.
#[must_use]
pub fn apply_to_keypoints(affine: &Affine, keypoints: &[Keypoint]) -> Vec<Keypoint> {
    keypoints
        .iter()
        .map(|k| {
            if k.is_present() {
                let (x, y) = affine.apply((k.x, k.y));
                Keypoint { x, y, ..*k }
            } else {
                *k
            }
        })
        .collect()
}
