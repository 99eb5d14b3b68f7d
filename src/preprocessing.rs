// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image primitives used by the geometric augmenter.
//!
//! This module handles the raster side of augmentation: mirroring, affine warping onto a
//! constant-filled canvas, uniform resizing, padded cropping, and conversion of the final
//! crop to a normalized CHW tensor.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use ndarray::Array3;

use crate::error::{Result, TargetError};
use crate::transform::Affine;

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Mirror an image left to right.
#[must_use]
pub fn flip_horizontal(image: &RgbImage) -> RgbImage {
    image::imageops::flip_horizontal(image)
}

/// Warp an image with an affine transform onto a canvas of the given size.
///
/// Output pixels whose source lies outside the input are set to `fill`.
///
/// # Arguments
///
/// * `image` - Source image.
/// * `affine` - Transform from source to output coordinates.
/// * `size` - Output canvas `(width, height)`.
/// * `fill` - Border color.
///
/// # Errors
///
/// Returns [`TargetError::ImageError`] if the transform is not invertible.
pub fn warp_affine(
    image: &RgbImage,
    affine: &Affine,
    size: (u32, u32),
    fill: [u8; 3],
) -> Result<RgbImage> {
    let projection = Projection::from_matrix(affine.to_homogeneous()).ok_or_else(|| {
        TargetError::ImageError("affine transform is not invertible".to_string())
    })?;

    let mut out = RgbImage::from_pixel(size.0, size.1, Rgb(fill));
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb(fill),
        &mut out,
    );
    Ok(out)
}

/// Output size of a uniform resize, rounded like the pixel grid and never empty.
#[must_use]
pub fn scaled_size(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let w = (width as f32 * factor).round().max(1.0) as u32;
    let h = (height as f32 * factor).round().max(1.0) as u32;
    (w, h)
}

/// Resize an image by a uniform factor with bilinear filtering.
///
/// # Errors
///
/// Returns [`TargetError::ImageError`] if the resizer rejects the buffers.
pub fn resize(image: &RgbImage, factor: f32) -> Result<RgbImage> {
    use fast_image_resize::{images::Image, PixelType, ResizeAlg, ResizeOptions, Resizer};

    let (src_w, src_h) = image.dimensions();
    let (dst_w, dst_h) = scaled_size(src_w, src_h, factor);
    if (dst_w, dst_h) == (src_w, src_h) {
        return Ok(image.clone());
    }

    let src_image = Image::from_vec_u8(src_w, src_h, image.as_raw().clone(), PixelType::U8x3)
        .map_err(|e| TargetError::ImageError(format!("invalid source buffer: {e}")))?;
    let mut dst_image = Image::new(dst_w, dst_h, PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| TargetError::ImageError(format!("resize failed: {e}")))?;

    RgbImage::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| TargetError::ImageError("resized buffer has wrong size".to_string()))
}

/// Crop a `size x size` window whose top-left corner is `(x1, y1)`.
///
/// The window may extend past any image edge; uncovered pixels are set to `fill`.
#[must_use]
pub fn crop_with_padding(image: &RgbImage, x1: i64, y1: i64, size: u32, fill: [u8; 3]) -> RgbImage {
    let mut out = RgbImage::from_pixel(size, size, Rgb(fill));
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let size = i64::from(size);

    // overlap of [x1, x1 + size) x [y1, y1 + size) with the image, in source coordinates
    let sx0 = x1.max(0);
    let sy0 = y1.max(0);
    let sx1 = (x1 + size).min(w);
    let sy1 = (y1 + size).min(h);
    if sx0 >= sx1 || sy0 >= sy1 {
        return out;
    }

    let row_len = ((sx1 - sx0) * 3) as usize;
    let src_stride = (w * 3) as usize;
    let dst_stride = (size * 3) as usize;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut out;

    for sy in sy0..sy1 {
        let src_off = sy as usize * src_stride + sx0 as usize * 3;
        let dst_off = (sy - y1) as usize * dst_stride + (sx0 - x1) as usize * 3;
        dst[dst_off..dst_off + row_len].copy_from_slice(&src[src_off..src_off + row_len]);
    }
    out
}

/// Convert an RGB image to a normalized CHW tensor.
///
/// # Arguments
///
/// * `image` - RGB image to convert.
///
/// # Returns
///
/// Array3 with shape (3, H, W) and values in [0, 1].
#[must_use]
pub fn image_to_tensor(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut tensor = Array3::zeros((3, h, w));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, y, x]] = f32::from(pixel[0]) * INV_255;
        tensor[[1, y, x]] = f32::from(pixel[1]) * INV_255;
        tensor[[2, y, x]] = f32::from(pixel[2]) * INV_255;
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn test_flip_horizontal() {
        let img = gradient(4, 2);
        let flipped = flip_horizontal(&img);
        assert_eq!(flipped.get_pixel(0, 1), img.get_pixel(3, 1));
        assert_eq!(flipped.get_pixel(3, 0), img.get_pixel(0, 0));
    }

    #[test]
    fn test_warp_identity_and_fill() {
        let img = gradient(8, 8);
        let out = warp_affine(&img, &Affine::translation(4.0, 0.0), (8, 8), [1, 2, 3]).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        // Exposed left border is filled
        assert_eq!(out.get_pixel(0, 3), &Rgb([1, 2, 3]));
        // Shifted content
        assert_eq!(out.get_pixel(6, 3), img.get_pixel(2, 3));
    }

    #[test]
    fn test_warp_singular_is_error() {
        let img = gradient(4, 4);
        assert!(warp_affine(&img, &Affine::scale(0.0), (4, 4), [0, 0, 0]).is_err());
    }

    #[test]
    fn test_resize_dimensions() {
        let img = gradient(100, 50);
        let out = resize(&img, 0.5).unwrap();
        assert_eq!(out.dimensions(), (50, 25));
        assert_eq!(scaled_size(3, 3, 0.01), (1, 1));
    }

    #[test]
    fn test_crop_inside() {
        let img = gradient(10, 10);
        let out = crop_with_padding(&img, 2, 3, 4, [0, 0, 0]);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(2, 3));
        assert_eq!(out.get_pixel(3, 3), img.get_pixel(5, 6));
    }

    #[test]
    fn test_crop_out_of_bounds_is_padded() {
        let img = gradient(10, 10);
        let out = crop_with_padding(&img, -2, 8, 4, [9, 9, 9]);
        assert_eq!(out.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert_eq!(out.get_pixel(2, 0), img.get_pixel(0, 8));
        assert_eq!(out.get_pixel(3, 1), img.get_pixel(1, 9));
        assert_eq!(out.get_pixel(3, 2), &Rgb([9, 9, 9]));

        // Fully outside
        let out = crop_with_padding(&img, 100, 100, 3, [5, 5, 5]);
        assert!(out.pixels().all(|p| *p == Rgb([5, 5, 5])));
    }

    #[test]
    fn test_image_to_tensor() {
        let img = RgbImage::from_pixel(3, 2, Rgb([255, 0, 51]));
        let t = image_to_tensor(&img);
        assert_eq!(t.shape(), &[3, 2, 3]);
        assert!((t[[0, 1, 2]] - 1.0).abs() < 1e-6);
        assert!(t[[1, 0, 0]].abs() < 1e-6);
        assert!((t[[2, 1, 1]] - 0.2).abs() < 1e-6);
    }
}
