use anyhow::{Context, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbImage};
use ndarray::Array3;

use crate::config::InputConfig;

/// Deterministic, stateless preprocessing: resize the shortest side, then
/// convert channel order and value range and normalize per channel. A pure
/// function of (image, configuration).
#[derive(Debug, Clone)]
pub struct Transform {
    min_size: u32,
    pixel_mean: [f32; 3],
    pixel_std: [f32; 3],
    to_bgr255: bool,
}

impl Transform {
    pub fn new(input: &InputConfig, min_size: u32) -> Self {
        Self {
            min_size,
            pixel_mean: input.pixel_mean,
            pixel_std: input.pixel_std,
            to_bgr255: input.to_bgr255,
        }
    }

    /// Resized width/height: shortest side scaled to `min_size`, aspect
    /// ratio preserved. Identity when the shortest side already matches.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let shortest = width.min(height);
        if shortest == self.min_size || shortest == 0 {
            return (width, height);
        }
        let scale = self.min_size as f32 / shortest as f32;
        (
            (width as f32 * scale).round() as u32,
            (height as f32 * scale).round() as u32,
        )
    }

    pub fn apply(&self, image: &DynamicImage) -> Result<Array3<f32>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let (new_width, new_height) = self.target_size(width, height);

        let resized = if (new_width, new_height) == (width, height) {
            rgb
        } else {
            resize_rgb(&rgb, new_width, new_height)?
        };

        let mut tensor = Array3::<f32>::zeros((3, new_height as usize, new_width as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let channels = if self.to_bgr255 {
                [b as f32, g as f32, r as f32]
            } else {
                [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
            };
            for (c, value) in channels.into_iter().enumerate() {
                tensor[[c, y as usize, x as usize]] =
                    (value - self.pixel_mean[c]) / self.pixel_std[c];
            }
        }
        Ok(tensor)
    }
}

fn resize_rgb(rgb: &RgbImage, new_width: u32, new_height: u32) -> Result<RgbImage> {
    let src = DynamicImage::ImageRgb8(rgb.clone());
    let mut dst = Image::new(new_width, new_height, PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    resizer.resize(&src, &mut dst, Some(&options))?;

    RgbImage::from_raw(new_width, new_height, dst.buffer().to_vec())
        .context("resize produced a malformed buffer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn input(to_bgr255: bool, mean: [f32; 3]) -> InputConfig {
        InputConfig {
            pixel_mean: mean,
            pixel_std: [1.0, 1.0, 1.0],
            to_bgr255,
        }
    }

    #[test]
    fn matching_shortest_side_is_a_no_op() {
        let transform = Transform::new(&input(true, [0.0; 3]), 600);
        assert_eq!(transform.target_size(800, 600), (800, 600));

        let image =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])));
        let transform = Transform::new(&input(true, [0.0; 3]), 6);
        let tensor = transform.apply(&image).unwrap();

        assert_eq!(tensor.dim(), (3, 6, 8));
        // untouched pixels, BGR order, [0, 255] range
        assert_eq!(tensor[[0, 0, 0]], 30.0);
        assert_eq!(tensor[[1, 0, 0]], 20.0);
        assert_eq!(tensor[[2, 0, 0]], 10.0);
    }

    #[test]
    fn shortest_side_resize_preserves_aspect_ratio() {
        let transform = Transform::new(&input(true, [0.0; 3]), 800);
        assert_eq!(transform.target_size(800, 600), (1067, 800));
        assert_eq!(transform.target_size(600, 800), (800, 1067));
        assert_eq!(transform.target_size(400, 400), (800, 800));
    }

    #[test]
    fn normalization_subtracts_mean_per_channel() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])));
        let transform = Transform::new(&input(true, [2.0, 3.0, 4.0]), 2);
        let tensor = transform.apply(&image).unwrap();

        assert_eq!(tensor[[0, 1, 1]], 28.0);
        assert_eq!(tensor[[1, 1, 1]], 17.0);
        assert_eq!(tensor[[2, 1, 1]], 6.0);
    }

    #[test]
    fn rgb_unit_range_branch() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 0, 51])));
        let transform = Transform::new(&input(false, [0.0; 3]), 2);
        let tensor = transform.apply(&image).unwrap();

        assert_eq!(tensor[[0, 0, 0]], 1.0);
        assert_eq!(tensor[[1, 0, 0]], 0.0);
        assert!((tensor[[2, 0, 0]] - 0.2).abs() < 1e-6);
    }
}
