use ndarray::{Array3, Array4, s};

/// Batch-of-images tensor padded so the network's downsampling stages
/// divide evenly, plus each image's unpadded (width, height) for mapping
/// coordinates back later.
#[derive(Debug)]
pub struct ImageBatch {
    pub tensor: Array4<f32>,
    pub image_sizes: Vec<(u32, u32)>,
}

/// Pad every CHW image up to the next multiple of `size_divisibility`
/// (bottom/right, zero fill) and stack into one NCHW tensor. The padding
/// is minimal: each padded dimension is the smallest multiple of the
/// divisor that fits the largest image.
pub fn to_image_batch(images: Vec<Array3<f32>>, size_divisibility: u32) -> ImageBatch {
    let divisor = size_divisibility.max(1) as usize;
    let max_h = images.iter().map(|image| image.dim().1).max().unwrap_or(0);
    let max_w = images.iter().map(|image| image.dim().2).max().unwrap_or(0);
    let padded_h = max_h.div_ceil(divisor) * divisor;
    let padded_w = max_w.div_ceil(divisor) * divisor;

    let mut tensor = Array4::<f32>::zeros((images.len(), 3, padded_h, padded_w));
    let mut image_sizes = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let (_, h, w) = image.dim();
        tensor.slice_mut(s![i, .., ..h, ..w]).assign(image);
        image_sizes.push((w as u32, h as u32));
    }

    ImageBatch { tensor, image_sizes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_is_divisible_and_minimal() {
        for (h, w) in [(800, 1067), (1, 1), (32, 32), (31, 33), (799, 801)] {
            let batch = to_image_batch(vec![Array3::<f32>::zeros((3, h, w))], 32);
            let (n, c, ph, pw) = batch.tensor.dim();
            assert_eq!((n, c), (1, 3));
            assert_eq!(ph % 32, 0);
            assert_eq!(pw % 32, 0);
            assert!(ph >= h && pw >= w);
            assert!(ph - h < 32 && pw - w < 32);
            assert_eq!(batch.image_sizes, vec![(w as u32, h as u32)]);
        }
    }

    #[test]
    fn image_lands_top_left_with_zero_fill() {
        let image = Array3::<f32>::from_elem((3, 30, 40), 2.0);
        let batch = to_image_batch(vec![image], 32);

        assert_eq!(batch.tensor.dim(), (1, 3, 32, 64));
        assert_eq!(batch.tensor[[0, 0, 0, 0]], 2.0);
        assert_eq!(batch.tensor[[0, 0, 29, 39]], 2.0);
        assert_eq!(batch.tensor[[0, 0, 30, 0]], 0.0);
        assert_eq!(batch.tensor[[0, 0, 0, 40]], 0.0);
    }
}
