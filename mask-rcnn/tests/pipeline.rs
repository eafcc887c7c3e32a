use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array2;

use mask_rcnn::batch::to_image_batch;
use mask_rcnn::config::InputConfig;
use mask_rcnn::postprocess::{Detections, Masker};
use mask_rcnn::preprocess::Transform;

/// The 800x600 scenario: shortest side up to 800, padding to the next
/// multiple of 32, detections mapped back into the original pixel grid.
#[test]
fn landscape_image_through_the_full_pipeline() {
    let input = InputConfig {
        pixel_mean: [102.9801, 115.9465, 122.7753],
        pixel_std: [1.0, 1.0, 1.0],
        to_bgr255: true,
    };
    let transform = Transform::new(&input, 800);

    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(800, 600, Rgb([40, 80, 120])));
    let tensor = transform.apply(&image).unwrap();

    // shortest side 600 scaled to 800, aspect ratio preserved
    assert_eq!(tensor.dim(), (3, 800, 1067));

    let batch = to_image_batch(vec![tensor], 32);
    let (n, _, height, width) = batch.tensor.dim();
    assert_eq!(n, 1);
    assert_eq!(height, 800);
    assert_eq!(width % 32, 0);
    assert!(width >= 1067 && width < 1067 + 32);
    assert_eq!(batch.image_sizes[0], (1067, 800));

    // raw detections as the network would report them, at the working
    // resolution
    let mut detections = Detections {
        boxes: vec![[10.0, 10.0, 500.0, 780.0], [1000.0, 700.0, 1400.0, 900.0]],
        labels: vec![1, 2],
        scores: vec![0.9, 0.8],
        masks: Some(vec![Array2::from_elem((28, 28), 0.9); 2]),
    };
    detections.resize(batch.image_sizes[0], (800, 600));
    for bbox in &detections.boxes {
        assert!(bbox[0] >= 0.0 && bbox[2] < 800.0);
        assert!(bbox[1] >= 0.0 && bbox[3] < 600.0);
        assert!(bbox[0] <= bbox[2] && bbox[1] <= bbox[3]);
    }

    let masker = Masker::new(Some(0.5), 1);
    masker.paste_all(&mut detections, 800, 600);

    let masks = detections.masks.as_ref().unwrap();
    assert_eq!(masks.len(), 2);
    for mask in masks {
        assert_eq!(mask.dim(), (600, 800));
    }

    // the first box is interior: its mask has solid pixels inside the box
    let inside = detections.boxes[0];
    let cy = ((inside[1] + inside[3]) * 0.5) as usize;
    let cx = ((inside[0] + inside[2]) * 0.5) as usize;
    assert_eq!(masks[0][[cy, cx]], 1.0);
}
