use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, info};

use crate::batch::to_image_batch;
use crate::config::DemoConfig;
use crate::mapping::ClassNames;
use crate::model::DetectionModel;
use crate::postprocess::{Detections, Masker};
use crate::preprocess::Transform;

/// One-image-at-a-time inference driver running the fixed stage sequence
/// from transform through mask pasting. Built once, read-only afterwards.
pub struct Predictor {
    transform: Transform,
    model: DetectionModel,
    masker: Masker,
    size_divisibility: u32,
    confidence_threshold: f32,
    class_names: ClassNames,
}

impl Predictor {
    pub fn new(
        config: &DemoConfig,
        min_image_size: u32,
        confidence_threshold: f32,
        show_mask_heatmaps: bool,
        class_names: ClassNames,
    ) -> Result<Self> {
        let transform = Transform::new(&config.input, min_image_size);
        let model = DetectionModel::load(&config.model)?;
        let mask_threshold = if show_mask_heatmaps { None } else { Some(0.5) };

        Ok(Self {
            transform,
            model,
            masker: Masker::new(mask_threshold, 1),
            size_divisibility: config.dataloader.size_divisibility,
            confidence_threshold,
            class_names,
        })
    }

    /// Full pipeline for one decoded image; the returned detections are in
    /// the original image's pixel coordinates, masks pasted full-size.
    pub fn compute_prediction(&self, original: &DynamicImage) -> Result<Detections> {
        let t = Instant::now();
        let image = self.transform.apply(original)?;
        info!("pre-processing time: {:?}", t.elapsed());

        let t = Instant::now();
        let batch = to_image_batch(vec![image], self.size_divisibility);
        info!("image list time: {:?}", t.elapsed());

        let t = Instant::now();
        let mut prediction = self.model.forward(&batch)?;
        info!("compute predictions time: {:?}", t.elapsed());

        // always a single image per batch
        let working_size = batch.image_sizes[0];
        let original_size = (original.width(), original.height());
        prediction.resize(working_size, original_size);

        if prediction.masks.is_some() {
            self.masker
                .paste_all(&mut prediction, original.width(), original.height());
        }

        Ok(prediction)
    }

    /// Decode one image file, run the pipeline, log the retained
    /// detections and return the elapsed wall-clock time.
    pub fn predict(&self, path: &Path) -> Result<Duration> {
        let image =
            image::open(path).with_context(|| format!("reading {}", path.display()))?;

        let start = Instant::now();
        let mut prediction = self.compute_prediction(&image)?;
        let elapsed = start.elapsed();

        prediction.select_top(self.confidence_threshold);
        info!(
            "{}: {} detections, {:?}",
            path.display(),
            prediction.len(),
            elapsed
        );
        for (label, score) in prediction.labels.iter().zip(&prediction.scores) {
            debug!(
                "  {}: {:.1}%",
                self.class_names.name(*label as usize),
                score * 100.0
            );
        }

        Ok(elapsed)
    }
}
