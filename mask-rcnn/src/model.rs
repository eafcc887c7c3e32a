use anyhow::{Context, Result, ensure};
use ndarray::{Array2, Axis, CowArray, Ix2, Ix4};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

use crate::batch::ImageBatch;
use crate::config::{Device, ModelConfig};
use crate::postprocess::Detections;

/// The detection network, opaque behind its serialized graph: RPN, RoI
/// heads, NMS and the mask head all live inside the session.
pub struct DetectionModel {
    session: Session,
    mask_on: bool,
}

impl DetectionModel {
    /// Build the network from configuration and load the trained weights.
    /// A missing or incompatible checkpoint is fatal.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let providers = match config.device {
            Device::Cuda => [CUDAExecutionProvider::default().build().error_on_failure()],
            Device::Cpu => [CPUExecutionProvider::default().build()],
        };

        let session = SessionBuilder::new()?
            .with_execution_providers(providers)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.weights)
            .with_context(|| format!("loading checkpoint {}", config.weights.display()))?;

        Ok(Self {
            session,
            mask_on: config.mask_on,
        })
    }

    /// Run the network on a batch-of-one and collect the parallel output
    /// arrays into a detection record at the working resolution.
    ///
    /// Output order follows the exported graph: boxes [n, 4], labels [n],
    /// scores [n], then mask probability maps [n, 1, m, m] when the mask
    /// head is enabled.
    pub fn forward(&self, batch: &ImageBatch) -> Result<Detections> {
        let tensor = CowArray::from(batch.tensor.view().into_dyn());
        let inputs = ort::inputs![tensor.view()]?;
        let outputs = self.session.run(inputs)?;

        let values: Vec<_> = outputs.iter().map(|(_name, value)| value).collect();
        ensure!(
            values.len() >= 3,
            "detection model produced {} outputs, expected boxes, labels and scores",
            values.len()
        );

        let boxes: Vec<[f32; 4]> = values[0]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix2>()?
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2], row[3]])
            .collect();
        let labels: Vec<i64> = values[1]
            .try_extract_tensor::<i64>()?
            .iter()
            .copied()
            .collect();
        let scores: Vec<f32> = values[2]
            .try_extract_tensor::<f32>()?
            .iter()
            .copied()
            .collect();

        let masks = if self.mask_on && values.len() > 3 {
            let maps = values[3]
                .try_extract_tensor::<f32>()?
                .into_dimensionality::<Ix4>()?
                .outer_iter()
                .map(|map| map.index_axis(Axis(0), 0).to_owned())
                .collect::<Vec<Array2<f32>>>();
            Some(maps)
        } else {
            None
        };

        ensure!(
            labels.len() == boxes.len()
                && scores.len() == boxes.len()
                && masks.as_ref().is_none_or(|m| m.len() == boxes.len()),
            "detection outputs disagree on length"
        );

        Ok(Detections {
            boxes,
            labels,
            scores,
            masks,
        })
    }
}
