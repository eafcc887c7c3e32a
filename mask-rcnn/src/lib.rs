pub mod batch;
pub mod cli;
pub mod config;
pub mod mapping;
pub mod model;
pub mod postprocess;
pub mod predictor;
pub mod preprocess;
pub mod runner;

pub use crate::batch::{ImageBatch, to_image_batch};
pub use crate::cli::Args;
pub use crate::config::{DemoConfig, Device};
pub use crate::mapping::ClassNames;
pub use crate::model::DetectionModel;
pub use crate::postprocess::{Detections, Masker};
pub use crate::predictor::Predictor;
pub use crate::preprocess::Transform;
pub use crate::runner::{RunStats, list_images, run_over_images};
