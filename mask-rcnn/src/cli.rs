use clap::Parser;

use crate::config::Device;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// model configuration file
    #[arg(long, default_value = "configs/fashion_mask_rcnn.toml")]
    pub config: String,

    /// directory of input images
    #[arg(long, default_value = "train_person/val")]
    pub source: String,

    /// class-name file for the detection summary
    #[arg(long, default_value = "assets/labels/fashion-labels.txt")]
    pub labels: String,

    /// shortest image side after resizing
    #[arg(long, default_value_t = 800)]
    pub min_image_size: u32,

    /// confidence threshold for the reported detections
    #[arg(long, default_value_t = 0.5)]
    pub confidence: f32,

    /// keep raw mask probabilities instead of thresholding
    #[arg(long)]
    pub heatmap: bool,

    /// stop after this many successfully processed images
    #[arg(long, default_value_t = 41)]
    pub limit: usize,

    /// compute device
    #[arg(long, value_enum, default_value = "cuda")]
    pub device: Device,
}
