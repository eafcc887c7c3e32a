use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

/// Demo configuration, immutable once the overrides are applied.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    pub output_dir: PathBuf,
    pub input: InputConfig,
    pub model: ModelConfig,
    pub dataloader: DataloaderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub pixel_mean: [f32; 3],
    pub pixel_std: [f32; 3],
    /// BGR in [0, 255] when set (the trained weights expect it); RGB in
    /// [0, 1] otherwise.
    pub to_bgr255: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub weights: PathBuf,
    pub device: Device,
    pub mask_on: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataloaderConfig {
    pub size_divisibility: u32,
}

impl DemoConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing configuration file {}", path.display()))?;
        Ok(config)
    }

    /// Apply the demo's explicit overrides on top of the file values,
    /// yielding the final configuration.
    pub fn with_overrides(mut self, mask_on: bool, device: Device) -> Self {
        self.model.mask_on = mask_on;
        self.model.device = device;
        self
    }
}
