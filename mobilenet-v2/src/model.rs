use burn::prelude::*;
use thiserror::Error;

use crate::block::InvertedResidual;
use crate::conv::ConvNorm;

/// One row of the inverted-residual table: (t, c, n, s).
#[derive(Debug, Clone, Copy)]
pub struct BlockSetting {
    pub expand_ratio: usize,
    pub channels: usize,
    pub repeats: usize,
    pub stride: usize,
}

impl BlockSetting {
    pub const fn new(expand_ratio: usize, channels: usize, repeats: usize, stride: usize) -> Self {
        Self {
            expand_ratio,
            channels,
            repeats,
            stride,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackboneError {
    #[error(
        "stage boundaries {stage_ends:?} must be strictly increasing, non-empty and end at row {rows}"
    )]
    InvalidStages { stage_ends: [usize; 4], rows: usize },
    #[error(
        "block row {row}: repeats must be at least 1 and stride must be 1 or 2 (got repeats {repeats}, stride {stride})"
    )]
    InvalidSetting {
        row: usize,
        repeats: usize,
        stride: usize,
    },
}

/// Configuration of the truncated feature-pyramid trunk.
///
/// `stage_ends[i]` is the exclusive index of the last `settings` row that
/// belongs to stage `i`. The split is validated by [`BackboneConfig::init`]
/// so that a table that cannot yield exactly four stages fails at
/// construction rather than at the first forward pass.
#[derive(Debug, Clone)]
pub struct BackboneConfig {
    pub width_mult: f64,
    pub stem_channels: usize,
    pub settings: Vec<BlockSetting>,
    pub stage_ends: [usize; 4],
}

impl BackboneConfig {
    /// The fashion-detection trunk: MobileNetV2 cut after the 160-channel
    /// group, split into stages of stride 4, 8, 16 and 32.
    pub fn fashion() -> Self {
        Self {
            width_mult: 1.0,
            stem_channels: 32,
            settings: vec![
                BlockSetting::new(1, 16, 1, 1),
                BlockSetting::new(6, 24, 2, 2),
                BlockSetting::new(6, 32, 3, 2),
                BlockSetting::new(6, 64, 4, 2),
                BlockSetting::new(6, 96, 3, 1),
                BlockSetting::new(6, 160, 3, 2),
            ],
            stage_ends: [2, 3, 5, 6],
        }
    }

    pub fn with_width_mult(mut self, width_mult: f64) -> Self {
        self.width_mult = width_mult;
        self
    }

    fn validate(&self) -> Result<(), BackboneError> {
        for (row, setting) in self.settings.iter().enumerate() {
            if setting.repeats < 1 || !(setting.stride == 1 || setting.stride == 2) {
                return Err(BackboneError::InvalidSetting {
                    row,
                    repeats: setting.repeats,
                    stride: setting.stride,
                });
            }
        }

        let increasing = self.stage_ends.windows(2).all(|w| w[0] < w[1]);
        if self.stage_ends[0] == 0
            || !increasing
            || self.stage_ends[3] != self.settings.len()
        {
            return Err(BackboneError::InvalidStages {
                stage_ends: self.stage_ends,
                rows: self.settings.len(),
            });
        }
        Ok(())
    }

    /// Validate the stage split and build the trunk.
    ///
    /// Weights are Kaiming-normal on the convolutions and unit/zero on the
    /// norm layers; seed the backend first for reproducible initialization.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Backbone<B>, BackboneError> {
        self.validate()?;

        let stem_width = scaled(self.stem_channels, self.width_mult);
        let stem = ConvNorm::new(3, stem_width, 3, 2, 1, device);

        let mut input_channel = stem_width;
        let mut stages = Vec::with_capacity(self.stage_ends.len());
        let mut row = 0;
        for &end in &self.stage_ends {
            let mut blocks = Vec::new();
            while row < end {
                let setting = self.settings[row];
                let output_channel = scaled(setting.channels, self.width_mult);
                for i in 0..setting.repeats {
                    let stride = if i == 0 { setting.stride } else { 1 };
                    blocks.push(InvertedResidual::new(
                        input_channel,
                        output_channel,
                        stride,
                        setting.expand_ratio,
                        device,
                    ));
                    input_channel = output_channel;
                }
                row += 1;
            }
            stages.push(Stage { blocks });
        }

        Ok(Backbone { stem, stages })
    }
}

fn scaled(channels: usize, width_mult: f64) -> usize {
    (channels as f64 * width_mult) as usize
}

#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    blocks: Vec<InvertedResidual<B>>,
}

impl<B: Backend> Stage<B> {
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(input, |x, block| block.forward(x))
    }
}

/// Truncated MobileNetV2 trunk exposing one feature map per stage instead
/// of a single classification output.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    stem: ConvNorm<B>,
    stages: Vec<Stage<B>>,
}

impl<B: Backend> Backbone<B> {
    /// # Shapes
    ///   - Images [batch_size, 3, height, width], normalized
    ///   - Output: one tensor per stage, spatial resolution halved at every
    ///     striding group, channel width growing with depth
    pub fn forward(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        let mut x = self.stem.forward(images);
        let mut maps = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            x = stage.forward(x);
            maps.push(x.clone());
        }
        maps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    #[test]
    fn four_feature_maps_with_expected_shapes() {
        <TestBackend as Backend>::seed(42);
        let backbone = BackboneConfig::fashion()
            .init::<TestBackend>(&device())
            .unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], &device());
        let maps = backbone.forward(input);

        assert_eq!(maps.len(), 4);
        assert_eq!(maps[0].dims(), [1, 24, 16, 16]);
        assert_eq!(maps[1].dims(), [1, 32, 8, 8]);
        assert_eq!(maps[2].dims(), [1, 96, 4, 4]);
        assert_eq!(maps[3].dims(), [1, 160, 2, 2]);
    }

    #[test]
    fn strides_divide_evenly_and_channels_grow() {
        let backbone = BackboneConfig::fashion()
            .init::<TestBackend>(&device())
            .unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 96, 128], &device());
        let maps = backbone.forward(input);

        let mut prev = None;
        for map in &maps {
            let [_, c, h, w] = map.dims();
            if let Some((pc, ph, pw)) = prev {
                assert!(c >= pc);
                assert_eq!(ph % h, 0);
                assert_eq!(pw % w, 0);
                assert_eq!(ph / h, pw / w);
            }
            prev = Some((c, h, w));
        }
    }

    #[test]
    fn width_mult_scales_every_stage() {
        let backbone = BackboneConfig::fashion()
            .with_width_mult(0.5)
            .init::<TestBackend>(&device())
            .unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], &device());
        let maps = backbone.forward(input);

        let widths: Vec<usize> = maps.iter().map(|m| m.dims()[1]).collect();
        assert_eq!(widths, vec![12, 16, 48, 80]);
    }

    #[test]
    fn rejects_stage_ends_that_do_not_partition_the_table() {
        let out_of_order = BackboneConfig {
            stage_ends: [2, 2, 5, 6],
            ..BackboneConfig::fashion()
        };
        assert!(matches!(
            out_of_order.init::<TestBackend>(&device()),
            Err(BackboneError::InvalidStages { .. })
        ));

        let short = BackboneConfig {
            stage_ends: [1, 2, 3, 4],
            ..BackboneConfig::fashion()
        };
        assert!(matches!(
            short.init::<TestBackend>(&device()),
            Err(BackboneError::InvalidStages { .. })
        ));
    }

    #[test]
    fn rejects_invalid_block_rows() {
        let mut config = BackboneConfig::fashion();
        config.settings[2] = BlockSetting::new(6, 32, 3, 3);
        assert_eq!(
            config.init::<TestBackend>(&device()).unwrap_err(),
            BackboneError::InvalidSetting {
                row: 2,
                repeats: 3,
                stride: 3
            }
        );
    }
}
