use burn::{
    nn::{BatchNorm, Initializer, PaddingConfig2d},
    prelude::*,
};

/// Convolution + batch norm + ReLU6, the basic unit of the backbone.
///
/// The convolution carries no bias (the norm supplies the shift) and is
/// initialized Kaiming-normal over the fan-out. `groups` turns the same
/// block into a depthwise convolution when it equals the channel count.
#[derive(Module, Debug)]
pub struct ConvNorm<B: Backend> {
    conv: nn::conv::Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvNorm<B> {
    pub fn new(
        c_in: usize,
        c_out: usize,
        kernel: usize,
        stride: usize,
        groups: usize,
        device: &B::Device,
    ) -> Self {
        let padding = (kernel - 1) / 2;
        let conv = nn::conv::Conv2dConfig::new([c_in, c_out], [kernel, kernel])
            .with_stride([stride, stride])
            .with_groups(groups)
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_bias(false)
            .with_initializer(Initializer::KaimingNormal {
                gain: std::f64::consts::SQRT_2,
                fan_out_only: true,
            })
            .init(device);
        let norm = nn::BatchNormConfig::new(c_out).init(device);

        Self { conv, norm }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.norm.forward(x);
        // ReLU6
        x.clamp(0.0, 6.0)
    }
}
