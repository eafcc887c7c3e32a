use burn::{
    nn::{BatchNorm, Initializer},
    prelude::*,
};

use crate::conv::ConvNorm;

/// Inverted residual block: optional 1x1 expansion, 3x3 depthwise, 1x1
/// linear projection.
#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    expand: Option<ConvNorm<B>>,
    depthwise: ConvNorm<B>,
    project: nn::conv::Conv2d<B>,
    project_norm: BatchNorm<B, 2>,
    use_res_connect: bool,
}

impl<B: Backend> InvertedResidual<B> {
    /// Create a new inverted residual block.
    ///
    /// # Arguments
    /// * `c_in`: Input channels.
    /// * `c_out`: Output channels.
    /// * `stride`: Depthwise stride, 1 or 2.
    /// * `expand_ratio`: Hidden width as a multiple of `c_in`; 1 skips the
    ///   expansion convolution.
    /// * `device`: Device to initialize the block on.
    pub fn new(
        c_in: usize,
        c_out: usize,
        stride: usize,
        expand_ratio: usize,
        device: &B::Device,
    ) -> Self {
        let hidden = c_in * expand_ratio;

        let expand = (expand_ratio != 1).then(|| ConvNorm::new(c_in, hidden, 1, 1, 1, device));
        let depthwise = ConvNorm::new(hidden, hidden, 3, stride, hidden, device);
        // Linear bottleneck: no activation after the projection.
        let project = nn::conv::Conv2dConfig::new([hidden, c_out], [1, 1])
            .with_bias(false)
            .with_initializer(Initializer::KaimingNormal {
                gain: std::f64::consts::SQRT_2,
                fan_out_only: true,
            })
            .init(device);
        let project_norm = nn::BatchNormConfig::new(c_out).init(device);

        Self {
            expand,
            depthwise,
            project,
            project_norm,
            use_res_connect: stride == 1 && c_in == c_out,
        }
    }

    /// `x + conv(x)` when the block keeps resolution and width, `conv(x)`
    /// otherwise.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = self.use_res_connect.then(|| input.clone());

        let x = match &self.expand {
            Some(expand) => expand.forward(input),
            None => input,
        };
        let x = self.depthwise.forward(x);
        let x = self.project.forward(x);
        let x = self.project_norm.forward(x);

        match residual {
            Some(r) => x.add(r),
            None => x,
        }
    }
}
