//! ConvNeXt residual block for complex-valued feature maps.

use candle_core::Tensor;
use candle_nn::VarBuilder;
use tracing::debug;

use crate::complex::{
    complex_norm2d, ComplexActivation, ComplexConv2d, ComplexNorm2d, ComplexTensor,
};
use crate::config::BlockConfig;
use crate::error::Result;
use crate::nn::{DropPath, LayerScale, PaddingMode};

/// Axis holding the samples once real and imaginary parts are stacked.
const STACKED_BATCH_AXIS: usize = 1;

/// Complex counterpart of [`ConvNeXtBlock2d`](super::ConvNeXtBlock2d).
///
/// The branch output is stacked as `[2, batch, channels, height, width]` before
/// layer scale and stochastic depth, so both parts of a sample are always
/// scaled and dropped together.
#[derive(Debug)]
pub struct ComplexConvNeXtBlock2d {
    config: BlockConfig,
    dwconv: ComplexConv2d,
    norm: Box<dyn ComplexNorm2d>,
    pwconv1: ComplexConv2d,
    nonlinear: ComplexActivation,
    pwconv2: ComplexConv2d,
    layer_scale: Option<LayerScale>,
    drop_path: DropPath,
}

impl ComplexConvNeXtBlock2d {
    pub fn load(config: &BlockConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let channels = config.channels;
        let hidden = config.hidden_channels();

        let dwconv = ComplexConv2d::depthwise(
            channels,
            config.kernel_size,
            PaddingMode::Reflect,
            vb.pp("dwconv"),
        )?;
        let norm = complex_norm2d(config.norm, channels, config.norm_eps, vb.pp("norm"))?;
        let pwconv1 = ComplexConv2d::pointwise(channels, hidden, vb.pp("pwconv1"))?;
        let pwconv2 = ComplexConv2d::pointwise(hidden, channels, vb.pp("pwconv2"))?;
        let layer_scale = config
            .layer_scale_init_value
            .map(|init| LayerScale::load(channels, init, vb.clone()))
            .transpose()?;
        let drop_path = DropPath::new(config.drop_prob)?;

        debug!(
            "ComplexConvNeXtBlock2d: channels={} hidden={} kernel={} norm={} drop_prob={} layer_scale={:?}",
            channels,
            hidden,
            config.kernel_size,
            config.norm,
            config.drop_prob,
            config.layer_scale_init_value
        );

        Ok(Self {
            config: config.clone(),
            dwconv,
            norm,
            pwconv1,
            nonlinear: ComplexActivation::default(),
            pwconv2,
            layer_scale,
            drop_path,
        })
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    pub fn layer_scale(&self) -> Option<&LayerScale> {
        self.layer_scale.as_ref()
    }

    pub fn forward_t(&self, x: &ComplexTensor, train: bool) -> Result<ComplexTensor> {
        let hidden = self.dwconv.forward(x)?;
        let hidden = self.norm.forward_t(&hidden, train)?;
        let hidden = self.pwconv1.forward(&hidden)?;
        let hidden = self.nonlinear.forward(&hidden)?;
        let hidden = self.pwconv2.forward(&hidden)?;

        let z = hidden.stack()?;
        let z = match &self.layer_scale {
            Some(scale) => scale.forward(&z)?,
            None => z,
        };
        let z = self.drop_path.forward_t_axis(&z, STACKED_BATCH_AXIS, train)?;
        let branch = ComplexTensor::from_stacked(&z)?;
        x.add(&branch)
    }

    /// Forward pass over separate real and imaginary tensors.
    pub fn forward_pair(
        &self,
        real: &Tensor,
        imag: &Tensor,
        train: bool,
    ) -> Result<(Tensor, Tensor)> {
        let x = ComplexTensor::new(real.clone(), imag.clone())?;
        Ok(self.forward_t(&x, train)?.into_parts())
    }
}
