//! ConvNeXt residual block for real-valued feature maps.

use candle_core::Tensor;
use candle_nn::{Activation, Module, ModuleT, VarBuilder};
use tracing::debug;

use crate::config::BlockConfig;
use crate::error::{Error, Result};
use crate::nn::{norm2d, Conv2d, DropPath, LayerScale, Norm2d, PaddingMode};

/// 2D ConvNeXt block:
/// depthwise conv -> norm -> pointwise expansion -> GELU -> pointwise projection
/// -> optional layer scale -> stochastic depth -> residual add.
///
/// Input and output are `[batch, channels, height, width]` with identical shapes.
#[derive(Debug)]
pub struct ConvNeXtBlock2d {
    config: BlockConfig,
    dwconv: Conv2d,
    norm: Box<dyn Norm2d>,
    pwconv1: Conv2d,
    nonlinear: Activation,
    pwconv2: Conv2d,
    layer_scale: Option<LayerScale>,
    drop_path: DropPath,
}

impl ConvNeXtBlock2d {
    pub fn load(config: &BlockConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let channels = config.channels;
        let hidden = config.hidden_channels();

        let dwconv = Conv2d::depthwise(
            channels,
            config.kernel_size,
            PaddingMode::Reflect,
            vb.pp("dwconv"),
        )?;
        let norm = norm2d(config.norm, channels, config.norm_eps, vb.pp("norm"))?;
        let pwconv1 = Conv2d::pointwise(channels, hidden, vb.pp("pwconv1"))?;
        let pwconv2 = Conv2d::pointwise(hidden, channels, vb.pp("pwconv2"))?;
        let layer_scale = config
            .layer_scale_init_value
            .map(|init| LayerScale::load(channels, init, vb.clone()))
            .transpose()?;
        let drop_path = DropPath::new(config.drop_prob)?;

        debug!(
            "ConvNeXtBlock2d: channels={} hidden={} kernel={} norm={} drop_prob={} layer_scale={:?}",
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
            nonlinear: Activation::Gelu,
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

    pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let residual = x;
        let hidden = self.dwconv.forward(x)?;
        let hidden = self.norm.forward_t(&hidden, train)?;
        let hidden = self.pwconv1.forward(&hidden)?;
        let hidden = self.nonlinear.forward(&hidden)?;
        let hidden = self.pwconv2.forward(&hidden)?;
        let hidden = match &self.layer_scale {
            Some(scale) => scale.forward(&hidden)?,
            None => hidden,
        };
        let hidden = self.drop_path.forward_t(&hidden, train)?;
        residual.add(&hidden).map_err(Error::from)
    }
}

impl ModuleT for ConvNeXtBlock2d {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        ConvNeXtBlock2d::forward_t(self, xs, train).map_err(candle_core::Error::from)
    }
}
