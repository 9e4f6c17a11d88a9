//! Channel normalization strategies for (batch, channels, height, width) inputs.

use candle_core::Tensor;
use candle_nn::{BatchNormConfig, LayerNormConfig, Module, ModuleT, VarBuilder};

use crate::config::NormKind;
use crate::error::{Error, Result};

/// Normalization applied between the depthwise and pointwise convolutions.
pub trait Norm2d: std::fmt::Debug + Send + Sync {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor>;

    fn kind(&self) -> NormKind;
}

/// Build the normalization strategy selected by `kind`.
pub fn norm2d(kind: NormKind, channels: usize, eps: f64, vb: VarBuilder) -> Result<Box<dyn Norm2d>> {
    Ok(match kind {
        NormKind::Layer => Box::new(LayerNorm2d::load(channels, eps, vb)?),
        NormKind::Batch => Box::new(BatchNorm2d::load(channels, eps, vb)?),
    })
}

/// Layer normalization over the channel axis at every spatial position.
#[derive(Debug, Clone)]
pub struct LayerNorm2d {
    norm: candle_nn::LayerNorm,
}

impl LayerNorm2d {
    pub fn load(channels: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        let norm = candle_nn::layer_norm(
            channels,
            LayerNormConfig {
                eps,
                ..Default::default()
            },
            vb,
        )?;
        Ok(Self { norm })
    }
}

impl Norm2d for LayerNorm2d {
    fn forward_t(&self, x: &Tensor, _train: bool) -> Result<Tensor> {
        // [B, C, H, W] -> [B, H, W, C]
        let hidden = x.permute((0, 2, 3, 1))?;
        let hidden = self.norm.forward(&hidden)?;
        hidden.permute((0, 3, 1, 2)).map_err(Error::from)
    }

    fn kind(&self) -> NormKind {
        NormKind::Layer
    }
}

/// Batch normalization with per-channel running statistics.
#[derive(Debug, Clone)]
pub struct BatchNorm2d {
    norm: candle_nn::BatchNorm,
}

impl BatchNorm2d {
    pub fn load(channels: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        let norm = candle_nn::batch_norm(
            channels,
            BatchNormConfig {
                eps,
                remove_mean: true,
                affine: true,
                momentum: 0.1,
            },
            vb,
        )?;
        Ok(Self { norm })
    }

    pub fn running_mean(&self) -> &Tensor {
        self.norm.running_mean()
    }

    pub fn running_var(&self) -> &Tensor {
        self.norm.running_var()
    }
}

impl Norm2d for BatchNorm2d {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        self.norm.forward_t(x, train).map_err(Error::from)
    }

    fn kind(&self) -> NormKind {
        NormKind::Batch
    }
}
