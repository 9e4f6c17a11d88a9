//! 2D convolutions with explicit boundary padding.

use candle_core::Tensor;
use candle_nn::{Conv2dConfig, Init, Module, VarBuilder};

use super::padding::{pad2d, PaddingMode};
use crate::config::KernelSize;
use crate::error::{Error, Result};

/// Grouped 2D convolution over (batch, channels, height, width) inputs.
///
/// Padding is applied before the convolution so that reflect boundaries are
/// available; the wrapped candle convolution itself never pads.
#[derive(Debug, Clone)]
pub struct Conv2d {
    conv: candle_nn::Conv2d,
    padding: (usize, usize),
    padding_mode: PaddingMode,
}

impl Conv2d {
    #[allow(clippy::too_many_arguments)]
    pub fn load(
        in_channels: usize,
        out_channels: usize,
        kernel_size: KernelSize,
        groups: usize,
        with_bias: bool,
        padding: (usize, usize),
        padding_mode: PaddingMode,
        vb: VarBuilder,
    ) -> Result<Self> {
        if groups == 0 || in_channels % groups != 0 || out_channels % groups != 0 {
            return Err(Error::ConfigError(format!(
                "channels ({in_channels} -> {out_channels}) must be divisible by groups ({groups})"
            )));
        }
        let in_per_group = in_channels / groups;
        let weight = vb.get_with_hints(
            (
                out_channels,
                in_per_group,
                kernel_size.height,
                kernel_size.width,
            ),
            "weight",
            candle_nn::init::DEFAULT_KAIMING_NORMAL,
        )?;
        let bias = if with_bias {
            let fan_in = in_per_group * kernel_size.height * kernel_size.width;
            let bound = 1. / (fan_in as f64).sqrt();
            Some(vb.get_with_hints(
                out_channels,
                "bias",
                Init::Uniform {
                    lo: -bound,
                    up: bound,
                },
            )?)
        } else {
            None
        };
        let config = Conv2dConfig {
            padding: 0,
            stride: 1,
            dilation: 1,
            groups,
            ..Default::default()
        };
        Ok(Self {
            conv: candle_nn::Conv2d::new(weight, bias, config),
            padding,
            padding_mode,
        })
    }

    /// Depthwise convolution: one filter per channel, no bias, same-size output.
    pub fn depthwise(
        channels: usize,
        kernel_size: KernelSize,
        padding_mode: PaddingMode,
        vb: VarBuilder,
    ) -> Result<Self> {
        Self::load(
            channels,
            channels,
            kernel_size,
            channels,
            false,
            kernel_size.same_padding(),
            padding_mode,
            vb,
        )
    }

    /// 1x1 convolution with bias, used to mix channels.
    pub fn pointwise(in_channels: usize, out_channels: usize, vb: VarBuilder) -> Result<Self> {
        Self::load(
            in_channels,
            out_channels,
            KernelSize::square(1),
            1,
            true,
            (0, 0),
            PaddingMode::Zeros,
            vb,
        )
    }

    pub fn weight(&self) -> &Tensor {
        self.conv.weight()
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.conv.bias()
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = pad2d(x, self.padding, self.padding_mode)?;
        self.conv.forward(&x).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_depthwise_keeps_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let conv =
            Conv2d::depthwise(4, KernelSize::new(3, 5), PaddingMode::Reflect, vb.pp("dw")).unwrap();
        assert_eq!(conv.weight().dims(), &[4, 1, 3, 5]);
        assert!(conv.bias().is_none());

        let x = Tensor::randn(0f32, 1f32, (2, 4, 6, 8), &device).unwrap();
        let y = conv.forward(&x).unwrap();
        assert_eq!(y.dims(), &[2, 4, 6, 8]);
    }

    #[test]
    fn test_depthwise_channels_independent() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let conv = Conv2d::depthwise(2, KernelSize::square(3), PaddingMode::Reflect, vb).unwrap();

        // Zeroing channel 1 of the input must leave channel 0 of the output untouched.
        let x = Tensor::randn(0f32, 1f32, (1, 2, 5, 5), &device).unwrap();
        let zeros = Tensor::zeros((1, 1, 5, 5), DType::F32, &device).unwrap();
        let x_masked = Tensor::cat(&[&x.narrow(1, 0, 1).unwrap(), &zeros], 1).unwrap();

        let y = conv.forward(&x).unwrap().narrow(1, 0, 1).unwrap();
        let y_masked = conv.forward(&x_masked).unwrap().narrow(1, 0, 1).unwrap();
        let diff = (y - y_masked)
            .unwrap()
            .abs()
            .unwrap()
            .max_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_pointwise_changes_channels() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let conv = Conv2d::pointwise(3, 12, vb).unwrap();
        assert_eq!(conv.bias().unwrap().dims(), &[12]);

        let x = Tensor::randn(0f32, 1f32, (2, 3, 4, 4), &device).unwrap();
        assert_eq!(conv.forward(&x).unwrap().dims(), &[2, 12, 4, 4]);
    }

    #[test]
    fn test_channel_mismatch_surfaces_engine_error() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let conv = Conv2d::pointwise(3, 6, vb).unwrap();

        let x = Tensor::randn(0f32, 1f32, (1, 5, 4, 4), &device).unwrap();
        assert!(matches!(conv.forward(&x), Err(Error::Candle(_))));
    }

    #[test]
    fn test_invalid_groups() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let err = Conv2d::load(
            4,
            6,
            KernelSize::square(3),
            4,
            false,
            (1, 1),
            PaddingMode::Zeros,
            vb,
        )
        .unwrap_err();
        assert!(err.is_config());
    }
}
