//! Complex-valued 2D convolution.

use candle_core::Tensor;
use candle_nn::VarBuilder;

use super::ComplexTensor;
use crate::config::KernelSize;
use crate::error::Result;
use crate::nn::{Conv2d, PaddingMode};

/// Convolution with a complex kernel `W = Wr + i Wi`:
/// `(a + ib) * W = (Wr a - Wi b) + i (Wr b + Wi a)`.
#[derive(Debug, Clone)]
pub struct ComplexConv2d {
    real: Conv2d,
    imag: Conv2d,
}

impl ComplexConv2d {
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
        let real = Conv2d::load(
            in_channels,
            out_channels,
            kernel_size,
            groups,
            with_bias,
            padding,
            padding_mode,
            vb.pp("real"),
        )?;
        let imag = Conv2d::load(
            in_channels,
            out_channels,
            kernel_size,
            groups,
            with_bias,
            padding,
            padding_mode,
            vb.pp("imag"),
        )?;
        Ok(Self { real, imag })
    }

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

    pub fn real_conv(&self) -> &Conv2d {
        &self.real
    }

    pub fn imag_conv(&self) -> &Conv2d {
        &self.imag
    }

    pub fn forward(&self, x: &ComplexTensor) -> Result<ComplexTensor> {
        let batch = x.real().dim(0)?;
        // Run both kernels once over [real; imag] concatenated on the batch axis.
        let joined = Tensor::cat(&[x.real(), x.imag()], 0)?;
        let by_real = self.real.forward(&joined)?;
        let by_imag = self.imag.forward(&joined)?;

        let real_a = by_real.narrow(0, 0, batch)?;
        let real_b = by_real.narrow(0, batch, batch)?;
        let imag_a = by_imag.narrow(0, 0, batch)?;
        let imag_b = by_imag.narrow(0, batch, batch)?;

        ComplexTensor::new((real_a - imag_b)?, (real_b + imag_a)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;
    use std::collections::HashMap;

    #[test]
    fn test_complex_multiplication() {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        let scalar = |v: f32| Tensor::new(&[[[[v]]]], &device).unwrap();
        tensors.insert("real.weight".to_string(), scalar(2.0));
        tensors.insert("real.bias".to_string(), Tensor::new(&[0f32], &device).unwrap());
        tensors.insert("imag.weight".to_string(), scalar(3.0));
        tensors.insert("imag.bias".to_string(), Tensor::new(&[0f32], &device).unwrap());
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let conv = ComplexConv2d::pointwise(1, 1, vb).unwrap();

        // (2 + 3i)(1 + i) = -1 + 5i ; (2 + 3i)(0.5 - 2i) = 7 - 2.5i
        let real = Tensor::new(&[[[[1f32]]], [[[0.5]]]], &device).unwrap();
        let imag = Tensor::new(&[[[[1f32]]], [[[-2.0]]]], &device).unwrap();
        let y = conv
            .forward(&ComplexTensor::new(real, imag).unwrap())
            .unwrap();
        assert_eq!(
            y.real().flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            vec![-1.0, 7.0]
        );
        assert_eq!(
            y.imag().flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            vec![5.0, -2.5]
        );
    }

    #[test]
    fn test_depthwise_complex_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let conv =
            ComplexConv2d::depthwise(3, KernelSize::new(5, 3), PaddingMode::Reflect, vb).unwrap();
        assert_eq!(conv.real_conv().weight().dims(), &[3, 1, 5, 3]);
        assert_eq!(conv.imag_conv().weight().dims(), &[3, 1, 5, 3]);

        let real = Tensor::randn(0f32, 1f32, (2, 3, 6, 7), &device).unwrap();
        let imag = Tensor::randn(0f32, 1f32, (2, 3, 6, 7), &device).unwrap();
        let y = conv
            .forward(&ComplexTensor::new(real, imag).unwrap())
            .unwrap();
        assert_eq!(y.dims(), &[2, 3, 6, 7]);
    }
}
