//! Learned per-channel scaling of a residual branch.

use candle_core::Tensor;
use candle_nn::{Init, VarBuilder};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct LayerScale {
    /// Scale vector with shape `[1, channels, 1, 1]`.
    gamma: Tensor,
}

impl LayerScale {
    pub fn load(channels: usize, init_value: f64, vb: VarBuilder) -> Result<Self> {
        let gamma = vb.get_with_hints((1, channels, 1, 1), "gamma", Init::Const(init_value))?;
        Ok(Self { gamma })
    }

    pub fn gamma(&self) -> &Tensor {
        &self.gamma
    }

    /// Scale a `[B, C, H, W]` tensor, or a stacked `[2, B, C, H, W]` complex one.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        x.broadcast_mul(&self.gamma).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_scale_per_channel() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let scale = LayerScale::load(3, 0.5, vb).unwrap();
        assert_eq!(scale.gamma().dims(), &[1, 3, 1, 1]);

        let x = Tensor::ones((2, 3, 2, 2), DType::F32, &device).unwrap();
        let y = scale.forward(&x).unwrap();
        assert_eq!(y.sum_all().unwrap().to_scalar::<f32>().unwrap(), 12.0);

        let stacked = Tensor::ones((2, 2, 3, 2, 2), DType::F32, &device).unwrap();
        let y = scale.forward(&stacked).unwrap();
        assert_eq!(y.dims(), &[2, 2, 3, 2, 2]);
        assert_eq!(y.sum_all().unwrap().to_scalar::<f32>().unwrap(), 24.0);
    }
}
