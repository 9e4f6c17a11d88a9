//! Spatial padding for (batch, channels, height, width) feature maps.

use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Boundary handling used when padding a convolution input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    #[default]
    Zeros,
    /// Mirror the signal without repeating the edge sample.
    Reflect,
}

/// Pad the two trailing spatial dimensions of a 4D tensor by `(pad_h, pad_w)` on each side.
pub fn pad2d(x: &Tensor, padding: (usize, usize), mode: PaddingMode) -> Result<Tensor> {
    let (pad_h, pad_w) = padding;
    if pad_h == 0 && pad_w == 0 {
        return Ok(x.clone());
    }
    match mode {
        PaddingMode::Zeros => {
            let x = x.pad_with_zeros(2, pad_h, pad_h)?;
            x.pad_with_zeros(3, pad_w, pad_w).map_err(Error::from)
        }
        PaddingMode::Reflect => {
            let x = reflect_pad_dim(x, 2, pad_h)?;
            reflect_pad_dim(&x, 3, pad_w)
        }
    }
}

fn reflect_pad_dim(x: &Tensor, dim: usize, pad: usize) -> Result<Tensor> {
    if pad == 0 {
        return Ok(x.clone());
    }
    let len = x.dim(dim)?;
    if pad >= len {
        return Err(Error::InvalidInput(format!(
            "reflect padding {pad} must be smaller than input size {len} on dim {dim}"
        )));
    }
    let indices = reflect_indices(len, pad, x.device())?;
    x.index_select(&indices, dim).map_err(Error::from)
}

fn reflect_indices(len: usize, pad: usize, device: &Device) -> Result<Tensor> {
    let last = (len - 1) as i64;
    let indices: Vec<u32> = (0..len + 2 * pad)
        .map(|i| {
            let src = i as i64 - pad as i64;
            let src = if src < 0 {
                -src
            } else if src > last {
                2 * last - src
            } else {
                src
            };
            src as u32
        })
        .collect();
    Tensor::new(indices.as_slice(), device).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_pad_values() {
        let device = Device::Cpu;
        let x = Tensor::new(&[[[[1f32, 2., 3.], [4., 5., 6.]]]], &device).unwrap();
        let y = pad2d(&x, (1, 2), PaddingMode::Reflect).unwrap();
        assert_eq!(y.dims(), &[1, 1, 4, 7]);
        let rows = y.squeeze(0).unwrap().squeeze(0).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(rows[0], vec![6., 5., 4., 5., 6., 5., 4.]);
        assert_eq!(rows[1], vec![3., 2., 1., 2., 3., 2., 1.]);
        assert_eq!(rows[2], vec![6., 5., 4., 5., 6., 5., 4.]);
        assert_eq!(rows[3], vec![3., 2., 1., 2., 3., 2., 1.]);
    }

    #[test]
    fn test_zero_pad_values() {
        let device = Device::Cpu;
        let x = Tensor::ones((1, 1, 2, 2), candle_core::DType::F32, &device).unwrap();
        let y = pad2d(&x, (1, 0), PaddingMode::Zeros).unwrap();
        assert_eq!(y.dims(), &[1, 1, 4, 2]);
        let total = y.sum_all().unwrap().to_scalar::<f32>().unwrap();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_reflect_pad_too_wide() {
        let device = Device::Cpu;
        let x = Tensor::zeros((1, 1, 2, 5), candle_core::DType::F32, &device).unwrap();
        let err = pad2d(&x, (2, 1), PaddingMode::Reflect).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
