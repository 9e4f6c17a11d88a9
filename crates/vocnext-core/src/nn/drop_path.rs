//! Stochastic depth.
//!
//! During training each sample's residual branch is zeroed with probability
//! `drop_prob` and kept samples are rescaled by `1 / (1 - drop_prob)`, so the
//! expected branch matches evaluation mode, where the branch passes through
//! untouched.

use candle_core::{DType, Device, Tensor};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropPath {
    drop_prob: f64,
}

impl DropPath {
    pub fn new(drop_prob: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&drop_prob) {
            return Err(Error::ConfigError(format!(
                "drop_prob must be within [0, 1], got {drop_prob}"
            )));
        }
        Ok(Self { drop_prob })
    }

    pub fn drop_prob(&self) -> f64 {
        self.drop_prob
    }

    pub fn keep_prob(&self) -> f64 {
        1.0 - self.drop_prob
    }

    /// Whether a forward pass in this mode may alter its input.
    pub fn is_active(&self, train: bool) -> bool {
        train && self.drop_prob > 0.0
    }

    /// Draw one keep/drop decision per sample.
    ///
    /// Returns a `(batch,)` tensor holding `0` for dropped samples and
    /// `1 / keep_prob` for kept ones.
    pub fn sample_mask(&self, batch: usize, dtype: DType, device: &Device) -> Result<Tensor> {
        let uniform = Tensor::rand(0f32, 1f32, batch, device)?;
        let mask = uniform.ge(self.drop_prob)?.to_dtype(dtype)?;
        let keep = self.keep_prob();
        if keep > 0.0 {
            mask.affine(1.0 / keep, 0.0).map_err(Error::from)
        } else {
            Ok(mask)
        }
    }

    /// Multiply `x` by a per-sample `mask` laid out along `axis`.
    pub fn apply_mask(x: &Tensor, mask: &Tensor, axis: usize) -> Result<Tensor> {
        let mut shape = vec![1usize; x.rank()];
        shape[axis] = x.dim(axis)?;
        let mask = mask.reshape(shape)?;
        x.broadcast_mul(&mask).map_err(Error::from)
    }

    /// Apply stochastic depth with samples laid out along `axis`.
    pub fn forward_t_axis(&self, x: &Tensor, axis: usize, train: bool) -> Result<Tensor> {
        if !self.is_active(train) {
            return Ok(x.clone());
        }
        let mask = self.sample_mask(x.dim(axis)?, x.dtype(), x.device())?;
        Self::apply_mask(x, &mask, axis)
    }

    /// Apply stochastic depth to a batch-first tensor.
    pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        self.forward_t_axis(x, 0, train)
    }
}
