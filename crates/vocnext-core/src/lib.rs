//! vocnext-core - ConvNeXt residual blocks for neural vocoders
//!
//! This crate provides the residual building blocks of a spectral-domain
//! vocoder on top of the candle tensor engine:
//! - [`ConvNeXtBlock2d`]: depthwise conv, layer/batch norm, pointwise
//!   expansion, GELU, pointwise projection, optional layer scale and
//!   stochastic depth around a residual connection
//! - [`ComplexConvNeXtBlock2d`]: the same pipeline over (real, imaginary)
//!   feature maps, with scale and stochastic depth applied jointly to both
//!   parts
//!
//! Parameters are registered through a [`candle_nn::VarBuilder`]; back it
//! with a [`candle_nn::VarMap`] to train with any candle optimizer, or with
//! safetensors to load weights.
//!
//! # Example
//!
//! ```ignore
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use vocnext_core::{BlockConfig, ConvNeXtBlock2d};
//!
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//! let config = BlockConfig::new(32).with_layer_scale(Some(1e-6));
//! let block = ConvNeXtBlock2d::load(&config, vb.pp("blocks.0"))?;
//!
//! let x = Tensor::randn(0f32, 1f32, (1, 32, 64, 80), &Device::Cpu)?;
//! let y = block.forward_t(&x, false)?;
//! ```

pub mod blocks;
pub mod complex;
pub mod config;
pub mod error;
pub mod nn;

#[cfg(test)]
mod test_utils;

pub use blocks::{ComplexConvNeXtBlock2d, ConvNeXtBlock2d};
pub use complex::ComplexTensor;
pub use config::{BlockConfig, KernelSize, NormKind};
pub use error::{Error, Result};
