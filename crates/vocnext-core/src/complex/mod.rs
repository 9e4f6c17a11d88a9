//! Complex-valued building blocks operating on (real, imaginary) pairs.

mod activation;
mod conv;
mod norm;
mod tensor;

pub use activation::ComplexActivation;
pub use conv::ComplexConv2d;
pub use norm::{complex_norm2d, ComplexBatchNorm2d, ComplexLayerNorm2d, ComplexNorm2d};
pub use tensor::ComplexTensor;
