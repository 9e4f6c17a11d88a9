//! ConvNeXt residual blocks.

mod complex_convnext;
mod convnext;

pub use complex_convnext::ComplexConvNeXtBlock2d;
pub use convnext::ConvNeXtBlock2d;
