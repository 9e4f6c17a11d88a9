//! Real-valued building blocks.
//!
//! - Padded grouped convolutions (zero or reflect boundaries)
//! - Layer/batch normalization strategies for channel-first maps
//! - Stochastic depth and layer scale for residual branches

mod conv;
mod drop_path;
mod layer_scale;
mod norm;
mod padding;

pub use conv::Conv2d;
pub use drop_path::DropPath;
pub use layer_scale::LayerScale;
pub use norm::{norm2d, BatchNorm2d, LayerNorm2d, Norm2d};
pub use padding::{pad2d, PaddingMode};
