//! Configuration types for ConvNeXt residual blocks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Spatial size of the depthwise convolution kernel.
///
/// Deserializes from either a single integer (square kernel) or a
/// `[height, width]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KernelSizeRepr", into = "KernelSizeRepr")]
pub struct KernelSize {
    pub height: usize,
    pub width: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum KernelSizeRepr {
    Square(usize),
    Pair([usize; 2]),
}

impl From<KernelSizeRepr> for KernelSize {
    fn from(repr: KernelSizeRepr) -> Self {
        match repr {
            KernelSizeRepr::Square(k) => KernelSize::square(k),
            KernelSizeRepr::Pair([height, width]) => KernelSize { height, width },
        }
    }
}

impl From<KernelSize> for KernelSizeRepr {
    fn from(kernel: KernelSize) -> Self {
        if kernel.height == kernel.width {
            KernelSizeRepr::Square(kernel.height)
        } else {
            KernelSizeRepr::Pair([kernel.height, kernel.width])
        }
    }
}

impl KernelSize {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Padding that keeps the spatial dimensions unchanged for an odd kernel.
    pub fn same_padding(&self) -> (usize, usize) {
        (self.height / 2, self.width / 2)
    }
}

impl From<usize> for KernelSize {
    fn from(size: usize) -> Self {
        KernelSize::square(size)
    }
}

impl From<(usize, usize)> for KernelSize {
    fn from((height, width): (usize, usize)) -> Self {
        KernelSize::new(height, width)
    }
}

impl fmt::Display for KernelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Normalization strategy applied after the depthwise convolution.
///
/// Serialized as `"layer"` or `"batch"`; parsing goes through [`FromStr`] in
/// both the string and serde paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum NormKind {
    /// Per-sample, per-position statistics across channels.
    #[default]
    Layer,
    /// Per-channel statistics across the batch.
    Batch,
}

impl NormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormKind::Layer => "layer",
            NormKind::Batch => "batch",
        }
    }
}

impl FromStr for NormKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "layer" | "layer_norm" | "layernorm" => Ok(NormKind::Layer),
            "batch" | "batch_norm" | "batchnorm" => Ok(NormKind::Batch),
            other => Err(Error::ConfigError(format!(
                "invalid normalization choice '{other}' (expected 'layer' or 'batch')"
            ))),
        }
    }
}

impl TryFrom<String> for NormKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<NormKind> for String {
    fn from(kind: NormKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters of a ConvNeXt block, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Number of input and output channels
    pub channels: usize,

    /// Channel expansion factor of the first pointwise convolution
    #[serde(default = "default_mult_channels")]
    pub mult_channels: usize,

    /// Depthwise convolution kernel size (both dimensions must be odd)
    #[serde(default = "default_kernel_size")]
    pub kernel_size: KernelSize,

    /// Stochastic depth probability
    #[serde(default)]
    pub drop_prob: f64,

    /// Normalization strategy
    #[serde(default)]
    pub norm: NormKind,

    /// Initial value of the learnable layer scale; no scaling when absent
    #[serde(default)]
    pub layer_scale_init_value: Option<f64>,

    /// Epsilon used by the normalization layer
    #[serde(default = "default_norm_eps")]
    pub norm_eps: f64,
}

fn default_mult_channels() -> usize {
    2
}

fn default_kernel_size() -> KernelSize {
    KernelSize::square(7)
}

fn default_norm_eps() -> f64 {
    1e-6
}

impl BlockConfig {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            mult_channels: default_mult_channels(),
            kernel_size: default_kernel_size(),
            drop_prob: 0.0,
            norm: NormKind::default(),
            layer_scale_init_value: None,
            norm_eps: default_norm_eps(),
        }
    }

    pub fn with_mult_channels(mut self, mult_channels: usize) -> Self {
        self.mult_channels = mult_channels;
        self
    }

    pub fn with_kernel_size(mut self, kernel_size: impl Into<KernelSize>) -> Self {
        self.kernel_size = kernel_size.into();
        self
    }

    pub fn with_drop_prob(mut self, drop_prob: f64) -> Self {
        self.drop_prob = drop_prob;
        self
    }

    pub fn with_norm(mut self, norm: NormKind) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_layer_scale(mut self, init_value: Option<f64>) -> Self {
        self.layer_scale_init_value = init_value;
        self
    }

    pub fn with_norm_eps(mut self, norm_eps: f64) -> Self {
        self.norm_eps = norm_eps;
        self
    }

    /// Number of channels after the expansion convolution.
    pub fn hidden_channels(&self) -> usize {
        self.channels * self.mult_channels
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(Error::ConfigError("channels must be positive".to_string()));
        }
        if self.mult_channels == 0 {
            return Err(Error::ConfigError(
                "mult_channels must be positive".to_string(),
            ));
        }
        if self.kernel_size.height % 2 == 0 {
            return Err(Error::ConfigError(format!(
                "kernel height must be odd, got {}",
                self.kernel_size.height
            )));
        }
        if self.kernel_size.width % 2 == 0 {
            return Err(Error::ConfigError(format!(
                "kernel width must be odd, got {}",
                self.kernel_size.width
            )));
        }
        if !(0.0..=1.0).contains(&self.drop_prob) {
            return Err(Error::ConfigError(format!(
                "drop_prob must be within [0, 1], got {}",
                self.drop_prob
            )));
        }
        if self.norm_eps.is_nan() || self.norm_eps <= 0.0 {
            return Err(Error::ConfigError(format!(
                "norm_eps must be positive, got {}",
                self.norm_eps
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON block configuration.
    ///
    /// Well-formed JSON carrying bad values (unknown norm, wrong types) is a
    /// [`Error::ConfigError`]; malformed JSON stays [`Error::Json`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BlockConfig = serde_json::from_str(json).map_err(|e| {
            if e.is_data() {
                Error::ConfigError(e.to_string())
            } else {
                Error::from(e)
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON block configuration from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }
}
