//! Split complex activation.

use candle_nn::{Activation, Module};

use super::ComplexTensor;
use crate::error::Result;

/// Applies a real-valued activation independently to the real and imaginary parts.
#[derive(Debug, Clone)]
pub struct ComplexActivation {
    activation: Activation,
}

impl ComplexActivation {
    pub fn new(activation: Activation) -> Self {
        Self { activation }
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn forward(&self, x: &ComplexTensor) -> Result<ComplexTensor> {
        x.try_map(|t| self.activation.forward(t))
    }
}

impl Default for ComplexActivation {
    /// Exact (erf) GELU.
    fn default() -> Self {
        Self::new(Activation::Gelu)
    }
}
