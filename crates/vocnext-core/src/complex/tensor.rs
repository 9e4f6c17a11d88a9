//! Complex feature maps as (real, imaginary) tensor pairs.

use candle_core::{Shape, Tensor};

use crate::error::{Error, Result};

/// A complex-valued feature map.
///
/// Both parts always share one shape; every operation acts on the two parts
/// together so they cannot be re-paired with a mismatched partner.
#[derive(Debug, Clone)]
pub struct ComplexTensor {
    real: Tensor,
    imag: Tensor,
}

impl ComplexTensor {
    pub fn new(real: Tensor, imag: Tensor) -> Result<Self> {
        if real.dims() != imag.dims() {
            return Err(Error::ShapeMismatch {
                expected: real.dims().to_vec(),
                actual: imag.dims().to_vec(),
            });
        }
        if real.dtype() != imag.dtype() {
            return Err(Error::InvalidInput(format!(
                "real part is {:?} but imaginary part is {:?}",
                real.dtype(),
                imag.dtype()
            )));
        }
        Ok(Self { real, imag })
    }

    /// Complex map with a zero imaginary part.
    pub fn from_real(real: Tensor) -> Result<Self> {
        let imag = real.zeros_like()?;
        Ok(Self { real, imag })
    }

    pub fn real(&self) -> &Tensor {
        &self.real
    }

    pub fn imag(&self) -> &Tensor {
        &self.imag
    }

    pub fn into_parts(self) -> (Tensor, Tensor) {
        (self.real, self.imag)
    }

    pub fn shape(&self) -> &Shape {
        self.real.shape()
    }

    pub fn dims(&self) -> &[usize] {
        self.real.dims()
    }

    /// Stack into a single tensor with a new leading axis (0 = real, 1 = imaginary).
    pub fn stack(&self) -> Result<Tensor> {
        Tensor::stack(&[&self.real, &self.imag], 0).map_err(Error::from)
    }

    /// Inverse of [`ComplexTensor::stack`].
    pub fn from_stacked(z: &Tensor) -> Result<Self> {
        let components = z.dim(0)?;
        if components != 2 {
            return Err(Error::InvalidInput(format!(
                "stacked complex tensor must have 2 components on axis 0, got {components}"
            )));
        }
        Self::new(z.get(0)?, z.get(1)?)
    }

    /// Apply the same real-valued operation to both parts.
    pub fn try_map<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Tensor) -> candle_core::Result<Tensor>,
    {
        Self::new(f(&self.real)?, f(&self.imag)?)
    }

    /// Component-wise sum; both operands must have the same shape.
    pub fn add(&self, rhs: &ComplexTensor) -> Result<Self> {
        Self::new(self.real.add(&rhs.real)?, self.imag.add(&rhs.imag)?)
    }

    /// Elementwise magnitude `sqrt(re^2 + im^2)`.
    pub fn magnitude(&self) -> Result<Tensor> {
        let power = (self.real.sqr()? + self.imag.sqr()?)?;
        power.sqrt().map_err(Error::from)
    }
}
