//! Complex normalization by 2x2 covariance whitening.
//!
//! Each (real, imaginary) pair is centred, multiplied by the inverse square
//! root of its covariance `[[Vrr, Vri], [Vri, Vii]]` and passed through a
//! learned complex affine map. Layer and batch variants differ only in the
//! axes the statistics are gathered over.

use candle_core::{Tensor, Var};
use candle_nn::{Init, VarBuilder};

use super::ComplexTensor;
use crate::config::NormKind;
use crate::error::{Error, Result};

const INV_SQRT_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Normalization applied to complex feature maps.
pub trait ComplexNorm2d: std::fmt::Debug + Send + Sync {
    fn forward_t(&self, x: &ComplexTensor, train: bool) -> Result<ComplexTensor>;

    fn kind(&self) -> NormKind;
}

/// Build the complex normalization strategy selected by `kind`.
pub fn complex_norm2d(
    kind: NormKind,
    channels: usize,
    eps: f64,
    vb: VarBuilder,
) -> Result<Box<dyn ComplexNorm2d>> {
    Ok(match kind {
        NormKind::Layer => Box::new(ComplexLayerNorm2d::load(channels, eps, vb)?),
        NormKind::Batch => Box::new(ComplexBatchNorm2d::load(channels, eps, vb)?),
    })
}

/// Second-order statistics of a complex feature map.
struct Moments {
    mean_real: Tensor,
    mean_imag: Tensor,
    vrr: Tensor,
    vri: Tensor,
    vii: Tensor,
}

impl Moments {
    fn gather<F>(x: &ComplexTensor, reduce: F) -> Result<Self>
    where
        F: Fn(&Tensor) -> candle_core::Result<Tensor>,
    {
        let mean_real = reduce(x.real())?;
        let mean_imag = reduce(x.imag())?;
        let centred_real = x.real().broadcast_sub(&mean_real)?;
        let centred_imag = x.imag().broadcast_sub(&mean_imag)?;
        Ok(Self {
            vrr: reduce(&centred_real.sqr()?)?,
            vri: reduce(&(&centred_real * &centred_imag)?)?,
            vii: reduce(&centred_imag.sqr()?)?,
            mean_real,
            mean_imag,
        })
    }
}

/// Centre `x` with `moments` and whiten it by the inverse square root of the covariance.
fn whiten(x: &ComplexTensor, m: &Moments, eps: f64) -> Result<ComplexTensor> {
    let real = x.real().broadcast_sub(&m.mean_real)?;
    let imag = x.imag().broadcast_sub(&m.mean_imag)?;

    let vrr = m.vrr.affine(1.0, eps)?;
    let vii = m.vii.affine(1.0, eps)?;
    let vri = &m.vri;

    // For SPD V: V^-1/2 = adj(V + sI) / (s t), s = sqrt(det V), t = sqrt(tr V + 2s).
    let det = ((&vrr * &vii)? - vri.sqr()?)?;
    let s = det.sqrt()?;
    let t = ((&vrr + &vii)? + s.affine(2.0, 0.0)?)?.sqrt()?;
    let inv_st = (&s * &t)?.recip()?;

    let wrr = (&vii + &s)?.mul(&inv_st)?;
    let wii = (&vrr + &s)?.mul(&inv_st)?;
    let wri = vri.neg()?.mul(&inv_st)?;

    let out_real = (real.broadcast_mul(&wrr)? + imag.broadcast_mul(&wri)?)?;
    let out_imag = (real.broadcast_mul(&wri)? + imag.broadcast_mul(&wii)?)?;
    ComplexTensor::new(out_real, out_imag)
}

/// Learned complex affine map applied after whitening.
#[derive(Debug, Clone)]
struct ComplexAffine {
    gamma_rr: Tensor,
    gamma_ri: Tensor,
    gamma_ii: Tensor,
    beta_real: Tensor,
    beta_imag: Tensor,
}

impl ComplexAffine {
    fn load(channels: usize, vb: &VarBuilder) -> Result<Self> {
        Ok(Self {
            gamma_rr: vb.get_with_hints(channels, "gamma_rr", Init::Const(INV_SQRT_2))?,
            gamma_ri: vb.get_with_hints(channels, "gamma_ri", Init::Const(0.))?,
            gamma_ii: vb.get_with_hints(channels, "gamma_ii", Init::Const(INV_SQRT_2))?,
            beta_real: vb.get_with_hints(channels, "beta_real", Init::Const(0.))?,
            beta_imag: vb.get_with_hints(channels, "beta_imag", Init::Const(0.))?,
        })
    }

    fn forward(&self, x: &ComplexTensor) -> Result<ComplexTensor> {
        let shape = channel_shape(self.gamma_rr.dim(0)?);
        let grr = self.gamma_rr.reshape(shape)?;
        let gri = self.gamma_ri.reshape(shape)?;
        let gii = self.gamma_ii.reshape(shape)?;
        let br = self.beta_real.reshape(shape)?;
        let bi = self.beta_imag.reshape(shape)?;

        let real = (x.real().broadcast_mul(&grr)? + x.imag().broadcast_mul(&gri)?)?;
        let imag = (x.real().broadcast_mul(&gri)? + x.imag().broadcast_mul(&gii)?)?;
        ComplexTensor::new(real.broadcast_add(&br)?, imag.broadcast_add(&bi)?)
    }
}

fn channel_shape(channels: usize) -> (usize, usize, usize, usize) {
    (1, channels, 1, 1)
}

/// Complex layer normalization: statistics across channels per (sample, position).
#[derive(Debug, Clone)]
pub struct ComplexLayerNorm2d {
    affine: ComplexAffine,
    eps: f64,
}

impl ComplexLayerNorm2d {
    pub fn load(channels: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            affine: ComplexAffine::load(channels, &vb)?,
            eps,
        })
    }
}

impl ComplexNorm2d for ComplexLayerNorm2d {
    fn forward_t(&self, x: &ComplexTensor, _train: bool) -> Result<ComplexTensor> {
        let moments = Moments::gather(x, |t| t.mean_keepdim(1))?;
        let whitened = whiten(x, &moments, self.eps)?;
        self.affine.forward(&whitened)
    }

    fn kind(&self) -> NormKind {
        NormKind::Layer
    }
}

/// Complex batch normalization: per-channel statistics across batch and space.
#[derive(Debug, Clone)]
pub struct ComplexBatchNorm2d {
    affine: ComplexAffine,
    running_mean_real: Var,
    running_mean_imag: Var,
    running_vrr: Var,
    running_vri: Var,
    running_vii: Var,
    eps: f64,
    momentum: f64,
}

impl ComplexBatchNorm2d {
    pub fn load(channels: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        let running = |name: &str, init: f64| -> Result<Var> {
            let t = vb.get_with_hints(channels, name, Init::Const(init))?;
            Var::from_tensor(&t).map_err(Error::from)
        };
        Ok(Self {
            affine: ComplexAffine::load(channels, &vb)?,
            running_mean_real: running("running_mean_real", 0.)?,
            running_mean_imag: running("running_mean_imag", 0.)?,
            running_vrr: running("running_vrr", INV_SQRT_2)?,
            running_vri: running("running_vri", 0.)?,
            running_vii: running("running_vii", INV_SQRT_2)?,
            eps,
            momentum: 0.1,
        })
    }

    pub fn running_mean(&self) -> (&Tensor, &Tensor) {
        (
            self.running_mean_real.as_tensor(),
            self.running_mean_imag.as_tensor(),
        )
    }

    pub fn running_covariance(&self) -> (&Tensor, &Tensor, &Tensor) {
        (
            self.running_vrr.as_tensor(),
            self.running_vri.as_tensor(),
            self.running_vii.as_tensor(),
        )
    }

    fn running_moments(&self) -> Result<Moments> {
        let c = self.running_vrr.as_tensor().dim(0)?;
        let shape = channel_shape(c);
        Ok(Moments {
            mean_real: self.running_mean_real.as_tensor().reshape(shape)?,
            mean_imag: self.running_mean_imag.as_tensor().reshape(shape)?,
            vrr: self.running_vrr.as_tensor().reshape(shape)?,
            vri: self.running_vri.as_tensor().reshape(shape)?,
            vii: self.running_vii.as_tensor().reshape(shape)?,
        })
    }

    fn update_running(&self, batch: &Moments) -> Result<()> {
        let m = self.momentum;
        let pairs = [
            (&self.running_mean_real, &batch.mean_real),
            (&self.running_mean_imag, &batch.mean_imag),
            (&self.running_vrr, &batch.vrr),
            (&self.running_vri, &batch.vri),
            (&self.running_vii, &batch.vii),
        ];
        for (running, observed) in pairs {
            let observed = observed.detach().flatten_all()?.to_dtype(running.dtype())?;
            let updated = (running.as_tensor().affine(1.0 - m, 0.0)? + observed.affine(m, 0.0)?)?;
            running.set(&updated)?;
        }
        Ok(())
    }
}

impl ComplexNorm2d for ComplexBatchNorm2d {
    fn forward_t(&self, x: &ComplexTensor, train: bool) -> Result<ComplexTensor> {
        let moments = if train {
            let moments = Moments::gather(x, |t| {
                let c = t.dim(1)?;
                t.transpose(0, 1)?
                    .flatten_from(1)?
                    .mean_keepdim(1)?
                    .reshape(channel_shape(c))
            })?;
            self.update_running(&moments)?;
            moments
        } else {
            self.running_moments()?
        };
        let whitened = whiten(x, &moments, self.eps)?;
        self.affine.forward(&whitened)
    }

    fn kind(&self) -> NormKind {
        NormKind::Batch
    }
}
