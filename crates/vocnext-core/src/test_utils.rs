//! Helpers shared by the unit tests.

use candle_core::Tensor;
use candle_nn::VarMap;

pub fn max_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
    (a - b)
        .unwrap()
        .abs()
        .unwrap()
        .max_all()
        .unwrap()
        .to_scalar::<f32>()
        .unwrap()
}

/// Largest absolute value of every sample along the leading axis.
pub fn per_sample_max_abs(t: &Tensor) -> Vec<f32> {
    t.abs()
        .unwrap()
        .flatten_from(1)
        .unwrap()
        .max(1)
        .unwrap()
        .to_vec1::<f32>()
        .unwrap()
}

/// Overwrite a registered parameter in place.
pub fn set_var(varmap: &VarMap, name: &str, value: Tensor) {
    let vars = varmap.data().lock().unwrap();
    let var = vars
        .get(name)
        .unwrap_or_else(|| panic!("unknown parameter {name}"));
    var.set(&value).unwrap();
}
