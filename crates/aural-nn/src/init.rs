// nn::init — parameter initialization
//
// Standalone functions for creating freshly initialized parameter tensors,
// following the torch.nn.init conventions. The layer constructors route
// through these so every parameter in the network is drawn the same way:
//
//   uniform(shape, low, high)       — U(low, high)
//   normal(shape, mean, std)        — N(mean, std)
//   constant(shape, val)            — all elements = val
//   zeros(shape)                    — all zeros
//   xavier_uniform(shape, gain)     — Glorot uniform
//   kaiming_uniform(shape, a, mode) — He uniform
//
// Every function returns a tensor with `set_variable()` already applied,
// so the result participates in gradient tracking immediately.

use aural_core::backend::Backend;
use aural_core::dtype::DType;
use aural_core::error::Result;
use aural_core::shape::Shape;
use aural_core::tensor::Tensor;

/// Fan selection mode for Kaiming initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    /// Use fan_in (input features); preserves variance in the forward pass.
    FanIn,
    /// Use fan_out (output features); preserves variance in the backward pass.
    FanOut,
}

/// Compute (fan_in, fan_out) from a parameter shape.
///
/// For 2-D weights `[out, in]`: fan_in = in, fan_out = out. Higher ranks
/// fold the trailing dimensions into a receptive-field factor.
fn compute_fans(shape: &Shape) -> (f64, f64) {
    let dims = shape.dims();
    match dims.len() {
        0 => (1.0, 1.0),
        1 => (dims[0] as f64, dims[0] as f64),
        2 => (dims[1] as f64, dims[0] as f64),
        _ => {
            let receptive_field: usize = dims[2..].iter().product();
            let fan_in = dims[1] as f64 * receptive_field as f64;
            let fan_out = dims[0] as f64 * receptive_field as f64;
            (fan_in, fan_out)
        }
    }
}

/// Initialize a tensor from a uniform distribution U(low, high).
pub fn uniform<B: Backend>(
    shape: impl Into<Shape>,
    low: f64,
    high: f64,
    dtype: DType,
    device: &B::Device,
) -> Result<Tensor<B>> {
    let shape = shape.into();
    let range = high - low;
    let t = Tensor::<B>::rand(shape, dtype, device)?
        .affine(range, low)?
        .set_variable();
    Ok(t)
}

/// Initialize a tensor from a normal distribution N(mean, std).
pub fn normal<B: Backend>(
    shape: impl Into<Shape>,
    mean: f64,
    std: f64,
    dtype: DType,
    device: &B::Device,
) -> Result<Tensor<B>> {
    let shape = shape.into();
    let t = Tensor::<B>::randn(shape, dtype, device)?
        .affine(std, mean)?
        .set_variable();
    Ok(t)
}

/// Initialize a tensor with a constant value.
pub fn constant<B: Backend>(
    shape: impl Into<Shape>,
    val: f64,
    dtype: DType,
    device: &B::Device,
) -> Result<Tensor<B>> {
    let t = Tensor::<B>::full(shape, val, dtype, device)?.set_variable();
    Ok(t)
}

/// Initialize a tensor with all zeros (as a variable).
pub fn zeros<B: Backend>(
    shape: impl Into<Shape>,
    dtype: DType,
    device: &B::Device,
) -> Result<Tensor<B>> {
    let t = Tensor::<B>::zeros(shape, dtype, device)?.set_variable();
    Ok(t)
}

/// Xavier (Glorot) uniform initialization.
///
/// Draws from U(-a, a) where a = gain * sqrt(6 / (fan_in + fan_out)).
/// Keeps activation variance roughly constant across layers, the usual
/// choice for classifier heads.
pub fn xavier_uniform<B: Backend>(
    shape: impl Into<Shape>,
    gain: f64,
    dtype: DType,
    device: &B::Device,
) -> Result<Tensor<B>> {
    let shape = shape.into();
    let (fan_in, fan_out) = compute_fans(&shape);
    let a = gain * (6.0 / (fan_in + fan_out)).sqrt();
    uniform::<B>(shape, -a, a, dtype, device)
}

/// Kaiming (He) uniform initialization.
///
/// Draws from U(-bound, bound) where bound = sqrt(3 * gain² / fan) and
/// gain² = 2 / (1 + a²).
///
/// # Arguments
/// - `a`: negative slope of the rectifier (0 for ReLU; sqrt(5) reproduces
///   the dense-layer default U(-sqrt(1/fan_in), sqrt(1/fan_in)))
/// - `mode`: `FanIn` or `FanOut`
pub fn kaiming_uniform<B: Backend>(
    shape: impl Into<Shape>,
    a: f64,
    mode: FanMode,
    dtype: DType,
    device: &B::Device,
) -> Result<Tensor<B>> {
    let shape = shape.into();
    let (fan_in, fan_out) = compute_fans(&shape);
    let fan = match mode {
        FanMode::FanIn => fan_in,
        FanMode::FanOut => fan_out,
    };
    let gain_sq = 2.0 / (1.0 + a * a);
    let bound = (3.0 * gain_sq / fan).sqrt();
    uniform::<B>(shape, -bound, bound, dtype, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aural_cpu::{CpuBackend, CpuDevice, CpuTensor};

    type T = CpuTensor;

    #[test]
    fn test_constant_fill() {
        let dev = CpuDevice;
        let t: T = constant((2, 3), 0.25, DType::F64, &dev).unwrap();
        assert_eq!(t.dims(), &[2, 3]);
        assert!(t.is_variable());
        for &x in &t.to_f64_vec().unwrap() {
            assert_eq!(x, 0.25);
        }
    }

    #[test]
    fn test_zeros_is_variable() {
        let dev = CpuDevice;
        let t: T = zeros((4,), DType::F32, &dev).unwrap();
        assert!(t.is_variable());
        assert_eq!(t.to_f64_vec().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_uniform_range() {
        let dev = CpuDevice;
        let t: T = uniform((1000,), -2.0, 3.0, DType::F64, &dev).unwrap();
        for &x in &t.to_f64_vec().unwrap() {
            assert!(x >= -2.0 - 1e-6 && x <= 3.0 + 1e-6);
        }
    }

    #[test]
    fn test_normal_stats() {
        let dev = CpuDevice;
        let t: T = normal((10000,), 5.0, 0.1, DType::F64, &dev).unwrap();
        let v = t.to_f64_vec().unwrap();
        let mean: f64 = v.iter().sum::<f64>() / v.len() as f64;
        assert!((mean - 5.0).abs() < 0.05, "mean {} too far from 5.0", mean);
    }

    #[test]
    fn test_xavier_uniform_bounds() {
        let dev = CpuDevice;
        // fan_in = 64, fan_out = 32 → a = sqrt(6 / 96) = 0.25
        let t = xavier_uniform::<CpuBackend>((32, 64), 1.0, DType::F64, &dev).unwrap();
        assert_eq!(t.dims(), &[32, 64]);
        let a = (6.0 / 96.0_f64).sqrt();
        for &x in &t.to_f64_vec().unwrap() {
            assert!(x >= -a - 1e-6 && x <= a + 1e-6, "value {} out of [-{a}, {a}]", x);
        }
    }

    #[test]
    fn test_kaiming_uniform_matches_dense_default() {
        let dev = CpuDevice;
        // a = sqrt(5) collapses the bound to sqrt(1/fan_in)
        let t: T =
            kaiming_uniform((50, 100), 5.0_f64.sqrt(), FanMode::FanIn, DType::F64, &dev).unwrap();
        let bound = (1.0 / 100.0_f64).sqrt();
        for &x in &t.to_f64_vec().unwrap() {
            assert!(
                x >= -bound - 1e-6 && x <= bound + 1e-6,
                "value {} out of bounds [-{}, {}]",
                x,
                bound,
                bound
            );
        }
    }

    #[test]
    fn test_compute_fans() {
        assert_eq!(compute_fans(&Shape::from((8, 3))), (3.0, 8.0));
        assert_eq!(compute_fans(&Shape::from(12)), (12.0, 12.0));
    }
}
