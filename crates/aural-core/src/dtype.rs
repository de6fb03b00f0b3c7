// Element types.
//
// The framework keeps the dtype lattice deliberately small:
//   F32 — parameters, activations, and feature data
//   F64 — high-precision host-side accumulation
//   U8  — boolean masks produced by comparisons
//   I64 — class labels and argmax indices

use std::fmt;

/// The element type of a tensor's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 8-bit unsigned integer (comparison masks).
    U8,
    /// 64-bit signed integer (labels, indices).
    I64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::U8 => 1,
            DType::F32 => 4,
            DType::F64 => 8,
            DType::I64 => 8,
        }
    }

    /// Whether this is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::U8 => "u8",
            DType::I64 => "i64",
        };
        write!(f, "{name}")
    }
}

/// Rust scalar types that can live inside tensor storage.
///
/// Conversion goes through f64, which is lossless for every supported type
/// except the extreme ends of the i64 range.
pub trait WithDType: Copy + Send + Sync + fmt::Debug + num_traits::NumCast + 'static {
    const DTYPE: DType;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

impl WithDType for f32 {
    const DTYPE: DType = DType::F32;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl WithDType for f64 {
    const DTYPE: DType = DType::F64;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(v: f64) -> Self {
        v
    }
}

impl WithDType for u8 {
    const DTYPE: DType = DType::U8;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(v: f64) -> Self {
        // NaN and out-of-range values map to 0 rather than wrapping
        num_traits::cast(v).unwrap_or(0)
    }
}

impl WithDType for i64 {
    const DTYPE: DType = DType::I64;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(v: f64) -> Self {
        num_traits::cast(v).unwrap_or(0)
    }
}
