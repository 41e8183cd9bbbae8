//! Elementwise conversion between numeric kinds.
//!
//! Conversions use Rust `as` semantics of the destination kind: floats are
//! truncated toward zero and saturate at the integer bounds (NaN becomes 0),
//! wider integers wrap into narrower ones. Nothing here detects overflow or
//! precision loss; callers own the domain check.

use std::fmt::Debug;

use num_traits::AsPrimitive;

/// A numeric kind that tensors and matrices can be viewed as.
pub trait Number:
    Copy + PartialEq + PartialOrd + Debug + Default + Send + Sync + 'static
{
    fn from_f32(v: f32) -> Self;
    fn from_f64(v: f64) -> Self;
    fn from_i8(v: i8) -> Self;
    fn from_i32(v: i32) -> Self;
    fn from_i64(v: i64) -> Self;
    fn from_u8(v: u8) -> Self;
    fn to_f64(self) -> f64;
    fn to_i64(self) -> i64;
}

macro_rules! impl_number {
    ($($t:ty),* $(,)?) => {
        $(
            impl Number for $t {
                #[inline]
                fn from_f32(v: f32) -> Self { v.as_() }
                #[inline]
                fn from_f64(v: f64) -> Self { v.as_() }
                #[inline]
                fn from_i8(v: i8) -> Self { v.as_() }
                #[inline]
                fn from_i32(v: i32) -> Self { v.as_() }
                #[inline]
                fn from_i64(v: i64) -> Self { v.as_() }
                #[inline]
                fn from_u8(v: u8) -> Self { v.as_() }
                #[inline]
                fn to_f64(self) -> f64 { self.as_() }
                #[inline]
                fn to_i64(self) -> i64 { self.as_() }
            }
        )*
    };
}

impl_number!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64);

/// Widen every element to `f64`.
pub fn number_to_f64<E: Number>(v: &[E]) -> Vec<f64> {
    v.iter().map(|&x| x.to_f64()).collect()
}

/// Convert every element to `i64`, truncating floats.
pub fn number_to_i64<E: Number>(v: &[E]) -> Vec<i64> {
    v.iter().map(|&x| x.to_i64()).collect()
}

/// Narrow every `f64` to `E`.
pub fn f64_to_number<E: Number>(v: &[f64]) -> Vec<E> {
    v.iter().map(|&x| E::from_f64(x)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_exact() {
        assert_eq!(number_to_f64(&[1i32, -2, 3]), vec![1.0, -2.0, 3.0]);
        assert_eq!(number_to_f64(&[255u8]), vec![255.0]);
    }

    #[test]
    fn float_to_int_truncates_toward_zero() {
        assert_eq!(f64_to_number::<i32>(&[1.9, -1.9, 0.5]), vec![1, -1, 0]);
        assert_eq!(number_to_i64(&[2.7f32, -2.7]), vec![2, -2]);
    }

    #[test]
    fn out_of_range_saturates_without_error() {
        assert_eq!(f64_to_number::<u8>(&[300.0, -5.0]), vec![255, 0]);
        assert_eq!(f64_to_number::<i8>(&[f64::NAN]), vec![0]);
    }

    #[test]
    fn integer_narrowing_wraps() {
        assert_eq!(u8::from_i32(256 + 7), 7);
        assert_eq!(i8::from_u8(200), -56);
    }

    #[test]
    fn i64_round_trip_keeps_precision() {
        let big = (1i64 << 60) + 1;
        assert_eq!(i64::from_i64(big), big);
        assert_eq!(big.to_i64(), big);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(number_to_f64::<f32>(&[]).is_empty());
        assert!(f64_to_number::<i64>(&[]).is_empty());
    }
}
