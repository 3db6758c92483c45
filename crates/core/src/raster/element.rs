//! Cell value trait for raster grids

use num_traits::{NumCast, Zero};
use std::fmt::{Debug, Display};

/// Trait for types that can be stored in a raster cell.
///
/// Elevation, TPI and distance grids use `f64`; direction codes and masks use
/// `u8`; accumulation uses `u64`.
pub trait RasterElement:
    Copy + Debug + Display + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Whether this value is a nodata cell under the given sentinel.
    ///
    /// Floating-point NaN is always nodata, with or without a sentinel.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` if the value does not fit
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn is_float() -> bool {
                false
            }
        }
    )*};
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) if nd.is_nan() => false,
                    Some(nd) => *self == nd || (*self - nd).abs() <= <$t>::EPSILON * nd.abs().max(1.0),
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    )*};
}

impl_raster_element_int!(u8, u16, u32, u64, i16, i32, i64);
impl_raster_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f64::NAN.is_nodata(Some(-9999.0)));
        assert!(!1.0_f64.is_nodata(Some(f64::NAN)));
    }

    #[test]
    fn test_sentinel_match() {
        assert!((-32768.0_f64).is_nodata(Some(-32768.0)));
        assert!(!(-32767.0_f64).is_nodata(Some(-32768.0)));
        assert!(255_u8.is_nodata(Some(255)));
        assert!(!0_u8.is_nodata(None));
    }

    #[test]
    fn test_from_f64_range() {
        assert_eq!(<u8 as RasterElement>::from_f64(3.0), Some(3));
        assert_eq!(<u8 as RasterElement>::from_f64(300.0), None);
    }
}
