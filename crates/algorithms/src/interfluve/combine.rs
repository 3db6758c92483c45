//! Mask intersection

use ridgeline_core::raster::Raster;
use ridgeline_core::{Algorithm, Error, Result};

/// Mask combiner algorithm
#[derive(Debug, Clone, Default)]
pub struct CombineMasks;

impl Algorithm for CombineMasks {
    type Input = (Raster<u8>, Raster<u8>);
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Combine Masks"
    }

    fn description(&self) -> &'static str {
        "Cell-wise logical AND of two binary masks"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        combine_masks(&input.0, &input.1)
    }
}

/// Cell-wise AND: 1 where both masks are set, 0 elsewhere.
///
/// Nodata cells of either mask count as unset. The output takes its
/// georeferencing from `a`.
///
/// # Errors
/// `ShapeMismatch` if the masks differ in rows or columns.
pub fn combine_masks(a: &Raster<u8>, b: &Raster<u8>) -> Result<Raster<u8>> {
    a.ensure_same_shape(b)?;

    let set = |mask: &Raster<u8>, v: u8| v != 0 && !mask.is_nodata(v);
    let data: Vec<u8> = a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(&x, &y)| u8::from(set(a, x) && set(b, y)))
        .collect();

    a.derive(data, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(values: &[u8], rows: usize, cols: usize) -> Raster<u8> {
        Raster::from_vec(values.to_vec(), rows, cols).unwrap()
    }

    #[test]
    fn test_and() {
        let a = mask(&[1, 1, 0, 0], 2, 2);
        let b = mask(&[1, 0, 1, 0], 2, 2);
        let out = combine_masks(&a, &b).unwrap();
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_idempotent() {
        let a = mask(&[0, 1, 1, 0, 1, 0], 2, 3);
        let out = combine_masks(&a, &a).unwrap();
        assert_eq!(out.data(), a.data());
    }

    #[test]
    fn test_all_zero_annihilates() {
        let a = mask(&[0, 1, 1, 0, 1, 1], 3, 2);
        let zero: Raster<u8> = Raster::new(3, 2);
        let out = combine_masks(&a, &zero).unwrap();
        assert_eq!(out.data(), zero.data());
    }

    #[test]
    fn test_nodata_is_unset() {
        let mut a = mask(&[1, 1], 1, 2);
        a.set_nodata(Some(1));
        let b = mask(&[1, 1], 1, 2);
        let out = combine_masks(&a, &b).unwrap();
        assert!(out.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_shape_mismatch() {
        let a: Raster<u8> = Raster::new(4, 5);
        let b: Raster<u8> = Raster::new(5, 4);
        let err = combine_masks(&a, &b).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { er: 4, ec: 5, ar: 5, ac: 4 }));
    }
}
