//! Nodata and contiguity flags derived from the reflectance bands.

use ndarray::{Array2, ArrayView3, Axis};

use super::{Flag, FlagLayers};

/// Computes the nodata and non-contiguous masks of a `(band, row, col)` stack.
///
/// Returns `(nodata, non_contiguous)`: a pixel is nodata where every band
/// equals `nodata`, and non-contiguous where any band does. A stack with no
/// bands has observed nothing, so every pixel is nodata.
pub fn derive_contiguity_flags(
    reflectance: ArrayView3<'_, i16>,
    nodata: i16,
) -> (Array2<bool>, Array2<bool>) {
    let missing_all = reflectance.map_axis(Axis(0), |lane| lane.iter().all(|v| *v == nodata));
    let missing_any = reflectance.map_axis(Axis(0), |lane| lane.iter().any(|v| *v == nodata));
    (missing_all, missing_any)
}

/// [`derive_contiguity_flags`] packaged as flag layers.
pub fn contiguity_flags(reflectance: ArrayView3<'_, i16>, nodata: i16) -> FlagLayers {
    let (missing_all, missing_any) = derive_contiguity_flags(reflectance, nodata);
    FlagLayers::new()
        .with(Flag::NoData, missing_all)
        .with(Flag::NonContiguous, missing_any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    const NODATA: i16 = -999;

    #[test]
    fn test_all_and_any_missing() {
        // 2 bands over a 1x3 tile: pixel 0 fully missing, 1 partly, 2 complete
        let stack = Array3::from_shape_vec(
            (2, 1, 3),
            vec![NODATA, NODATA, 120, NODATA, 340, 560],
        )
        .unwrap();

        let (nodata, non_contiguous) = derive_contiguity_flags(stack.view(), NODATA);
        assert_eq!(nodata, array![[true, false, false]]);
        assert_eq!(non_contiguous, array![[true, true, false]]);
    }

    #[test]
    fn test_no_bands_is_all_nodata() {
        let stack = Array3::<i16>::zeros((0, 2, 2));
        let (nodata, non_contiguous) = derive_contiguity_flags(stack.view(), NODATA);
        assert!(nodata.iter().all(|v| *v));
        assert!(non_contiguous.iter().all(|v| !*v));
    }

    #[test]
    fn test_contiguity_layers_tagged() {
        let stack = Array3::from_elem((3, 2, 2), 100i16);
        let layers = contiguity_flags(stack.view(), NODATA);
        assert_eq!(layers.flags(), vec![Flag::NoData, Flag::NonContiguous]);
    }
}
