//! Per-flag boolean layers and their combination into observation bytes.

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

use super::{Flag, Observation};

/// A layer whose shape differs from the classifier output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{layer} layer has shape {actual:?}, expected {expected:?}")]
pub struct ShapeMismatch {
    pub layer: &'static str,
    pub expected: (usize, usize),
    pub actual: (usize, usize),
}

/// Boolean masking layers, each tagged with the flag it sets.
///
/// A flag may carry several layers (e.g. contiguity derived from
/// reflectance plus contiguity reported by pixel quality); they are ORed.
#[derive(Clone, Debug, Default)]
pub struct FlagLayers {
    layers: Vec<(Flag, Array2<bool>)>,
}

impl FlagLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer for `flag`.
    pub fn with(mut self, flag: Flag, layer: Array2<bool>) -> Self {
        self.insert(flag, layer);
        self
    }

    /// Adds a layer for `flag`.
    pub fn insert(&mut self, flag: Flag, layer: Array2<bool>) {
        self.layers.push((flag, layer));
    }

    /// Appends every layer of `other`.
    pub fn merge(mut self, other: FlagLayers) -> Self {
        self.layers.extend(other.layers);
        self
    }

    /// Iterates over `(flag, layer)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Flag, &Array2<bool>)> {
        self.layers.iter().map(|(flag, layer)| (*flag, layer))
    }

    /// Flags that have at least one layer.
    pub fn flags(&self) -> Vec<Flag> {
        Flag::ALL
            .into_iter()
            .filter(|flag| self.layers.iter().any(|(f, _)| f == flag))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Combines the raw wet decision with the masking layers.
///
/// Each output pixel is the OR of the bits of every flag set there. The
/// wet bit survives only where no flag is set. Inputs are left untouched.
///
/// # Errors
///
/// Returns [`ShapeMismatch`] if any layer's shape differs from `wet`.
pub fn combine_observations(
    wet: ArrayView2<'_, bool>,
    flags: &FlagLayers,
) -> Result<Array2<u8>, ShapeMismatch> {
    let shape = wet.dim();
    for (flag, layer) in flags.iter() {
        if layer.dim() != shape {
            return Err(ShapeMismatch {
                layer: flag.name(),
                expected: shape,
                actual: layer.dim(),
            });
        }
    }

    Ok(Array2::from_shape_fn(shape, |idx| {
        let masked = flags
            .iter()
            .filter(|(_, layer)| layer[idx])
            .fold(0u8, |acc, (flag, _)| acc | flag.bit());
        Observation::compose(wet[idx], masked).bits()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{is_legal, DRY, WET};
    use ndarray::array;

    #[test]
    fn test_no_flags_passes_classifier_through() {
        let wet = array![[true, false], [false, true]];
        let out = combine_observations(wet.view(), &FlagLayers::new()).unwrap();
        assert_eq!(out, array![[WET, DRY], [DRY, WET]]);
    }

    #[test]
    fn test_flag_clears_wet_bit() {
        let wet = array![[true, true], [false, false]];
        let cloud = array![[true, false], [true, false]];
        let flags = FlagLayers::new().with(Flag::Cloud, cloud);

        let out = combine_observations(wet.view(), &flags).unwrap();
        assert_eq!(out, array![[64, WET], [64, DRY]]);
    }

    #[test]
    fn test_flags_combine_by_or() {
        let wet = array![[true, false]];
        let flags = FlagLayers::new()
            .with(Flag::NoData, array![[true, false]])
            .with(Flag::Sea, array![[true, true]])
            .with(Flag::Cloud, array![[false, true]]);

        let out = combine_observations(wet.view(), &flags).unwrap();
        assert_eq!(out, array![[1 | 4, 4 | 64]]);
    }

    #[test]
    fn test_repeated_flag_layers_are_ored() {
        let wet = array![[false, false, false]];
        let flags = FlagLayers::new()
            .with(Flag::NonContiguous, array![[true, false, false]])
            .merge(FlagLayers::new().with(Flag::NonContiguous, array![[false, true, false]]));

        assert_eq!(flags.len(), 2);
        assert_eq!(flags.flags(), vec![Flag::NonContiguous]);

        let out = combine_observations(wet.view(), &flags).unwrap();
        assert_eq!(out, array![[2, 2, 0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let wet = Array2::<bool>::from_elem((2, 3), false);
        let flags = FlagLayers::new().with(Flag::HighSlope, Array2::from_elem((3, 2), true));

        let err = combine_observations(wet.view(), &flags).unwrap_err();
        assert_eq!(err.layer, "high_slope");
        assert_eq!(err.expected, (2, 3));
        assert_eq!(err.actual, (3, 2));
    }

    mod property_tests {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        const ROWS: usize = 4;
        const COLS: usize = 5;
        const PIXELS: usize = ROWS * COLS;

        fn layer(bits: &[bool]) -> Array2<bool> {
            Array2::from_shape_vec((ROWS, COLS), bits.to_vec()).unwrap()
        }

        proptest! {
            #[test]
            fn test_combined_output_is_always_legal(
                wet in vec(any::<bool>(), PIXELS),
                masks in vec(vec(any::<bool>(), PIXELS), 7),
            ) {
                let mut flags = FlagLayers::new();
                for (flag, bits) in Flag::ALL.iter().zip(&masks) {
                    flags.insert(*flag, layer(bits));
                }

                let out = combine_observations(layer(&wet).view(), &flags).unwrap();

                for (i, value) in out.iter().enumerate() {
                    prop_assert!(is_legal(*value));
                    // Wet bit set implies every other bit clear
                    if value & WET != 0 {
                        prop_assert_eq!(value & !WET, 0);
                    }

                    let expected_flags = Flag::ALL
                        .iter()
                        .zip(&masks)
                        .filter(|(_, bits)| bits[i])
                        .fold(0u8, |acc, (flag, _)| acc | flag.bit());
                    prop_assert_eq!(value & !WET, expected_flags);
                    prop_assert_eq!(*value == WET, wet[i] && expected_flags == 0);
                }
            }
        }
    }
}
