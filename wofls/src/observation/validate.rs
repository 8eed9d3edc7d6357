//! Output contract check run before a task is accepted.

use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use thiserror::Error;

use super::is_legal;

/// An observation byte outside the legal set.
///
/// This signals a bug in a producer, not bad input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal observation value {value} at row {row}, col {col}")]
pub struct InvariantViolation {
    pub row: usize,
    pub col: usize,
    pub value: u8,
}

/// Checks every pixel against the legal value set.
///
/// Rows are scanned in parallel; the reported violation is the first one in
/// row-major order.
pub fn validate_observations(observations: ArrayView2<'_, u8>) -> Result<(), InvariantViolation> {
    let violation = observations
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .find_map_first(|(row, lane)| {
            lane.iter()
                .position(|value| !is_legal(*value))
                .map(|col| InvariantViolation {
                    row,
                    col,
                    value: lane[col],
                })
        });

    match violation {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}
