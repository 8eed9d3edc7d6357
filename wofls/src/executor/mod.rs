//! Task execution.
//!
//! The dispatcher only knows [`TaskExecutor`]: given a descriptor, produce
//! an output and return its provenance record. [`WoflExecutor`] is the
//! reference composition for water observation tiles:
//!
//! ```text
//! TileLoader ──► Classifier ──────────┐
//!     │                               ├──► combine ──► validate ──► DatasetWriter
//!     └────────► FlagDerivation ──────┘
//!                + contiguity flags
//! ```
//!
//! Executors run on the blocking worker pool and must not touch the catalog.

mod wofl;
mod writer;

pub use wofl::{LoadedTile, WoflExecutor};
pub use writer::{RawDatasetWriter, RawSidecar};

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

use crate::catalog::DatasetRecord;
use crate::coord::SpatioTemporalKey;
use crate::observation::{FlagLayers, ShapeMismatch};
use crate::task::{TaskDescriptor, TaskFailure, TaskInputs};

/// Produces the output of one task.
///
/// Implementations are called from worker threads, possibly concurrently
/// for different descriptors.
pub trait TaskExecutor: Send + Sync {
    /// Runs the task and returns the record of the written output.
    ///
    /// On `Err` nothing may be left at the output location.
    fn execute(&self, task: &TaskDescriptor) -> Result<DatasetRecord, TaskFailure>;
}

/// Errors from the collaborators of [`WoflExecutor`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Input data could not be read.
    #[error("failed to load inputs for {key}: {message}")]
    Load {
        key: SpatioTemporalKey,
        message: String,
    },

    /// The classifier failed.
    #[error("classification failed: {0}")]
    Classify(String),

    /// Flag derivation failed.
    #[error("flag derivation failed: {0}")]
    Flags(String),

    /// A layer does not line up with the classifier output.
    #[error(transparent)]
    Shape(#[from] ShapeMismatch),

    /// Inputs share no valid-data region.
    #[error("inputs have no common valid data")]
    NoValidData,

    /// The output could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The metadata document could not be encoded.
    #[error("failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl From<ExecutorError> for TaskFailure {
    fn from(err: ExecutorError) -> Self {
        TaskFailure::execution(err)
    }
}

/// Reads the input arrays of a task onto a common pixel grid.
pub trait TileLoader: Send + Sync {
    fn load(
        &self,
        key: &SpatioTemporalKey,
        inputs: &TaskInputs,
    ) -> Result<LoadedTile, ExecutorError>;
}

/// Decides, per pixel, whether water was observed.
///
/// The result ignores masking; flags are applied afterwards.
pub trait Classifier: Send + Sync {
    fn classify(&self, tile: &LoadedTile) -> Result<Array2<bool>, ExecutorError>;
}

/// Derives masking layers (cloud, shadow, slope, sea...) for a tile.
pub trait FlagDerivation: Send + Sync {
    fn derive(&self, tile: &LoadedTile) -> Result<FlagLayers, ExecutorError>;
}

/// Flag derivation that sets nothing.
///
/// Useful when only the reflectance contiguity flags are wanted.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFlags;

impl FlagDerivation for NoFlags {
    fn derive(&self, _tile: &LoadedTile) -> Result<FlagLayers, ExecutorError> {
        Ok(FlagLayers::new())
    }
}

/// Persists an output array with its metadata.
///
/// Writes are all-or-nothing: after an error nothing is left at `path`.
pub trait DatasetWriter: Send + Sync {
    fn write(
        &self,
        path: &Path,
        observations: ArrayView2<'_, u8>,
        record: &DatasetRecord,
    ) -> Result<(), ExecutorError>;
}
