//! Units of work and their outcomes.
//!
//! A [`TaskDescriptor`] bundles everything needed to produce one output tile.
//! The planner builds descriptors, the dispatcher hands them to an executor,
//! and every submitted descriptor comes back as exactly one [`TaskResult`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::{DatasetRecord, TileReference};
use crate::coord::SpatioTemporalKey;
use crate::observation::InvariantViolation;
use crate::product::Platform;

/// The three inputs a water observation tile is computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskInputs {
    /// Surface reflectance.
    pub primary: TileReference,
    /// Paired pixel quality.
    pub pixel_quality: TileReference,
    /// Elevation mosaic tile covering the same cell.
    pub elevation: TileReference,
}

impl TaskInputs {
    /// Inputs in `[primary, pixel_quality, elevation]` order.
    pub fn iter(&self) -> impl Iterator<Item = &TileReference> {
        [&self.primary, &self.pixel_quality, &self.elevation].into_iter()
    }
}

/// Immutable description of one output tile to produce.
///
/// Equality and hashing use the key alone: the planner never emits two
/// descriptors for the same key.
#[derive(Clone, Debug)]
pub struct TaskDescriptor {
    pub key: SpatioTemporalKey,
    pub platform: Platform,
    pub input_references: TaskInputs,
    pub output_location: PathBuf,
}

impl TaskDescriptor {
    pub fn new(
        key: SpatioTemporalKey,
        platform: Platform,
        input_references: TaskInputs,
        output_location: PathBuf,
    ) -> Self {
        Self {
            key,
            platform,
            input_references,
            output_location,
        }
    }
}

impl PartialEq for TaskDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TaskDescriptor {}

impl Hash for TaskDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.platform.name, self.key)
    }
}

/// Why a task did not produce an output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskFailure {
    /// The output file is already on disk.
    ///
    /// Usually a previous run wrote it but never indexed it.
    #[error("output already exists: {}", .path.display())]
    OutputAlreadyExists { path: PathBuf },

    /// Loading, classification, flag derivation or writing failed.
    #[error("task execution failed: {message}")]
    Execution { message: String },

    /// The produced array broke the observation byte contract.
    #[error(transparent)]
    InvariantViolation(#[from] InvariantViolation),

    /// The executor panicked.
    #[error("task panicked: {message}")]
    Panicked { message: String },
}

impl TaskFailure {
    /// Creates an execution failure from any displayable error.
    pub fn execution(err: impl fmt::Display) -> Self {
        Self::Execution {
            message: err.to_string(),
        }
    }

    /// Returns true if the run must stop rather than carry on with other tasks.
    ///
    /// Only an invariant violation is fatal; it means a producer is broken
    /// and every further output would be suspect.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Outcome of one dispatched task.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// The output was written; its record awaits indexing.
    Success {
        key: SpatioTemporalKey,
        output_location: PathBuf,
        record: DatasetRecord,
    },

    /// No output was accepted.
    Failure {
        key: SpatioTemporalKey,
        output_location: PathBuf,
        error: TaskFailure,
    },
}

impl TaskResult {
    /// Builds the result of running `task`.
    pub fn from_outcome(task: &TaskDescriptor, outcome: Result<DatasetRecord, TaskFailure>) -> Self {
        match outcome {
            Ok(record) => Self::Success {
                key: task.key,
                output_location: task.output_location.clone(),
                record,
            },
            Err(error) => Self::Failure {
                key: task.key,
                output_location: task.output_location.clone(),
                error,
            },
        }
    }

    pub fn key(&self) -> &SpatioTemporalKey {
        match self {
            Self::Success { key, .. } | Self::Failure { key, .. } => key,
        }
    }

    pub fn output_location(&self) -> &Path {
        match self {
            Self::Success {
                output_location, ..
            }
            | Self::Failure {
                output_location, ..
            } => output_location,
        }
    }

    /// Returns true if the task succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure, if the task failed.
    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}
