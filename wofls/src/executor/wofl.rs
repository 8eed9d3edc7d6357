//! Reference executor for water observation tiles.

use std::sync::Arc;

use chrono::Utc;
use ndarray::{Array2, Array3};
use tracing::debug;

use super::{Classifier, DatasetWriter, ExecutorError, FlagDerivation, TaskExecutor, TileLoader};
use crate::catalog::{DatasetId, DatasetRecord};
use crate::coord::BoundingBox;
use crate::observation::{
    combine_observations, contiguity_flags, validate_observations,
};
use crate::product::file_uri;
use crate::task::{TaskDescriptor, TaskFailure, TaskInputs};

/// Input arrays of one task, resampled onto the output pixel grid.
#[derive(Clone, Debug)]
pub struct LoadedTile {
    /// Surface reflectance, shaped `(band, row, col)`.
    pub reflectance: Array3<i16>,
    /// Nodata marker shared by every reflectance band.
    pub reflectance_nodata: i16,
    /// Pixel quality bitmask, shaped `(row, col)`.
    pub pixel_quality: Array2<u16>,
    /// Surface elevation in metres, shaped `(row, col)`.
    pub elevation: Array2<f32>,
    /// Extent the arrays cover.
    pub extent: BoundingBox,
}

impl LoadedTile {
    /// Output grid shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.reflectance.dim();
        (rows, cols)
    }
}

/// Loads, classifies, flags, validates and writes one tile.
pub struct WoflExecutor {
    output_product: String,
    loader: Arc<dyn TileLoader>,
    classifier: Arc<dyn Classifier>,
    flags: Arc<dyn FlagDerivation>,
    writer: Arc<dyn DatasetWriter>,
}

impl WoflExecutor {
    /// Create an executor producing datasets of `output_product`.
    pub fn new(
        output_product: impl Into<String>,
        loader: Arc<dyn TileLoader>,
        classifier: Arc<dyn Classifier>,
        flags: Arc<dyn FlagDerivation>,
        writer: Arc<dyn DatasetWriter>,
    ) -> Self {
        Self {
            output_product: output_product.into(),
            loader,
            classifier,
            flags,
            writer,
        }
    }

    fn build_record(
        &self,
        task: &TaskDescriptor,
        extent: BoundingBox,
    ) -> Result<DatasetRecord, ExecutorError> {
        let valid_data = common_valid_data(extent, &task.input_references)
            .ok_or(ExecutorError::NoValidData)?;
        let uri = file_uri(&task.output_location);

        Ok(DatasetRecord {
            id: DatasetId::from_uri(&uri),
            product: self.output_product.clone(),
            platform: task.platform.name.clone(),
            key: task.key,
            uri,
            extent,
            valid_data,
            sources: task
                .input_references
                .iter()
                .map(|tile| tile.id.clone())
                .collect(),
            created_at: Utc::now(),
        })
    }
}

impl TaskExecutor for WoflExecutor {
    fn execute(&self, task: &TaskDescriptor) -> Result<DatasetRecord, TaskFailure> {
        if task.output_location.exists() {
            return Err(TaskFailure::OutputAlreadyExists {
                path: task.output_location.clone(),
            });
        }

        let tile = self.loader.load(&task.key, &task.input_references)?;
        let wet = self.classifier.classify(&tile)?;
        let flags = self
            .flags
            .derive(&tile)?
            .merge(contiguity_flags(tile.reflectance.view(), tile.reflectance_nodata));

        let observations =
            combine_observations(wet.view(), &flags).map_err(ExecutorError::from)?;
        validate_observations(observations.view())?;

        let record = self.build_record(task, tile.extent)?;
        self.writer
            .write(&task.output_location, observations.view(), &record)?;

        debug!(
            key = %task.key,
            path = %task.output_location.display(),
            "Wrote water observation tile"
        );
        Ok(record)
    }
}

/// Intersection of `extent` with every input's valid-data region.
fn common_valid_data(extent: BoundingBox, inputs: &TaskInputs) -> Option<BoundingBox> {
    inputs
        .iter()
        .try_fold(extent, |acc, tile| acc.intersection(&tile.valid_data))
}
