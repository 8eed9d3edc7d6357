//! Raw byte writer with a JSON metadata sidecar.
//!
//! Each output is two files:
//!
//! ```text
//! LS8_OLI_WATER_3577_15_-40_20160503000102000000.nc     row-major u8 pixels
//! LS8_OLI_WATER_3577_15_-40_20160503000102000000.json   RawSidecar document
//! ```
//!
//! Both are written to temporary names and renamed into place, sidecar
//! first, so the data file only appears once the output is complete.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{DatasetWriter, ExecutorError};
use crate::catalog::DatasetRecord;

/// Metadata document stored next to a raw output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSidecar {
    /// Array shape `[rows, cols]`.
    pub shape: [usize; 2],
    /// Pixel data type; always `uint8`.
    pub dtype: String,
    pub record: DatasetRecord,
}

/// Writes observation arrays as raw bytes plus a JSON sidecar.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDatasetWriter;

impl RawDatasetWriter {
    pub fn new() -> Self {
        Self
    }

    /// Location of the sidecar belonging to `path`.
    pub fn sidecar_path(path: &Path) -> PathBuf {
        path.with_extension("json")
    }

    /// Reads back an output written by this writer.
    pub fn read(path: &Path) -> io::Result<(Array2<u8>, RawSidecar)> {
        let document = fs::read_to_string(Self::sidecar_path(path))?;
        let sidecar: RawSidecar = serde_json::from_str(&document)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let bytes = fs::read(path)?;
        let [rows, cols] = sidecar.shape;
        let array = Array2::from_shape_vec((rows, cols), bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok((array, sidecar))
    }
}

impl DatasetWriter for RawDatasetWriter {
    fn write(
        &self,
        path: &Path,
        observations: ArrayView2<'_, u8>,
        record: &DatasetRecord,
    ) -> Result<(), ExecutorError> {
        let io_err = |source: io::Error| ExecutorError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let (rows, cols) = observations.dim();
        let sidecar = RawSidecar {
            shape: [rows, cols],
            dtype: "uint8".to_string(),
            record: record.clone(),
        };
        let document = serde_json::to_string_pretty(&sidecar)?;
        let pixels: Vec<u8> = observations.iter().copied().collect();

        let sidecar_path = Self::sidecar_path(path);
        let result = write_atomic(&sidecar_path, document.as_bytes())
            .and_then(|()| write_atomic(path, &pixels));

        if let Err(e) = result {
            // The data rename is the last step, so only the sidecar can be left over
            if sidecar_path.exists() {
                if let Err(cleanup) = fs::remove_file(&sidecar_path) {
                    warn!(
                        path = %sidecar_path.display(),
                        error = %cleanup,
                        "Failed to remove partial output"
                    );
                }
            }
            return Err(io_err(e));
        }

        Ok(())
    }
}

/// Writes to a temporary sibling, then renames over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = temp_path(path);
    if let Err(e) = fs::write(&temp_path, contents).and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
