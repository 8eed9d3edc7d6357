//! Centralized output naming conventions.
//!
//! Output names are read by downstream consumers and double as the
//! uniqueness key of a produced tile, so they must stay bit-exact:
//!
//! `{sensor}_WATER/{x}_{y}/{sensor}_WATER_3577_{x}_{y}_{YYYYmmddHHMMSSffffff}.nc`
//!
//! All other modules should use these functions rather than constructing
//! names directly.

use std::path::{Path, PathBuf};

use crate::coord::{SpatioTemporalKey, GRID_EPSG};

/// `strftime` pattern of the acquisition time in output names.
///
/// Six fractional digits (microseconds), no separators.
pub const OUTPUT_TIME_FORMAT: &str = "%Y%m%d%H%M%S%6f";

/// Product name of a per-platform collection.
///
/// # Examples
///
/// ```
/// use wofls::product::product_name;
///
/// assert_eq!(product_name("ls8", "nbar_albers"), "ls8_nbar_albers");
/// assert_eq!(product_name("ls5", "pq_albers"), "ls5_pq_albers");
/// ```
pub fn product_name(platform: &str, suffix: &str) -> String {
    format!("{}_{}", platform, suffix)
}

/// Relative path of the output tile produced for `key` by a sensor.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use wofls::coord::SpatioTemporalKey;
/// use wofls::product::output_name;
///
/// let time = Utc.with_ymd_and_hms(2016, 5, 3, 0, 1, 2).unwrap();
/// assert_eq!(
///     output_name("LS8_OLI", &SpatioTemporalKey::new(15, -40, time)),
///     "LS8_OLI_WATER/15_-40/LS8_OLI_WATER_3577_15_-40_20160503000102000000.nc"
/// );
/// ```
pub fn output_name(sensor: &str, key: &SpatioTemporalKey) -> String {
    let time = key.time.format(OUTPUT_TIME_FORMAT);
    format!(
        "{sensor}_WATER/{x}_{y}/{sensor}_WATER_{epsg}_{x}_{y}_{time}.nc",
        sensor = sensor,
        x = key.x,
        y = key.y,
        epsg = GRID_EPSG,
        time = time,
    )
}

/// Full output location under `destination`.
pub fn output_location(destination: &Path, sensor: &str, key: &SpatioTemporalKey) -> PathBuf {
    destination.join(output_name(sensor, key))
}

/// `file://` URI of a local path.
///
/// Relative paths are resolved against the current directory.
pub fn file_uri(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    format!("file://{}", absolute.display())
}
