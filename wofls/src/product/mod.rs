//! Product definitions.
//!
//! A production run reconciles several independently indexed products:
//!
//! ```text
//! per platform:   {platform}_nbar_albers   primary surface reflectance
//!                 {platform}_pq_albers     paired pixel quality
//! shared:         dsm1sv10                 atemporal elevation mosaic
//! target:         wofs_albers              water observation output
//! ```
//!
//! Names come from [`crate::config::WoflConfig`]; nothing here is global.

mod naming;

pub use naming::{file_uri, output_location, output_name, product_name, OUTPUT_TIME_FORMAT};

use serde::{Deserialize, Serialize};

/// A sensor platform whose archive is processed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Short identifier used in product names (e.g. `ls8`).
    pub name: String,
    /// Sensor code used in output names (e.g. `LS8_OLI`).
    pub sensor: String,
}

impl Platform {
    pub fn new(name: impl Into<String>, sensor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sensor: sensor.into(),
        }
    }

    /// Landsat 8, 7 and 5, newest first.
    pub fn landsat() -> Vec<Platform> {
        vec![
            Platform::new("ls8", "LS8_OLI"),
            Platform::new("ls7", "LS7_ETM"),
            Platform::new("ls5", "LS5_TM"),
        ]
    }
}

/// Primary and pixel-quality products of one platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformProducts {
    pub platform: Platform,
    pub primary: String,
    pub pixel_quality: String,
}

/// Every product a planning pass reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductSet {
    pub platforms: Vec<PlatformProducts>,
    pub elevation: String,
    pub output: String,
}

impl ProductSet {
    /// Derives per-platform product names from suffixes.
    pub fn new(
        platforms: &[Platform],
        primary_suffix: &str,
        pq_suffix: &str,
        elevation: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            platforms: platforms
                .iter()
                .map(|platform| PlatformProducts {
                    platform: platform.clone(),
                    primary: product_name(&platform.name, primary_suffix),
                    pixel_quality: product_name(&platform.name, pq_suffix),
                })
                .collect(),
            elevation: elevation.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landsat_platforms() {
        let platforms = Platform::landsat();
        let names: Vec<_> = platforms.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ls8", "ls7", "ls5"]);
        assert_eq!(platforms[2].sensor, "LS5_TM");
    }

    #[test]
    fn test_product_set_names() {
        let set = ProductSet::new(
            &Platform::landsat(),
            "nbar_albers",
            "pq_albers",
            "dsm1sv10",
            "wofs_albers",
        );

        assert_eq!(set.platforms.len(), 3);
        assert_eq!(set.platforms[0].primary, "ls8_nbar_albers");
        assert_eq!(set.platforms[1].pixel_quality, "ls7_pq_albers");
        assert_eq!(set.elevation, "dsm1sv10");
        assert_eq!(set.output, "wofs_albers");
    }
}
