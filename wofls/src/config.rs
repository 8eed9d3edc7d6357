//! Run configuration.
//!
//! [`WoflConfig`] is an immutable value handed to the planner, dispatcher
//! and pipeline at construction. It can be built in code with the `with_*`
//! methods or loaded from an INI file:
//!
//! ```ini
//! [output]
//! destination = /short/v10/datacube/wofs
//! product = wofs_albers
//!
//! [products]
//! primary_suffix = nbar_albers
//! pq_suffix = pq_albers
//! elevation = dsm1sv10
//!
//! [dispatch]
//! backlog_depth = 16
//! max_tasks = 100
//!
//! [platforms]
//! ls8 = LS8_OLI
//! ls7 = LS7_ETM
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::product::{Platform, ProductSet};

/// Default root directory for produced tiles.
pub const DEFAULT_DESTINATION: &str = "/short/v10/datacube/wofs";

/// Default suffix of primary reflectance products.
pub const DEFAULT_PRIMARY_SUFFIX: &str = "nbar_albers";

/// Default suffix of pixel-quality products.
pub const DEFAULT_PQ_SUFFIX: &str = "pq_albers";

/// Default elevation mosaic product.
pub const DEFAULT_ELEVATION_PRODUCT: &str = "dsm1sv10";

/// Default output product.
pub const DEFAULT_OUTPUT_PRODUCT: &str = "wofs_albers";

/// Default maximum number of tasks in flight.
pub const DEFAULT_BACKLOG_DEPTH: usize = 8;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is missing, malformed or out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration of a production run.
#[derive(Clone, Debug, PartialEq)]
pub struct WoflConfig {
    /// Root directory output tiles are written under.
    pub destination: PathBuf,

    /// Platforms processed, in planning order.
    pub platforms: Vec<Platform>,

    /// Suffix appended to a platform name to form its primary product.
    pub primary_suffix: String,

    /// Suffix appended to a platform name to form its pixel-quality product.
    pub pq_suffix: String,

    /// Atemporal elevation mosaic product.
    pub elevation_product: String,

    /// Product produced tiles are indexed under.
    pub output_product: String,

    /// Maximum number of tasks concurrently in flight.
    pub backlog_depth: usize,

    /// Optional cap on the number of tasks planned per pass.
    pub max_tasks: Option<usize>,
}

impl Default for WoflConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(DEFAULT_DESTINATION),
            platforms: Platform::landsat(),
            primary_suffix: DEFAULT_PRIMARY_SUFFIX.to_string(),
            pq_suffix: DEFAULT_PQ_SUFFIX.to_string(),
            elevation_product: DEFAULT_ELEVATION_PRODUCT.to_string(),
            output_product: DEFAULT_OUTPUT_PRODUCT.to_string(),
            backlog_depth: DEFAULT_BACKLOG_DEPTH,
            max_tasks: None,
        }
    }
}

impl WoflConfig {
    /// Create a configuration writing under `destination`.
    pub fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            ..Default::default()
        }
    }

    /// Replace the platform list.
    pub fn with_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.platforms = platforms;
        self
    }

    /// Set the maximum number of tasks in flight.
    pub fn with_backlog_depth(mut self, depth: usize) -> Self {
        self.backlog_depth = depth;
        self
    }

    /// Cap the number of tasks planned per pass.
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = Some(max_tasks);
        self
    }

    /// Set the output product name.
    pub fn with_output_product(mut self, product: impl Into<String>) -> Self {
        self.output_product = product.into();
        self
    }

    /// Set the elevation mosaic product name.
    pub fn with_elevation_product(mut self, product: impl Into<String>) -> Self {
        self.elevation_product = product.into();
        self
    }

    /// Product names derived from this configuration.
    pub fn product_set(&self) -> ProductSet {
        ProductSet::new(
            &self.platforms,
            &self.primary_suffix,
            &self.pq_suffix,
            self.elevation_product.clone(),
            self.output_product.clone(),
        )
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&content)
    }

    /// Parse and validate INI text. Absent keys keep their defaults.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("output")) {
            if let Some(value) = section.get("destination") {
                config.destination = PathBuf::from(value);
            }
            if let Some(value) = section.get("product") {
                config.output_product = value.to_string();
            }
        }

        if let Some(section) = ini.section(Some("products")) {
            if let Some(value) = section.get("primary_suffix") {
                config.primary_suffix = value.to_string();
            }
            if let Some(value) = section.get("pq_suffix") {
                config.pq_suffix = value.to_string();
            }
            if let Some(value) = section.get("elevation") {
                config.elevation_product = value.to_string();
            }
        }

        if let Some(section) = ini.section(Some("dispatch")) {
            if let Some(value) = section.get("backlog_depth") {
                config.backlog_depth = parse_value("dispatch.backlog_depth", value)?;
            }
            if let Some(value) = section.get("max_tasks") {
                config.max_tasks = Some(parse_value("dispatch.max_tasks", value)?);
            }
        }

        if let Some(section) = ini.section(Some("platforms")) {
            let platforms: Vec<Platform> = section
                .iter()
                .map(|(name, sensor)| Platform::new(name, sensor))
                .collect();
            if !platforms.is_empty() {
                config.platforms = platforms;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the planner and dispatcher depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backlog_depth == 0 {
            return Err(ConfigError::Invalid(
                "backlog_depth must be at least 1".to_string(),
            ));
        }
        if self.platforms.is_empty() {
            return Err(ConfigError::Invalid("no platforms configured".to_string()));
        }

        let mut seen = HashSet::new();
        for platform in &self.platforms {
            if platform.name.is_empty() || platform.sensor.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "platform '{}' needs both a name and a sensor code",
                    platform.name
                )));
            }
            if !seen.insert(platform.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "platform '{}' listed twice",
                    platform.name
                )));
            }
        }

        for (field, value) in [
            ("primary_suffix", &self.primary_suffix),
            ("pq_suffix", &self.pq_suffix),
            ("elevation_product", &self.elevation_product),
            ("output_product", &self.output_product),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }

        Ok(())
    }
}

fn parse_value<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = WoflConfig::default();
        assert_eq!(config.backlog_depth, DEFAULT_BACKLOG_DEPTH);
        assert_eq!(config.platforms.len(), 3);
        assert_eq!(config.output_product, "wofs_albers");
        assert!(config.max_tasks.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = WoflConfig::new(PathBuf::from("/tmp/wofs"))
            .with_platforms(vec![Platform::new("ls5", "LS5_TM")])
            .with_backlog_depth(4)
            .with_max_tasks(1)
            .with_output_product("wofs_test")
            .with_elevation_product("dsm_test");

        assert_eq!(config.destination, PathBuf::from("/tmp/wofs"));
        assert_eq!(config.platforms.len(), 1);
        assert_eq!(config.backlog_depth, 4);
        assert_eq!(config.max_tasks, Some(1));

        let products = config.product_set();
        assert_eq!(products.platforms[0].primary, "ls5_nbar_albers");
        assert_eq!(products.elevation, "dsm_test");
        assert_eq!(products.output, "wofs_test");
    }

    #[test]
    fn test_from_ini_overrides_defaults() {
        let config = WoflConfig::from_ini_str(
            "[output]\n\
             destination = /g/data/wofs\n\
             [dispatch]\n\
             backlog_depth = 32\n\
             max_tasks = 5\n\
             [platforms]\n\
             ls7 = LS7_ETM\n\
             ls5 = LS5_TM\n",
        )
        .unwrap();

        assert_eq!(config.destination, PathBuf::from("/g/data/wofs"));
        assert_eq!(config.backlog_depth, 32);
        assert_eq!(config.max_tasks, Some(5));
        assert_eq!(
            config.platforms,
            vec![Platform::new("ls7", "LS7_ETM"), Platform::new("ls5", "LS5_TM")]
        );
        // Untouched sections keep their defaults
        assert_eq!(config.elevation_product, DEFAULT_ELEVATION_PRODUCT);
    }

    #[test]
    fn test_from_ini_rejects_bad_number() {
        let err = WoflConfig::from_ini_str("[dispatch]\nbacklog_depth = lots\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("backlog_depth"));
    }

    #[test]
    fn test_zero_backlog_depth_is_invalid() {
        let err = WoflConfig::from_ini_str("[dispatch]\nbacklog_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_platform_is_invalid() {
        let config = WoflConfig::default().with_platforms(vec![
            Platform::new("ls8", "LS8_OLI"),
            Platform::new("ls8", "LS8_OLI"),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[products]\nelevation = srtm_dsm\n").unwrap();

        let config = WoflConfig::load(file.path()).unwrap();
        assert_eq!(config.elevation_product, "srtm_dsm");
    }

    #[test]
    fn test_load_missing_file() {
        let err = WoflConfig::load(Path::new("/nonexistent/wofls.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
