//! Planning: which tiles still need producing.
//!
//! [`TileJoiner`] reconciles the listings of independently indexed products
//! into a [`Backlog`] of tasks. A key is planned when the platform's primary
//! and pixel-quality products both have it, the elevation mosaic covers its
//! cell, and the output product does not have it yet.
//!
//! ```text
//!  primary ∩ pixel_quality ── − output ── ∩ elevation(x, y) ──► TaskDescriptor
//! ```
//!
//! Planning is a pure function of catalog state: re-planning without
//! indexing yields the same backlog, and once every result is indexed the
//! next pass is empty.

mod backlog;

pub use backlog::Backlog;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, TileReference};
use crate::config::WoflConfig;
use crate::coord::{BoundingBox, SpatialKey, SpatioTemporalKey, TimeRange};
use crate::error::WoflError;
use crate::product::{output_location, PlatformProducts, ProductSet};
use crate::task::{TaskDescriptor, TaskInputs};

/// Space-time extent of a planning pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanQuery {
    pub time_range: TimeRange,
    pub extent: BoundingBox,
}

impl PlanQuery {
    pub fn new(time_range: TimeRange, extent: BoundingBox) -> Self {
        Self { time_range, extent }
    }
}

/// Joins product listings into the set of tasks still to run.
pub struct TileJoiner {
    catalog: Arc<dyn Catalog>,
    products: ProductSet,
    destination: PathBuf,
    max_tasks: Option<usize>,
}

impl TileJoiner {
    /// Create a joiner reading `catalog` with the products of `config`.
    pub fn new(catalog: Arc<dyn Catalog>, config: &WoflConfig) -> Self {
        Self {
            catalog,
            products: config.product_set(),
            destination: config.destination.clone(),
            max_tasks: config.max_tasks,
        }
    }

    /// Plans the tasks for `query`.
    ///
    /// Platforms are visited in configured order and each contributes its
    /// keys in ascending order, so the backlog is deterministic for a given
    /// catalog state.
    ///
    /// # Errors
    ///
    /// [`WoflError::CatalogConsistency`] if the elevation mosaic has more
    /// than one timestamp in the extent, and [`WoflError::Catalog`] if a
    /// listing fails. No tasks are planned in either case.
    pub fn plan(&self, query: &PlanQuery) -> Result<Backlog, WoflError> {
        let elevation = self.elevation_tiles(&query.extent)?;
        let produced: HashSet<SpatioTemporalKey> = self
            .catalog
            .list_tiles(&self.products.output, Some(&query.time_range), &query.extent)?
            .into_keys()
            .collect();

        debug!(
            elevation_tiles = elevation.len(),
            produced = produced.len(),
            "Fetched shared listings"
        );

        let mut tasks = Vec::new();
        let mut planned = HashSet::new();

        for products in &self.products.platforms {
            let before = tasks.len();
            self.plan_platform(
                products,
                query,
                &elevation,
                &produced,
                &mut planned,
                &mut tasks,
            )?;
            info!(
                platform = %products.platform.name,
                tasks = tasks.len() - before,
                "Planned platform"
            );
        }

        if let Some(max) = self.max_tasks {
            if tasks.len() > max {
                info!(planned = tasks.len(), max_tasks = max, "Truncating backlog");
                tasks.truncate(max);
            }
        }

        info!(tasks = tasks.len(), "Planning complete");
        Ok(Backlog::new(tasks))
    }

    /// Elevation tiles in the extent, keyed by grid cell.
    fn elevation_tiles(
        &self,
        extent: &BoundingBox,
    ) -> Result<HashMap<SpatialKey, TileReference>, WoflError> {
        let listing = self
            .catalog
            .list_tiles(&self.products.elevation, None, extent)?;

        // Zero timestamps is not an error: no mosaic coverage plans no tasks.
        let timestamps: BTreeSet<_> = listing.keys().map(|key| key.time).collect();
        if timestamps.len() > 1 {
            warn!(
                product = %self.products.elevation,
                timestamps = timestamps.len(),
                "Elevation mosaic is not atemporal"
            );
            return Err(WoflError::CatalogConsistency {
                product: self.products.elevation.clone(),
                timestamps: timestamps.into_iter().collect(),
            });
        }

        Ok(listing
            .into_iter()
            .map(|(key, tile)| (key.spatial(), tile))
            .collect())
    }

    fn plan_platform(
        &self,
        products: &PlatformProducts,
        query: &PlanQuery,
        elevation: &HashMap<SpatialKey, TileReference>,
        produced: &HashSet<SpatioTemporalKey>,
        planned: &mut HashSet<SpatioTemporalKey>,
        tasks: &mut Vec<TaskDescriptor>,
    ) -> Result<(), WoflError> {
        let primary =
            self.catalog
                .list_tiles(&products.primary, Some(&query.time_range), &query.extent)?;
        let mut pixel_quality = self.catalog.list_tiles(
            &products.pixel_quality,
            Some(&query.time_range),
            &query.extent,
        )?;

        for (key, primary_tile) in primary {
            if produced.contains(&key) {
                continue;
            }
            let Some(pq_tile) = pixel_quality.remove(&key) else {
                continue;
            };
            let Some(elevation_tile) = elevation.get(&key.spatial()) else {
                continue;
            };
            if !planned.insert(key) {
                warn!(
                    platform = %products.platform.name,
                    key = %key,
                    "Key already planned for another platform, skipping"
                );
                continue;
            }

            let location = output_location(&self.destination, &products.platform.sensor, &key);
            tasks.push(TaskDescriptor::new(
                key,
                products.platform.clone(),
                TaskInputs {
                    primary: primary_tile,
                    pixel_quality: pq_tile,
                    elevation: elevation_tile.clone(),
                },
                location,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatasetId, MemoryCatalog};
    use crate::coord::GridSpec;
    use crate::product::Platform;
    use chrono::{DateTime, TimeZone, Utc};
    use std::path::Path;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 6, day, 0, 0, 0).unwrap()
    }

    fn query() -> PlanQuery {
        PlanQuery::new(
            TimeRange::new(at(1), at(30)).unwrap(),
            BoundingBox::new(-1_000_000.0, -1_000_000.0, 1_000_000.0, 1_000_000.0).unwrap(),
        )
    }

    fn tile(product: &str, key: SpatioTemporalKey) -> TileReference {
        let extent = GridSpec::default().tile_extent(key.spatial());
        TileReference::new(product, key, format!("file:///{}/{}.nc", product, key), extent)
    }

    fn seed(catalog: &MemoryCatalog, product: &str, keys: &[SpatioTemporalKey]) {
        for key in keys {
            catalog.insert_tile(tile(product, *key)).unwrap();
        }
    }

    fn seed_elevation(catalog: &MemoryCatalog, cells: &[(i32, i32)]) {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        for (x, y) in cells {
            seed(catalog, "dsm1sv10", &[SpatioTemporalKey::new(*x, *y, epoch)]);
        }
    }

    fn config(platforms: Vec<Platform>) -> WoflConfig {
        WoflConfig::new(PathBuf::from("/out")).with_platforms(platforms)
    }

    fn ls8() -> Vec<Platform> {
        vec![Platform::new("ls8", "LS8_OLI")]
    }

    #[test]
    fn test_join_requires_all_inputs_and_no_output() {
        let a = SpatioTemporalKey::new(0, 0, at(2));
        let b = SpatioTemporalKey::new(1, 0, at(2));
        let c = SpatioTemporalKey::new(2, 0, at(2));

        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog, "ls8_nbar_albers", &[a, b, c]);
        seed(&catalog, "ls8_pq_albers", &[a, b]);
        seed_elevation(&catalog, &[(0, 0), (2, 0)]);
        seed(&catalog, "wofs_albers", &[b]);

        let joiner = TileJoiner::new(catalog, &config(ls8()));
        let tasks: Vec<_> = joiner.plan(&query()).unwrap().collect();

        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.key, a);
        assert_eq!(task.input_references.primary.product, "ls8_nbar_albers");
        assert_eq!(task.input_references.pixel_quality.product, "ls8_pq_albers");
        assert_eq!(task.input_references.elevation.product, "dsm1sv10");
        assert_eq!(
            task.output_location,
            Path::new("/out/LS8_OLI_WATER/0_0/LS8_OLI_WATER_3577_0_0_20160602000000000000.nc")
        );
    }

    #[test]
    fn test_elevation_with_two_timestamps_is_rejected() {
        let a = SpatioTemporalKey::new(0, 0, at(2));
        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog, "ls8_nbar_albers", &[a]);
        seed(&catalog, "ls8_pq_albers", &[a]);
        seed(
            &catalog,
            "dsm1sv10",
            &[
                SpatioTemporalKey::new(0, 0, at(1)),
                SpatioTemporalKey::new(1, 0, at(5)),
            ],
        );

        let joiner = TileJoiner::new(catalog, &config(ls8()));
        match joiner.plan(&query()) {
            Err(WoflError::CatalogConsistency {
                product,
                timestamps,
            }) => {
                assert_eq!(product, "dsm1sv10");
                assert_eq!(timestamps, vec![at(1), at(5)]);
            }
            other => panic!("expected consistency error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_no_elevation_means_no_tasks() {
        let a = SpatioTemporalKey::new(0, 0, at(2));
        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog, "ls8_nbar_albers", &[a]);
        seed(&catalog, "ls8_pq_albers", &[a]);

        let joiner = TileJoiner::new(catalog, &config(ls8()));
        assert!(joiner.plan(&query()).unwrap().is_empty());
    }

    #[test]
    fn test_platforms_in_config_order_keys_ascending() {
        let catalog = Arc::new(MemoryCatalog::new());
        let ls5_keys = [
            SpatioTemporalKey::new(1, 1, at(3)),
            SpatioTemporalKey::new(0, 1, at(4)),
        ];
        let ls8_keys = [
            SpatioTemporalKey::new(1, 0, at(9)),
            SpatioTemporalKey::new(0, 0, at(9)),
            SpatioTemporalKey::new(0, 0, at(2)),
        ];
        seed(&catalog, "ls5_nbar_albers", &ls5_keys);
        seed(&catalog, "ls5_pq_albers", &ls5_keys);
        seed(&catalog, "ls8_nbar_albers", &ls8_keys);
        seed(&catalog, "ls8_pq_albers", &ls8_keys);
        seed_elevation(&catalog, &[(0, 0), (1, 0), (0, 1), (1, 1)]);

        let platforms = vec![Platform::new("ls8", "LS8_OLI"), Platform::new("ls5", "LS5_TM")];
        let joiner = TileJoiner::new(catalog, &config(platforms));
        let order: Vec<_> = joiner
            .plan(&query())
            .unwrap()
            .map(|task| (task.platform.name, task.key))
            .collect();

        assert_eq!(
            order,
            vec![
                ("ls8".to_string(), SpatioTemporalKey::new(0, 0, at(2))),
                ("ls8".to_string(), SpatioTemporalKey::new(0, 0, at(9))),
                ("ls8".to_string(), SpatioTemporalKey::new(1, 0, at(9))),
                ("ls5".to_string(), SpatioTemporalKey::new(0, 1, at(4))),
                ("ls5".to_string(), SpatioTemporalKey::new(1, 1, at(3))),
            ]
        );
    }

    #[test]
    fn test_key_shared_by_platforms_is_planned_once() {
        let shared = SpatioTemporalKey::new(0, 0, at(2));
        let catalog = Arc::new(MemoryCatalog::new());
        for platform in ["ls7", "ls5"] {
            seed(&catalog, &format!("{}_nbar_albers", platform), &[shared]);
            seed(&catalog, &format!("{}_pq_albers", platform), &[shared]);
        }
        seed_elevation(&catalog, &[(0, 0)]);

        let platforms = vec![Platform::new("ls7", "LS7_ETM"), Platform::new("ls5", "LS5_TM")];
        let joiner = TileJoiner::new(catalog, &config(platforms));
        let tasks: Vec<_> = joiner.plan(&query()).unwrap().collect();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].platform.name, "ls7");
    }

    #[test]
    fn test_time_range_filters_primary() {
        let inside = SpatioTemporalKey::new(0, 0, at(2));
        let outside = SpatioTemporalKey::new(0, 0, Utc.with_ymd_and_hms(2017, 3, 1, 0, 0, 0).unwrap());
        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog, "ls8_nbar_albers", &[inside, outside]);
        seed(&catalog, "ls8_pq_albers", &[inside, outside]);
        seed_elevation(&catalog, &[(0, 0)]);

        let joiner = TileJoiner::new(catalog, &config(ls8()));
        let keys: Vec<_> = joiner.plan(&query()).unwrap().map(|t| t.key).collect();
        assert_eq!(keys, vec![inside]);
    }

    #[test]
    fn test_max_tasks_truncates_backlog() {
        let keys: Vec<_> = (0..5).map(|x| SpatioTemporalKey::new(x, 0, at(2))).collect();
        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog, "ls8_nbar_albers", &keys);
        seed(&catalog, "ls8_pq_albers", &keys);
        seed_elevation(&catalog, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]);

        let joiner = TileJoiner::new(catalog, &config(ls8()).with_max_tasks(2));
        let planned: Vec<_> = joiner.plan(&query()).unwrap().map(|t| t.key).collect();
        assert_eq!(planned, keys[..2].to_vec());
    }

    #[test]
    fn test_inputs_carry_catalog_identity() {
        let a = SpatioTemporalKey::new(3, -2, at(7));
        let catalog = Arc::new(MemoryCatalog::new());
        seed(&catalog, "ls8_nbar_albers", &[a]);
        seed(&catalog, "ls8_pq_albers", &[a]);
        seed_elevation(&catalog, &[(3, -2)]);

        let joiner = TileJoiner::new(catalog, &config(ls8()));
        let task = joiner.plan(&query()).unwrap().next().unwrap();
        assert_eq!(
            task.input_references.primary.id,
            DatasetId::from_uri(&format!("file:///ls8_nbar_albers/{}.nc", a))
        );
    }
}
