//! Recording produced outputs in the catalog.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogError, DatasetId};
use crate::task::TaskResult;

/// What the indexer did with a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The output was recorded under this id.
    Indexed(DatasetId),
    /// The task failed; nothing was recorded.
    Skipped,
}

/// Appends successful outputs to the catalog.
///
/// Relies on the catalog's idempotent insert, so indexing the same result
/// twice records it once. Once indexed, a key drops out of the next
/// planning pass.
pub struct ResultIndexer {
    catalog: Arc<dyn Catalog>,
}

impl ResultIndexer {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Index one result.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the record could not be written.
    pub fn index(&self, result: TaskResult) -> Result<IndexOutcome, CatalogError> {
        match result {
            TaskResult::Success {
                key,
                output_location,
                record,
            } => {
                let id = self.catalog.add_record(&record)?;
                info!(
                    key = %key,
                    id = %id,
                    path = %output_location.display(),
                    "Indexed output"
                );
                Ok(IndexOutcome::Indexed(id))
            }
            TaskResult::Failure {
                key,
                output_location,
                error,
            } => {
                warn!(
                    key = %key,
                    path = %output_location.display(),
                    error = %error,
                    "Task failed, not indexing"
                );
                Ok(IndexOutcome::Skipped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DatasetRecord, MemoryCatalog};
    use crate::coord::BoundingBox;
    use crate::task::test_support::{descriptor, key};
    use crate::task::{TaskDescriptor, TaskFailure};
    use chrono::Utc;
    use std::path::PathBuf;

    fn success(task: &TaskDescriptor) -> TaskResult {
        let uri = format!("file://{}", task.output_location.display());
        let record = DatasetRecord {
            id: DatasetId::from_uri(&uri),
            product: "wofs_albers".to_string(),
            platform: "ls8".to_string(),
            key: task.key,
            uri,
            extent: BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap(),
            valid_data: BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap(),
            sources: task.input_references.iter().map(|t| t.id.clone()).collect(),
            created_at: Utc::now(),
        };
        TaskResult::from_outcome(task, Ok(record))
    }

    #[test]
    fn test_success_is_indexed_with_lineage() {
        let catalog = Arc::new(MemoryCatalog::new());
        let indexer = ResultIndexer::new(catalog.clone());
        let task = descriptor(key(1, 1, 1), PathBuf::from("/out/a.nc"));

        let outcome = indexer.index(success(&task)).unwrap();

        let stored = catalog.get("wofs_albers", &task.key).unwrap();
        assert_eq!(outcome, IndexOutcome::Indexed(stored.id.clone()));
        assert_eq!(stored.lineage.len(), 3);
        assert_eq!(stored.uris, vec!["file:///out/a.nc".to_string()]);
    }

    #[test]
    fn test_indexing_twice_records_once() {
        let catalog = Arc::new(MemoryCatalog::new());
        let indexer = ResultIndexer::new(catalog.clone());
        let task = descriptor(key(1, 1, 1), PathBuf::from("/out/a.nc"));

        let first = indexer.index(success(&task)).unwrap();
        let second = indexer.index(success(&task)).unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.count("wofs_albers"), 1);
    }

    #[test]
    fn test_failure_is_skipped() {
        let catalog = Arc::new(MemoryCatalog::new());
        let indexer = ResultIndexer::new(catalog.clone());
        let task = descriptor(key(2, 2, 2), PathBuf::from("/out/b.nc"));
        let result = TaskResult::from_outcome(&task, Err(TaskFailure::execution("no pq")));

        assert_eq!(indexer.index(result).unwrap(), IndexOutcome::Skipped);
        assert_eq!(catalog.count("wofs_albers"), 0);
    }
}
