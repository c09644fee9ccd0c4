pub mod ingest;
pub mod normalize;
pub mod readers;
pub mod render;
pub mod types;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use types::FileDataset;

/// The currently loaded, answerable set of file datasets.
///
/// Readers take an `Arc` snapshot; writers build a new vector and swap it in,
/// so a reader never observes a half-replaced corpus.
#[derive(Default)]
pub struct Corpus {
    datasets: RwLock<Arc<Vec<FileDataset>>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<Vec<FileDataset>> {
        self.datasets.read().await.clone()
    }

    /// Add one dataset after those already loaded. Returns the new count.
    pub async fn append(&self, dataset: FileDataset) -> usize {
        let mut guard = self.datasets.write().await;
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(dataset);
        let count = next.len();
        *guard = Arc::new(next);
        debug!(count, "dataset appended to corpus");
        count
    }

    /// Install `datasets` as the whole corpus in one swap.
    pub async fn replace(&self, datasets: Vec<FileDataset>) -> Arc<Vec<FileDataset>> {
        let next = Arc::new(datasets);
        let previous = {
            let mut guard = self.datasets.write().await;
            std::mem::replace(&mut *guard, next.clone())
        };
        debug!(
            previous = previous.len(),
            current = next.len(),
            "corpus replaced"
        );
        next
    }

    /// Drop every dataset. Returns how many were loaded.
    pub async fn clear(&self) -> usize {
        let mut guard = self.datasets.write().await;
        let previous = std::mem::take(&mut *guard);
        debug!(previous = previous.len(), "corpus cleared");
        previous.len()
    }
}
