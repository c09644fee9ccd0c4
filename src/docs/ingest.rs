use async_trait::async_trait;
use futures::future;
use tracing::{info, warn};

use super::normalize::normalize_all;
use super::readers::{read_records, resolve_format};
use super::types::{BatchFailure, BatchReport, FetchedFile, FileDataset, Format, RemoteFile};
use super::Corpus;
use crate::error::IngestError;

/// Remote folder storage the batch path pulls files from.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Files directly inside `folder_id`, in provider order.
    async fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>>;

    async fn fetch(&self, file: &RemoteFile) -> anyhow::Result<FetchedFile>;
}

/// Read and normalize one source into a dataset.
pub fn build_dataset(
    provenance: &str,
    bytes: &[u8],
    format: Format,
) -> Result<FileDataset, IngestError> {
    let records = read_records(bytes, format)?;
    Ok(FileDataset {
        provenance: provenance.to_string(),
        format,
        records: normalize_all(&records),
        digest: blake3::hash(bytes).to_hex().to_string(),
        ingested_at: chrono::Utc::now().timestamp(),
    })
}

/// Parsing is CPU-bound, so it runs on the blocking pool.
async fn build_dataset_blocking(
    provenance: String,
    bytes: Vec<u8>,
    format: Format,
) -> Result<FileDataset, IngestError> {
    tokio::task::spawn_blocking(move || build_dataset(&provenance, &bytes, format))
        .await
        .map_err(|e| IngestError::read(format, format!("reader task failed: {}", e)))?
}

/// Ingest one uploaded file and append it to the corpus.
///
/// The format comes from the file name's extension, falling back to the
/// declared content type.
pub async fn ingest_single(
    corpus: &Corpus,
    file_name: &str,
    bytes: Vec<u8>,
    content_type: Option<&str>,
) -> Result<FileDataset, IngestError> {
    let format = resolve_format(file_name, content_type)?;
    let dataset = build_dataset_blocking(file_name.to_string(), bytes, format).await?;
    let loaded = corpus.append(dataset.clone()).await;

    info!(
        file = file_name,
        %format,
        records = dataset.records.len(),
        loaded,
        "file ingested"
    );
    Ok(dataset)
}

async fn ingest_remote(store: &dyn RemoteStore, file: &RemoteFile) -> Result<FileDataset, IngestError> {
    let fetched = store
        .fetch(file)
        .await
        .map_err(|e| IngestError::transport(file.name.clone(), e))?;
    let declared = file.mime_type.as_deref().or(fetched.content_type.as_deref());
    let format = resolve_format(&file.name, declared)?;
    let provenance = if file.name.is_empty() {
        file.id.clone()
    } else {
        file.name.clone()
    };
    build_dataset_blocking(provenance, fetched.bytes, format).await
}

/// Rebuild the corpus from every file in a remote folder.
///
/// Files are processed concurrently; a file that fails is logged, left out
/// of the datasets and listed in `failures`. The corpus is replaced in one
/// swap, in listing order. A listing failure leaves the corpus untouched.
pub async fn ingest_batch(
    corpus: &Corpus,
    store: &dyn RemoteStore,
    folder_id: &str,
) -> Result<BatchReport, IngestError> {
    let files = store
        .list_folder(folder_id)
        .await
        .map_err(|e| IngestError::transport(format!("folder {}", folder_id), e))?;

    info!(folder = folder_id, files = files.len(), "rebuilding corpus");

    let outcomes = future::join_all(files.iter().map(|file| ingest_remote(store, file))).await;

    let mut datasets = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for (file, outcome) in files.iter().zip(outcomes) {
        match outcome {
            Ok(dataset) => datasets.push(dataset),
            Err(err) => {
                warn!(
                    file_id = %file.id,
                    file = %file.name,
                    kind = %err.kind(),
                    error = %err,
                    "file skipped"
                );
                failures.push(BatchFailure {
                    file_id: file.id.clone(),
                    file_name: file.name.clone(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }
    }

    let datasets = corpus.replace(datasets).await;
    info!(
        folder = folder_id,
        loaded = datasets.len(),
        failed = failures.len(),
        "corpus rebuilt"
    );

    Ok(BatchReport {
        datasets,
        failures,
        listed: files.len(),
    })
}
