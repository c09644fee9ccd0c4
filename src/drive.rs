use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::docs::ingest::RemoteStore;
use crate::docs::types::{FetchedFile, RemoteFile};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FILE_FIELDS: &str = "id, name, mimeType";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

/// Google Drive v3 over plain REST with a caller-supplied bearer token.
pub struct DriveClient {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    token: String,
}

impl DriveClient {
    /// `None` when `DRIVE_ACCESS_TOKEN` is unset.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(token) = dotenv::var("DRIVE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
        else {
            return Ok(None);
        };
        let api_base =
            dotenv::var("DRIVE_API_BASE").unwrap_or_else(|_| DRIVE_API_BASE.to_string());
        let upload_base =
            dotenv::var("DRIVE_UPLOAD_BASE").unwrap_or_else(|_| DRIVE_UPLOAD_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Some(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        }))
    }

    /// Upload `bytes` into `folder_id` under `name` in a single multipart request.
    pub async fn upload(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<RemoteFile> {
        let size = bytes.len();
        let form = upload_form(folder_id, name, bytes, content_type)?;

        let file: RemoteFile = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .multipart(form)
            .send()
            .await
            .context("Drive upload request failed")?
            .error_for_status()
            .context("Drive rejected upload")?
            .json()
            .await
            .context("Failed to parse Drive upload response")?;

        info!(file_id = %file.id, name = %file.name, folder = folder_id, size, "uploaded to Drive");
        Ok(file)
    }
}

/// File metadata sent ahead of the media part.
fn upload_metadata(folder_id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({ "name": name, "parents": [folder_id] })
}

/// Metadata part first, then the media, as the multipart upload expects.
fn upload_form(
    folder_id: &str,
    name: &str,
    bytes: Vec<u8>,
    content_type: Option<&str>,
) -> Result<Form> {
    let metadata = Part::text(upload_metadata(folder_id, name).to_string())
        .mime_str("application/json; charset=UTF-8")
        .context("Invalid metadata content type")?;
    let media = Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str(content_type.unwrap_or("application/octet-stream"))
        .with_context(|| format!("Invalid content type for {}", name))?;
    Ok(Form::new().part("metadata", metadata).part("file", media))
}

/// Drive search expression for the direct children of a folder.
fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents", escaped)
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let query = folder_query(folder_id);
        let fields = format!("nextPageToken, files({})", FILE_FIELDS);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&self.token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", fields.as_str()),
                    ("pageSize", "1000"),
                ]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = req
                .send()
                .await
                .context("Drive list request failed")?
                .error_for_status()
                .context("Drive rejected list request")?
                .json()
                .await
                .context("Failed to parse Drive file list")?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!(folder = folder_id, count = files.len(), "Drive folder listed");
        Ok(files)
    }

    async fn fetch(&self, file: &RemoteFile) -> Result<FetchedFile> {
        let resp = self
            .client
            .get(format!("{}/files/{}", self.api_base, file.id))
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
            .send()
            .await
            .with_context(|| format!("Drive download of {} failed", file.id))?
            .error_for_status()
            .with_context(|| format!("Drive rejected download of {}", file.id))?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", file.id))?;

        debug!(file_id = %file.id, name = %file.name, size = bytes.len(), "Drive file downloaded");
        Ok(FetchedFile {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_query_quotes_id() {
        assert_eq!(folder_query("abc123"), "'abc123' in parents");
        assert_eq!(folder_query("o'neil"), "'o\\'neil' in parents");
    }

    #[test]
    fn file_list_keeps_provider_order() {
        let page: FileList = serde_json::from_str(
            r#"{
                "nextPageToken": "tok",
                "files": [
                    {"id": "1", "name": "a.csv", "mimeType": "text/csv"},
                    {"id": "2", "name": "b.csv"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        let names: Vec<_> = page.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert_eq!(page.files[0].mime_type.as_deref(), Some("text/csv"));
        assert_eq!(page.files[1].mime_type, None);
    }

    #[test]
    fn upload_metadata_names_file_and_parent() {
        let metadata = upload_metadata("folder-1", "2023/24 sales.csv");
        assert_eq!(metadata["name"], "2023/24 sales.csv");
        assert_eq!(metadata["parents"], serde_json::json!(["folder-1"]));
    }

    #[test]
    fn upload_form_rejects_bad_content_type() {
        assert!(upload_form("f", "a.csv", b"x".to_vec(), Some("text/csv")).is_ok());
        assert!(upload_form("f", "a.bin", b"x".to_vec(), None).is_ok());
        assert!(upload_form("f", "a.csv", b"x".to_vec(), Some("not a mime\n")).is_err());
    }

    #[test]
    fn empty_listing_has_no_files() {
        let page: FileList = serde_json::from_str("{}").unwrap();
        assert!(page.files.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
