//! Drive-style REST backend
//!
//! Speaks the Google Drive v3 files API: `files` listings with a query
//! filter and page tokens, `files/{id}` metadata, and `alt=media`
//! content downloads with Range support.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header;
use serde::Deserialize;

use crate::config::ProviderConfig;

use super::{
    ByteRange, ListQuery, ObjectEntry, ObjectMetadata, ObjectStream, ProviderError,
    RemoteObjectProvider,
};

/// Filter selecting streamable audio: audio mime types or `.mp3` names,
/// not trashed, not folders.
const AUDIO_FILTER: &str = "(mimeType contains 'audio/' or name contains '.mp3') \
     and trashed = false \
     and mimeType != 'application/vnd.google-apps.folder'";

/// Remote object provider backed by a Drive-style REST API
pub struct DriveProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    /// Drive serializes sizes as JSON strings.
    size: Option<String>,
}

impl DriveProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        // No overall request timeout: content downloads stream for as
        // long as the client keeps reading. Only connecting is bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            page_size: config.page_size,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(format!("{}/{}", self.base_url, path));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ProviderError::Status(response.status().as_u16()))
        }
    }
}

/// Build the listing filter, scoped to a container when one is given.
/// Container ids come from configuration, never from the request.
fn listing_filter(container: Option<&str>) -> String {
    match container {
        Some(parent) => format!("{AUDIO_FILTER} and '{parent}' in parents"),
        None => AUDIO_FILTER.to_string(),
    }
}

#[async_trait]
impl RemoteObjectProvider for DriveProvider {
    async fn list(&self, query: &ListQuery) -> Result<Vec<ObjectEntry>, ProviderError> {
        let filter = listing_filter(query.container.as_deref());
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .get("files")
                .query(&[
                    ("q", filter.as_str()),
                    ("fields", "nextPageToken, files(id, name, mimeType)"),
                    ("orderBy", "name_natural"),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                ])
                .query(&[("pageSize", self.page_size)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::ensure_success(request.send().await?)?;
            let page: FileList = response.json().await?;

            entries.extend(page.files.into_iter().map(|file| ObjectEntry {
                id: file.id,
                name: file.name,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn metadata(&self, id: &str) -> Result<ObjectMetadata, ProviderError> {
        let response = self
            .get(&format!("files/{id}"))
            .query(&[
                ("fields", "id, name, mimeType, size"),
                ("supportsAllDrives", "true"),
            ])
            .send()
            .await?;
        let response = Self::ensure_success(response)?;
        let meta: FileMetadata = response.json().await?;

        Ok(ObjectMetadata {
            mime_type: meta.mime_type,
            size: meta.size.and_then(|size| size.parse().ok()),
        })
    }

    async fn content(
        &self,
        id: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectStream, ProviderError> {
        let mut request = self
            .get(&format!("files/{id}"))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")]);
        if let Some(range) = range {
            request = request.header(
                header::RANGE,
                format!("bytes={}-{}", range.start, range.end),
            );
        }

        let response = Self::ensure_success(request.send().await?)?;
        Ok(Box::pin(response.bytes_stream().map_err(ProviderError::from)))
    }
}
