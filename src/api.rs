// API client module: a small blocking HTTP client for the WorkDocs REST
// API. It implements the `Backend` trait so the navigator never sees
// URLs, headers or JSON shapes.

use crate::backend::{
    Backend, DirectoryListing, DocumentEntry, FolderEntry, FolderRef, SortKey, SortOrder,
    UploadRequest, UploadSlot,
};
use crate::config::Config;
use crate::error::{Result, ShellError};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// The service reads its bearer token from this header, not `Authorization`.
const AUTHENTICATION: &str = "authentication";

/// Key of the original upload in a version's `Source` map.
const ORIGINAL_SOURCE: &str = "ORIGINAL";

/// Blocking client bound to one endpoint and one bearer token.
#[derive(Clone)]
pub struct WorkDocsClient {
    client: Client,
    base_url: Url,
    token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct RootFoldersResponse {
    #[serde(default)]
    folders: Vec<FolderMetadata>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct FolderMetadata {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_folder_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct GetFolderResponse {
    metadata: FolderMetadata,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct FolderContentsResponse {
    #[serde(default)]
    folders: Vec<FolderMetadata>,
    #[serde(default)]
    documents: Vec<DocumentMetadata>,
    #[serde(default)]
    marker: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DocumentMetadata {
    id: String,
    latest_version_metadata: VersionMetadata,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct VersionMetadata {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default, deserialize_with = "epoch_seconds")]
    modified_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    source: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DocumentVersionResponse {
    metadata: VersionMetadata,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct InitiateUploadRequest<'a> {
    name: &'a str,
    content_created_timestamp: f64,
    content_modified_timestamp: f64,
    content_type: &'a str,
    document_size_in_bytes: u64,
    parent_folder_id: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct InitiateUploadResponse {
    metadata: DocumentMetadata,
    upload_metadata: UploadMetadata,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct UploadMetadata {
    upload_url: String,
    #[serde(default)]
    signed_headers: BTreeMap<String, String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct UpdateVersionRequest {
    version_status: &'static str,
}

// The service encodes timestamps as fractional epoch seconds.
fn epoch_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<f64>::deserialize(deserializer)?;
    Ok(secs.and_then(|s| DateTime::<Utc>::from_timestamp_millis((s * 1000.0).round() as i64)))
}

/// Marker for the following page, or `None` once the listing is complete.
/// A server echoing the marker it was just given ends the walk too.
fn next_marker(previous: Option<&str>, returned: Option<String>) -> Option<String> {
    returned.filter(|next| !next.is_empty() && Some(next.as_str()) != previous)
}

fn to_epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

impl From<FolderMetadata> for FolderEntry {
    fn from(folder: FolderMetadata) -> Self {
        FolderEntry {
            id: folder.id,
            name: folder.name.unwrap_or_default(),
        }
    }
}

impl From<DocumentMetadata> for DocumentEntry {
    fn from(doc: DocumentMetadata) -> Self {
        let version = doc.latest_version_metadata;
        DocumentEntry {
            id: doc.id,
            latest_version_id: version.id,
            name: version.name,
            size_bytes: version.size,
            modified_at: version.modified_timestamp,
        }
    }
}

impl WorkDocsClient {
    /// Build a client for the endpoint and token found in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint)
            .map_err(|err| ShellError::Config(format!("invalid endpoint {}: {err}", config.endpoint)))?;
        if base_url.cannot_be_a_base() {
            return Err(ShellError::Config(format!("invalid endpoint {}", config.endpoint)));
        }
        let client = Client::builder()
            .build()
            .map_err(|err| ShellError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(WorkDocsClient {
            client,
            base_url,
            token: config.auth_token.clone(),
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.token)
            .map_err(|_| ShellError::Config("AUTH_TOKEN is not a valid header value".into()))?;
        headers.insert(HeaderName::from_static(AUTHENTICATION), value);
        Ok(headers)
    }

    /// `/api/v1/<segments...>` with every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url
    }

    fn execute(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        let res = request
            .headers(self.auth_headers()?)
            .send()
            .map_err(|err| ShellError::Backend(format!("{operation}: {err}")))?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            return Err(ShellError::Backend(format!("{operation} failed: {status} - {txt}")));
        }
        trace!(operation, status = %res.status(), "request succeeded");
        Ok(res)
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, operation: &str) -> Result<T> {
        self.execute(request, operation)?
            .json::<T>()
            .map_err(|err| ShellError::Backend(format!("parsing {operation} response: {err}")))
    }

    fn contents_page(
        &self,
        folder_id: &str,
        sort: SortKey,
        order: SortOrder,
        marker: Option<&str>,
    ) -> Result<FolderContentsResponse> {
        let mut request = self
            .client
            .get(self.url(&["folders", folder_id, "contents"]))
            .query(&[("sort", sort.as_str()), ("order", order.as_str()), ("type", "ALL")]);
        if let Some(marker) = marker {
            request = request.query(&[("marker", marker)]);
        }
        self.fetch(request, "DescribeFolderContents")
    }
}

impl Backend for WorkDocsClient {
    fn describe_root_folder(&self) -> Result<FolderRef> {
        let res: RootFoldersResponse =
            self.fetch(self.client.get(self.url(&["me", "root"])), "DescribeRootFolders")?;
        let root = res
            .folders
            .into_iter()
            .next()
            .ok_or_else(|| ShellError::Backend("no root folder for this user".into()))?;
        debug!(root = %root.id, "root folder resolved");
        Ok(FolderRef {
            id: root.id,
            parent_id: None,
        })
    }

    fn describe_folder(&self, folder_id: &str) -> Result<FolderRef> {
        debug!(folder = folder_id, "GetFolder");
        let res: GetFolderResponse =
            self.fetch(self.client.get(self.url(&["folders", folder_id])), "GetFolder")?;
        Ok(FolderRef {
            id: res.metadata.id,
            parent_id: res.metadata.parent_folder_id,
        })
    }

    fn list_folder_contents(
        &self,
        folder_id: &str,
        sort: SortKey,
        order: SortOrder,
    ) -> Result<DirectoryListing> {
        let mut listing = DirectoryListing::default();
        let mut marker: Option<String> = None;
        loop {
            let page = self.contents_page(folder_id, sort, order, marker.as_deref())?;
            debug!(
                folder = folder_id,
                folders = page.folders.len(),
                documents = page.documents.len(),
                "DescribeFolderContents page"
            );
            listing.folders.extend(page.folders.into_iter().map(FolderEntry::from));
            listing.documents.extend(page.documents.into_iter().map(DocumentEntry::from));
            match next_marker(marker.as_deref(), page.marker) {
                Some(next) => marker = Some(next),
                None => break,
            }
        }
        Ok(listing)
    }

    fn request_download_source(&self, document_id: &str, version_id: &str) -> Result<String> {
        let request = self
            .client
            .get(self.url(&["documents", document_id, "versions", version_id]))
            .query(&[("fields", "SOURCE")]);
        let mut res: DocumentVersionResponse = self.fetch(request, "GetDocumentVersion")?;
        res.metadata.source.remove(ORIGINAL_SOURCE).ok_or_else(|| {
            ShellError::Backend(format!("version {version_id} of {document_id} has no download source"))
        })
    }

    fn request_upload_slot(&self, request: &UploadRequest) -> Result<UploadSlot> {
        let body = InitiateUploadRequest {
            name: &request.name,
            content_created_timestamp: to_epoch_seconds(request.created_at),
            content_modified_timestamp: to_epoch_seconds(request.modified_at),
            content_type: &request.content_type,
            document_size_in_bytes: request.size_bytes,
            parent_folder_id: &request.parent_folder_id,
        };
        debug!(name = %request.name, parent = %request.parent_folder_id, "InitiateDocumentVersionUpload");
        let res: InitiateUploadResponse = self.fetch(
            self.client.post(self.url(&["documents"])).json(&body),
            "InitiateDocumentVersionUpload",
        )?;
        Ok(UploadSlot {
            document_id: res.metadata.id,
            version_id: res.metadata.latest_version_metadata.id,
            upload_url: res.upload_metadata.upload_url,
            upload_headers: res.upload_metadata.signed_headers,
        })
    }

    fn finalize_document_version(&self, document_id: &str, version_id: &str) -> Result<()> {
        let body = UpdateVersionRequest {
            version_status: "ACTIVE",
        };
        debug!(document = document_id, version = version_id, "UpdateDocumentVersion");
        self.execute(
            self.client
                .patch(self.url(&["documents", document_id, "versions", version_id]))
                .json(&body),
            "UpdateDocumentVersion",
        )?;
        Ok(())
    }
}
