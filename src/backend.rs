// Collaborator seams for the navigator: the document-storage service and
// the byte-stream transport used for signed-URL transfers. The navigator
// only ever talks to these traits, so it has no idea about HTTP or JSON.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// A folder node. `parent_id` is `None` only for the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
}

/// A document as seen through its latest version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub id: String,
    pub latest_version_id: String,
    pub name: String,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Immediate children of one folder, in the order the backend returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub folders: Vec<FolderEntry>,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "NAME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASCENDING",
        }
    }
}

/// Everything the backend needs to hand out an upload slot.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub content_type: String,
    pub parent_folder_id: String,
}

/// A draft document version plus the signed destination for its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    pub document_id: String,
    pub version_id: String,
    pub upload_url: String,
    pub upload_headers: BTreeMap<String, String>,
}

/// Operations the navigator needs from the document-storage service.
pub trait Backend {
    fn describe_root_folder(&self) -> Result<FolderRef>;

    fn describe_folder(&self, folder_id: &str) -> Result<FolderRef>;

    fn list_folder_contents(
        &self,
        folder_id: &str,
        sort: SortKey,
        order: SortOrder,
    ) -> Result<DirectoryListing>;

    /// Signed URL serving the bytes of one document version.
    fn request_download_source(&self, document_id: &str, version_id: &str) -> Result<String>;

    fn request_upload_slot(&self, request: &UploadRequest) -> Result<UploadSlot>;

    /// Marks an uploaded version as the active one.
    fn finalize_document_version(&self, document_id: &str, version_id: &str) -> Result<()>;
}

/// Moves raw bytes between signed URLs and the local filesystem.
pub trait Transport {
    /// Streams `url` into `destination`, truncating any existing file.
    /// Returns the number of bytes written.
    fn download(&self, url: &str, destination: &Path) -> Result<u64>;

    /// Streams `source` to `url` and returns the HTTP status code of the
    /// response. Errors are reserved for faults that produced no response.
    fn upload(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        source: &Path,
        size_bytes: u64,
    ) -> Result<u16>;
}
