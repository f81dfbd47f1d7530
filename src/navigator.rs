// Session navigator: the folder-tree position of one interactive session
// plus the cached listing of the folder it currently sits in.
//
// The cache is either absent or holds the listing of `current_folder_id`.
// It is filled by `list` and dropped whenever the current folder actually
// changes. Uploads leave it alone, so a freshly uploaded file shows up only
// after the next navigation or an explicit `refresh`.

use crate::backend::{
    Backend, DirectoryListing, DocumentEntry, SortKey, SortOrder, Transport, UploadRequest,
};
use crate::error::{Result, ShellError};
use crate::format::content_type_for;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Target name that moves to the parent folder.
pub const PARENT: &str = "..";

/// Status the signed upload URL answers with when the bytes were stored.
const UPLOAD_SUCCESS_STATUS: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorState {
    pub root_folder_id: String,
    pub current_folder_id: String,
    pub parent_folder_id: String,
    pub cached_listing: Option<DirectoryListing>,
}

impl NavigatorState {
    fn at_root(root_folder_id: String) -> Self {
        NavigatorState {
            current_folder_id: root_folder_id.clone(),
            parent_folder_id: root_folder_id.clone(),
            root_folder_id,
            cached_listing: None,
        }
    }

    pub fn is_at_root(&self) -> bool {
        self.current_folder_id == self.root_folder_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Bytes stored and the new version activated.
    Success { document_id: String },
    /// The transfer was answered with an unexpected status; the draft
    /// version is left on the backend as is.
    Failure { document_id: String, status: u16 },
}

pub struct Navigator<B, T> {
    backend: B,
    transport: T,
    state: NavigatorState,
}

impl<B: Backend, T: Transport> Navigator<B, T> {
    /// Looks up the root folder and positions the session on it.
    pub fn start(backend: B, transport: T) -> Result<Self> {
        let root = backend.describe_root_folder()?;
        info!(root = %root.id, "session started");
        Ok(Navigator {
            backend,
            transport,
            state: NavigatorState::at_root(root.id),
        })
    }

    pub fn state(&self) -> &NavigatorState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Children of the current folder, fetched at most once per folder visit.
    pub fn list(&mut self) -> Result<&DirectoryListing> {
        let listing = match self.state.cached_listing.take() {
            Some(listing) => listing,
            None => {
                debug!(folder = %self.state.current_folder_id, "fetching folder contents");
                self.backend.list_folder_contents(
                    &self.state.current_folder_id,
                    SortKey::Name,
                    SortOrder::Ascending,
                )?
            }
        };
        Ok(self.state.cached_listing.insert(listing))
    }

    /// Drops the cached listing so the next `list` hits the backend again.
    pub fn refresh(&mut self) {
        debug!(folder = %self.state.current_folder_id, "listing invalidated");
        self.state.cached_listing = None;
    }

    /// Moves to `..` or to a child folder named in the cached listing.
    /// On error the position and cache are left untouched.
    pub fn navigate(&mut self, target: &str) -> Result<()> {
        if target == PARENT {
            return self.navigate_up();
        }

        let listing = self.state.cached_listing.as_ref().ok_or_else(|| {
            ShellError::Navigation(format!("{target}: folder contents not listed yet"))
        })?;
        // Duplicate names are allowed by the service; the first one listed wins.
        let folder = listing
            .folders
            .iter()
            .find(|folder| folder.name == target)
            .ok_or_else(|| ShellError::Navigation(format!("{target}: no such folder")))?;

        let child = folder.id.clone();
        info!(from = %self.state.current_folder_id, to = %child, "entering folder");
        self.state.parent_folder_id = std::mem::replace(&mut self.state.current_folder_id, child);
        self.state.cached_listing = None;
        Ok(())
    }

    // The root's parent is the root itself, so `..` at the root is a no-op.
    fn navigate_up(&mut self) -> Result<()> {
        let target = self.state.parent_folder_id.clone();
        if target == self.state.current_folder_id {
            debug!(folder = %target, "already at the top");
            return Ok(());
        }

        let grandparent = if target == self.state.root_folder_id {
            self.state.root_folder_id.clone()
        } else {
            let folder = self.backend.describe_folder(&target).map_err(|err| {
                ShellError::Navigation(format!("cannot look up parent of {target}: {err}"))
            })?;
            folder
                .parent_id
                .unwrap_or_else(|| self.state.root_folder_id.clone())
        };

        info!(from = %self.state.current_folder_id, to = %target, "leaving folder");
        self.state.current_folder_id = target;
        self.state.parent_folder_id = grandparent;
        self.state.cached_listing = None;
        Ok(())
    }

    /// Exact, case-sensitive lookup of a document in the cached listing.
    pub fn resolve_document(&self, name: &str) -> Result<&DocumentEntry> {
        self.state
            .cached_listing
            .as_ref()
            .and_then(|listing| listing.documents.iter().find(|doc| doc.name == name))
            .ok_or_else(|| ShellError::NotFound(name.to_string()))
    }

    /// Writes the latest version of `document` to `destination`. A failed
    /// transfer may leave a partial file behind.
    pub fn download(&self, document: &DocumentEntry, destination: &Path) -> Result<u64> {
        let url = self
            .backend
            .request_download_source(&document.id, &document.latest_version_id)?;
        let written = self.transport.download(&url, destination)?;
        info!(document = %document.id, bytes = written, path = %destination.display(), "downloaded");
        Ok(written)
    }

    /// Uploads `source` as `target_name` into the current folder.
    pub fn upload(&self, source: &Path, target_name: &str) -> Result<UploadOutcome> {
        let metadata = fs::metadata(source)
            .map_err(|err| ShellError::Transfer(format!("{}: {err}", source.display())))?;
        if !metadata.is_file() {
            return Err(ShellError::Transfer(format!(
                "{}: not a regular file",
                source.display()
            )));
        }
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);

        let request = UploadRequest {
            name: target_name.to_string(),
            size_bytes: metadata.len(),
            created_at: DateTime::<Utc>::from(created),
            modified_at: DateTime::<Utc>::from(modified),
            content_type: content_type_for(target_name).to_string(),
            parent_folder_id: self.state.current_folder_id.clone(),
        };
        let slot = self.backend.request_upload_slot(&request)?;
        debug!(document = %slot.document_id, version = %slot.version_id, "upload slot issued");

        let status = self.transport.upload(
            &slot.upload_url,
            &slot.upload_headers,
            source,
            request.size_bytes,
        )?;
        if status != UPLOAD_SUCCESS_STATUS {
            warn!(document = %slot.document_id, status, "upload rejected, version left as draft");
            return Ok(UploadOutcome::Failure {
                document_id: slot.document_id,
                status,
            });
        }

        self.backend
            .finalize_document_version(&slot.document_id, &slot.version_id)?;
        info!(document = %slot.document_id, name = target_name, "upload finalized");
        Ok(UploadOutcome::Success {
            document_id: slot.document_id,
        })
    }
}
