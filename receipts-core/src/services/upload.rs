//! Upload flow - one pending image, one upload in flight
//!
//! States: `Empty -> Selected -> Uploading -> Empty` on success, or back to
//! `Selected` on failure so the same file can be retried.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::result::{Error, Result};
use crate::domain::{content_type_for, ImageFile, StatusMessage};
use crate::ports::{ReceiptCreated, ReceiptGateway};

use super::collection::ReceiptStore;

pub const REJECTED_FILE_MESSAGE: &str = "Please upload an image file.";
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Receipt uploaded successfully!";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Empty,
    Selected(ImageFile),
    Uploading(ImageFile),
}

impl UploadState {
    fn name(&self) -> &'static str {
        match self {
            UploadState::Empty => "empty",
            UploadState::Selected(_) => "selected",
            UploadState::Uploading(_) => "uploading",
        }
    }
}

struct Inner {
    state: UploadState,
    status: Option<StatusMessage>,
}

/// Single-slot upload flow
pub struct UploadFlow {
    gateway: Arc<dyn ReceiptGateway>,
    store: Arc<ReceiptStore>,
    inner: Mutex<Inner>,
}

impl UploadFlow {
    pub fn new(gateway: Arc<dyn ReceiptGateway>, store: Arc<ReceiptStore>) -> Self {
        Self {
            gateway,
            store,
            inner: Mutex::new(Inner {
                state: UploadState::Empty,
                status: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> UploadState {
        self.lock().state.clone()
    }

    /// Message from the last selection or upload
    pub fn status(&self) -> Option<StatusMessage> {
        self.lock().status.clone()
    }

    /// Select a file for upload
    ///
    /// Only `image/*` files are accepted. A rejected file clears any
    /// previous selection and records a rejection message. Selecting while
    /// an upload is in flight is refused.
    pub fn select(&self, file: ImageFile) -> Result<()> {
        let mut inner = self.lock();
        if let UploadState::Uploading(_) = inner.state {
            return Err(Error::invalid_state("Cannot change the selection while uploading"));
        }

        if !file.is_image() {
            inner.state = UploadState::Empty;
            inner.status = Some(StatusMessage::error(REJECTED_FILE_MESSAGE));
            return Err(Error::validation(format!(
                "Not an image file: {}",
                file.content_type
            )));
        }

        inner.state = UploadState::Selected(file);
        inner.status = None;
        Ok(())
    }

    /// Drop the current selection
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock();
        if let UploadState::Uploading(_) = inner.state {
            return Err(Error::invalid_state("Cannot clear the selection while uploading"));
        }
        inner.state = UploadState::Empty;
        Ok(())
    }

    /// Upload the selected file
    ///
    /// A created record returned by the server is appended to the store;
    /// otherwise the caller should refresh the collection.
    pub async fn submit(&self) -> Result<ReceiptCreated> {
        let file = {
            let mut inner = self.lock();
            let file = match &inner.state {
                UploadState::Selected(file) => file.clone(),
                other => {
                    return Err(Error::invalid_state(format!(
                        "Cannot submit while {}",
                        other.name()
                    )))
                }
            };
            inner.state = UploadState::Uploading(file.clone());
            file
        };

        let result = self.gateway.upload(&file).await;

        let mut inner = self.lock();
        match result {
            Ok(created) => {
                if let Some(receipt) = &created.receipt {
                    self.store.upsert(receipt.clone());
                }
                inner.state = UploadState::Empty;
                inner.status = Some(StatusMessage::success(UPLOAD_SUCCESS_MESSAGE));
                Ok(created)
            }
            Err(e) => {
                inner.state = UploadState::Selected(file);
                inner.status = Some(StatusMessage::error(UPLOAD_FAILED_MESSAGE));
                Err(e)
            }
        }
    }
}

/// Read a local file as an upload candidate, typed by its extension
pub fn load_image_file(path: &Path) -> Result<ImageFile> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "receipt".to_string());
    let content_type = content_type_for(&file_name);
    Ok(ImageFile::new(file_name, content_type, bytes))
}
