use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A file selected for upload: either the user's original image or the
/// re-encoded replacement produced by preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
    pub last_modified: DateTime<Utc>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
            last_modified: Utc::now(),
        }
    }

    /// Byte length of the payload
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Same name, new payload and media type, modification time set to now.
    pub fn replace_content(&self, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: self.name.clone(),
            content_type: content_type.into(),
            data,
            last_modified: Utc::now(),
        }
    }
}
