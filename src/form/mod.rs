//! multipart/form-data encoding for upload requests.
//!
//! An [`UploadForm`] collects ordered fields and keyed files and serialises
//! them into a body plus the matching `Content-Type`:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="key"\r\n
//! \r\n
//! value\r\n
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="file"; filename="x.png"\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <bytes>\r\n
//! --{boundary}--\r\n
//! ```
//!
//! Field parts come first, in insertion order, then file parts in insertion
//! order.

mod file;
mod header;
mod value;

use anyhow::{Context, Result};
use bytes::Bytes;
use log::debug;

pub use file::{FileAttachment, FileName, Payload};
pub use value::{FieldName, FieldValue, FormValue};

/// Builder for a multipart/form-data body.
#[derive(Debug)]
pub struct UploadForm {
    boundary: String,
    fields: Vec<(FieldName, FieldValue)>,
    files: Vec<(String, Option<FileAttachment>)>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadForm {
    /// An empty form with a fresh random boundary.
    pub fn new() -> Self {
        Self {
            boundary: uuid::Uuid::new_v4().simple().to_string(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Replaces the boundary token, e.g. for reproducible output.
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_field(&mut self, name: impl Into<FieldName>, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Sets the file for `key`. A key that is already present keeps its
    /// position and gets the new value. `None` records the key but emits no part.
    pub fn add_file(
        &mut self,
        key: impl Into<String>,
        file: impl Into<Option<FileAttachment>>,
    ) -> &mut Self {
        let key = key.into();
        let file = file.into();
        match self.files.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = file,
            None => self.files.push((key, file)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// Serialises the form, draining any stream or file payloads.
    ///
    /// Returns the body and its `Content-Type` header value.
    pub fn encode(self) -> Result<(Bytes, String)> {
        let content_type = self.content_type();
        let mut body = Vec::new();

        for (name, value) in self.fields {
            let name = name.decode()?;
            for v in value.into_present() {
                write_part(&mut body, &self.boundary, &name, None, None, &[], &v.into_bytes())?;
            }
        }

        for (key, file) in self.files {
            let Some(file) = file else {
                debug!("Skipping empty file slot {:?}", key);
                continue;
            };
            let filename = file.resolve_filename(&key);
            let data = file.payload.into_bytes()?;
            write_part(
                &mut body,
                &self.boundary,
                &key,
                Some(filename.as_deref()),
                file.content_type.as_deref(),
                &file.headers,
                &data,
            )
            .with_context(|| format!("Invalid headers for file part {:?}", key))?;
        }

        body.extend_from_slice(b"--");
        body.extend_from_slice(self.boundary.as_bytes());
        body.extend_from_slice(b"--\r\n");

        debug!("Encoded multipart body of {} bytes", body.len());
        Ok((Bytes::from(body), content_type))
    }
}

/// `filename` is `None` for plain fields and `Some(None)` for a file part
/// without a filename parameter.
fn write_part(
    body: &mut Vec<u8>,
    boundary: &str,
    name: &str,
    filename: Option<Option<&str>>,
    content_type: Option<&str>,
    headers: &[(String, String)],
    data: &[u8],
) -> Result<()> {
    body.extend_from_slice(b"--");
    body.extend_from_slice(boundary.as_bytes());
    body.extend_from_slice(b"\r\n");
    header::render_part_headers(body, name, filename.flatten(), content_type, headers)?;
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    Ok(())
}
