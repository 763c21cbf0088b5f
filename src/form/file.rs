//! File attachments for multipart uploads.

use anyhow::{Context, Result};
use bytes::Bytes;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where the bytes of an attachment come from.
pub enum Payload {
    /// Data already in memory.
    Bytes(Bytes),
    /// Text, written as UTF-8.
    Text(String),
    /// A stream drained to completion at encoding time. `name` plays the role
    /// of a file object's own name when no filename is given.
    Reader {
        reader: Box<dyn Read + Send>,
        name: Option<String>,
    },
    /// A file on disk, read at encoding time.
    Path(PathBuf),
}

impl Payload {
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Payload::Reader {
            reader: Box::new(reader),
            name: None,
        }
    }

    pub fn named_reader<R: Read + Send + 'static>(reader: R, name: impl Into<String>) -> Self {
        Payload::Reader {
            reader: Box::new(reader),
            name: Some(name.into()),
        }
    }

    /// The payload's own name, reduced to its last path component.
    ///
    /// Pseudo-names such as `<stdin>` do not count.
    pub fn inherent_name(&self) -> Option<String> {
        let name = match self {
            Payload::Reader { name: Some(name), .. } => name.as_str(),
            Payload::Path(path) => path.to_str()?,
            _ => return None,
        };
        if name.is_empty() || (name.starts_with('<') && name.ends_with('>')) {
            return None;
        }
        Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }

    pub(crate) fn into_bytes(self) -> Result<Bytes> {
        match self {
            Payload::Bytes(b) => Ok(b),
            Payload::Text(s) => Ok(Bytes::from(s)),
            Payload::Reader { mut reader, name } => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).with_context(|| {
                    format!(
                        "Failed to read upload stream {}",
                        name.as_deref().unwrap_or("<anonymous>")
                    )
                })?;
                Ok(Bytes::from(buf))
            }
            Payload::Path(path) => {
                let data = std::fs::read(&path)
                    .with_context(|| format!("Failed to read upload file {:?}", path))?;
                Ok(Bytes::from(data))
            }
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Payload::Text(s) => f.debug_tuple("Text").field(&s.len()).finish(),
            Payload::Reader { name, .. } => f.debug_struct("Reader").field("name", name).finish(),
            Payload::Path(p) => f.debug_tuple("Path").field(p).finish(),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Bytes(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(b))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(b: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(b))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<PathBuf> for Payload {
    fn from(p: PathBuf) -> Self {
        Payload::Path(p)
    }
}

/// How the `filename` parameter of a file part is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FileName {
    /// The payload's own name, else the field key.
    #[default]
    Derived,
    Explicit(String),
    /// No `filename` parameter at all.
    Omitted,
}

/// One file of an upload form.
///
/// Covers the four historical shapes: a bare payload, `(filename, payload)`,
/// `(filename, payload, content_type)` and
/// `(filename, payload, content_type, headers)`.
#[derive(Debug)]
pub struct FileAttachment {
    pub filename: FileName,
    pub payload: Payload,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl FileAttachment {
    /// A bare payload; the filename is derived.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            filename: FileName::Derived,
            payload: payload.into(),
            content_type: None,
            headers: Vec::new(),
        }
    }

    /// `(filename, payload)`.
    pub fn named(filename: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::new(payload).with_filename(filename)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = FileName::Explicit(filename.into());
        self
    }

    pub fn without_filename(mut self) -> Self {
        self.filename = FileName::Omitted;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub(crate) fn resolve_filename(&self, key: &str) -> Option<String> {
        match &self.filename {
            FileName::Explicit(name) => Some(name.clone()),
            FileName::Omitted => None,
            FileName::Derived => Some(
                self.payload
                    .inherent_name()
                    .unwrap_or_else(|| key.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_derived_filename_falls_back_to_key() {
        let file = FileAttachment::new(b"data".as_slice());
        assert_eq!(file.resolve_filename("file"), Some("file".to_string()));
    }

    #[test]
    fn test_derived_filename_from_reader_name() {
        let file = FileAttachment::new(Payload::named_reader(Cursor::new(b"x"), "/tmp/dir/a.txt"));
        assert_eq!(file.resolve_filename("file"), Some("a.txt".to_string()));
    }

    #[test]
    fn test_pseudo_names_are_ignored() {
        let file = FileAttachment::new(Payload::named_reader(Cursor::new(b"x"), "<stdin>"));
        assert_eq!(file.resolve_filename("file"), Some("file".to_string()));
    }

    #[test]
    fn test_derived_filename_from_path() {
        let file = FileAttachment::new(PathBuf::from("/var/data/photo.jpg"));
        assert_eq!(file.resolve_filename("file"), Some("photo.jpg".to_string()));
    }

    #[test]
    fn test_explicit_and_omitted_filename() {
        let file = FileAttachment::named("x.png", b"data".as_slice());
        assert_eq!(file.resolve_filename("file"), Some("x.png".to_string()));

        let file = FileAttachment::new(b"data".as_slice()).without_filename();
        assert_eq!(file.resolve_filename("file"), None);
    }

    #[test]
    fn test_reader_is_drained() {
        let payload = Payload::reader(Cursor::new(b"streamed".to_vec()));
        assert_eq!(payload.into_bytes().unwrap(), Bytes::from_static(b"streamed"));
    }

    #[test]
    fn test_unreadable_reader_propagates() {
        let payload = Payload::named_reader(FailingReader, "broken.bin");
        let err = payload.into_bytes().unwrap_err();
        assert!(err.to_string().contains("broken.bin"));
    }

    #[test]
    fn test_path_payload_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"on disk").unwrap();

        let payload = Payload::from(path);
        assert_eq!(payload.into_bytes().unwrap(), Bytes::from_static(b"on disk"));
    }

    #[test]
    fn test_missing_path_propagates() {
        let payload = Payload::from(PathBuf::from("/definitely/not/here.bin"));
        assert!(payload.into_bytes().is_err());
    }
}
