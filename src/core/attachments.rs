//! Image attachments and the handles that keep their bytes on disk.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::api::flux::extension_for_mime;
use crate::api::ClientError;

pub const MAX_ATTACHMENT_BYTES: u64 = 4 * 1024 * 1024;

pub const INVALID_TYPE_MESSAGE: &str =
    "Invalid file type. Please upload a JPEG, PNG, GIF, or WebP image.";
pub const TOO_LARGE_MESSAGE: &str = "File too large. Maximum size is 4MB.";

/// MIME type implied by an image file's extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Check type and size without reading the file.
pub fn validate_image(path: &Path, size: u64) -> Result<&'static str, ClientError> {
    let mime = mime_for_path(path).ok_or_else(|| ClientError::validation(INVALID_TYPE_MESSAGE))?;
    if size > MAX_ATTACHMENT_BYTES {
        return Err(ClientError::validation(TOO_LARGE_MESSAGE));
    }
    Ok(mime)
}

/// A validated image read into memory, waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl PendingImage {
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let metadata = fs::metadata(path).map_err(|err| {
            ClientError::validation(format!("Cannot read {}: {err}", path.display()))
        })?;
        let mime = validate_image(path, metadata.len())?;
        let bytes = fs::read(path).map_err(|err| {
            ClientError::validation(format!("Cannot read {}: {err}", path.display()))
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { name, mime, bytes })
    }
}

/// Handle to bytes owned by an [`ObjectStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(u64);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object-{}", self.0)
    }
}

/// Image reference carried by a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub object: ObjectRef,
    pub mime: String,
}

/// Temp-file backed storage for uploaded and generated images. Releasing a
/// handle deletes its file; dropping the store removes the directory.
pub struct ObjectStore {
    dir: TempDir,
    objects: HashMap<ObjectRef, PathBuf>,
    next_id: u64,
}

impl ObjectStore {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("polychat-objects-").tempdir()?;
        Ok(Self {
            dir,
            objects: HashMap::new(),
            next_id: 1,
        })
    }

    pub fn create(&mut self, bytes: &[u8], extension: &str) -> std::io::Result<ObjectRef> {
        let object = ObjectRef(self.next_id);
        self.next_id += 1;
        let path = self.dir.path().join(format!("{object}.{extension}"));
        fs::write(&path, bytes)?;
        debug!(%object, bytes = bytes.len(), "created object");
        self.objects.insert(object, path);
        Ok(object)
    }

    pub fn create_for_mime(&mut self, bytes: &[u8], mime: &str) -> std::io::Result<ObjectRef> {
        self.create(bytes, extension_for_mime(mime).unwrap_or("bin"))
    }

    pub fn path(&self, object: ObjectRef) -> Option<&Path> {
        self.objects.get(&object).map(PathBuf::as_path)
    }

    pub fn read(&self, object: ObjectRef) -> std::io::Result<Vec<u8>> {
        match self.path(object) {
            Some(path) => fs::read(path),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{object} has been released"),
            )),
        }
    }

    /// Returns false when the handle was unknown or already released.
    pub fn release(&mut self, object: ObjectRef) -> bool {
        match self.objects.remove(&object) {
            Some(path) => {
                if let Err(err) = fs::remove_file(&path) {
                    debug!(%object, "failed to remove object file: {err}");
                }
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        let objects: Vec<ObjectRef> = self.objects.keys().copied().collect();
        for object in objects {
            self.release(object);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn validation_checks_type_then_size() {
        assert_eq!(
            validate_image(Path::new("cat.PNG"), 10).unwrap(),
            "image/png"
        );
        assert_eq!(
            validate_image(Path::new("notes.pdf"), 10).unwrap_err(),
            ClientError::Validation(INVALID_TYPE_MESSAGE.to_string())
        );
        assert_eq!(
            validate_image(Path::new("big.jpg"), MAX_ATTACHMENT_BYTES + 1).unwrap_err(),
            ClientError::Validation(TOO_LARGE_MESSAGE.to_string())
        );
        assert!(validate_image(Path::new("edge.webp"), MAX_ATTACHMENT_BYTES).is_ok());
    }

    #[test]
    fn pending_image_reads_bytes_and_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpeg");
        fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();

        let image = PendingImage::load(&path).unwrap();
        assert_eq!(image.name, "photo.jpeg");
        assert_eq!(image.mime, "image/jpeg");
        assert_eq!(image.bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn release_deletes_the_backing_file() {
        let mut store = ObjectStore::new().unwrap();
        let object = store.create(b"bytes", "png").unwrap();
        let path = store.path(object).unwrap().to_path_buf();
        assert!(path.exists());

        assert!(store.release(object));
        assert!(!path.exists());
        assert!(store.path(object).is_none());
        assert!(!store.release(object));
    }
}
