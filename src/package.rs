use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use epub::doc::EpubDoc;
use tokio::sync::{Mutex, RwLock};

use crate::error::ArchiveError;

type PackageDoc = EpubDoc<BufReader<File>>;

/// Lazily-opened handle to the EPUB package parser.
///
/// The parsed package is shared by every concurrent enumerate/open call
/// on the same archive and released exactly once when the archive is
/// disposed. The parse itself runs inside the write lock; the handle is
/// published only after it fully succeeds, so readers never observe a
/// half-constructed package.
#[derive(Debug)]
pub(crate) struct PackageSession {
    path: PathBuf,
    doc: RwLock<Option<Arc<Mutex<PackageDoc>>>>,
}

impl PackageSession {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            doc: RwLock::new(None),
        }
    }

    async fn doc(&self) -> Result<Arc<Mutex<PackageDoc>>, ArchiveError> {
        if let Some(doc) = self.doc.read().await.as_ref() {
            return Ok(doc.clone());
        }
        let mut slot = self.doc.write().await;
        if let Some(doc) = slot.as_ref() {
            return Ok(doc.clone());
        }
        let doc = Arc::new(Mutex::new(EpubDoc::new(&self.path)?));
        *slot = Some(doc.clone());
        Ok(doc)
    }

    /// Resources whose declared media type is `image/*`.
    ///
    /// Sizes are unknown here: the package parser does not expose
    /// resource lengths without reading the content. An empty listing is
    /// a success, not an error.
    pub async fn list_image_resources(&self) -> Result<Vec<(String, Option<u64>)>, ArchiveError> {
        let doc = self.doc().await?;
        let doc = doc.lock().await;
        let images = doc
            .resources
            .values()
            .filter(|item| item.mime.starts_with("image/"))
            .map(|item| (item.path.to_string_lossy().into_owned(), None))
            .collect();
        Ok(images)
    }

    /// Declared image and XHTML document counts, for the
    /// image-dominance predicate.
    pub async fn resource_counts(&self) -> Result<(usize, usize), ArchiveError> {
        let doc = self.doc().await?;
        let doc = doc.lock().await;
        let images = doc
            .resources
            .values()
            .filter(|item| item.mime.starts_with("image/"))
            .count();
        let documents = doc
            .resources
            .values()
            .filter(|item| item.mime.as_str() == "application/xhtml+xml")
            .count();
        Ok((images, documents))
    }

    /// Read one resource's bytes, located by case-insensitive name match
    /// against the full resource table (not only the image subset) so
    /// lookups survive minor naming drift.
    pub async fn open_resource(&self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let doc = self.doc().await?;
        let mut doc = doc.lock().await;
        let wanted = name.to_lowercase();
        let path = doc
            .resources
            .values()
            .map(|item| &item.path)
            .find(|path| path.to_string_lossy().to_lowercase() == wanted)
            .cloned();
        let path = match path {
            Some(path) => path,
            None => return Err(ArchiveError::EntryNotFound(name.to_string())),
        };
        doc.get_resource_by_path(&path)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))
    }

    /// Drop the parsed package, if it was ever opened.
    pub async fn close(&self) {
        self.doc.write().await.take();
    }
}
