use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::entry::{ArchiveEntry, EntryStream};
use crate::error::ArchiveError;
use crate::package::PackageSession;
use crate::zip_fallback::ZipFallbackSession;
use crate::{Archive, is_image_dominant};

/// Which backend ended up serving this archive instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Package,
    ZipFallback,
}

/// The one-shot outcome of enumeration: the chosen backend together
/// with the entry list it produced. Published atomically so no caller
/// observes a half-chosen state.
#[derive(Debug)]
struct Resolution {
    backend: Backend,
    entries: Vec<ArchiveEntry>,
}

/// Image archive over an EPUB container.
///
/// The EPUB package parser is attempted first; when it fails, the same
/// file is read as a plain ZIP and image members are recovered by
/// extension. The decision is made once, on first enumeration, and kept
/// for the lifetime of the instance, so entry ids stay stable and later
/// opens never re-resolve the backend.
#[derive(Debug)]
pub struct EpubArchive {
    path: PathBuf,
    created: Option<SystemTime>,
    modified: Option<SystemTime>,
    package: PackageSession,
    fallback: ZipFallbackSession,
    resolution: RwLock<Option<Arc<Resolution>>>,
    disposed: AtomicBool,
}

impl EpubArchive {
    /// Record the container path and its file timestamps. Nothing is
    /// opened until the first enumeration.
    pub fn new(path: &Path) -> Result<Self, ArchiveError> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            created: metadata.created().ok(),
            modified: metadata.modified().ok(),
            package: PackageSession::new(path),
            fallback: ZipFallbackSession::new(path),
            resolution: RwLock::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    /// Whether the package's declared resources look image-dominant
    /// (comic-style) rather than text-dominant. Diagnostic only; entry
    /// enumeration surfaces every image resource either way.
    pub async fn is_image_dominant(&self) -> Result<bool, ArchiveError> {
        self.ensure_live()?;
        let (images, documents) = self.package.resource_counts().await?;
        Ok(is_image_dominant(images, documents))
    }

    fn ensure_live(&self) -> Result<(), ArchiveError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(ArchiveError::Disposed);
        }
        Ok(())
    }

    /// Resolve the backend exactly once and cache the entry list.
    ///
    /// A second concurrent caller either blocks until the first
    /// finishes or takes the fast path on the published resolution; the
    /// primary parser is never re-attempted after a fallback was
    /// chosen. Cancellation mid-enumeration publishes nothing.
    async fn resolve(&self, cancel: &CancellationToken) -> Result<Arc<Resolution>, ArchiveError> {
        if let Some(resolution) = self.resolution.read().await.as_ref() {
            return Ok(resolution.clone());
        }
        let mut slot = self.resolution.write().await;
        if let Some(resolution) = slot.as_ref() {
            return Ok(resolution.clone());
        }

        let resolution = match self.package.list_image_resources().await {
            Ok(listing) => {
                let entries = self.build_entries(listing, cancel)?;
                log::debug!(
                    "epub package: {} image entries in {:?}",
                    entries.len(),
                    self.path
                );
                Resolution {
                    backend: Backend::Package,
                    entries,
                }
            }
            Err(err) => {
                // A broken package is not fatal, the raw ZIP directory
                // may still hold usable images. Cancellation never gets
                // here: the package listing itself is not cancellable.
                log::debug!(
                    "epub package parse failed for {:?}, falling back to zip: {}",
                    self.path,
                    err
                );
                let members = self.fallback.list_image_members(cancel).await?;
                let listing: Vec<(String, Option<u64>)> = members
                    .iter()
                    .map(|member| (member.name.clone(), Some(member.size)))
                    .collect();
                let entries = self.build_entries(listing, cancel)?;
                log::debug!(
                    "zip fallback: {} image entries in {:?}",
                    entries.len(),
                    self.path
                );
                Resolution {
                    backend: Backend::ZipFallback,
                    entries,
                }
            }
        };

        let resolution = Arc::new(resolution);
        *slot = Some(resolution.clone());
        Ok(resolution)
    }

    /// Sort case-insensitively by name, then assign dense ids in that
    /// order. Cancellation is checked between entries.
    fn build_entries(
        &self,
        mut listing: Vec<(String, Option<u64>)>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        listing.sort_by_key(|(name, _)| name.to_lowercase());
        let mut entries = Vec::with_capacity(listing.len());
        for (id, (name, length)) in listing.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }
            entries.push(ArchiveEntry {
                id: id as u32,
                name,
                is_valid: true,
                length,
                created: self.created,
                modified: self.modified,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
impl Archive for EpubArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn entries(
        &self,
        _decrypt: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        self.ensure_live()?;
        let resolution = self.resolve(cancel).await?;
        Ok(resolution.entries.clone())
    }

    async fn open_entry(
        &self,
        entry: &ArchiveEntry,
        _decrypt: bool,
        cancel: &CancellationToken,
    ) -> Result<EntryStream, ArchiveError> {
        self.ensure_live()?;
        let resolution = self.resolve(cancel).await?;
        let bytes = match resolution.backend {
            Backend::Package => self.package.open_resource(&entry.name).await?,
            Backend::ZipFallback => self.fallback.open_member(&entry.name, cancel).await?,
        };
        Ok(EntryStream::new(bytes))
    }

    async fn extract_to_file(
        &self,
        _entry: &ArchiveEntry,
        _destination: &Path,
        _overwrite: bool,
        _cancel: &CancellationToken,
    ) -> Result<(), ArchiveError> {
        Err(ArchiveError::ExtractUnsupported)
    }

    async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.package.close().await;
        self.fallback.close().await;
    }
}

impl fmt::Display for EpubArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epub")
    }
}
