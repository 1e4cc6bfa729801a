//! Lazy image archive access for EPUB files, with a raw ZIP fallback.
//!
//! An [`EpubArchive`] enumerates the image resources declared by an EPUB
//! package without materializing the container, and serves any entry's
//! bytes on demand as a stream. When the package parser cannot make
//! sense of the file, the same bytes are read as a plain ZIP and image
//! members are recovered by file extension. Whichever backend answers
//! first is kept for the lifetime of the archive instance.

pub mod config;
pub mod error;
pub mod prelude;

mod entry;
pub use entry::{ArchiveEntry, EntryStream};

mod package;
mod zip_fallback;

mod epub_archive;
pub use epub_archive::EpubArchive;

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ArchiveError;

/// Whether a file name is a recognized image resource, by extension.
pub fn is_image_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name.ends_with(".jpg")
        || name.ends_with(".jpeg")
        || name.ends_with(".png")
        || name.ends_with(".bmp")
        || name.ends_with(".webp")
}

/// Whether a package with `images` image resources and `documents`
/// XHTML documents reads as image-dominant (comic-style) rather than
/// text-dominant (novel-style).
///
/// Diagnostic only. Enumeration surfaces every image resource either
/// way; callers that want to treat text-heavy books differently can
/// consult this predicate themselves.
pub fn is_image_dominant(images: usize, documents: usize) -> bool {
    images >= 5 && images > documents * 2
}

/// The uniform contract an archive kind exposes to the front end:
/// enumerate entries, open one entry as a stream, dispose.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Path of the container file backing this archive.
    fn path(&self) -> &Path;

    /// Enumerate the image entries of the archive.
    ///
    /// `decrypt` is accepted for symmetry with encrypted archive kinds
    /// and has no effect here.
    async fn entries(
        &self,
        decrypt: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    /// Open one entry's content as an owned byte stream.
    async fn open_entry(
        &self,
        entry: &ArchiveEntry,
        decrypt: bool,
        cancel: &CancellationToken,
    ) -> Result<EntryStream, ArchiveError>;

    /// Extract one entry directly to a file on disk.
    ///
    /// Archive kinds that only support streaming reads return
    /// [`ArchiveError::ExtractUnsupported`].
    async fn extract_to_file(
        &self,
        entry: &ArchiveEntry,
        destination: &Path,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> Result<(), ArchiveError>;

    /// Release any handles held open by the archive. Idempotent; later
    /// calls on the archive fail with [`ArchiveError::Disposed`].
    async fn dispose(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_image_extensions() {
        assert!(is_image_name("page1.jpg"));
        assert!(is_image_name("page1.jpeg"));
        assert!(is_image_name("cover.png"));
        assert!(is_image_name("scan.bmp"));
        assert!(is_image_name("art.webp"));
        assert!(is_image_name("dir/nested/page.png"));
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(is_image_name("PAGE.JPG"));
        assert!(is_image_name("Cover.PnG"));
        assert!(is_image_name("MIXED.WebP"));
    }

    #[test]
    fn rejects_non_image_names() {
        assert!(!is_image_name("chapter1.xhtml"));
        assert!(!is_image_name("style.css"));
        assert!(!is_image_name("notes.txt"));
        assert!(!is_image_name("anim.gif"));
        assert!(!is_image_name("archive.gif.txt"));
        assert!(!is_image_name("png"));
    }

    #[test]
    fn dominance_requires_enough_images() {
        assert!(!is_image_dominant(0, 0));
        assert!(!is_image_dominant(4, 0));
        assert!(is_image_dominant(5, 0));
        assert!(is_image_dominant(5, 2));
    }

    #[test]
    fn dominance_requires_images_to_outnumber_documents() {
        assert!(!is_image_dominant(10, 5));
        assert!(is_image_dominant(11, 5));
        assert!(!is_image_dominant(20, 40));
    }
}
