use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use zip::read::ZipArchive;
use zip::result::ZipError;

use crate::error::ArchiveError;
use crate::is_image_name;

const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// One image member of the raw ZIP directory.
#[derive(Debug, Clone)]
pub(crate) struct ZipMember {
    pub name: String,
    pub size: u64,
}

/// Fallback backend treating the container as a plain ZIP of image
/// files, used when the package parser cannot interpret the content.
///
/// The member set is scanned once per session and reused for later
/// opens; the container file itself is reopened per read, so open
/// sessions stay independent of each other.
#[derive(Debug)]
pub(crate) struct ZipFallbackSession {
    path: PathBuf,
    members: RwLock<Option<Arc<Vec<ZipMember>>>>,
}

impl ZipFallbackSession {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            members: RwLock::new(None),
        }
    }

    /// Image members by extension, deduplicated case-insensitively with
    /// the first occurrence's casing preserved.
    ///
    /// A cancelled or failed scan publishes nothing; the next caller
    /// recomputes from scratch.
    pub async fn list_image_members(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<ZipMember>>, ArchiveError> {
        if let Some(members) = self.members.read().await.as_ref() {
            return Ok(members.clone());
        }
        let mut slot = self.members.write().await;
        if let Some(members) = slot.as_ref() {
            return Ok(members.clone());
        }

        let file = File::open(&self.path)?;
        let mut zip = ZipArchive::new(file)?;
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for index in 0..zip.len() {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }
            let entry = zip.by_index(index)?;
            let name = entry.name().to_string();
            if !is_image_name(&name) {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                members.push(ZipMember {
                    name,
                    size: entry.size(),
                });
            }
        }
        log::debug!(
            "zip fallback: {} image members in {:?}",
            members.len(),
            self.path
        );

        let members = Arc::new(members);
        *slot = Some(members.clone());
        Ok(members)
    }

    /// Decompress one member into memory, honoring cancellation between
    /// copied chunks.
    pub async fn open_member(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ArchiveError> {
        let members = self.list_image_members(cancel).await?;
        let wanted = name.to_lowercase();
        let member = members
            .iter()
            .find(|member| member.name.to_lowercase() == wanted)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;

        let file = File::open(&self.path)?;
        let mut zip = ZipArchive::new(file)?;
        let mut entry = match zip.by_name(&member.name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(ArchiveError::EntryNotFound(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let mut bytes = Vec::with_capacity(member.size as usize);
        let mut chunk = vec![0u8; COPY_CHUNK_SIZE];
        loop {
            if cancel.is_cancelled() {
                return Err(ArchiveError::Cancelled);
            }
            let read = entry.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
        }
        Ok(bytes)
    }

    /// Forget the cached member set.
    pub async fn close(&self) {
        self.members.write().await.take();
    }
}
