pub use crate::config::EpubArchiveConfig;
pub use crate::error::ArchiveError;
pub use crate::{Archive, ArchiveEntry, EntryStream, EpubArchive, is_image_dominant, is_image_name};
pub use tokio_util::sync::CancellationToken;
