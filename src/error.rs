use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Package parse error: {0}")]
    PackageParse(#[from] epub::doc::DocError),
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    #[error("Extracting to a file is not supported, read the entry as a stream")]
    ExtractUnsupported,
    #[error("Archive has been disposed")]
    Disposed,
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Config error: {0}")]
    Config(String),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
