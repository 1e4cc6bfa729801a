use std::io::{Cursor, Read};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use tokio::io::{AsyncRead, ReadBuf};

/// One logical image resource inside an archive.
///
/// Entries are handed out by value and hold no reference into the
/// archive's internal state. Ids are dense, assigned in case-insensitive
/// name order, and stable for the lifetime of the archive instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Dense ordinal id, `0..N` in sort order.
    pub id: u32,
    /// Entry name as the backend reports it, original case preserved.
    pub name: String,
    /// Validity flag.
    pub is_valid: bool,
    /// Uncompressed size, when the backend knows it without reading.
    pub length: Option<u64>,
    /// Creation time inherited from the container file.
    pub created: Option<SystemTime>,
    /// Last-write time inherited from the container file.
    pub modified: Option<SystemTime>,
}

/// Owned byte stream for one entry's content.
///
/// Readable both synchronously ([`std::io::Read`]) and asynchronously
/// ([`tokio::io::AsyncRead`]). Dropping the stream releases it; the
/// archive itself is unaffected.
#[derive(Debug)]
pub struct EntryStream {
    inner: Cursor<Vec<u8>>,
}

impl EntryStream {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(bytes),
        }
    }

    /// Total length of the stream in bytes.
    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Consume the stream and take the remaining buffer whole.
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl AsyncRead for EntryStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_reads_sync() {
        let mut stream = EntryStream::new(b"abcdef".to_vec());
        assert_eq!(stream.len(), 6);
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");
    }

    #[tokio::test]
    async fn stream_reads_async() {
        use tokio::io::AsyncReadExt;

        let mut stream = EntryStream::new(b"stream me".to_vec());
        let mut out = Vec::new();
        AsyncReadExt::read_to_end(&mut stream, &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"stream me");
    }

    #[test]
    fn into_bytes_returns_whole_buffer() {
        let stream = EntryStream::new(vec![1, 2, 3]);
        assert_eq!(stream.into_bytes(), vec![1, 2, 3]);
    }
}
