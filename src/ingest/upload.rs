//! Uploaded-container input
//!
//! Wraps whatever the caller hands us (an opened temp file, an in-memory
//! buffer) behind the three capabilities the pipeline needs: total byte
//! size, a seekable stream, and a chunked copy to storage. The pipeline
//! rewinds before every pass, so the stream may arrive positioned anywhere.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Leading bytes used for content-type sniffing
pub const SNIFF_LEN: usize = 2048;

const COPY_CHUNK: usize = 64 * 1024;

/// An uploaded container stream plus its byte size
pub struct Upload<R> {
    stream: R,
    size: u64,
}

impl Upload<io::Cursor<Vec<u8>>> {
    /// Wrap an in-memory container (fixtures, small uploads)
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            stream: io::Cursor::new(bytes),
            size,
        }
    }
}

impl<R: Read + Seek> Upload<R> {
    pub fn new(stream: R, size: u64) -> Self {
        Self { stream, size }
    }

    /// Upload size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the leading bytes for MIME sniffing
    pub fn sniff_head(&mut self) -> io::Result<Vec<u8>> {
        self.stream.seek(SeekFrom::Start(0))?;
        let mut head = vec![0u8; SNIFF_LEN];
        let mut filled = 0;
        while filled < head.len() {
            let n = self.stream.read(&mut head[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        head.truncate(filled);
        Ok(head)
    }

    /// Rewound access to the underlying stream for extraction
    pub fn rewind(&mut self) -> io::Result<&mut R> {
        self.stream.seek(SeekFrom::Start(0))?;
        Ok(&mut self.stream)
    }

    /// Copy the full container to a writer in fixed-size chunks
    pub fn copy_to<W: Write>(&mut self, dest: &mut W) -> io::Result<u64> {
        self.stream.seek(SeekFrom::Start(0))?;
        let mut buf = vec![0u8; COPY_CHUNK];
        let mut written = 0u64;
        loop {
            let n = self.stream.read(&mut buf)?;
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n])?;
            written += n as u64;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_rewinds_and_truncates() {
        let mut upload = Upload::from_bytes(vec![7u8; 10]);
        // Position somewhere else first; sniffing must not care
        upload.rewind().unwrap();
        let head = upload.sniff_head().unwrap();
        assert_eq!(head.len(), 10);
        assert_eq!(upload.size(), 10);
    }

    #[test]
    fn copy_writes_every_byte() {
        let payload: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        let mut upload = Upload::from_bytes(payload.clone());
        // Disturb the position; copy must start from the beginning
        upload.sniff_head().unwrap();

        let mut dest = Vec::new();
        let written = upload.copy_to(&mut dest).unwrap();
        assert_eq!(written, payload.len() as u64);
        assert_eq!(dest, payload);
    }
}
