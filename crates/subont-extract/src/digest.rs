//! Pass-through readers and writers that hash the bytes flowing through them.
//!
//! Inputs are hashed while the parser streams them, in a single pass.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// A file read or written by a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDigest {
    /// Role of the file: "relationships", "concepts" or "terms".
    pub role: String,
    /// Path as given on the command line.
    pub path: String,
    /// Bytes hashed.
    pub bytes: u64,
    /// BLAKE3 hash (hex).
    pub blake3: String,
}

/// Wraps a reader and hashes every byte read from it.
pub struct DigestReader<R> {
    inner: R,
    hasher: blake3::Hasher,
    bytes: u64,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            bytes: 0,
        }
    }

    /// Digest of everything read so far.
    pub fn digest(&self, role: &str, path: &str) -> FileDigest {
        FileDigest {
            role: role.to_string(),
            path: path.to_string(),
            bytes: self.bytes,
            blake3: self.hasher.finalize().to_hex().to_string(),
        }
    }

    /// Drain any unread bytes into the hash so the digest covers the whole stream.
    pub fn read_to_end_hashed(&mut self) -> io::Result<()> {
        io::copy(self, &mut io::sink())?;
        Ok(())
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}

/// Wraps a writer and hashes every byte written through it.
pub struct DigestWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
    bytes: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            bytes: 0,
        }
    }

    pub fn digest(&self, role: &str, path: &str) -> FileDigest {
        FileDigest {
            role: role.to_string(),
            path: path.to_string(),
            bytes: self.bytes,
            blake3: self.hasher.finalize().to_hex().to_string(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
