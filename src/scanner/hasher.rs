//! Streaming content fingerprints.
//!
//! # Overview
//!
//! A [`Hasher`] reads a file in fixed-size chunks and feeds each chunk into
//! a 256-bit cryptographic digest. Only one buffer of `buffer_size` bytes is
//! held per file, so memory use does not depend on file size.
//!
//! The resulting [`Fingerprint`] depends only on the bytes of the file: the
//! chunk size changes how the data is fed to the digest, never the digest.
//!
//! The cancellation token is checked before every read, so a long file stops
//! at the next chunk boundary after cancellation (a read already in progress
//! finishes first).

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use super::fs::FileSystem;
use super::HashError;
use crate::signal::CancelToken;

/// Default read buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// 256-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hexadecimal rendering (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }

    /// Parse a 64-character hexadecimal string.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid fingerprint hex"))
    }
}

/// Digest used to fingerprint file content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3 (faster on large files)
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Blake3 => f.write_str("blake3"),
        }
    }
}

/// Incremental digest state for one file.
enum Accumulator {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(chunk),
            Self::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finalize(self) -> Fingerprint {
        match self {
            Self::Sha256(h) => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&h.finalize());
                Fingerprint(out)
            }
            Self::Blake3(h) => Fingerprint(*h.finalize().as_bytes()),
        }
    }
}

/// Chunked streaming fingerprinter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default(), DEFAULT_BUFFER_SIZE)
    }
}

impl Hasher {
    /// Create a hasher. A `buffer_size` of zero is raised to one byte;
    /// callers that need to reject zero validate before construction.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, buffer_size: usize) -> Self {
        Self {
            algorithm,
            buffer_size: buffer_size.max(1),
        }
    }

    /// The digest algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Bytes requested per read.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Fingerprint everything `reader` yields until end of stream.
    ///
    /// Returns `Ok(None)` when `cancel` was observed before the stream ended;
    /// the partial digest is dropped.
    ///
    /// # Errors
    ///
    /// Any read error other than [`io::ErrorKind::Interrupted`], which is
    /// retried.
    pub fn fingerprint_reader<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        cancel: &CancelToken,
    ) -> io::Result<Option<Fingerprint>> {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut acc = Accumulator::new(self.algorithm);

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => acc.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(Some(acc.finalize()))
    }

    /// Open `path` through `fs` and fingerprint its whole content.
    ///
    /// Returns `Ok(None)` if cancelled mid-stream.
    ///
    /// # Errors
    ///
    /// - [`HashError::Open`] if the file cannot be opened
    /// - [`HashError::Read`] if a read fails before end of file
    pub fn fingerprint_path<F: FileSystem + ?Sized>(
        &self,
        fs: &F,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<Option<Fingerprint>, HashError> {
        let mut reader = fs.open_for_read(path).map_err(|source| HashError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        self.fingerprint_reader(&mut *reader, cancel)
            .map_err(|source| HashError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Fingerprint an in-memory byte slice.
    #[must_use]
    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> Fingerprint {
        let mut acc = Accumulator::new(self.algorithm);
        for chunk in bytes.chunks(self.buffer_size) {
            acc.update(chunk);
        }
        acc.finalize()
    }
}
