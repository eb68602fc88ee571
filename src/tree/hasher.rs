//! Content hashing for files using BLAKE3

use crate::error::StorageError;
use blake3::Hasher;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default read chunk size for streaming file content (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded digest
pub const DIGEST_HEX_LEN: usize = 64;

/// BLAKE3 content digest of a single file
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding, always [`DIGEST_HEX_LEN`] characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex digest. Upper and lower case input are both accepted.
    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(StorageError::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                DIGEST_HEX_LEN,
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| StorageError::InvalidDigest(format!("{}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash a file by streaming it in `chunk_size` pieces.
///
/// Memory use is bounded by the chunk buffer regardless of file size.
pub fn hash_file(path: &Path, chunk_size: usize) -> Result<Digest, StorageError> {
    let to_error = |source| StorageError::HashFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(to_error)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(to_error(e)),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(Digest::from_bytes(*hasher.finalize().as_bytes()))
}

/// Hash in-memory content
pub fn hash_bytes(content: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(content);
    Digest::from_bytes(*hasher.finalize().as_bytes())
}
