//! Full cryptographic digest: BLAKE3 by default, SHA-256 when `--mirror-to-sha256` or
//! `--hash-algo sha256` is in effect (§9 decision). Files above
//! [`HashingConsts::HASH_MMAP_THRESHOLD`] are hashed via `mmap`; smaller files are always
//! read in chunks through the rate limiter so throttling applies uniformly regardless of size.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

use crate::consts::HashingConsts;
use crate::ratelimit::RateLimiter;

/// Object-safe digest accumulator so the full-hash stage can pick an algorithm once per run
/// and hash every file through the same code path.
pub trait FullHasher {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self: Box<Self>) -> [u8; 32];
}

struct Blake3Accumulator(blake3::Hasher);

impl FullHasher for Blake3Accumulator {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
    fn finalize(self: Box<Self>) -> [u8; 32] {
        *self.0.finalize().as_bytes()
    }
}

struct Sha256Accumulator(sha2::Sha256);

impl FullHasher for Sha256Accumulator {
    fn update(&mut self, bytes: &[u8]) {
        use sha2::Digest;
        self.0.update(bytes);
    }
    fn finalize(self: Box<Self>) -> [u8; 32] {
        use sha2::Digest;
        self.0.finalize().into()
    }
}

/// Which full-hash algorithm a run uses. Selects both the accumulator and the catalog
/// column (`sha256` vs `blake3`) the result is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    fn accumulator(&self) -> Box<dyn FullHasher> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256Accumulator(sha2::Sha256::default())),
            HashAlgorithm::Blake3 => Box::new(Blake3Accumulator(blake3::Hasher::new())),
        }
    }

    pub fn column(&self) -> crate::types::DigestColumn {
        match self {
            HashAlgorithm::Sha256 => crate::types::DigestColumn::Sha256,
            HashAlgorithm::Blake3 => crate::types::DigestColumn::Blake3,
        }
    }
}

/// Hash `path` in full, returning the lowercase hex digest. Reads above the mmap threshold
/// go through a memory map; smaller reads are chunked so `limiter` can throttle them
/// (mmap'd pages bypass the limiter, matching the original's "large files bypass per-chunk
/// throttling" behavior since the OS, not this process, drives their I/O pace).
pub fn hash_file_full(
    path: &Path,
    algo: HashAlgorithm,
    chunk_bytes: usize,
    limiter: &RateLimiter,
) -> Result<String> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();

    let mut hasher = algo.accumulator();

    if size >= HashingConsts::HASH_MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.display()))?;
        hasher.update(&mmap);
    } else {
        let mut reader = file;
        let mut buf = vec![0u8; chunk_bytes.max(1)];
        loop {
            let n = reader
                .read(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            if n == 0 {
                break;
            }
            limiter.acquire(n);
            hasher.update(&buf[..n]);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Minimal hex encoder so we don't pull in the `hex` crate for 32 bytes.
mod hex {
    pub fn encode(bytes: [u8; 32]) -> String {
        let mut s = String::with_capacity(64);
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn blake3_and_sha256_differ_on_same_content() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"duplicate me").unwrap();
        let limiter = RateLimiter::unlimited();
        let b3 = hash_file_full(f.path(), HashAlgorithm::Blake3, 4096, &limiter).unwrap();
        let sha = hash_file_full(f.path(), HashAlgorithm::Sha256, 4096, &limiter).unwrap();
        assert_ne!(b3, sha);
        assert_eq!(b3.len(), 64);
        assert_eq!(sha.len(), 64);
    }

    #[test]
    fn identical_content_hashes_identically() {
        let mut a = NamedTempFile::new().unwrap();
        a.write_all(b"same bytes here").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        b.write_all(b"same bytes here").unwrap();
        let limiter = RateLimiter::unlimited();
        assert_eq!(
            hash_file_full(a.path(), HashAlgorithm::Blake3, 4096, &limiter).unwrap(),
            hash_file_full(b.path(), HashAlgorithm::Blake3, 4096, &limiter).unwrap()
        );
    }
}
