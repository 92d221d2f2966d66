//! Cheap 64-bit hashes used to cut the candidate set down before any full read.
//!
//! `quick_hash` mixes file size with a head and tail sample so same-size files that differ
//! near either end are split apart immediately. `sample_hash` extends that with a larger,
//! position-tagged sample for the progressive stage, grounded in the original catalog's
//! `hash_sample_head`/`hash_sample_tail` two-pass narrowing before the full cryptographic read.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use xxhash_rust::xxh3::Xxh3;

use crate::ratelimit::RateLimiter;

/// `size ∥ head(n) ∥ tail(n)` folded through XXH3-64. Two files with the same size and the
/// same quick hash are merely candidates for a duplicate, never confirmed by this alone.
pub fn quick_hash(path: &Path, sample_bytes: usize, limiter: &RateLimiter) -> Result<u64> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();

    let mut hasher = Xxh3::new();
    hasher.update(size.to_string().as_bytes());

    let mut head = vec![0u8; sample_bytes.min(size as usize)];
    let n = file
        .read(&mut head)
        .with_context(|| format!("read head of {}", path.display()))?;
    hasher.update(&head[..n]);
    limiter.acquire(n);

    if size as usize > sample_bytes {
        let tail_len = sample_bytes.min(size as usize);
        let tail_start = size - tail_len as u64;
        file.seek(SeekFrom::Start(tail_start))
            .with_context(|| format!("seek tail of {}", path.display()))?;
        let mut tail = vec![0u8; tail_len];
        let n = file
            .read(&mut tail)
            .with_context(|| format!("read tail of {}", path.display()))?;
        hasher.update(&tail[..n]);
        limiter.acquire(n);
    }

    Ok(hasher.digest())
}

/// Which slice of the file `sample_hash` reads: `Head` for the first progressive pass
/// (`h1`), `Tail` for the narrowing second pass (`h2`) over survivors of the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePosition {
    Head,
    Tail,
}

/// A single position-tagged sample hash, used by the progressive-sampling stage to narrow
/// a quick-hash collision group before committing to a full cryptographic read.
pub fn sample_hash(
    path: &Path,
    position: SamplePosition,
    sample_bytes: usize,
    limiter: &RateLimiter,
) -> Result<u64> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();

    let mut buf = vec![0u8; sample_bytes.min(size as usize)];
    match position {
        SamplePosition::Head => {}
        SamplePosition::Tail => {
            let start = size.saturating_sub(buf.len() as u64);
            file.seek(SeekFrom::Start(start))
                .with_context(|| format!("seek tail sample of {}", path.display()))?;
        }
    }
    let n = file
        .read(&mut buf)
        .with_context(|| format!("read sample of {}", path.display()))?;
    limiter.acquire(n);

    let mut hasher = Xxh3::new();
    hasher.update(size.to_string().as_bytes());
    hasher.update(&buf[..n]);
    Ok(hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn quick_hash_differs_for_different_content() {
        let limiter = RateLimiter::unlimited();
        let mut a = NamedTempFile::new().unwrap();
        a.write_all(b"hello world").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        b.write_all(b"hello there").unwrap();
        assert_ne!(
            quick_hash(a.path(), 4096, &limiter).unwrap(),
            quick_hash(b.path(), 4096, &limiter).unwrap()
        );
    }

    #[test]
    fn quick_hash_matches_for_identical_content() {
        let limiter = RateLimiter::unlimited();
        let mut a = NamedTempFile::new().unwrap();
        a.write_all(b"identical payload").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        b.write_all(b"identical payload").unwrap();
        assert_eq!(
            quick_hash(a.path(), 4096, &limiter).unwrap(),
            quick_hash(b.path(), 4096, &limiter).unwrap()
        );
    }

    #[test]
    fn sample_hash_head_and_tail_differ_on_long_file() {
        let limiter = RateLimiter::unlimited();
        let mut f = NamedTempFile::new().unwrap();
        let mut payload = vec![b'a'; 100_000];
        payload.extend_from_slice(&vec![b'b'; 100_000]);
        f.write_all(&payload).unwrap();
        let head = sample_hash(f.path(), SamplePosition::Head, 4096, &limiter).unwrap();
        let tail = sample_hash(f.path(), SamplePosition::Tail, 4096, &limiter).unwrap();
        assert_ne!(head, tail);
    }
}
