//! The staged hashing pipeline's digest primitives: the 64-bit quick/sample hashes and
//! the 256-bit cryptographic full hash behind a common trait so the dedupe stage can pick
//! BLAKE3 or SHA-256 at runtime without branching on every read.

pub mod full;
pub mod quick;

pub use full::{FullHasher, HashAlgorithm};
pub use quick::{quick_hash, sample_hash};
