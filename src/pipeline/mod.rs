//! The staged hashing pipeline: a generic paged/parallel stage executor plus the dedupe
//! orchestration built on top of it (§4.2, §4.5).

pub mod dedupe;
pub mod executor;
