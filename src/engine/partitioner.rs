//! Deterministic key → reducer routing

use super::{EngineError, EngineResult};
use sha2::{Digest, Sha256};
use std::fmt;

/// Routes a record key to one of `R` reducers.
///
/// The route is the first eight bytes of the SHA-256 digest of the key's text
/// encoding, big-endian, modulo `R`. It depends on nothing but the key bytes,
/// so every stage, thread and process agrees on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    reducers: usize,
}

impl Partitioner {
    pub fn new(reducers: usize) -> EngineResult<Self> {
        if reducers == 0 {
            return Err(EngineError::InvalidReducerCount(reducers));
        }
        Ok(Self { reducers })
    }

    pub fn reducers(&self) -> usize {
        self.reducers
    }

    /// Reducer index for raw key bytes
    pub fn partition_bytes(&self, key: &[u8]) -> usize {
        let digest = Sha256::digest(key);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(head) % self.reducers as u64) as usize
    }

    /// Reducer index for a typed key, hashed through its record encoding
    pub fn partition<K: fmt::Display + ?Sized>(&self, key: &K) -> usize {
        self.partition_bytes(key.to_string().as_bytes())
    }
}
