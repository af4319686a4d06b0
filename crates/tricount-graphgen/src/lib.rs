//! Seeded graph generators for exercising the triangle counter
//!
//! `uniform_random` spreads edges evenly, `preferential_attachment` grows a
//! few high-degree hubs. `count_triangles` is a brute-force oracle to check
//! pipeline results against.

pub mod reference;
pub mod skewed;
pub mod uniform;

pub use reference::{count_triangles, ReferenceCount};
pub use skewed::preferential_attachment;
pub use uniform::uniform_random;

use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error("a simple graph needs at least 2 vertices, got {0}")]
    TooFewVertices(u64),

    #[error("{requested} edges requested but {vertices} vertices allow at most {max}")]
    TooManyEdges {
        requested: u64,
        vertices: u64,
        max: u64,
    },

    #[error("attachment count must be in 1..{vertices}, got {m}")]
    InvalidAttachment { m: u64, vertices: u64 },
}

pub type GenResult<T> = Result<T, GenError>;

/// A simple undirected graph over vertices `1..=vertices`.
///
/// Every edge is stored as `(min, max)` and appears once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedGraph {
    pub vertices: u64,
    pub edges: Vec<(u64, u64)>,
}

impl GeneratedGraph {
    /// Edge records as `u v` lines
    pub fn to_lines(&self) -> Vec<String> {
        self.edges.iter().map(|(u, v)| format!("{} {}", u, v)).collect()
    }

    pub fn write_to(&self, mut out: impl Write) -> io::Result<()> {
        for (u, v) in &self.edges {
            writeln!(out, "{} {}", u, v)?;
        }
        out.flush()
    }

    pub fn max_degree(&self) -> u64 {
        let mut degrees: HashMap<u64, u64> = HashMap::new();
        for &(u, v) in &self.edges {
            *degrees.entry(u).or_insert(0) += 1;
            *degrees.entry(v).or_insert(0) += 1;
        }
        degrees.into_values().max().unwrap_or(0)
    }
}

fn canonical(u: u64, v: u64) -> (u64, u64) {
    if u < v {
        (u, v)
    } else {
        (v, u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_and_write() {
        let graph = GeneratedGraph {
            vertices: 3,
            edges: vec![(1, 2), (2, 3)],
        };
        assert_eq!(graph.to_lines(), vec!["1 2", "2 3"]);

        let mut buf = Vec::new();
        graph.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1 2\n2 3\n");
        assert_eq!(graph.max_degree(), 2);
    }

    #[test]
    fn test_max_degree_of_huge_ids() {
        let graph = GeneratedGraph {
            vertices: u64::MAX,
            edges: vec![(1, u64::MAX), (2, u64::MAX)],
        };
        assert_eq!(graph.max_degree(), 2);
    }
}
