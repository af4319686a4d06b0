//! Core type definitions for the input graph

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors raised while building vertices and edges
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid vertex token {0:?}")]
    InvalidVertex(String),

    #[error("Self-loop on vertex {0}")]
    SelfLoop(Vertex),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Characters that separate fields inside the text records, plus the
/// replacement character left by undecodable input
const RESERVED: [char; 3] = [',', '|', char::REPLACEMENT_CHARACTER];

/// Opaque vertex identifier.
///
/// Vertices are compared under a fixed total order: tokens that are canonical
/// unsigned integers ("0", or digits without a leading zero that fit a `u64`)
/// sort numerically and come first, every other token sorts by its bytes.
/// Equality is always textual identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vertex {
    name: String,
    numeric: Option<u64>,
}

impl Vertex {
    /// Parse a vertex from a record token
    pub fn new(token: impl Into<String>) -> GraphResult<Self> {
        let name = token.into();
        if name.is_empty()
            || name.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c))
        {
            return Err(GraphError::InvalidVertex(name));
        }
        let numeric = canonical_integer(&name);
        Ok(Vertex { name, numeric })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Numeric value, when the token is a canonical integer
    pub fn as_u64(&self) -> Option<u64> {
        self.numeric
    }
}

fn canonical_integer(token: &str) -> Option<u64> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

impl Ord for Vertex {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric, other.numeric) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.name.cmp(&other.name),
        }
    }
}

impl PartialOrd for Vertex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<u64> for Vertex {
    fn from(id: u64) -> Self {
        Vertex {
            name: id.to_string(),
            numeric: Some(id),
        }
    }
}

impl Serialize for Vertex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// An undirected edge, always stored in canonical `(low, high)` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    low: Vertex,
    high: Vertex,
}

impl Edge {
    /// Canonicalize `{a, b}`; self-loops are rejected.
    pub fn new(a: Vertex, b: Vertex) -> GraphResult<Self> {
        match a.cmp(&b) {
            Ordering::Less => Ok(Edge { low: a, high: b }),
            Ordering::Greater => Ok(Edge { low: b, high: a }),
            Ordering::Equal => Err(GraphError::SelfLoop(a)),
        }
    }

    pub fn low(&self) -> &Vertex {
        &self.low
    }

    pub fn high(&self) -> &Vertex {
        &self.high
    }

    pub fn into_endpoints(self) -> (Vertex, Vertex) {
        (self.low, self.high)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.low, self.high)
    }
}

/// Orientation order of a vertex: `(degree, vertex)`, compared lexicographically.
///
/// The lower-ranked endpoint of an edge owns it in the forward adjacency
/// relation, so hubs end up on the receiving side of almost every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rank<'a> {
    pub degree: u64,
    pub vertex: &'a Vertex,
}
