//! Graph data model
//!
//! Vertices are opaque, totally-ordered identifiers and edges are unordered,
//! loop-free pairs kept in canonical form. The orientation rank lives here
//! too since every stage after the degree count depends on it.

pub mod types;

pub use types::{Edge, GraphError, GraphResult, Rank, Vertex};
