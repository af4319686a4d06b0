//! Edge, degree and adjacency records

use super::{fields, parse_count, RecordError, RecordResult};
use crate::graph::{Edge, Vertex};
use std::fmt;

/// Parse an `u v` edge line into its canonical edge
pub fn parse_edge(line: &str) -> RecordResult<Edge> {
    let [u, v] = fields::<2>(line)?;
    Ok(Edge::new(Vertex::new(u)?, Vertex::new(v)?)?)
}

/// `v\td`: total degree of one vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeRecord {
    pub vertex: Vertex,
    pub degree: u64,
}

impl DegreeRecord {
    pub fn parse(line: &str) -> RecordResult<Self> {
        let [vertex, degree] = fields::<2>(line)?;
        Ok(DegreeRecord {
            vertex: Vertex::new(vertex)?,
            degree: parse_count(degree)?,
        })
    }
}

impl fmt::Display for DegreeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.vertex, self.degree)
    }
}

/// `u\tn1,n2,...`: forward adjacency list of `u`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyRecord {
    pub vertex: Vertex,
    pub neighbors: Vec<Vertex>,
}

impl AdjacencyRecord {
    pub fn parse(line: &str) -> RecordResult<Self> {
        let [vertex, neighbors] = fields::<2>(line)?;
        let neighbors = neighbors
            .split(',')
            .map(Vertex::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RecordError::from)?;
        Ok(AdjacencyRecord {
            vertex: Vertex::new(vertex)?,
            neighbors,
        })
    }
}

impl fmt::Display for AdjacencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t", self.vertex)?;
        for (i, n) in self.neighbors.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}
