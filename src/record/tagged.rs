//! Tagged records of the closing and aggregation stages

use super::{fields, parse_count, RecordError, RecordResult};
use crate::graph::{Edge, Vertex};
use std::fmt;

/// Canonical pair key `v,w` (v < w) shared by wedges and real edges
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(Edge);

impl PairKey {
    pub fn new(edge: Edge) -> Self {
        PairKey(edge)
    }

    pub fn edge(&self) -> &Edge {
        &self.0
    }
}

impl From<Edge> for PairKey {
    fn from(edge: Edge) -> Self {
        PairKey(edge)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0.low(), self.0.high())
    }
}

/// Value side of a closing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosingValue {
    /// The pair is a real edge of the input
    EdgeMarker,
    /// `u` has both ends of the pair in its forward adjacency list
    Witness(Vertex),
}

impl ClosingValue {
    pub fn parse(token: &str) -> RecordResult<Self> {
        if token == "E" {
            return Ok(ClosingValue::EdgeMarker);
        }
        match token.strip_prefix("W|") {
            Some(witness) => Ok(ClosingValue::Witness(Vertex::new(witness)?)),
            None => Err(RecordError::UnknownTag(token.to_string())),
        }
    }
}

impl fmt::Display for ClosingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosingValue::EdgeMarker => f.write_str("E"),
            ClosingValue::Witness(u) => write!(f, "W|{}", u),
        }
    }
}

/// Aggregation key: the global total or one vertex.
///
/// `Global` orders before every vertex key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregateKey {
    Global,
    Vertex(Vertex),
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateKey::Global => f.write_str("G"),
            AggregateKey::Vertex(v) => write!(f, "V\t{}", v),
        }
    }
}

/// `G\tn` or `V\tvertex\tn`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub key: AggregateKey,
    pub count: u64,
}

impl Contribution {
    pub fn global(count: u64) -> Self {
        Contribution {
            key: AggregateKey::Global,
            count,
        }
    }

    pub fn vertex(vertex: Vertex, count: u64) -> Self {
        Contribution {
            key: AggregateKey::Vertex(vertex),
            count,
        }
    }

    pub fn parse(line: &str) -> RecordResult<Self> {
        let tag = line.split_whitespace().next().unwrap_or_default();
        match tag {
            "G" => {
                let [_, count] = fields::<2>(line)?;
                Ok(Contribution::global(parse_count(count)?))
            }
            "V" => {
                let [_, vertex, count] = fields::<3>(line)?;
                Ok(Contribution::vertex(Vertex::new(vertex)?, parse_count(count)?))
            }
            other => Err(RecordError::UnknownTag(other.to_string())),
        }
    }
}

impl fmt::Display for Contribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.key, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: u64, b: u64) -> Edge {
        Edge::new(a.into(), b.into()).unwrap()
    }

    #[test]
    fn test_pair_key_format() {
        assert_eq!(PairKey::new(edge(3, 2)).to_string(), "2,3");
    }

    #[test]
    fn test_closing_value_format() {
        assert_eq!(ClosingValue::EdgeMarker.to_string(), "E");
        assert_eq!(ClosingValue::Witness(Vertex::from(9)).to_string(), "W|9");
        assert_eq!(ClosingValue::parse("W|9").unwrap(), ClosingValue::Witness(Vertex::from(9)));
        assert_eq!(ClosingValue::parse("E").unwrap(), ClosingValue::EdgeMarker);
        assert!(matches!(ClosingValue::parse("X"), Err(RecordError::UnknownTag(_))));
    }

    #[test]
    fn test_contribution_format() {
        assert_eq!(Contribution::global(1).to_string(), "G\t1");
        assert_eq!(Contribution::vertex(Vertex::from(4), 2).to_string(), "V\t4\t2");
    }

    #[test]
    fn test_contribution_parse() {
        assert_eq!(Contribution::parse("G\t5").unwrap(), Contribution::global(5));
        assert_eq!(
            Contribution::parse("V\tx\t1").unwrap(),
            Contribution::vertex(Vertex::new("x").unwrap(), 1)
        );
        assert!(matches!(Contribution::parse("Q\t1"), Err(RecordError::UnknownTag(_))));
        assert!(matches!(Contribution::parse("V\t1"), Err(RecordError::FieldCount { .. })));
        assert!(matches!(Contribution::parse(""), Err(RecordError::UnknownTag(_))));
    }

    #[test]
    fn test_global_key_sorts_first() {
        assert!(AggregateKey::Global < AggregateKey::Vertex(Vertex::from(0)));
    }
}
