//! Line-oriented record formats exchanged between stages
//!
//! Every intermediate stream is plain text, one record per line:
//!
//! | record        | format                  |
//! |---------------|-------------------------|
//! | edge          | `u v`                   |
//! | degree        | `v\td`                  |
//! | adjacency     | `u\tn1,n2,...`          |
//! | closing       | `v,w\tE` / `v,w\tW|u`   |
//! | contribution  | `G\tn` / `V\tvertex\tn` |
//!
//! Types implement `Display` for encoding and a `parse` constructor for
//! decoding. Decoding failures are `RecordError`s; the stages treat them as
//! skippable input, never as fatal.

pub mod adjacency;
pub mod tagged;

pub use adjacency::{parse_edge, AdjacencyRecord, DegreeRecord};
pub use tagged::{AggregateKey, ClosingValue, Contribution, PairKey};

use crate::graph::GraphError;
use thiserror::Error;

/// Record decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Wrong number of fields on the line
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A count column that is not an unsigned integer
    #[error("invalid count {0:?}")]
    InvalidCount(String),

    /// Unknown record tag
    #[error("unknown tag {0:?}")]
    UnknownTag(String),

    /// Vertex or edge construction failed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Split a line on whitespace and require exactly `expected` fields
pub(crate) fn fields<const N: usize>(line: &str) -> RecordResult<[&str; N]> {
    let mut out = [""; N];
    let mut found = 0;
    for token in line.split_whitespace() {
        if found < N {
            out[found] = token;
        }
        found += 1;
    }
    if found != N {
        return Err(RecordError::FieldCount { expected: N, found });
    }
    Ok(out)
}

pub(crate) fn parse_count(token: &str) -> RecordResult<u64> {
    token
        .parse()
        .map_err(|_| RecordError::InvalidCount(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_exact() {
        assert_eq!(fields::<2>("a  b").unwrap(), ["a", "b"]);
        assert_eq!(fields::<3>("V\tx\t1").unwrap(), ["V", "x", "1"]);
    }

    #[test]
    fn test_fields_count_mismatch() {
        assert_eq!(
            fields::<2>("a b c"),
            Err(RecordError::FieldCount { expected: 2, found: 3 })
        );
        assert_eq!(
            fields::<2>(""),
            Err(RecordError::FieldCount { expected: 2, found: 0 })
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("17"), Ok(17));
        assert!(matches!(parse_count("-1"), Err(RecordError::InvalidCount(_))));
    }
}
