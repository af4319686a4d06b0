//! Brute-force triangle counting, used as an oracle for the pipeline

use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCount {
    pub total: u64,
    /// Vertices in at least one triangle
    pub per_vertex: BTreeMap<u64, u64>,
}

/// Count triangles of an undirected edge list.
///
/// Each triangle is found once as `u < v < w` with all three edges present.
/// Duplicate edges and self-loops are ignored.
pub fn count_triangles(edges: &[(u64, u64)]) -> ReferenceCount {
    let mut neighbors: HashMap<u64, HashSet<u64>> = HashMap::new();
    for &(u, v) in edges {
        if u == v {
            continue;
        }
        neighbors.entry(u).or_default().insert(v);
        neighbors.entry(v).or_default().insert(u);
    }

    let mut count = ReferenceCount::default();
    for (&u, u_neighbors) in &neighbors {
        for &v in u_neighbors {
            if v <= u {
                continue;
            }
            for &w in &neighbors[&v] {
                if w <= v {
                    continue;
                }
                if u_neighbors.contains(&w) {
                    count.total += 1;
                    for x in [u, v, w] {
                        *count.per_vertex.entry(x).or_insert(0) += 1;
                    }
                }
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k4() {
        let edges = [(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)];
        let count = count_triangles(&edges);
        assert_eq!(count.total, 4);
        assert!(count.per_vertex.values().all(|&c| c == 3));
    }

    #[test]
    fn test_path_and_duplicates() {
        assert_eq!(count_triangles(&[(1, 2), (2, 3), (3, 4)]).total, 0);
        assert_eq!(count_triangles(&[(1, 2), (2, 1), (2, 3), (1, 3), (3, 3)]).total, 1);
    }
}
