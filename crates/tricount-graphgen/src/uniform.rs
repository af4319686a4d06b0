//! Uniformly random simple graphs

use super::{canonical, GenError, GenResult, GeneratedGraph};
use rand::prelude::*;
use std::collections::HashSet;

/// `edges` distinct edges between vertices `1..=vertices`, chosen uniformly.
///
/// Sparse requests sample pairs with rejection; requests above half of the
/// complete graph shuffle the full pair list instead.
pub fn uniform_random(vertices: u64, edges: u64, seed: u64) -> GenResult<GeneratedGraph> {
    if vertices < 2 {
        return Err(GenError::TooFewVertices(vertices));
    }
    // saturates for vertex counts whose complete graph exceeds u64 edges
    let max = u64::try_from(u128::from(vertices) * u128::from(vertices - 1) / 2)
        .unwrap_or(u64::MAX);
    if edges > max {
        return Err(GenError::TooManyEdges {
            requested: edges,
            vertices,
            max,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let edges = if edges.saturating_mul(2) > max {
        let mut all: Vec<(u64, u64)> = (1..=vertices)
            .flat_map(|u| (u + 1..=vertices).map(move |v| (u, v)))
            .collect();
        all.shuffle(&mut rng);
        all.truncate(edges as usize);
        all
    } else {
        let mut seen = HashSet::with_capacity(edges as usize);
        let mut list = Vec::with_capacity(edges as usize);
        while (list.len() as u64) < edges {
            let u = rng.gen_range(1..=vertices);
            let v = rng.gen_range(1..=vertices);
            if u == v {
                continue;
            }
            let edge = canonical(u, v);
            if seen.insert(edge) {
                list.push(edge);
            }
        }
        list
    };

    Ok(GeneratedGraph { vertices, edges })
}
