//! Power-law graphs by preferential attachment
//!
//! Starts from a clique on vertices `1..=m+1`. Every later vertex attaches to
//! `m` distinct earlier vertices picked with probability proportional to
//! their current degree, which grows a few very high-degree hubs.

use super::{canonical, GenError, GenResult, GeneratedGraph};
use rand::prelude::*;

pub fn preferential_attachment(vertices: u64, m: u64, seed: u64) -> GenResult<GeneratedGraph> {
    if m == 0 || vertices <= m {
        return Err(GenError::InvalidAttachment { m, vertices });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::new();
    // each vertex appears once per incident edge
    let mut urn: Vec<u64> = Vec::new();

    for u in 1..=m + 1 {
        for v in u + 1..=m + 1 {
            edges.push((u, v));
            urn.push(u);
            urn.push(v);
        }
    }

    let mut targets = Vec::with_capacity(m as usize);
    for new in m + 2..=vertices {
        targets.clear();
        while (targets.len() as u64) < m {
            if let Some(&t) = urn.choose(&mut rng) {
                if !targets.contains(&t) {
                    targets.push(t);
                }
            }
        }
        for &t in &targets {
            edges.push(canonical(new, t));
            urn.push(t);
            urn.push(new);
        }
    }

    Ok(GeneratedGraph { vertices, edges })
}
