//! Node Scoring & Selection
//!
//! `score = free_mb - chunk_count * penalty`. The candidate set is every alive
//! node whose score lies within `TIE_EPSILON` of the best one; the winner is drawn
//! uniformly from that band so that equally good nodes (typically freshly empty
//! ones) share the load instead of one node absorbing every chunk.

use super::types::{NodeView, Selection};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Mutex;

pub const TIE_EPSILON: f64 = 1e-3;

pub fn compute_score(free_mb: u64, chunk_count: u64, penalty: u64) -> f64 {
    free_mb as f64 - (chunk_count as f64 * penalty as f64)
}

/// Alive candidates whose score lies inside the top tie band, in input order.
pub fn top_band(candidates: &[(String, NodeView)], penalty: u64) -> Vec<(String, f64)> {
    let scored: Vec<(String, f64)> = candidates
        .iter()
        .filter(|(_, view)| view.is_alive())
        .map(|(address, view)| {
            (
                address.clone(),
                compute_score(view.free_mb, view.chunk_count, penalty),
            )
        })
        .collect();

    let Some(max_score) = scored.iter().map(|(_, s)| *s).reduce(f64::max) else {
        return Vec::new();
    };

    scored
        .into_iter()
        .filter(|(_, score)| (score - max_score).abs() < TIE_EPSILON)
        .collect()
}

/// Randomised top-band picker. The RNG can be seeded for reproducible runs.
pub struct NodeSelector {
    penalty: u64,
    rng: Mutex<StdRng>,
}

impl NodeSelector {
    pub fn new(penalty: u64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            penalty,
            rng: Mutex::new(rng),
        }
    }

    pub fn penalty(&self) -> u64 {
        self.penalty
    }

    /// Picks one alive node from `candidates`, or `None` if none is alive.
    pub fn select(&self, candidates: &[(String, NodeView)]) -> Option<Selection> {
        let band = top_band(candidates, self.penalty);
        let tied = band.len();

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (address, score) = band.choose(&mut *rng)?.clone();

        Some(Selection {
            address,
            score,
            tied,
        })
    }
}
