use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Seeded random selector for reproducible stochastic choices
#[derive(Debug, Clone)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Create a deterministic random selector
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generic weighted random selection
    ///
    /// Returns index into weights array using cumulative distribution.
    /// Falls back to a uniform choice when no weight is positive.
    pub fn weighted_choice(&mut self, weights: &[f64]) -> usize {
        if weights.is_empty() {
            return 0;
        }
        let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
        if total <= 0.0 {
            return self.rng.random_range(0..weights.len());
        }

        let mut rand_val = self.rng.random::<f64>() * total;
        for (i, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() || weight <= 0.0 {
                continue;
            }
            rand_val -= weight;
            if rand_val <= 0.0 {
                return i;
            }
        }
        weights
            .iter()
            .rposition(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(weights.len() - 1)
    }

    /// Draw up to `count` distinct indices, each draw weighted by the remaining weights
    pub fn weighted_sample(&mut self, weights: &[f64], count: usize) -> Vec<usize> {
        let mut remaining: Vec<usize> = (0..weights.len()).collect();
        let mut chosen = Vec::with_capacity(count.min(weights.len()));

        while chosen.len() < count && !remaining.is_empty() {
            let current: Vec<f64> = remaining
                .iter()
                .map(|&i| weights.get(i).copied().unwrap_or(0.0))
                .collect();
            let pick = self.weighted_choice(&current);
            if pick < remaining.len() {
                chosen.push(remaining.swap_remove(pick));
            } else {
                break;
            }
        }
        chosen
    }

    /// Uniform sample in `[low, high)`; returns `low` for an empty interval
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.rng.random_range(low..high)
        } else {
            low
        }
    }

    /// Uniform index in `[0, len)`; returns 0 when `len` is zero
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.rng.random_range(0..len)
        }
    }

    /// Fair coin flip
    pub fn coin(&mut self) -> bool {
        self.rng.random::<bool>()
    }

    /// Shuffle a slice in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
