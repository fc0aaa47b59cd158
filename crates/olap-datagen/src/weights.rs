//! Sampling weights and the weighted sampler used by the fact generator.

use rand::{
  Rng,
  distr::{Distribution, weighted::WeightedIndex},
};

use crate::Result;

/// Share of items considered "top" by [`pareto_weights`].
pub const PARETO_TOP_SHARE: f64 = 0.2;

/// 80/20-style weights: the first `max(1, floor(0.2 n))` items share `factor`
/// of the mass, the rest share `1 - factor`.
///
/// `factor` is expected in `[0, 1)`.
pub fn pareto_weights(n: usize, factor: f64) -> Vec<f64> {
  match n {
    0 => Vec::new(),
    1 => vec![1.0],
    _ => {
      let top = ((n as f64 * PARETO_TOP_SHARE).floor() as usize).max(1);
      let top_weight = factor / top as f64;
      let rest_weight = (1.0 - factor) / (n - top) as f64;
      (0..n)
        .map(|i| if i < top { top_weight } else { rest_weight })
        .collect()
    }
  }
}

/// Linearly increasing weights `1, 2, ..., n`; later items are likelier.
pub fn recency_weights(n: usize) -> Vec<f64> {
  (1..=n).map(|i| i as f64).collect()
}

/// Draws indices in proportion to a fixed weight vector.
///
/// Built once; each draw is a binary search over cumulative weights.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
  index: WeightedIndex<f64>,
  len:   usize,
}

impl WeightedSampler {
  /// Fails on empty input, negative or non-finite weights, or all zeros.
  pub fn new(weights: &[f64]) -> Result<Self> {
    Ok(Self {
      index: WeightedIndex::new(weights)?,
      len:   weights.len(),
    })
  }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
    self.index.sample(rng)
  }

  /// Draw an element of `items`, which must be the slice the weights were
  /// built for.
  pub fn choose<'a, T, R: Rng + ?Sized>(&self, items: &'a [T], rng: &mut R) -> &'a T {
    &items[self.sample(rng)]
  }
}

#[cfg(test)]
mod tests {
  use rand::{SeedableRng, rngs::StdRng};

  use super::*;

  #[test]
  fn pareto_mass_is_split_eighty_twenty() {
    for n in [5, 10, 37, 1000] {
      let w = pareto_weights(n, 0.8);
      let top = ((n as f64 * 0.2).floor() as usize).max(1);
      let total: f64 = w.iter().sum();
      let head: f64 = w[..top].iter().sum();
      assert!((total - 1.0).abs() < 1e-9, "n = {n}");
      assert!((head - 0.8).abs() < 1e-9, "n = {n}");
    }
  }

  #[test]
  fn pareto_small_populations() {
    assert!(pareto_weights(0, 0.8).is_empty());
    assert_eq!(pareto_weights(1, 0.8), vec![1.0]);
    let two = pareto_weights(2, 0.8);
    assert_eq!(two.len(), 2);
    assert!((two[0] - 0.8).abs() < 1e-12);
  }

  #[test]
  fn recency_is_increasing() {
    assert_eq!(recency_weights(4), vec![1.0, 2.0, 3.0, 4.0]);
  }

  #[test]
  fn sampler_rejects_bad_weights() {
    assert!(WeightedSampler::new(&[]).is_err());
    assert!(WeightedSampler::new(&[0.0, 0.0]).is_err());
    assert!(WeightedSampler::new(&[1.0, -1.0]).is_err());
  }

  #[test]
  fn sampler_never_draws_zero_weight_items() {
    let sampler = WeightedSampler::new(&[0.0, 3.0, 0.0, 1.0]).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let mut counts = [0usize; 4];
    for _ in 0..4000 {
      counts[sampler.sample(&mut rng)] += 1;
    }
    assert_eq!(counts[0], 0);
    assert_eq!(counts[2], 0);
    assert!(counts[1] > counts[3] * 2);
  }

  #[test]
  fn pareto_sampling_concentrates_on_the_head() {
    let n = 100;
    let sampler = WeightedSampler::new(&pareto_weights(n, 0.8)).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let draws = 10_000;
    let head = (0..draws).filter(|_| sampler.sample(&mut rng) < 20).count();
    let share = head as f64 / draws as f64;
    assert!((0.75..0.85).contains(&share), "share = {share}");
  }
}
