// crates/livecut-core/src/distribution.rs
//
// Distribution<K>: a map from keys to non-negative weights, used for feature
// votes and for the selector's weighted tally. BTreeMap-backed so iteration
// order (and therefore every tie-break) is the key order.

use std::collections::BTreeMap;
use std::ops::{Add, Mul};

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DistributionError {
    /// normalize / sample / expectation on a distribution whose weights sum to 0.
    #[error("distribution total = 0")]
    ZeroTotal,
    /// expectation / conditional_update called with a mismatched keyset.
    #[error("distribution keysets do not match")]
    KeyMismatch,
}

/// A distribution of items and their associated weights.
///
/// Weights are plain `f64`s ≥ 0 — a `Distribution` is only a *probability*
/// distribution after `normalize()`. Reading an absent key yields 0.0.
#[derive(Debug, Clone, Default)]
pub struct Distribution<K: Ord> {
    weights: BTreeMap<K, f64>,
}

impl<K: Ord + Clone> Distribution<K> {
    pub fn new() -> Self {
        Self { weights: BTreeMap::new() }
    }

    /// Equal weight per item, summing to 1.
    pub fn uniform(items: impl IntoIterator<Item = K>) -> Self {
        let keys: Vec<K> = items.into_iter().collect();
        let p = 1.0 / keys.len().max(1) as f64;
        Self { weights: keys.into_iter().map(|k| (k, p)).collect() }
    }

    /// Build from occurrence counts (e.g. a sliding window tally).
    pub fn from_counts(items: impl IntoIterator<Item = K>) -> Self {
        let mut d = Self::new();
        for item in items {
            *d.entry(item) += 1.0;
        }
        d
    }

    /// Weight for `key`; absent keys read as 0.0.
    pub fn get(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    /// Mutable weight for `key`, inserting 0.0 when absent.
    pub fn entry(&mut self, key: K) -> &mut f64 {
        self.weights.entry(key).or_insert(0.0)
    }

    pub fn set(&mut self, key: K, weight: f64) {
        self.weights.insert(key, weight);
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.weights.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.weights.iter().map(|(k, &v)| (k, v))
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// The key with the largest weight. Ties break toward the smaller key
    /// (strict `>` comparison over key-ordered iteration).
    pub fn argmax(&self) -> Option<&K> {
        let mut best: Option<(&K, f64)> = None;
        for (k, &v) in &self.weights {
            match best {
                Some((_, bv)) if v > bv => best = Some((k, v)),
                None => best = Some((k, v)),
                _ => {}
            }
        }
        best.map(|(k, _)| k)
    }

    /// Scale weights in place so they sum to 1.
    pub fn normalize(&mut self) -> Result<(), DistributionError> {
        let total = self.total();
        if total <= 0.0 {
            return Err(DistributionError::ZeroTotal);
        }
        for v in self.weights.values_mut() {
            *v /= total;
        }
        Ok(())
    }

    /// Expectation of `values` under this distribution's weights.
    /// Both sides must carry exactly the same keyset.
    pub fn expectation(&self, values: &Distribution<K>) -> Result<f64, DistributionError> {
        self.require_same_keys(values)?;
        Ok(self.weights.iter().map(|(k, &w)| w * values.get(k)).sum())
    }

    /// Bayes-style update: multiply pointwise by `conditional`, then
    /// renormalize. Keysets must match exactly; an all-zero product is an
    /// error rather than a NaN-filled distribution.
    pub fn conditional_update(
        &self,
        conditional: &Distribution<K>,
    ) -> Result<Distribution<K>, DistributionError> {
        self.require_same_keys(conditional)?;
        let mut updated = self.clone();
        for (k, v) in updated.weights.iter_mut() {
            *v *= conditional.get(k);
        }
        updated.normalize()?;
        Ok(updated)
    }

    /// Draw a key with probability proportional to its weight.
    ///
    /// The draw is uniform in `[0, total)`; the first key whose prefix-sum
    /// strictly exceeds the draw wins. Rounding can leave the accumulated sum
    /// just short of `total` — the last key is returned in that case.
    pub fn sample(&self) -> Result<&K, DistributionError> {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with(&self, rng: &mut impl Rng) -> Result<&K, DistributionError> {
        let total = self.total();
        if total <= 0.0 || self.weights.is_empty() {
            return Err(DistributionError::ZeroTotal);
        }
        let target: f64 = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut last = None;
        for (k, &v) in &self.weights {
            cumulative += v;
            if cumulative > target {
                return Ok(k);
            }
            last = Some(k);
        }
        Ok(last.expect("non-empty distribution"))
    }

    fn require_same_keys(&self, other: &Distribution<K>) -> Result<(), DistributionError> {
        if self.weights.len() != other.weights.len()
            || !self.weights.keys().eq(other.weights.keys())
        {
            return Err(DistributionError::KeyMismatch);
        }
        Ok(())
    }
}

impl<K: Ord + Clone> FromIterator<(K, f64)> for Distribution<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self { weights: iter.into_iter().collect() }
    }
}

/// Pointwise sum; the keysets union, with missing keys reading as 0.0.
impl<K: Ord + Clone> Add for Distribution<K> {
    type Output = Distribution<K>;

    fn add(mut self, rhs: Distribution<K>) -> Distribution<K> {
        for (k, v) in rhs.weights {
            *self.entry(k) += v;
        }
        self
    }
}

/// Scale every weight by a constant. Distributive over `+`.
impl<K: Ord + Clone> Mul<f64> for Distribution<K> {
    type Output = Distribution<K>;

    fn mul(mut self, rhs: f64) -> Distribution<K> {
        for v in self.weights.values_mut() {
            *v *= rhs;
        }
        self
    }
}

impl<K: Ord> PartialEq for Distribution<K> {
    fn eq(&self, other: &Self) -> bool {
        self.weights == other.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dist(pairs: &[(&str, f64)]) -> Distribution<String> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn absent_key_reads_zero() {
        let d = dist(&[("a", 1.0)]);
        assert_eq!(d.get(&"b".to_string()), 0.0);
    }

    #[test]
    fn add_unions_keysets() {
        let a = dist(&[("a", 1.0), ("b", 2.0)]);
        let b = dist(&[("b", 3.0), ("c", 4.0)]);
        let sum = a.clone() + b.clone();
        for k in ["a", "b", "c"] {
            let k = k.to_string();
            assert_eq!(sum.get(&k), a.get(&k) + b.get(&k));
        }
    }

    #[test]
    fn scalar_multiply_is_distributive_over_add() {
        let a = dist(&[("a", 1.0), ("b", 2.0)]);
        let b = dist(&[("b", 3.0), ("c", 4.0)]);
        let lhs = (a.clone() + b.clone()) * 2.0;
        let rhs = a * 2.0 + b * 2.0;
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn normalize_sums_to_one() {
        let mut d = dist(&[("a", 2.0), ("b", 6.0)]);
        d.normalize().unwrap();
        assert!((d.total() - 1.0).abs() < 1e-9);
        assert!((d.get(&"a".to_string()) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn normalize_empty_fails_with_zero_total() {
        let mut d: Distribution<String> = Distribution::new();
        assert_eq!(d.normalize(), Err(DistributionError::ZeroTotal));
    }

    #[test]
    fn normalize_all_zero_fails() {
        let mut d = dist(&[("a", 0.0), ("b", 0.0)]);
        assert_eq!(d.normalize(), Err(DistributionError::ZeroTotal));
    }

    #[test]
    fn argmax_is_a_member_and_ties_break_by_key_order() {
        let d = dist(&[("b", 1.0), ("a", 1.0), ("c", 0.5)]);
        assert_eq!(d.argmax(), Some(&"a".to_string()));
    }

    #[test]
    fn argmax_empty_is_none() {
        let d: Distribution<String> = Distribution::new();
        assert_eq!(d.argmax(), None);
    }

    #[test]
    fn expectation_requires_identical_keysets() {
        let d = dist(&[("a", 0.5), ("b", 0.5)]);
        let v = dist(&[("a", 2.0), ("c", 4.0)]);
        assert_eq!(d.expectation(&v), Err(DistributionError::KeyMismatch));
    }

    #[test]
    fn expectation_weights_values() {
        let d = dist(&[("a", 0.25), ("b", 0.75)]);
        let v = dist(&[("a", 4.0), ("b", 8.0)]);
        assert!((d.expectation(&v).unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn conditional_update_renormalizes() {
        let d = dist(&[("a", 0.5), ("b", 0.5)]);
        let c = dist(&[("a", 1.0), ("b", 3.0)]);
        let u = d.conditional_update(&c).unwrap();
        assert!((u.get(&"a".to_string()) - 0.25).abs() < 1e-9);
        assert!((u.get(&"b".to_string()) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn conditional_update_rejects_mismatched_keys() {
        let d = dist(&[("a", 0.5), ("b", 0.5)]);
        let c = dist(&[("a", 1.0)]);
        assert_eq!(d.conditional_update(&c), Err(DistributionError::KeyMismatch));
    }

    #[test]
    fn sample_lands_on_positive_weight() {
        let d = dist(&[("a", 0.0), ("b", 1.0), ("c", 0.0)]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(d.sample_with(&mut rng).unwrap(), &"b".to_string());
        }
    }

    #[test]
    fn sample_empty_fails() {
        let d: Distribution<String> = Distribution::new();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(d.sample_with(&mut rng), Err(DistributionError::ZeroTotal));
    }

    #[test]
    fn from_counts_tallies_occurrences() {
        let d = Distribution::from_counts(["a", "b", "a", "a"].map(String::from));
        assert_eq!(d.get(&"a".to_string()), 3.0);
        assert_eq!(d.get(&"b".to_string()), 1.0);
    }
}
