//! Activation memory: per-proposition weights bumped on every observation.
//!
//! The decision cycle only writes bumps. Decay, if any, is the business of the
//! reactive proposer that reads these weights.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::term::Proposition;

/// Bump magnitudes and the weight ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Added to each proposition grounded from a successful result (default: 0.8).
    pub success_bump: f32,
    /// Added to a non-transient action that failed outright (default: 0.3).
    pub failure_bump: f32,
    /// Upper bound of any weight (default: 10.0).
    pub ceiling: f32,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            success_bump: 0.8,
            failure_bump: 0.3,
            ceiling: 10.0,
        }
    }
}

/// Proposition → weight in `[0.0, ceiling]`.
#[derive(Debug, Clone)]
pub struct ActivationMemory {
    weights: HashMap<Proposition, f32>,
    ceiling: f32,
}

impl ActivationMemory {
    pub fn new(ceiling: f32) -> Self {
        Self {
            weights: HashMap::new(),
            ceiling: ceiling.max(0.0),
        }
    }

    /// Add `amount` to the weight of `proposition`, starting from zero.
    ///
    /// Returns the new weight.
    pub fn bump(&mut self, proposition: Proposition, amount: f32) -> f32 {
        let ceiling = self.ceiling;
        let weight = self.weights.entry(proposition).or_insert(0.0);
        *weight = (*weight + amount).clamp(0.0, ceiling);
        *weight
    }

    /// Current weight, zero if never bumped.
    pub fn weight(&self, proposition: &Proposition) -> f32 {
        self.weights.get(proposition).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, proposition: &Proposition) -> bool {
        self.weights.contains_key(proposition)
    }

    /// The `n` heaviest propositions, highest first.
    pub fn top(&self, n: usize) -> Vec<(&Proposition, f32)> {
        let mut sorted: Vec<_> = self.weights.iter().map(|(p, w)| (p, *w)).collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        sorted.truncate(n);
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Proposition, f32)> {
        self.weights.iter().map(|(p, w)| (p, *w))
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl Default for ActivationMemory {
    fn default() -> Self {
        Self::new(ActivationConfig::default().ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(s: &str) -> Proposition {
        s.parse().unwrap()
    }

    #[test]
    fn bump_accumulates_from_zero() {
        let mut mem = ActivationMemory::default();
        let p = prop("checkTankWaterLevel(\"0.5\")");
        assert_eq!(mem.weight(&p), 0.0);
        assert_eq!(mem.bump(p.clone(), 0.3), 0.3);
        let w = mem.bump(p.clone(), 0.8);
        assert!((w - 1.1).abs() < 1e-6);
        assert_eq!(mem.len(), 1);
    }

    #[test]
    fn weights_stay_in_range() {
        let mut mem = ActivationMemory::new(1.0);
        let p = prop("ping");
        mem.bump(p.clone(), 0.8);
        assert_eq!(mem.bump(p.clone(), 0.8), 1.0);
        assert_eq!(mem.bump(p.clone(), -5.0), 0.0);
    }

    #[test]
    fn top_orders_by_weight() {
        let mut mem = ActivationMemory::default();
        mem.bump(prop("a"), 0.3);
        mem.bump(prop("b"), 0.8);
        mem.bump(prop("c"), 0.5);
        let top: Vec<String> = mem.top(2).into_iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(top, vec!["b", "c"]);
    }
}
