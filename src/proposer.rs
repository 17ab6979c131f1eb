//! Contracts of the two proposal subsystems and the transience classifier.
//!
//! The decision cycle depends only on these traits. Both subsystems keep their
//! own internal state; the cycle lends them read-only views of the stores it
//! owns so they can reason over activation and beliefs.

use std::collections::HashSet;

use crate::activation::ActivationMemory;
use crate::belief::BeliefStore;
use crate::term::{Action, Proposition};

/// Fast, associative proposal subsystem.
pub trait ReactiveProposer {
    /// Refresh internal state before proposals are collected.
    fn refresh(&mut self, memory: &ActivationMemory);

    /// Candidate actions, most preferred first. May be empty.
    fn propose_actions(&self) -> Vec<Action>;

    /// Advance one internal step after an action was executed.
    fn advance(&mut self);
}

/// Declarative classification of predicates whose truth is never persisted.
pub trait TransienceClassifier {
    fn is_transient(&self, proposition: &Proposition) -> bool;
}

/// Slow, deliberative proposal subsystem.
///
/// It owns the goal declarations, which is also where transience is declared.
pub trait DeliberativeProposer: TransienceClassifier {
    /// Propose at most one action.
    fn propose_action(&mut self, beliefs: &BeliefStore) -> Option<Action>;
}

/// Transience by predicate name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientPredicates {
    names: HashSet<String>,
}

impl TransientPredicates {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, predicate: &str) -> bool {
        self.names.contains(predicate)
    }
}

impl TransienceClassifier for TransientPredicates {
    fn is_transient(&self, proposition: &Proposition) -> bool {
        self.contains(proposition.predicate())
    }
}

/// Reactive proposer that never proposes anything.
///
/// With it, every cycle falls through to deliberation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quiescent;

impl ReactiveProposer for Quiescent {
    fn refresh(&mut self, _memory: &ActivationMemory) {}

    fn propose_actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn advance(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_by_predicate_ignores_arguments() {
        let t = TransientPredicates::new(["doWork", "sleep"]);
        assert!(t.is_transient(&"doWork".parse().unwrap()));
        assert!(t.is_transient(&"sleep(5)".parse().unwrap()));
        assert!(!t.is_transient(&"drainTank(x)".parse().unwrap()));
    }

    #[test]
    fn quiescent_proposes_nothing() {
        let mut q = Quiescent;
        q.refresh(&ActivationMemory::default());
        assert!(q.propose_actions().is_empty());
    }
}
