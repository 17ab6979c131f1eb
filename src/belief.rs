//! Belief store: ground propositions mapped to known-true / known-false.
//!
//! Writes are last-write-wins per proposition. Every write stamps the entry
//! with a monotonically increasing store revision so that observers (the
//! routine planner) can ask what changed since they last looked.

use std::collections::HashMap;

use crate::proposer::TransienceClassifier;
use crate::term::Proposition;

/// Known status of a proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
}

/// A stored belief with the revision at which it was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Belief {
    pub truth: Truth,
    pub revision: u64,
}

/// Mutable proposition → truth mapping owned by one agent.
#[derive(Debug, Clone, Default)]
pub struct BeliefStore {
    entries: HashMap<Proposition, Belief>,
    revision: u64,
}

impl BeliefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `proposition` as known-true, replacing any prior status.
    pub fn mark_true(&mut self, proposition: Proposition) {
        self.write(proposition, Truth::True);
    }

    /// Record `proposition` as known-false, replacing any prior status.
    pub fn mark_false(&mut self, proposition: Proposition) {
        self.write(proposition, Truth::False);
    }

    /// Record both `P` and `performed(P)` as true.
    ///
    /// Transient propositions are never persisted; returns whether anything
    /// was written.
    pub fn mark_performed<C>(&mut self, proposition: Proposition, classifier: &C) -> bool
    where
        C: TransienceClassifier + ?Sized,
    {
        if classifier.is_transient(&proposition) {
            return false;
        }
        let wrapped = proposition.performed();
        self.write(proposition, Truth::True);
        self.write(wrapped, Truth::True);
        true
    }

    fn write(&mut self, proposition: Proposition, truth: Truth) {
        self.revision += 1;
        self.entries.insert(
            proposition,
            Belief {
                truth,
                revision: self.revision,
            },
        );
    }

    pub fn truth(&self, proposition: &Proposition) -> Option<Truth> {
        self.entries.get(proposition).map(|b| b.truth)
    }

    pub fn belief(&self, proposition: &Proposition) -> Option<Belief> {
        self.entries.get(proposition).copied()
    }

    pub fn is_true(&self, proposition: &Proposition) -> bool {
        self.truth(proposition) == Some(Truth::True)
    }

    pub fn is_false(&self, proposition: &Proposition) -> bool {
        self.truth(proposition) == Some(Truth::False)
    }

    /// Whether `performed(P)` is known-true.
    pub fn was_performed(&self, proposition: &Proposition) -> bool {
        self.is_true(&proposition.performed())
    }

    /// Revision of the most recent write (0 for an untouched store).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Entries written after `revision`, in no particular order.
    pub fn revised_since(&self, revision: u64) -> impl Iterator<Item = (&Proposition, Belief)> {
        self.entries
            .iter()
            .filter(move |(_, b)| b.revision > revision)
            .map(|(p, b)| (p, *b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Proposition, Belief)> {
        self.entries.iter().map(|(p, b)| (p, *b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::TransientPredicates;

    fn prop(s: &str) -> Proposition {
        s.parse().unwrap()
    }

    #[test]
    fn last_write_wins() {
        let mut store = BeliefStore::new();
        let p = prop("valveOpen(\"mv101\")");
        store.mark_false(p.clone());
        store.mark_true(p.clone());
        assert!(store.is_true(&p));
        store.mark_false(p.clone());
        assert!(store.is_false(&p));
        assert!(!store.is_true(&p));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn marks_are_idempotent() {
        let mut store = BeliefStore::new();
        let p = prop("ping");
        store.mark_true(p.clone());
        store.mark_true(p.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(store.truth(&p), Some(Truth::True));
    }

    #[test]
    fn performed_writes_both_forms() {
        let mut store = BeliefStore::new();
        let p = prop("drainTank(\"t1\")");
        assert!(store.mark_performed(p.clone(), &TransientPredicates::default()));
        assert!(store.is_true(&p));
        assert!(store.was_performed(&p));
        assert!(store.is_true(&prop("performed(drainTank(\"t1\"))")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn transient_is_never_persisted() {
        let mut store = BeliefStore::new();
        let transient = TransientPredicates::new(["doWork"]);
        assert!(!store.mark_performed(prop("doWork"), &transient));
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn revised_since_reports_newer_writes_only() {
        let mut store = BeliefStore::new();
        store.mark_true(prop("a"));
        let seen = store.revision();
        store.mark_false(prop("b"));
        store.mark_true(prop("a"));

        let mut changed: Vec<_> = store
            .revised_since(seen)
            .map(|(p, b)| (p.to_string(), b.truth))
            .collect();
        changed.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            changed,
            vec![("a".to_string(), Truth::True), ("b".to_string(), Truth::False)]
        );
        assert_eq!(store.revised_since(store.revision()).count(), 0);
    }
}
