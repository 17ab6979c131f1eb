//! Routine planner: a small deliberative proposer driven by configuration.
//!
//! A routine is a list of alternatives, each an ordered list of steps. The
//! planner proposes one step at a time and, on the next call, looks at what
//! the belief store learned since the proposal:
//!
//! - a matching proposition became true → the step is done, move on, and
//!   carry its variable bindings into the later steps of the alternative;
//! - a matching proposition became false → abandon this alternative;
//! - nothing matched → the step was retried or pre-empted, propose it again.
//!
//! Transient steps never reach the belief store and always count as done.
//! Bindings are dropped whenever the planner moves to another alternative or
//! starts a new round.
//! Finishing an alternative, or failing every alternative, ends a round; the
//! next round starts again from the first alternative.

use crate::belief::{BeliefStore, Truth};
use crate::error::{ConfigError, ConfigResult};
use crate::proposer::{DeliberativeProposer, TransienceClassifier, TransientPredicates};
use crate::term::{Action, Bindings, Proposition};

#[derive(Debug, Clone)]
struct Pending {
    step: Action,
    since: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepOutcome {
    Done(Bindings),
    Failed,
    Unchanged,
}

/// Proposes the steps of a repeating routine in order.
#[derive(Debug, Clone)]
pub struct RoutinePlanner {
    alternatives: Vec<Vec<Action>>,
    transient: TransientPredicates,
    max_rounds: Option<u32>,
    current: usize,
    cursor: usize,
    rounds: u32,
    failed_rounds: u32,
    bindings: Bindings,
    pending: Option<Pending>,
}

impl RoutinePlanner {
    /// Empty alternatives are dropped.
    pub fn new(alternatives: Vec<Vec<Action>>, transient: TransientPredicates) -> Self {
        Self {
            alternatives: alternatives.into_iter().filter(|a| !a.is_empty()).collect(),
            transient,
            max_rounds: None,
            current: 0,
            cursor: 0,
            rounds: 0,
            failed_rounds: 0,
            bindings: Bindings::new(),
            pending: None,
        }
    }

    /// Parse step strings such as `checkForAlerts(alert)`.
    pub fn parse<S: AsRef<str>>(
        alternatives: &[Vec<S>],
        transient: TransientPredicates,
    ) -> ConfigResult<Self> {
        let parsed = alternatives
            .iter()
            .map(|steps| {
                steps
                    .iter()
                    .map(|s| {
                        s.as_ref().parse::<Action>().map_err(|source| ConfigError::Step {
                            step: s.as_ref().to_string(),
                            source,
                        })
                    })
                    .collect::<ConfigResult<Vec<_>>>()
            })
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self::new(parsed, transient))
    }

    /// Stop proposing after this many rounds (default: never).
    pub fn with_max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn alternatives(&self) -> &[Vec<Action>] {
        &self.alternatives
    }

    /// Rounds finished so far, successful or not.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Rounds in which every alternative failed.
    pub fn failed_rounds(&self) -> u32 {
        self.failed_rounds
    }

    pub fn is_finished(&self) -> bool {
        self.alternatives.is_empty() || self.max_rounds.is_some_and(|max| self.rounds >= max)
    }

    fn observe(&self, pending: &Pending, beliefs: &BeliefStore) -> StepOutcome {
        if self
            .transient
            .is_transient(&Proposition::from(pending.step.clone()))
        {
            return StepOutcome::Done(Bindings::new());
        }
        // Several true matches (e.g. one per alert) resolve to the smallest
        // proposition so the choice does not depend on map order.
        let mut done: Option<(&Proposition, Bindings)> = None;
        let mut failed = false;
        for (proposition, belief) in beliefs.revised_since(pending.since) {
            let Some(bound) = pending.step.matches(proposition) else {
                continue;
            };
            match belief.truth {
                Truth::True => {
                    if done.as_ref().is_none_or(|(best, _)| proposition < *best) {
                        done = Some((proposition, bound));
                    }
                }
                Truth::False => failed = true,
            }
        }
        match done {
            Some((_, bound)) => StepOutcome::Done(bound),
            None if failed => StepOutcome::Failed,
            None => StepOutcome::Unchanged,
        }
    }

    fn advance_step(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.alternatives[self.current].len() {
            self.finish_round(true);
        }
    }

    fn abandon_alternative(&mut self) {
        tracing::debug!(alternative = self.current, "routine alternative failed");
        self.current += 1;
        self.cursor = 0;
        self.bindings.clear();
        if self.current >= self.alternatives.len() {
            self.finish_round(false);
        }
    }

    fn finish_round(&mut self, completed: bool) {
        self.rounds += 1;
        if !completed {
            self.failed_rounds += 1;
            tracing::warn!(round = self.rounds, "every routine alternative failed");
        } else {
            tracing::debug!(round = self.rounds, "routine round completed");
        }
        self.current = 0;
        self.cursor = 0;
        self.bindings.clear();
    }
}

impl TransienceClassifier for RoutinePlanner {
    fn is_transient(&self, proposition: &Proposition) -> bool {
        self.transient.is_transient(proposition)
    }
}

impl DeliberativeProposer for RoutinePlanner {
    fn propose_action(&mut self, beliefs: &BeliefStore) -> Option<Action> {
        if let Some(pending) = self.pending.take() {
            match self.observe(&pending, beliefs) {
                StepOutcome::Unchanged => {
                    let step = pending.step.clone();
                    self.pending = Some(pending);
                    return Some(step);
                }
                StepOutcome::Done(bound) => {
                    self.bindings.extend(bound);
                    self.advance_step();
                }
                StepOutcome::Failed => self.abandon_alternative(),
            }
        }
        if self.is_finished() {
            return None;
        }
        let step = self.alternatives[self.current][self.cursor]
            .substitute(&self.bindings)
            .into_action();
        self.pending = Some(Pending {
            step: step.clone(),
            since: beliefs.revision(),
        });
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Bindings, Term};

    fn planner(alternatives: &[&[&str]], transient: &[&str]) -> RoutinePlanner {
        let alts: Vec<Vec<&str>> = alternatives.iter().map(|a| a.to_vec()).collect();
        RoutinePlanner::parse(&alts, TransientPredicates::new(transient.iter().copied())).unwrap()
    }

    fn perform(beliefs: &mut BeliefStore, step: &str, value: Option<&str>) {
        let action: Action = step.parse().unwrap();
        let mut b = Bindings::new();
        if let Some(v) = value {
            b.insert("x".into(), Term::atom(v));
        }
        beliefs.mark_performed(action.substitute(&b), &TransientPredicates::default());
    }

    #[test]
    fn steps_advance_on_performed() {
        let mut p = planner(&[&["check(x)", "fix(x)"]], &[]).with_max_rounds(Some(1));
        let mut beliefs = BeliefStore::new();

        assert_eq!(p.propose_action(&beliefs).unwrap().to_string(), "check(x)");
        perform(&mut beliefs, "check(x)", Some("HH"));
        assert_eq!(p.propose_action(&beliefs).unwrap().to_string(), r#"fix("HH")"#);
        perform(&mut beliefs, r#"fix("HH")"#, None);
        assert_eq!(p.propose_action(&beliefs), None);
        assert_eq!(p.rounds(), 1);
        assert!(p.is_finished());
    }

    #[test]
    fn bindings_flow_into_later_steps() {
        let mut p = planner(&[&["checkForAlerts(x)", "addressAlert(x)", "log(x, y)"]], &[]);
        let mut beliefs = BeliefStore::new();

        p.propose_action(&beliefs);
        perform(&mut beliefs, "checkForAlerts(x)", Some("LL"));
        perform(&mut beliefs, "checkForAlerts(x)", Some("HH"));
        let step = p.propose_action(&beliefs).unwrap();
        assert_eq!(step.to_string(), r#"addressAlert("HH")"#);
        assert!(step.is_ground());

        beliefs.mark_performed(Proposition::from(step), &TransientPredicates::default());
        // `y` stays unbound until a step binds it.
        assert_eq!(
            p.propose_action(&beliefs).unwrap().to_string(),
            r#"log("HH", y)"#
        );
    }

    #[test]
    fn bindings_reset_with_the_alternative() {
        let mut p = planner(&[&["check(x)", "fix(x)"], &["inspect(x)"]], &[]);
        let mut beliefs = BeliefStore::new();

        p.propose_action(&beliefs);
        perform(&mut beliefs, "check(x)", Some("HH"));
        let fix = p.propose_action(&beliefs).unwrap();
        beliefs.mark_false(Proposition::from(fix));
        assert_eq!(p.propose_action(&beliefs).unwrap().to_string(), "inspect(x)");
    }

    #[test]
    fn unchanged_beliefs_repeat_the_step() {
        let mut p = planner(&[&["check(x)"]], &[]);
        let beliefs = BeliefStore::new();
        let first = p.propose_action(&beliefs);
        assert_eq!(p.propose_action(&beliefs), first);
        assert_eq!(p.rounds(), 0);
    }

    #[test]
    fn failure_switches_alternative() {
        let mut p = planner(&[&["checkForAlerts(x)"], &["checkTankWaterLevel(x)"]], &[]);
        let mut beliefs = BeliefStore::new();

        let step = p.propose_action(&beliefs).unwrap();
        beliefs.mark_false(Proposition::from(step));
        assert_eq!(
            p.propose_action(&beliefs).unwrap().to_string(),
            "checkTankWaterLevel(x)"
        );
        perform(&mut beliefs, "checkTankWaterLevel(x)", Some("0.5"));
        // Round complete; the next round starts from the first alternative.
        assert_eq!(
            p.propose_action(&beliefs).unwrap().to_string(),
            "checkForAlerts(x)"
        );
        assert_eq!(p.rounds(), 1);
        assert_eq!(p.failed_rounds(), 0);
    }

    #[test]
    fn every_alternative_failing_ends_the_round() {
        let mut p = planner(&[&["a"], &["b"]], &[]).with_max_rounds(Some(1));
        let mut beliefs = BeliefStore::new();
        for _ in 0..2 {
            let step = p.propose_action(&beliefs).unwrap();
            beliefs.mark_false(Proposition::from(step));
        }
        assert_eq!(p.propose_action(&beliefs), None);
        assert_eq!(p.failed_rounds(), 1);
    }

    #[test]
    fn transient_steps_always_advance() {
        let mut p = planner(&[&["sleep(1)", "check"]], &["sleep"]);
        let beliefs = BeliefStore::new();
        assert_eq!(p.propose_action(&beliefs).unwrap().to_string(), "sleep(1)");
        assert_eq!(p.propose_action(&beliefs).unwrap().to_string(), "check");
        assert!(p.is_transient(&"sleep(3)".parse().unwrap()));
    }

    #[test]
    fn stale_beliefs_do_not_count() {
        let mut p = planner(&[&["check(x)"]], &[]);
        let mut beliefs = BeliefStore::new();
        perform(&mut beliefs, "check(x)", Some("old"));
        p.propose_action(&beliefs);
        assert_eq!(p.propose_action(&beliefs).unwrap().to_string(), "check(x)");
        assert_eq!(p.rounds(), 0);
    }

    #[test]
    fn invalid_step_is_reported() {
        let err = RoutinePlanner::parse(&[vec!["check("]], TransientPredicates::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Step { step, .. } if step == "check("));
    }

    #[test]
    fn empty_routine_proposes_nothing() {
        let mut p = RoutinePlanner::new(vec![vec![]], TransientPredicates::default());
        assert!(p.is_finished());
        assert_eq!(p.propose_action(&BeliefStore::new()), None);
    }
}
