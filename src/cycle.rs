//! Decision cycle: propose → arbitrate → execute → revise → advance → propose.
//!
//! One call to [`DecisionCycle::run`] performs exactly one full cycle. The
//! action it returns is the one to execute on the *next* call, so a driving
//! loop alternates between feeding the previous answer back in and acting on
//! it. A call without a pending action is a cold start: it proposes, executes
//! that proposal immediately, and then proposes again. A propose-only call
//! executes nothing; the agent loop opens with one so that every executed
//! action counts against its iteration cap.

use serde::{Deserialize, Serialize};

use crate::activation::{ActivationConfig, ActivationMemory};
use crate::arbitrate::{Arbitrator, Choice};
use crate::belief::BeliefStore;
use crate::error::{AgentError, AgentResult};
use crate::proposer::{DeliberativeProposer, ReactiveProposer, TransienceClassifier};
use crate::registry::{ActionOutcome, ActionRegistry, OutcomeKind};
use crate::term::{Action, Proposition};

// ---------------------------------------------------------------------------
// Cycle types
// ---------------------------------------------------------------------------

/// Where the cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Waiting for (or holding) the next proposal.
    AwaitingProposal,
    Executing,
    Revising,
    /// The last proposal round chose nothing.
    Terminated,
}

/// Cycle settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Discrete-event mode: every request must carry an event time (default: false).
    pub require_event_time: bool,
}

/// Input to one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleRequest {
    /// Action chosen by the previous cycle; `None` means cold start.
    pub pending: Option<Action>,
    /// Simulation time of this cycle, when driven by an event scheduler.
    pub event_time: Option<u64>,
    /// Only refresh and arbitrate; `pending` is ignored and nothing executes.
    pub propose_only: bool,
}

impl CycleRequest {
    pub fn cold_start() -> Self {
        Self::default()
    }

    pub fn resume(action: Action) -> Self {
        Self {
            pending: Some(action),
            ..Self::default()
        }
    }

    /// Choose the first action without executing anything.
    pub fn propose() -> Self {
        Self {
            propose_only: true,
            ..Self::default()
        }
    }

    /// Stamp the request with an event time.
    pub fn at(mut self, event_time: u64) -> Self {
        self.event_time = Some(event_time);
        self
    }
}

impl From<Option<Action>> for CycleRequest {
    fn from(pending: Option<Action>) -> Self {
        Self {
            pending,
            ..Self::default()
        }
    }
}

/// An action executed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Performed {
    pub action: Action,
    pub outcome: OutcomeKind,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// What was executed, if anything.
    pub performed: Option<Performed>,
    /// Action to execute next; `None` means stop.
    pub next: Option<Choice>,
}

impl CycleReport {
    pub fn next_action(&self) -> Option<&Action> {
        self.next.as_ref().map(|c| &c.action)
    }

    pub fn into_next_action(self) -> Option<Action> {
        self.next.map(|c| c.action)
    }
}

// ---------------------------------------------------------------------------
// Decision cycle
// ---------------------------------------------------------------------------

/// Orchestrates proposal, dispatch and belief revision for one agent.
///
/// Owns the belief store and activation memory for the lifetime of the agent.
/// `H` is the host that owns handler state; the cycle never looks inside it.
pub struct DecisionCycle<H> {
    registry: ActionRegistry<H>,
    reactive: Box<dyn ReactiveProposer>,
    deliberative: Box<dyn DeliberativeProposer>,
    arbitrator: Arbitrator,
    beliefs: BeliefStore,
    activation: ActivationMemory,
    bumps: ActivationConfig,
    config: CycleConfig,
    phase: CyclePhase,
    cycles: u64,
    events: u64,
}

impl<H> DecisionCycle<H> {
    pub fn new(
        registry: ActionRegistry<H>,
        reactive: Box<dyn ReactiveProposer>,
        deliberative: Box<dyn DeliberativeProposer>,
    ) -> Self {
        let bumps = ActivationConfig::default();
        Self {
            registry,
            reactive,
            deliberative,
            arbitrator: Arbitrator::default(),
            beliefs: BeliefStore::new(),
            activation: ActivationMemory::new(bumps.ceiling),
            bumps,
            config: CycleConfig::default(),
            phase: CyclePhase::AwaitingProposal,
            cycles: 0,
            events: 0,
        }
    }

    pub fn with_arbitrator(mut self, arbitrator: Arbitrator) -> Self {
        self.arbitrator = arbitrator;
        self
    }

    /// Replace bump sizes and ceiling. Resets activation memory.
    pub fn with_activation(mut self, config: ActivationConfig) -> Self {
        self.activation = ActivationMemory::new(config.ceiling);
        self.bumps = config;
        self
    }

    pub fn with_config(mut self, config: CycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one full cycle.
    pub fn run(&mut self, host: &mut H, request: CycleRequest) -> AgentResult<CycleReport> {
        if self.config.require_event_time && request.event_time.is_none() {
            return Err(AgentError::MissingContext {
                field: "event_time",
            });
        }

        self.cycles += 1;
        let cycle = self.cycles;

        if request.propose_only {
            let next = self.propose();
            if next.is_none() {
                tracing::info!(cycle, "no action chosen");
            }
            return Ok(CycleReport {
                cycle,
                performed: None,
                next,
            });
        }

        let action = match request.pending {
            Some(action) => action,
            None => match self.propose() {
                Some(choice) => choice.action,
                None => {
                    tracing::info!(cycle, "no action chosen");
                    return Ok(CycleReport {
                        cycle,
                        performed: None,
                        next: None,
                    });
                }
            },
        };

        // ── Execute ─────────────────────────────────────────────────────
        self.phase = CyclePhase::Executing;
        tracing::debug!(cycle, %action, "executing");
        let outcome = self.registry.dispatch(host, &action)?;
        if let Some(event_time) = request.event_time {
            self.events += 1;
            tracing::info!(action_type = %action, event_time, "event");
        }

        // ── Revise ──────────────────────────────────────────────────────
        self.revise(&action, &outcome);

        // ── Advance, then propose the next action ───────────────────────
        self.reactive.advance();
        let next = self.propose();

        Ok(CycleReport {
            cycle,
            performed: Some(Performed {
                action,
                outcome: outcome.kind(),
            }),
            next,
        })
    }

    fn propose(&mut self) -> Option<Choice> {
        self.phase = CyclePhase::AwaitingProposal;
        self.reactive.refresh(&self.activation);
        let proposals = self.reactive.propose_actions();

        let deliberative = &mut self.deliberative;
        let beliefs = &self.beliefs;
        let choice = self
            .arbitrator
            .choose(proposals, &self.activation, || deliberative.propose_action(beliefs));

        match &choice {
            Some(c) => tracing::info!(action = %c.action, source = %c.source, "next action chosen"),
            None => self.phase = CyclePhase::Terminated,
        }
        choice
    }

    /// Apply the outcome of `action` to beliefs and activation.
    ///
    /// Transient propositions skip the belief store but still bump activation.
    fn revise(&mut self, action: &Action, outcome: &ActionOutcome) {
        self.phase = CyclePhase::Revising;
        let classifier = self.deliberative.as_ref();

        match outcome {
            ActionOutcome::Retry => {
                tracing::debug!(%action, "retry requested, beliefs left untouched");
            }
            ActionOutcome::Succeeded(sets) if !sets.is_empty() => {
                for bindings in sets {
                    let concrete = action.substitute(bindings);
                    self.beliefs.mark_performed(concrete.clone(), classifier);
                    self.activation.bump(concrete, self.bumps.success_bump);
                }
            }
            ActionOutcome::Succeeded(_) | ActionOutcome::Failed => {
                let proposition = Proposition::from(action.clone());
                if !classifier.is_transient(&proposition) {
                    tracing::debug!(%action, "action failed, marking known-false");
                    self.beliefs.mark_false(proposition.clone());
                    self.activation.bump(proposition, self.bumps.failure_bump);
                }
            }
        }
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    pub fn activation(&self) -> &ActivationMemory {
        &self.activation
    }

    pub fn registry(&self) -> &ActionRegistry<H> {
        &self.registry
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Number of cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Number of actions executed with an event time.
    pub fn events(&self) -> u64 {
        self.events
    }
}

impl<H> std::fmt::Debug for DecisionCycle<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCycle")
            .field("registry", &self.registry)
            .field("phase", &self.phase)
            .field("cycles", &self.cycles)
            .field("beliefs", &self.beliefs.len())
            .field("activation", &self.activation.len())
            .finish_non_exhaustive()
    }
}
