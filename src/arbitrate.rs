//! Proposal arbitration between the reactive and deliberative subsystems.
//!
//! Reactive proposals are preferred: when any exist and the bypass policy
//! trusts them, the first one is taken and deliberation is skipped. Otherwise
//! deliberation runs once and its proposal, if any, wins; the first reactive
//! proposal is the fallback. No proposal at all means the loop should stop.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::activation::ActivationMemory;
use crate::term::{Action, Proposition};

/// Decides whether reactive proposals are trusted without deliberation.
pub trait BypassPolicy {
    /// Called only when `proposals` is non-empty.
    fn should_bypass(&self, proposals: &[Action], memory: &ActivationMemory) -> bool;
}

/// Always trust reactive proposals when there are any.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysBypass;

impl BypassPolicy for AlwaysBypass {
    fn should_bypass(&self, _proposals: &[Action], _memory: &ActivationMemory) -> bool {
        true
    }
}

/// Always deliberate; reactive proposals only serve as a fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverBypass;

impl BypassPolicy for NeverBypass {
    fn should_bypass(&self, _proposals: &[Action], _memory: &ActivationMemory) -> bool {
        false
    }
}

/// Trust the leading proposal only once its activation reaches a threshold.
#[derive(Debug, Clone, Copy)]
pub struct ActivationThreshold(pub f32);

impl BypassPolicy for ActivationThreshold {
    fn should_bypass(&self, proposals: &[Action], memory: &ActivationMemory) -> bool {
        proposals.first().is_some_and(|first| {
            memory.weight(&Proposition::from(first.clone())) >= self.0
        })
    }
}

/// Serializable choice of bypass policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassSetting {
    #[default]
    Always,
    Never,
    Threshold(f32),
}

impl BypassSetting {
    pub fn into_policy(self) -> Box<dyn BypassPolicy> {
        match self {
            Self::Always => Box::new(AlwaysBypass),
            Self::Never => Box::new(NeverBypass),
            Self::Threshold(t) => Box::new(ActivationThreshold(t)),
        }
    }
}

/// Which subsystem an action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSource {
    Reactive,
    Deliberative,
}

impl fmt::Display for ChoiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reactive => f.write_str("reactive"),
            Self::Deliberative => f.write_str("deliberative"),
        }
    }
}

/// The action selected for the next execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub action: Action,
    pub source: ChoiceSource,
}

/// Applies the bypass policy and the fallback order.
pub struct Arbitrator {
    bypass: Box<dyn BypassPolicy>,
}

impl Arbitrator {
    pub fn new(bypass: Box<dyn BypassPolicy>) -> Self {
        Self { bypass }
    }

    /// Choose among `reactive` proposals and, if needed, one call to `deliberate`.
    ///
    /// `deliberate` is called at most once and not at all when the bypass
    /// policy trusts the reactive proposals.
    pub fn choose<F>(
        &self,
        mut reactive: Vec<Action>,
        memory: &ActivationMemory,
        deliberate: F,
    ) -> Option<Choice>
    where
        F: FnOnce() -> Option<Action>,
    {
        if !reactive.is_empty() && self.bypass.should_bypass(&reactive, memory) {
            return Some(Choice {
                action: reactive.swap_remove(0),
                source: ChoiceSource::Reactive,
            });
        }
        match deliberate() {
            Some(action) => Some(Choice {
                action,
                source: ChoiceSource::Deliberative,
            }),
            None if !reactive.is_empty() => Some(Choice {
                action: reactive.swap_remove(0),
                source: ChoiceSource::Reactive,
            }),
            None => None,
        }
    }
}

impl Default for Arbitrator {
    fn default() -> Self {
        Self::new(Box::new(AlwaysBypass))
    }
}

impl fmt::Debug for Arbitrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arbitrator").finish_non_exhaustive()
    }
}
