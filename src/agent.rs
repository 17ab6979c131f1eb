//! Agent: a host composed with its decision cycle, plus the driving loop.
//!
//! The loop feeds each cycle's chosen action into the next cycle until nothing
//! is chosen or the iteration cap is reached, then optionally closes the
//! host's transport.

use std::fmt;

use crate::cycle::{CycleReport, CycleRequest, DecisionCycle};
use crate::error::AgentResult;
use crate::term::Action;
use crate::transport::Transport;

/// Owner of handler state, possibly including a transport.
pub trait Host {
    /// The transport closed at the end of the loop, if the host has one.
    fn transport(&mut self) -> Option<&mut dyn Transport> {
        None
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A proposal round chose nothing.
    NoActionChosen,
    /// The iteration cap was reached with an action still pending.
    IterationCap { iterations: usize, max: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActionChosen => f.write_str("no action chosen"),
            Self::IterationCap { iterations, max } => {
                write!(f, "finished {iterations} of max {max} agent cycles")
            }
        }
    }
}

/// What a finished loop reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Action still pending when the loop stopped; `None` if nothing is left to do.
    pub last_action: Option<Action>,
    pub stop: StopReason,
    /// Actions executed, one per continuation cycle.
    pub iterations: usize,
    /// All cycles run, including the opening propose-only one.
    pub cycles: u64,
}

/// A host plus the decision cycle that acts on its behalf.
pub struct Agent<H> {
    host: H,
    cycle: DecisionCycle<H>,
}

impl<H: Host> Agent<H> {
    pub fn new(host: H, cycle: DecisionCycle<H>) -> Self {
        Self { host, cycle }
    }

    /// Run a single cycle.
    pub fn step(&mut self, request: CycleRequest) -> AgentResult<CycleReport> {
        self.cycle.run(&mut self.host, request)
    }

    /// Drive cycles until no action is chosen or `max_iterations` actions have
    /// been executed (`None` = unbounded).
    ///
    /// The first cycle only proposes, so a cap of `n` executes at most `n`
    /// actions.
    ///
    /// With `disconnect_at_end`, the host's transport is closed afterwards,
    /// also when a cycle failed.
    pub fn run_loop(
        &mut self,
        max_iterations: Option<usize>,
        disconnect_at_end: bool,
    ) -> AgentResult<LoopOutcome> {
        let result = self.drive(max_iterations);
        if disconnect_at_end {
            let closed = self.disconnect();
            let outcome = result?;
            closed?;
            return Ok(outcome);
        }
        result
    }

    fn drive(&mut self, max_iterations: Option<usize>) -> AgentResult<LoopOutcome> {
        let start = self.cycle.cycles();
        let mut next = self.step(CycleRequest::propose())?.into_next_action();
        let mut iterations = 0;

        while let Some(action) = next.take() {
            if max_iterations.is_some_and(|max| iterations >= max) {
                next = Some(action);
                break;
            }
            next = self.step(CycleRequest::resume(action))?.into_next_action();
            iterations += 1;
        }

        let stop = match (&next, max_iterations) {
            (Some(_), Some(max)) => StopReason::IterationCap { iterations, max },
            _ => StopReason::NoActionChosen,
        };
        tracing::info!(reason = %stop, "exiting agent loop");
        Ok(LoopOutcome {
            last_action: next,
            stop,
            iterations,
            cycles: self.cycle.cycles() - start,
        })
    }

    /// Close the host's transport, if any.
    pub fn disconnect(&mut self) -> AgentResult<()> {
        if let Some(transport) = self.host.transport() {
            transport.disconnect()?;
        }
        Ok(())
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn cycle(&self) -> &DecisionCycle<H> {
        &self.cycle
    }

    pub fn into_parts(self) -> (H, DecisionCycle<H>) {
        (self.host, self.cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_lines() {
        assert_eq!(StopReason::NoActionChosen.to_string(), "no action chosen");
        assert_eq!(
            StopReason::IterationCap {
                iterations: 100,
                max: 100
            }
            .to_string(),
            "finished 100 of max 100 agent cycles"
        );
    }
}
