// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # twofold
//!
//! A dual-process decision engine: an agent repeatedly picks an action from a
//! fast reactive subsystem or, failing that, a slow deliberative one, executes
//! it through a table of handlers, and revises its beliefs from the outcome.
//!
//! ## Architecture
//!
//! - **Terms** (`term`): actions, propositions and binding sets
//! - **Action registry** (`registry`): frozen symbol → handler table with a
//!   three-stage resolution fallback
//! - **Belief store** (`belief`) and **activation memory** (`activation`)
//! - **Arbitration** (`arbitrate`): reactive proposals first, deliberation as fallback
//! - **Decision cycle** (`cycle`): one propose → execute → revise → propose pass
//! - **Agent loop** (`agent`): drives cycles and owns the transport lifecycle
//! - **Routine planner** (`planner`), **transport** (`transport`) and the
//!   plant **operator** host (`operator`)
//!
//! ## Library usage
//!
//! ```
//! use twofold::agent::{Agent, Host, StopReason};
//! use twofold::cycle::DecisionCycle;
//! use twofold::planner::RoutinePlanner;
//! use twofold::proposer::{Quiescent, TransientPredicates};
//! use twofold::registry::{ActionOutcome, ActionRegistry};
//! use twofold::term::Action;
//!
//! struct Bench;
//! impl Host for Bench {}
//!
//! let registry = ActionRegistry::builder()
//!     .method("ping_plant", |_: &mut Bench, _: &Action| Ok(ActionOutcome::success()))
//!     .build();
//! let planner = RoutinePlanner::parse(&[vec!["pingPlant"]], TransientPredicates::default())
//!     .unwrap()
//!     .with_max_rounds(Some(2));
//! let cycle = DecisionCycle::new(registry, Box::new(Quiescent), Box::new(planner));
//!
//! let mut agent = Agent::new(Bench, cycle);
//! let outcome = agent.run_loop(Some(10), true).unwrap();
//! assert_eq!(outcome.stop, StopReason::NoActionChosen);
//! ```

pub mod activation;
pub mod agent;
pub mod arbitrate;
pub mod belief;
pub mod config;
pub mod cycle;
pub mod error;
pub mod operator;
pub mod planner;
pub mod proposer;
pub mod registry;
pub mod term;
pub mod transport;
