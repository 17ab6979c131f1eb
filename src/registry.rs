//! Action registry: action symbols mapped to executable handlers.
//!
//! The registry is assembled once through [`RegistryBuilder`] and frozen.
//! Resolution tries, in order:
//!
//! 1. a primitive registered under the exact predicate,
//! 2. a host method whose name equals the predicate,
//! 3. a host method whose name equals the predicate in word-separated form
//!    (`checkForAlerts` → `check_for_alerts`).
//!
//! A miss at every stage is not an error: dispatch yields [`ActionOutcome::Failed`]
//! so that speculative or malformed actions never halt the loop.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::AgentResult;
use crate::term::{Action, Bindings, Term, to_snake_case};

/// What a handler reports back to the decision cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// One binding set per alternative outcome.
    Succeeded(Vec<Bindings>),
    Failed,
    /// Side effects happened; attempt the same action again without revising beliefs.
    Retry,
}

impl ActionOutcome {
    /// A single outcome with no variable bindings.
    pub fn success() -> Self {
        Self::Succeeded(vec![Bindings::new()])
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Succeeded(sets) if sets.is_empty() => OutcomeKind::Failed,
            Self::Succeeded(sets) => OutcomeKind::Succeeded {
                alternatives: sets.len(),
            },
            Self::Failed => OutcomeKind::Failed,
            Self::Retry => OutcomeKind::Retry,
        }
    }
}

/// Summary of an [`ActionOutcome`] without the bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded { alternatives: usize },
    Failed,
    Retry,
}

/// A handler invoked with the host that owns its state.
pub type Handler<H> = Box<dyn FnMut(&mut H, &Action) -> AgentResult<ActionOutcome>>;

/// Which resolution stage matched an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    Primitive,
    Method,
    ConvertedMethod,
}

/// Frozen symbol → handler table.
pub struct ActionRegistry<H> {
    primitives: HashMap<String, Handler<H>>,
    methods: HashMap<String, Handler<H>>,
}

impl<H> ActionRegistry<H> {
    pub fn builder() -> RegistryBuilder<H> {
        RegistryBuilder::new()
    }

    /// Which stage would handle `action`, if any.
    pub fn resolve(&self, action: &Action) -> Option<ResolutionStage> {
        let predicate = action.predicate();
        if self.primitives.contains_key(predicate) {
            return Some(ResolutionStage::Primitive);
        }
        if self.methods.contains_key(predicate) {
            return Some(ResolutionStage::Method);
        }
        let converted = to_snake_case(predicate);
        (converted != predicate && self.methods.contains_key(&converted))
            .then_some(ResolutionStage::ConvertedMethod)
    }

    fn handler_mut(&mut self, action: &Action) -> Option<(ResolutionStage, &mut Handler<H>)> {
        let predicate = action.predicate();
        if let Some(handler) = self.primitives.get_mut(predicate) {
            return Some((ResolutionStage::Primitive, handler));
        }
        if self.methods.contains_key(predicate) {
            return self
                .methods
                .get_mut(predicate)
                .map(|h| (ResolutionStage::Method, h));
        }
        let converted = to_snake_case(predicate);
        if converted == predicate {
            return None;
        }
        self.methods
            .get_mut(&converted)
            .map(|h| (ResolutionStage::ConvertedMethod, h))
    }

    /// Resolve and invoke the handler for `action`.
    ///
    /// Unresolvable actions are a no-op that reports failure.
    pub fn dispatch(&mut self, host: &mut H, action: &Action) -> AgentResult<ActionOutcome> {
        match self.handler_mut(action) {
            Some((stage, handler)) => {
                tracing::debug!(%action, ?stage, "dispatching action");
                handler(host, action)
            }
            None => {
                tracing::debug!(%action, "no handler for action, treating as failed");
                Ok(ActionOutcome::Failed)
            }
        }
    }

    /// Registered primitive symbols, sorted.
    pub fn primitive_symbols(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.primitives.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered host method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.primitives.len() + self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty() && self.methods.is_empty()
    }
}

impl<H> std::fmt::Debug for ActionRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("primitives", &self.primitive_symbols())
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Assembles an [`ActionRegistry`]. Later registrations under the same name replace earlier ones.
pub struct RegistryBuilder<H> {
    primitives: HashMap<String, Handler<H>>,
    methods: HashMap<String, Handler<H>>,
}

impl<H> RegistryBuilder<H> {
    pub fn new() -> Self {
        Self {
            primitives: HashMap::new(),
            methods: HashMap::new(),
        }
    }

    /// Register a primitive reachable by exact symbol match.
    pub fn primitive<F>(mut self, symbol: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&mut H, &Action) -> AgentResult<ActionOutcome> + 'static,
    {
        self.primitives.insert(symbol.into(), Box::new(handler));
        self
    }

    /// Register a host method under its word-separated name.
    ///
    /// Lookup tries the predicate as written, then its word-separated form,
    /// so `checkForAlerts` and `readHTTPStatus` reach `check_for_alerts` and
    /// `read_http_status` without a separate alias table.
    pub fn method<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: FnMut(&mut H, &Action) -> AgentResult<ActionOutcome> + 'static,
    {
        self.methods.insert(name.into(), Box::new(handler));
        self
    }

    pub fn build(self) -> ActionRegistry<H> {
        ActionRegistry {
            primitives: self.primitives,
            methods: self.methods,
        }
    }
}

impl<H: 'static> RegistryBuilder<H> {
    /// Register the generic primitives `succeed` and `sleep(seconds)`.
    ///
    /// `sleep` blocks for at most `sleep_cap`.
    pub fn with_builtins(self, sleep_cap: Duration) -> Self {
        self.primitive("succeed", |_: &mut H, action: &Action| {
            tracing::info!(%action, "primitive action trivially succeeds");
            Ok(ActionOutcome::success())
        })
        .primitive("sleep", move |_: &mut H, action: &Action| {
            let requested = match action.args().first() {
                Some(Term::Int(secs)) if *secs > 0 => Duration::from_secs(*secs as u64),
                _ => Duration::ZERO,
            };
            let wait = requested.min(sleep_cap);
            tracing::debug!(?wait, "sleeping");
            std::thread::sleep(wait);
            Ok(ActionOutcome::success())
        })
    }
}

impl<H> Default for RegistryBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}
