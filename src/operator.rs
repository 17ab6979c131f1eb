//! Plant operator: a host whose handlers talk to a process simulator.
//!
//! Every handler performs exactly one request-reply exchange and translates
//! the reply into binding sets. Handlers are registered under their
//! word-separated names, so a routine written as `checkForAlerts(alert)`
//! resolves through the converted-name stage of the registry.

use std::time::Duration;

use serde_json::{Value, json};

use crate::agent::Host;
use crate::error::{AgentResult, TransportError};
use crate::registry::{ActionOutcome, ActionRegistry};
use crate::term::{Action, Bindings, Term};
use crate::transport::Transport;

/// Host owning the transport to the simulated plant.
pub struct OperatorHost {
    transport: Box<dyn Transport>,
    exchanges: u64,
}

impl OperatorHost {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            exchanges: 0,
        }
    }

    /// Built-ins plus the four plant actions.
    pub fn registry(sleep_cap: Duration) -> ActionRegistry<Self> {
        ActionRegistry::builder()
            .with_builtins(sleep_cap)
            .method("check_for_alerts", Self::check_for_alerts)
            .method("address_alert", Self::address_alert)
            .method("check_tank_water_level", Self::check_tank_water_level)
            .method("drain_tank", Self::drain_tank)
            .build()
    }

    /// Number of request-reply exchanges performed so far.
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    fn exchange(&mut self, action: &Action) -> AgentResult<Value> {
        let args: Vec<String> = action.args().iter().map(ToString::to_string).collect();
        let request = json!({
            "action": action.predicate(),
            "args": args,
            "replier": "operator",
        });
        let reply = self.transport.request(&request)?;
        self.exchanges += 1;
        tracing::debug!(%action, %reply, "plant replied");
        Ok(reply)
    }

    /// Ask the plant for active alerts. One binding set per alert; no alerts fails.
    pub fn check_for_alerts(&mut self, action: &Action) -> AgentResult<ActionOutcome> {
        tracing::info!("checking for alerts from the plant");
        let reply = self.exchange(action)?;
        let alerts = reply
            .get("alerts")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("reply has no `alerts` array"))?;

        if alerts.is_empty() {
            tracing::info!("no alerts reported");
            return Ok(ActionOutcome::Failed);
        }
        tracing::info!(count = alerts.len(), "alerts reported");
        let var = first_variable(action);
        Ok(ActionOutcome::Succeeded(
            alerts.iter().map(|a| bind(var, json_term(a))).collect(),
        ))
    }

    pub fn address_alert(&mut self, action: &Action) -> AgentResult<ActionOutcome> {
        tracing::info!(%action, "addressing alert");
        self.exchange(action)?;
        Ok(ActionOutcome::success())
    }

    /// Read the tank level; binds the first argument to the reported level.
    pub fn check_tank_water_level(&mut self, action: &Action) -> AgentResult<ActionOutcome> {
        let reply = self.exchange(action)?;
        let level = reply
            .get("tank_level")
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed("reply has no numeric `tank_level`"))?;
        tracing::info!(level, "tank water level reported");
        Ok(ActionOutcome::Succeeded(vec![bind(
            first_variable(action),
            Term::Atom(level.to_string()),
        )]))
    }

    pub fn drain_tank(&mut self, action: &Action) -> AgentResult<ActionOutcome> {
        tracing::info!(%action, "draining water tank");
        self.exchange(action)?;
        Ok(ActionOutcome::success())
    }
}

impl Host for OperatorHost {
    fn transport(&mut self) -> Option<&mut dyn Transport> {
        Some(self.transport.as_mut())
    }
}

fn malformed(message: &str) -> TransportError {
    TransportError::Malformed {
        message: message.to_string(),
    }
}

fn first_variable(action: &Action) -> Option<&str> {
    match action.args().first() {
        Some(Term::Var(name)) => Some(name),
        _ => None,
    }
}

fn bind(var: Option<&str>, value: Term) -> Bindings {
    let mut bindings = Bindings::new();
    if let Some(name) = var {
        bindings.insert(name.to_string(), value);
    }
    bindings
}

fn json_term(value: &Value) -> Term {
    match value {
        Value::String(s) => Term::Atom(s.clone()),
        Value::Number(n) => n
            .as_i64()
            .map(Term::Int)
            .unwrap_or_else(|| Term::Atom(n.to_string())),
        other => Term::Atom(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::{AgentError, TransportResult};

    #[derive(Default)]
    struct Canned {
        replies: VecDeque<Value>,
    }

    impl Transport for Canned {
        fn request(&mut self, _message: &Value) -> TransportResult<Value> {
            self.replies.pop_front().ok_or(TransportError::Closed)
        }

        fn disconnect(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }

    fn host(replies: Vec<Value>) -> OperatorHost {
        OperatorHost::new(Box::new(Canned {
            replies: replies.into(),
        }))
    }

    fn action(s: &str) -> Action {
        s.parse().unwrap()
    }

    #[test]
    fn alerts_bind_the_first_variable() {
        let mut h = host(vec![json!({ "alerts": ["HH", "LL"] })]);
        let outcome = h.check_for_alerts(&action("checkForAlerts(alert)")).unwrap();
        let ActionOutcome::Succeeded(sets) = outcome else {
            panic!("expected success");
        };
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].get("alert"), Some(&Term::atom("HH")));
        assert_eq!(sets[1].get("alert"), Some(&Term::atom("LL")));
        assert_eq!(h.exchanges(), 1);
    }

    #[test]
    fn no_alerts_is_failure() {
        let mut h = host(vec![json!({ "alerts": [] })]);
        assert_eq!(
            h.check_for_alerts(&action("checkForAlerts(alert)")).unwrap(),
            ActionOutcome::Failed
        );
    }

    #[test]
    fn tank_level_is_bound_as_text() {
        let mut h = host(vec![json!({ "tank_level": 0.75 })]);
        let outcome = h
            .check_tank_water_level(&action("checkTankWaterLevel(level)"))
            .unwrap();
        let mut expected = Bindings::new();
        expected.insert("level".into(), Term::atom("0.75"));
        assert_eq!(outcome, ActionOutcome::Succeeded(vec![expected]));
    }

    #[test]
    fn malformed_reply_is_fatal() {
        let mut h = host(vec![json!({ "status": "ok" })]);
        let err = h
            .check_tank_water_level(&action("checkTankWaterLevel(level)"))
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::Transport(TransportError::Malformed { .. })
        ));
    }

    #[test]
    fn registry_resolves_mixed_case_predicates() {
        let mut reg = OperatorHost::registry(Duration::ZERO);
        let mut h = host(vec![json!({ "ack": true })]);
        let outcome = reg
            .dispatch(&mut h, &action("drainTank(\"t101\")"))
            .unwrap();
        assert_eq!(outcome, ActionOutcome::success());
        assert_eq!(h.exchanges(), 1);
    }
}
