//! TOML configuration for a complete agent run.
//!
//! Every section is optional; missing values fall back to the defaults
//! documented on each field.
//!
//! ```toml
//! [transport]
//! address = "127.0.0.1:5556"
//! reply_timeout_ms = 5000
//!
//! [loop]
//! max_iterations = 100
//! disconnect_at_end = true
//!
//! [arbitration]
//! bypass = { threshold = 0.5 }
//!
//! [routine]
//! alternatives = [
//!     ["checkForAlerts(alert)", "addressAlert(alert)", "sleep(1)"],
//!     ["checkTankWaterLevel(tanklevel)"],
//! ]
//! transient = ["sleep"]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activation::ActivationConfig;
use crate::arbitrate::BypassSetting;
use crate::cycle::CycleConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::planner::RoutinePlanner;
use crate::proposer::TransientPredicates;
use crate::transport::ReplyWait;

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub transport: TransportSettings,
    #[serde(rename = "loop")]
    pub run: LoopSettings,
    pub activation: ActivationConfig,
    pub cycle: CycleConfig,
    pub arbitration: ArbitrationSettings,
    pub routine: RoutineSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Simulator address (default: `127.0.0.1:5556`).
    pub address: String,
    /// Bound on each reply wait; absent means block until the reply arrives.
    pub reply_timeout_ms: Option<u64>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5556".into(),
            reply_timeout_ms: None,
        }
    }
}

impl TransportSettings {
    pub fn reply_wait(&self) -> ReplyWait {
        match self.reply_timeout_ms {
            Some(ms) => ReplyWait::Bounded(Duration::from_millis(ms)),
            None => ReplyWait::Forever,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Continuation cycles to run; negative means unbounded (default: 100).
    pub max_iterations: i64,
    /// Close the transport when the loop ends (default: true).
    pub disconnect_at_end: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            disconnect_at_end: true,
        }
    }
}

impl LoopSettings {
    pub fn max_iterations(&self) -> Option<usize> {
        usize::try_from(self.max_iterations).ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationSettings {
    pub bypass: BypassSetting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineSettings {
    /// Alternatives, each an ordered list of step actions.
    pub alternatives: Vec<Vec<String>>,
    /// Predicates whose outcomes are never persisted as beliefs.
    pub transient: Vec<String>,
    /// Rounds before the routine stops proposing; absent means forever.
    pub max_rounds: Option<u32>,
    /// Upper bound on a single `sleep` step, in seconds (default: 5).
    pub sleep_cap_secs: u64,
}

impl Default for RoutineSettings {
    fn default() -> Self {
        Self {
            alternatives: vec![
                vec![
                    "checkForAlerts(alert)".into(),
                    "addressAlert(alert)".into(),
                    "sleep(1)".into(),
                ],
                vec!["checkTankWaterLevel(tanklevel)".into()],
            ],
            transient: vec!["sleep".into()],
            max_rounds: None,
            sleep_cap_secs: 5,
        }
    }
}

impl RoutineSettings {
    pub fn planner(&self) -> ConfigResult<RoutinePlanner> {
        Ok(RoutinePlanner::parse(
            &self.alternatives,
            TransientPredicates::new(self.transient.iter().cloned()),
        )?
        .with_max_rounds(self.max_rounds))
    }

    pub fn sleep_cap(&self) -> Duration {
        Duration::from_secs(self.sleep_cap_secs)
    }
}

impl AgentSettings {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse_named(content, "<inline>")
    }

    fn parse_named(content: &str, path: &str) -> ConfigResult<Self> {
        let settings: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the rest of the crate cannot honour.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.transport.reply_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                key: "transport.reply_timeout_ms",
                message: "must be positive; omit it to wait forever".into(),
            });
        }
        let a = &self.activation;
        if !(a.ceiling > 0.0) {
            return Err(ConfigError::Invalid {
                key: "activation.ceiling",
                message: format!("must be positive, got {}", a.ceiling),
            });
        }
        if a.success_bump < 0.0 || a.failure_bump < 0.0 {
            return Err(ConfigError::Invalid {
                key: "activation",
                message: "bumps must not be negative".into(),
            });
        }
        if let BypassSetting::Threshold(t) = self.arbitration.bypass {
            if !t.is_finite() {
                return Err(ConfigError::Invalid {
                    key: "arbitration.bypass",
                    message: "threshold must be a finite number".into(),
                });
            }
        }
        self.routine.planner().map(|_| ())
    }

    /// Settings for `Agent::run_loop`, which never stamps event times.
    ///
    /// Discrete-event mode needs an external scheduler driving `Agent::step`.
    pub fn validate_for_loop(&self) -> ConfigResult<()> {
        if self.cycle.require_event_time {
            return Err(ConfigError::Invalid {
                key: "cycle.require_event_time",
                message: "the agent loop does not stamp event times; \
                          drive cycles from an event scheduler instead"
                    .into(),
            });
        }
        Ok(())
    }
}
