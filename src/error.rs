//! Rich diagnostic error types for the decision engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`AgentError`] is the top-level type that
//! flows out of a decision cycle; anything that reaches it terminates the loop.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the agent and its decision cycle.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    #[error("decision cycle invoked without required context: {field}")]
    #[diagnostic(
        code(twofold::cycle::missing_context),
        help(
            "This agent runs in discrete-event mode and every cycle must carry \
             an event time. Pass it through `CycleRequest::at(...)`."
        )
    )]
    MissingContext { field: &'static str },

    /// Returned by action handlers for failures that must stop the loop.
    ///
    /// A handler that merely could not do its job should return
    /// `ActionOutcome::Failed` instead, which only marks the action false.
    #[error("handler for \"{action}\" failed: {message}")]
    #[diagnostic(
        code(twofold::cycle::handler),
        help("The action handler raised an error. Check the inner cause for details.")
    )]
    Handler { action: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),
}

/// Convenience alias for agent operations.
pub type AgentResult<T> = std::result::Result<T, AgentError>;

// ---------------------------------------------------------------------------
// Term errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TermError {
    #[error("unexpected end of input while parsing \"{input}\"")]
    #[diagnostic(
        code(twofold::term::eof),
        help("Check for a missing closing parenthesis, bracket or quote.")
    )]
    UnexpectedEnd { input: String },

    #[error("unexpected character '{found}' at offset {offset} in \"{input}\"")]
    #[diagnostic(
        code(twofold::term::unexpected),
        help("Actions are written as `predicate(arg, ...)`; arguments are variables, integers, \"quoted atoms\", [lists] or nested actions.")
    )]
    Unexpected {
        input: String,
        found: char,
        offset: usize,
    },

    #[error("expected a predicate name in \"{input}\"")]
    #[diagnostic(
        code(twofold::term::predicate),
        help("A predicate name starts with a letter and may contain letters, digits and underscores.")
    )]
    MissingPredicate { input: String },

    #[error("integer out of range in \"{input}\"")]
    #[diagnostic(code(twofold::term::int_range), help("Integers must fit in a signed 64-bit value."))]
    IntOutOfRange { input: String },
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("could not connect to {address}")]
    #[diagnostic(
        code(twofold::transport::connect),
        help("Make sure the process simulator is listening on this address before starting the agent.")
    )]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport I/O failed")]
    #[diagnostic(code(twofold::transport::io), help("The connection to the peer broke mid-exchange."))]
    Io(#[source] std::io::Error),

    #[error("no reply within {millis} ms")]
    #[diagnostic(
        code(twofold::transport::timeout),
        help(
            "The peer did not answer in time. Raise `transport.reply_timeout_ms`, \
             or remove it to block until a reply arrives."
        )
    )]
    Timeout { millis: u128 },

    #[error("peer closed the connection")]
    #[diagnostic(code(twofold::transport::closed), help("The simulator hung up before replying."))]
    Closed,

    #[error("malformed reply: {message}")]
    #[diagnostic(
        code(twofold::transport::malformed),
        help("The peer must answer each request with one JSON object on a single line.")
    )]
    Malformed { message: String },

    #[error("transport already disconnected")]
    #[diagnostic(
        code(twofold::transport::disconnected),
        help("A handler issued a request after the agent loop closed the connection.")
    )]
    Disconnected,
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(code(twofold::config::read), help("Ensure the file exists and is readable."))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config \"{path}\": {message}")]
    #[diagnostic(
        code(twofold::config::parse),
        help("Check the TOML syntax and the section names: transport, loop, activation, cycle, arbitration, routine.")
    )]
    Parse { path: String, message: String },

    #[error("invalid routine step \"{step}\"")]
    #[diagnostic(code(twofold::config::step), help("Routine steps use the action syntax, e.g. `checkForAlerts(alert)`."))]
    Step {
        step: String,
        #[source]
        source: TermError,
    },

    #[error("invalid setting {key}: {message}")]
    #[diagnostic(code(twofold::config::invalid))]
    Invalid { key: &'static str, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
