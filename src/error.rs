//! Error types returned by the thingvisor runtime.
//!
//! [`SupervisorError`] covers every condition a command can report back to the caller:
//! - **Configuration errors**: double configure, unknown kind, quantity above the cap.
//! - **Lookup errors**: stop by id / by kind with nothing to stop.
//! - **Lifecycle errors**: commands issued before configure or after shutdown began.
//!
//! [`CommandError`] covers malformed console lines.
//!
//! Serialization and sink write failures inside the aggregator are *not* surfaced here;
//! they are logged and counted in [`DrainReport`](crate::DrainReport) instead.

use std::io;

use thiserror::Error;

use crate::things::ThingId;

/// # Errors produced by supervisor commands.
///
/// All variants are recoverable from the point of view of the process:
/// the command fails, the runtime keeps running.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// `configure` was called on an already configured supervisor.
    #[error("event sink already configured")]
    AlreadyConfigured,

    /// A command that needs the event sink ran before `configure`.
    #[error("event sink not configured")]
    NotConfigured,

    /// The supervisor is shutting down (or already terminated) and accepts no new things.
    #[error("supervisor is shutting down")]
    ShuttingDown,

    /// Kind name outside of the closed set of thing kinds.
    #[error("no thing type named {kind:?}")]
    UnknownKind {
        /// The rejected name, as given by the caller.
        kind: String,
    },

    /// Requested more things than the configured cap allows in one command.
    #[error("maximum quantity of things per command is {max}, requested {requested}")]
    QuantityExceeded {
        /// Number of things requested.
        requested: usize,
        /// Configured cap.
        max: usize,
    },

    /// No running thing has this id.
    #[error("no thing with id {id}")]
    NotFound {
        /// The id that was looked up.
        id: ThingId,
    },

    /// No running thing has this kind.
    #[error("no thing(s) of type {kind} running")]
    NoMatches {
        /// Wire name of the kind that was looked up.
        kind: &'static str,
    },

    /// The event sink could not be opened.
    #[error("event sink: {source}")]
    Sink {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use thingvisor::SupervisorError;
    ///
    /// let err = SupervisorError::NotFound { id: 999 };
    /// assert_eq!(err.as_label(), "thing_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::AlreadyConfigured => "already_configured",
            SupervisorError::NotConfigured => "not_configured",
            SupervisorError::ShuttingDown => "shutting_down",
            SupervisorError::UnknownKind { .. } => "unknown_kind",
            SupervisorError::QuantityExceeded { .. } => "quantity_exceeded",
            SupervisorError::NotFound { .. } => "thing_not_found",
            SupervisorError::NoMatches { .. } => "no_matching_things",
            SupervisorError::Sink { .. } => "sink_io",
        }
    }

    /// Indicates whether the error came from a lookup that simply found nothing.
    ///
    /// Lookup misses are reported to the user but never change runtime state.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            SupervisorError::NotFound { .. } | SupervisorError::NoMatches { .. }
        )
    }
}

/// # Errors produced while parsing a console line.
///
/// Parsing never touches runtime state; these are reported back to the operator
/// and the console keeps reading.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    #[error("no command entered, try again")]
    Empty,

    /// First word is not a known command.
    #[error("unrecognized command {0:?}, try again")]
    Unknown(String),

    /// Known command with the wrong number of arguments.
    #[error("wrong number of arguments to {0:?}, try again")]
    Arity(&'static str),

    /// Numeric argument that does not parse.
    #[error("{0:?} is not a valid number, try again")]
    NotANumber(String),

    /// Kind argument outside of the known aliases.
    #[error("invalid thing type {0:?}, valid types: b=battery, i=inverter, l=light")]
    InvalidKind(String),
}

impl CommandError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::Empty => "empty_command",
            CommandError::Unknown(_) => "unknown_command",
            CommandError::Arity(_) => "wrong_arity",
            CommandError::NotANumber(_) => "not_a_number",
            CommandError::InvalidKind(_) => "invalid_kind",
        }
    }
}
