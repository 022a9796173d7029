//! Error types for the checkout navigation layer
//!
//! One enum per concern, built with thiserror. Collaborator errors
//! (`ViewLoadError`, `HostError`, ...) are what external implementations
//! return; `NavigationError` is the orchestrator's own taxonomy.

use thiserror::Error;

/// Failure taxonomy for a navigation attempt.
///
/// Only `Validation` is surfaced immediately as `FailedCritical`; the other
/// variants are caught per strategy and converted into the next strategy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Navigation request rejected: {}", reasons.join("; "))]
    Validation { reasons: Vec<String> },

    #[error("Screen host unavailable: {reason}")]
    HostUnavailable { reason: String },

    #[error("Transition failed: {0}")]
    Transition(#[from] TransitionError),

    #[error("Could not preserve navigation data: {reason}")]
    Persistence { reason: String },
}

impl NavigationError {
    pub fn host_unavailable(reason: impl Into<String>) -> Self {
        NavigationError::HostUnavailable {
            reason: reason.into(),
        }
    }

    /// Stable short name used in logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            NavigationError::Validation { .. } => "validation_failure",
            NavigationError::HostUnavailable { .. } => "host_unavailable",
            NavigationError::Transition(_) => "transition_failure",
            NavigationError::Persistence { .. } => "persistence_failure",
        }
    }
}

/// Failure while swapping screen content
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error(transparent)]
    ViewLoad(#[from] ViewLoadError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

/// Errors from the view-loading collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewLoadError {
    #[error("View '{screen}' not found")]
    ViewNotFound { screen: String },

    #[error("Failed to load view '{screen}': {message}")]
    LoadError { screen: String, message: String },
}

/// Errors reported by the screen host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Host has no content region")]
    MissingContentRegion,

    #[error("Host rejected the transition: {message}")]
    Rejected { message: String },
}

/// Errors from the emergency (host-independent) router
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No emergency route for screen '{screen}'")]
    NoRoute { screen: String },

    #[error("Emergency routing failed: {message}")]
    Failed { message: String },
}

/// Payload injection into a freshly created screen controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectionError {
    #[error("Controller for '{screen}' does not accept an order payload")]
    Unsupported { screen: String },

    #[error("Controller rejected the payload: {message}")]
    Rejected { message: String },
}

/// Errors from the order-data collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderDataError {
    #[error("Order '{order_id}' not found")]
    NotFound { order_id: String },

    #[error("Order service unavailable: {message}")]
    Unavailable { message: String },
}

/// Host registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Screen host already registered")]
    AlreadyInitialized,

    #[error("Screen host failed validation: {reason}")]
    InvalidHost { reason: String },
}

/// Session store write errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session id must not be empty")]
    EmptySessionId,

    #[error("Session store has zero capacity")]
    NoCapacity,
}

impl From<SessionError> for NavigationError {
    fn from(err: SessionError) -> Self {
        NavigationError::Persistence {
            reason: err.to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors assembling a [`CheckoutContext`](crate::context::CheckoutContext)
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Missing collaborator: {name}")]
    MissingCollaborator { name: &'static str },

    #[error("Failed to start background task: {0}")]
    Spawn(#[from] std::io::Error),
}
