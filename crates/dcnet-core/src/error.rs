//! Error types for DC-net operations

use crate::types::ParticipantId;
use thiserror::Error;

/// Result type alias for DC-net operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running a DC-net
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The network has not been started yet
    #[error("Network has not been started yet")]
    NotStarted,

    /// The network is already running
    #[error("Network is already running")]
    AlreadyRunning,

    /// The network has already been terminated
    #[error("Network has already been terminated")]
    AlreadyTerminated,

    /// A sharing partner was assigned twice
    #[error("Sharing partner {0} already assigned")]
    DuplicateSharingPartner(ParticipantId),

    /// No keystream has been agreed with the given participant
    #[error("No keystream agreed with participant {0}")]
    MissingKeystream(ParticipantId),

    /// Not enough shares supplied to reconstruct a message
    #[error("Share count too low: required {required}, got {actual}")]
    InvalidShareCount { required: usize, actual: usize },

    /// A share does not fit the scheme it is combined under
    #[error("Malformed share: {0}")]
    MalformedShare(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
