//! Error types and handling for Daguerre

/// Result type alias for Daguerre operations
pub type Result<T> = std::result::Result<T, DaguerreError>;

/// Coarse classification of a [`DaguerreError`], stable across messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Protocol,
    Validation,
    ResourceExhaustion,
    StateConflict,
    InvalidParameter,
    Memory,
    Custody,
    SessionClosed,
    Device,
    Config,
    Dispatch,
}

/// Error types for the capture pipeline
#[derive(Debug, thiserror::Error)]
pub enum DaguerreError {
    /// Malformed or short encoded record, field-count mismatch, integrity failure
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Record decoded but its contents are unusable
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Pool at capacity and the direct fallback allocation failed too
    #[error("Resource exhaustion: requested {requested} bytes - {message}")]
    ResourceExhaustion { requested: usize, message: String },

    /// An operation of a single-flight kind is already in progress
    #[error("State conflict: {message}")]
    StateConflict { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// The allocator refused a request
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Transfer-of-custody table violation (double release, use after release)
    #[error("Custody violation at {address:#x}: {message}")]
    Custody { address: usize, message: String },

    /// Call made after the session or pool was torn down
    #[error("Session closed: {message}")]
    SessionClosed { message: String },

    /// Failure reported by the camera device collaborator
    #[error("Device error: {message}")]
    Device { message: String },

    /// Configuration could not be loaded
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Owner-thread affinity violation or dispatcher shut down
    #[error("Dispatch error: {message}")]
    Dispatch { message: String },
}

impl DaguerreError {
    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a resource exhaustion error
    pub fn resource_exhaustion(requested: usize, message: impl Into<String>) -> Self {
        Self::ResourceExhaustion {
            requested,
            message: message.into(),
        }
    }

    /// Create a state conflict error
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::StateConflict {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create a custody violation error
    pub fn custody(address: usize, message: impl Into<String>) -> Self {
        Self::Custody {
            address,
            message: message.into(),
        }
    }

    /// Create a session closed error
    pub fn session_closed(message: impl Into<String>) -> Self {
        Self::SessionClosed {
            message: message.into(),
        }
    }

    /// Create a device error
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    /// Create a config error without an underlying cause
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error wrapping the underlying cause
    pub fn config_from(
        source: impl std::error::Error + Send + Sync + 'static,
        context: &str,
    ) -> Self {
        Self::Config {
            message: format!("{}: {}", context, source),
            source: Some(Box::new(source)),
        }
    }

    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ResourceExhaustion { .. } => ErrorKind::ResourceExhaustion,
            Self::StateConflict { .. } => ErrorKind::StateConflict,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::Memory { .. } => ErrorKind::Memory,
            Self::Custody { .. } => ErrorKind::Custody,
            Self::SessionClosed { .. } => ErrorKind::SessionClosed,
            Self::Device { .. } => ErrorKind::Device,
            Self::Config { .. } => ErrorKind::Config,
            Self::Dispatch { .. } => ErrorKind::Dispatch,
        }
    }

    /// Whether the pipeline recovers from this error locally (log, release, report)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Protocol | ErrorKind::Validation | ErrorKind::StateConflict
        )
    }
}

impl From<serde_json::Error> for DaguerreError {
    fn from(err: serde_json::Error) -> Self {
        Self::config_from(err, "Invalid configuration document")
    }
}

impl From<std::io::Error> for DaguerreError {
    fn from(err: std::io::Error) -> Self {
        Self::config_from(err, "Failed to read configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DaguerreError::protocol("expected 8 fields, got 7");
        assert!(matches!(err, DaguerreError::Protocol { .. }));
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = DaguerreError::state_conflict("already capturing");
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let err = DaguerreError::custody(0x1000, "released twice");
        assert_eq!(err.kind(), ErrorKind::Custody);
    }

    #[test]
    fn test_error_display() {
        let err = DaguerreError::custody(0xdead, "released twice");
        let display = format!("{}", err);
        assert!(display.contains("0xdead"));
        assert!(display.contains("released twice"));

        let err = DaguerreError::validation("width", "must be positive");
        let display = format!("{}", err);
        assert!(display.contains("Validation error"));
        assert!(display.contains("width"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(DaguerreError::protocol("x").is_recoverable());
        assert!(DaguerreError::validation("x", "y").is_recoverable());
        assert!(!DaguerreError::resource_exhaustion(10, "oom").is_recoverable());
        assert!(!DaguerreError::custody(1, "x").is_recoverable());
    }
}
