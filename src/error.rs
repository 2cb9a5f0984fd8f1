//! Error types for Barber Assist.

use uuid::Uuid;

/// Top-level error type for the booking core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Messaging delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message to {contact_id}: {reason}")]
    SendFailed { contact_id: String, reason: String },

    #[error("Contact {contact_id} is unreachable")]
    Unreachable { contact_id: String },
}

/// Confirmation workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Worker {worker_id} already has a pending confirmation")]
    AlreadyPending { worker_id: Uuid },
}

/// Result type alias for the booking core.
pub type Result<T> = std::result::Result<T, Error>;
