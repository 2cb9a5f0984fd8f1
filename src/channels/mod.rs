//! Messaging abstraction: fire-and-forget text delivery to chat contacts.
//!
//! The actual transport (chat session, authentication, media) lives outside
//! this core; everything here goes through the `Messenger` trait.

use async_trait::async_trait;
use tracing::info;

use crate::error::ChannelError;

/// Outbound text delivery to a contact identity.
///
/// Failure is an ordinary error value, never a crash, and callers treat it as
/// an immediate non-retried delivery failure.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Channel name, for logging.
    fn name(&self) -> &str;

    /// Deliver `text` to `contact_id`.
    async fn send_message(&self, contact_id: &str, text: &str) -> Result<(), ChannelError>;
}

/// Messenger that writes deliveries to the log. Used for local runs where no
/// chat transport is wired in.
#[derive(Debug, Default)]
pub struct ConsoleMessenger;

impl ConsoleMessenger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_message(&self, contact_id: &str, text: &str) -> Result<(), ChannelError> {
        info!(contact_id = %contact_id, "→ {text}");
        Ok(())
    }
}
