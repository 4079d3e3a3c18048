//! Outbound chat delivery.
//!
//! The bot emits messages through the [`ChatSink`] trait so handlers stay
//! independent of the chat platform. The connector channel is the production
//! sink: it posts reply activities back to the service URL that delivered the
//! inbound turn.

mod connector;

use async_trait::async_trait;
use serde_json::Value;

pub use connector::{ConnectorAuth, ConnectorChannel, ReplyContext};

/// One outbound emission. Within a turn the bot awaits each send before the
/// next, so delivery order matches emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Transient typing indicator.
    Typing,
    Text(String),
    /// A renderable card document (see [`crate::cards`]).
    Card(Value),
}

impl OutboundMessage {
    pub fn text(s: impl Into<String>) -> Self {
        OutboundMessage::Text(s.into())
    }
}

/// Sink for a single conversation's outbound messages.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), String>;
}
