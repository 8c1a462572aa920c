//! Outbound side of the channel: the sender trait, the Bot Framework connector, and the
//! per-turn context the bot writes replies through.

mod connector;

pub use connector::{BotConnector, ConnectorError, ServiceUrlPolicy};

use crate::activity::Activity;
use async_trait::async_trait;
use std::sync::Arc;

/// Delivers a fully addressed activity to the channel.
#[async_trait]
pub trait ActivitySender: Send + Sync {
    async fn send_activity(&self, activity: &Activity) -> Result<(), ConnectorError>;
}

/// One inbound activity plus the means to reply to it. Replies go out in call order.
pub struct TurnContext {
    pub activity: Activity,
    sender: Arc<dyn ActivitySender>,
}

impl TurnContext {
    pub fn new(activity: Activity, sender: Arc<dyn ActivitySender>) -> Self {
        Self { activity, sender }
    }

    /// Address `reply` to the inbound conversation and send it.
    pub async fn send_activity(&self, reply: Activity) -> Result<(), ConnectorError> {
        let reply = self.activity.reply_envelope(reply);
        self.sender.send_activity(&reply).await
    }

    /// Send a plain text message.
    pub async fn send_text(&self, text: &str) -> Result<(), ConnectorError> {
        self.send_activity(Activity::message(text)).await
    }
}
