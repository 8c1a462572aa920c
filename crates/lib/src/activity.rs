//! Bot Framework activity schema (the subset the relay reads and writes).
//!
//! Inbound activities arrive as the POST body of `/api/messages`; outbound replies are
//! built with the constructors here and posted back through the connector.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity type. Unknown types deserialize to `Other` and are ignored by the bot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    #[default]
    Message,
    ConversationUpdate,
    Typing,
    #[serde(untagged)]
    Other(String),
}

/// A user or bot on the channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Entra object id; Teams sets this for tenant users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// "personal", "groupChat" or "channel" on Teams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// A button shown as a suggested action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAction {
    #[serde(rename = "type")]
    pub typ: String,
    pub title: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedActions {
    #[serde(default)]
    pub actions: Vec<CardAction>,
}

/// Rich content attached to a message (e.g. an adaptive card).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    pub content: Value,
}

/// One activity, inbound or outbound.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub typ: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Structured payload; card submissions land here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_removed: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<SuggestedActions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Activity {
    /// Plain text message.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            typ: ActivityType::Message,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Typing indicator.
    pub fn typing() -> Self {
        Self {
            typ: ActivityType::Typing,
            ..Self::default()
        }
    }

    /// Message carrying a single attachment and no text.
    pub fn with_attachment(attachment: Attachment) -> Self {
        Self {
            typ: ActivityType::Message,
            attachments: vec![attachment],
            ..Self::default()
        }
    }

    /// Message text, or "" when absent.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Tenant id from `channelData.tenant.id`, falling back to `conversation.tenantId`.
    pub fn tenant_id(&self) -> Option<&str> {
        self.channel_data
            .as_ref()
            .and_then(|d| d.get("tenant"))
            .and_then(|t| t.get("id"))
            .and_then(|v| v.as_str())
            .or_else(|| {
                self.conversation
                    .as_ref()
                    .and_then(|c| c.tenant_id.as_deref())
            })
    }

    /// `value.text` when the structured payload carries one (card button submits).
    pub fn value_text(&self) -> Option<&str> {
        self.value
            .as_ref()
            .and_then(|v| v.get("text"))
            .and_then(|v| v.as_str())
    }

    /// `conversation.conversationType`, if present.
    pub fn conversation_type(&self) -> Option<&str> {
        self.conversation
            .as_ref()
            .and_then(|c| c.conversation_type.as_deref())
    }

    /// Sender display name, if the channel sent one.
    pub fn sender_name(&self) -> Option<&str> {
        self.from.as_ref().and_then(|f| f.name.as_deref())
    }

    /// Build a reply addressed back to this activity's conversation, in the style of the
    /// connector's reply helper: from/recipient swapped, conversation and service url copied.
    pub fn reply_envelope(&self, mut reply: Activity) -> Activity {
        reply.service_url = self.service_url.clone();
        reply.channel_id = self.channel_id.clone();
        reply.conversation = self.conversation.clone();
        reply.from = self.recipient.clone();
        reply.recipient = self.from.clone();
        reply.reply_to_id = self.id.clone();
        if reply.timestamp.is_none() {
            reply.timestamp = Some(chrono::Utc::now().to_rfc3339());
        }
        reply
    }
}
