//! Turn handling: route one inbound activity to the flow and render the reply.
//!
//! Every message ends in exactly one of: the flow's answer (text plus shortcut, or a
//! dropdown card), or one apology line from [`TurnErrorKind::user_message`].
//!
//! [`TurnErrorKind::user_message`]: crate::error::TurnErrorKind::user_message

use crate::activity::{Activity, ActivityType};
use crate::cards::{self, LEGACY_SELECTION_KEY, SELECTION_ACTION, SELECTION_KEY, SHORTCUT_PHRASE};
use crate::channels::{ConnectorError, TurnContext};
use crate::config::Config;
use crate::directory::{self, DirectoryLookup};
use crate::error::TurnError;
use crate::extract::extract_text;
use crate::flow::{FlowBackend, FlowRequest};
use crate::state::ConversationStateStore;
use crate::trigger::{self, Trigger};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Sent to members joining the conversation when the welcome is enabled.
pub const WELCOME_TEXT: &str = "Hello to eAccess, now all you can do is type in an AD account, and I will pull the user's accesses for you to review.";

/// Sent when a turn fails outside the per-branch error handling.
pub const TURN_ERROR_TEXT: &str = "The bot encountered an error. Administrators have been notified.";

/// Flow query for the "Show my assets" shortcut.
pub fn asset_query(upn: &str) -> String {
    format!("show this user's assets. User email: {}", upn)
}

/// Flow query for a dropdown submission.
pub fn selection_query(items: &[String]) -> String {
    format!("Selected items: {}", items.join(", "))
}

/// Items submitted from a dropdown card, under the current or the legacy key.
/// A list is taken as-is; a string is split on commas with blank items dropped.
/// A submit with nothing selected (no key, `action: submitSelection`) is an empty selection.
pub fn selected_items(value: &Value) -> Option<Vec<String>> {
    let raw = value
        .get(SELECTION_KEY)
        .or_else(|| value.get(LEGACY_SELECTION_KEY))
        .filter(|v| !v.is_null());
    let Some(raw) = raw else {
        return (value.get("action").and_then(Value::as_str) == Some(SELECTION_ACTION))
            .then(Vec::new);
    };
    let items = match raw {
        Value::String(s) => trigger::split_items(s),
        Value::Array(values) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    };
    Some(items)
}

/// The relay bot. Cheap to share; one instance serves every request.
pub struct RelayBot {
    config: Arc<Config>,
    flow: Arc<dyn FlowBackend>,
    directory: Arc<dyn DirectoryLookup>,
    state: Arc<ConversationStateStore>,
}

impl RelayBot {
    pub fn new(
        config: Arc<Config>,
        flow: Arc<dyn FlowBackend>,
        directory: Arc<dyn DirectoryLookup>,
        state: Arc<ConversationStateStore>,
    ) -> Self {
        Self {
            config,
            flow,
            directory,
            state,
        }
    }

    pub fn state(&self) -> &Arc<ConversationStateStore> {
        &self.state
    }

    /// Run one turn, falling back to [`on_turn_error`](Self::on_turn_error) when it fails.
    pub async fn handle(&self, ctx: &TurnContext) {
        if let Err(e) = self.on_turn(ctx).await {
            self.on_turn_error(ctx, &e).await;
        }
    }

    /// Dispatch on activity type, then save conversation state.
    pub async fn on_turn(&self, ctx: &TurnContext) -> Result<(), ConnectorError> {
        match ctx.activity.typ {
            ActivityType::Message => self.on_message(ctx).await?,
            ActivityType::ConversationUpdate => self.on_conversation_update(ctx).await?,
            ref other => log::debug!("bot: ignoring {:?} activity", other),
        }
        self.save_state(ctx).await;
        Ok(())
    }

    /// Last-resort handler: log, save state, and tell the user when they sent a message.
    pub async fn on_turn_error(&self, ctx: &TurnContext, err: &ConnectorError) {
        log::error!("bot: unhandled turn error: {}", err);
        self.save_state(ctx).await;
        if ctx.activity.typ == ActivityType::Message {
            if let Err(e) = ctx.send_text(TURN_ERROR_TEXT).await {
                log::error!("bot: could not send turn error notice: {}", e);
            }
        }
    }

    async fn save_state(&self, ctx: &TurnContext) {
        if !self.config.bot.conversation_state {
            return;
        }
        let Some(conversation) = ctx.activity.conversation.as_ref() else {
            return;
        };
        let channel_id = ctx.activity.channel_id.as_deref().unwrap_or("unknown");
        let key = ConversationStateStore::key(channel_id, &conversation.id);
        self.state.save_changes(&key).await;
    }

    async fn on_message(&self, ctx: &TurnContext) -> Result<(), ConnectorError> {
        match self.answer(ctx).await {
            Ok(()) => Ok(()),
            Err(TurnError::Send(e)) => Err(e),
            Err(e) => {
                log::warn!("bot: {:?} error: {}", e.kind(), e);
                ctx.send_text(&e.user_message()).await
            }
        }
    }

    async fn answer(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        let activity = &ctx.activity;
        if activity.text() == SHORTCUT_PHRASE || activity.value_text() == Some(SHORTCUT_PHRASE) {
            return self.show_assets(ctx).await;
        }
        if let Some(items) = activity.value.as_ref().and_then(selected_items) {
            log::info!("bot: selection of {} item(s)", items.len());
            return self.forward(ctx, &selection_query(&items)).await;
        }
        self.forward(ctx, activity.text()).await
    }

    async fn show_assets(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        ctx.send_activity(Activity::typing()).await?;
        let account = directory::resolve_sender(
            self.directory.as_ref(),
            &ctx.activity,
            self.config.identity.prefer_object_id,
        )
        .await;
        let upn = account
            .as_ref()
            .and_then(|a| a.upn())
            .ok_or(TurnError::Identity)?;
        self.forward(ctx, &asset_query(upn)).await
    }

    /// Send `message` to the flow and render what comes back.
    async fn forward(&self, ctx: &TurnContext, message: &str) -> Result<(), TurnError> {
        let request = FlowRequest::from_config(message, &self.config.flow);
        if request.endpoint.is_empty() {
            return Err(TurnError::Unexpected("no flow id or endpoint configured".to_string()));
        }
        let response = self.flow.run(&request).await?;
        let text = extract_text(&response);
        self.reply(ctx, &text).await?;
        Ok(())
    }

    async fn reply(&self, ctx: &TurnContext, text: &str) -> Result<(), ConnectorError> {
        let bot = &self.config.bot;
        match trigger::detect(text, &bot.assets, &bot.asset_prompt) {
            Trigger::AssetDropdown { prompt, items } => {
                ctx.send_text(&prompt).await?;
                if bot.follow_up_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(bot.follow_up_delay_ms)).await;
                }
                let card = cards::multi_select_card(&prompt, &items, SELECTION_KEY);
                ctx.send_activity(Activity::with_attachment(card)).await
            }
            Trigger::LegacyDropdown { prompt, items } => {
                let card = cards::multi_select_card(&prompt, &items, LEGACY_SELECTION_KEY);
                ctx.send_activity(Activity::with_attachment(card)).await
            }
            Trigger::Plain(text) => {
                ctx.send_text(&text).await?;
                ctx.send_activity(cards::shortcut_prompt(ctx.activity.conversation_type()))
                    .await
            }
        }
    }

    async fn on_conversation_update(&self, ctx: &TurnContext) -> Result<(), ConnectorError> {
        let activity = &ctx.activity;
        let bot_id = activity.recipient.as_ref().map(|r| r.id.as_str());
        for member in &activity.members_removed {
            log::info!("bot: member removed {}", member.id);
        }
        for member in &activity.members_added {
            if Some(member.id.as_str()) == bot_id {
                continue;
            }
            log::info!("bot: member added {}", member.id);
            if self.config.bot.welcome_on_member_added {
                ctx.send_text(WELCOME_TEXT).await?;
            }
        }
        Ok(())
    }
}
