//! Outbound card payloads: suggested-action buttons and adaptive cards.

use crate::activity::{Activity, Attachment, CardAction, SuggestedActions};
use serde_json::{json, Value};

pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const ADAPTIVE_CARD_VERSION: &str = "1.5";

/// The one shortcut the bot offers after every reply.
pub const SHORTCUT_PHRASE: &str = "Show my assets";

/// Text above the shortcut button.
pub const SHORTCUT_PROMPT: &str = "What would you like to do next?";

/// Submission key written by the asset dropdown.
pub const SELECTION_KEY: &str = "multiSelectValues";

/// Submission key written by the legacy dropdown.
pub const LEGACY_SELECTION_KEY: &str = "selectedItems";

/// `action` carried by the dropdown's submit button.
pub const SELECTION_ACTION: &str = "submitSelection";

/// Message with one `imBack` button per title.
pub fn suggested_actions(text: &str, titles: &[&str]) -> Activity {
    let actions = titles
        .iter()
        .map(|t| CardAction {
            typ: "imBack".to_string(),
            title: t.to_string(),
            value: Value::String(t.to_string()),
        })
        .collect();
    Activity {
        suggested_actions: Some(SuggestedActions { actions }),
        ..Activity::message(text)
    }
}

/// Card with a text block and a single submit button whose data is `{ "text": title }`.
/// Teams ignores suggested actions outside personal chats, so group conversations get this instead.
pub fn submit_button_card(text: &str, title: &str) -> Attachment {
    adaptive_card(
        vec![text_block(text)],
        vec![json!({
            "type": "Action.Submit",
            "title": title,
            "data": { "text": title }
        })],
    )
}

/// Shortcut follow-up for a conversation: suggested actions in personal chats, a submit-button
/// card elsewhere.
pub fn shortcut_prompt(conversation_type: Option<&str>) -> Activity {
    match conversation_type {
        Some(t) if t != "personal" => {
            let mut activity = Activity::with_attachment(submit_button_card(SHORTCUT_PROMPT, SHORTCUT_PHRASE));
            activity.text = Some(SHORTCUT_PROMPT.to_string());
            activity
        }
        _ => suggested_actions(SHORTCUT_PROMPT, &[SHORTCUT_PHRASE]),
    }
}

/// Card with a prompt, a filtered multi-select list of `items`, and a submit button.
/// The selection is submitted under `input_id`.
pub fn multi_select_card(prompt: &str, items: &[String], input_id: &str) -> Attachment {
    let choices: Vec<Value> = items
        .iter()
        .map(|i| json!({ "title": i, "value": i }))
        .collect();
    adaptive_card(
        vec![
            text_block(prompt),
            json!({
                "type": "Input.ChoiceSet",
                "id": input_id,
                "isMultiSelect": true,
                "style": "filtered",
                "placeholder": "Select one or more",
                "choices": choices
            }),
        ],
        vec![json!({
            "type": "Action.Submit",
            "title": "Submit",
            "data": { "action": SELECTION_ACTION }
        })],
    )
}

fn text_block(text: &str) -> Value {
    json!({ "type": "TextBlock", "text": text, "wrap": true })
}

fn adaptive_card(body: Vec<Value>, actions: Vec<Value>) -> Attachment {
    Attachment {
        content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
        content: json!({
            "type": "AdaptiveCard",
            "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
            "version": ADAPTIVE_CARD_VERSION,
            "body": body,
            "actions": actions
        }),
    }
}
