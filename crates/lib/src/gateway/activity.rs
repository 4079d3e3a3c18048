//! Inbound activity wire types (camelCase JSON).
//!
//! Only the fields the bot consumes are modeled; everything else on the wire
//! is ignored. Card invokes arrive as `type: "invoke"` with
//! `name: "adaptiveCard/action"` and the submitted payload under `value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INVOKE_NAME_CARD_ACTION: &str = "adaptiveCard/action";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Invoke name (e.g. `adaptiveCard/action`).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<ActionInvokeValue>,
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    #[serde(default)]
    pub recipient: Option<ChannelAccount>,
    #[serde(default)]
    pub conversation: Option<ConversationAccount>,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub members_added: Option<Vec<ChannelAccount>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
}

/// `value` of a card invoke: the submitted action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInvokeValue {
    #[serde(default)]
    pub action: Option<ActionSubmit>,
}

/// The submitted action: `data` holds the discriminator and the card's fixed
/// fields; user inputs (e.g. `noteContent`) arrive as siblings of `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSubmit {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub note_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_invoke_deserializes_data_and_sibling_inputs() {
        let raw = serde_json::json!({
            "type": "invoke",
            "name": "adaptiveCard/action",
            "serviceUrl": "https://smba.example.invalid/emea",
            "conversation": { "id": "conv-1" },
            "value": {
                "action": {
                    "data": { "action": "submitNote", "ticketId": "5", "ticketNumber": "T-5" },
                    "noteContent": "escalating"
                }
            }
        });
        let activity: Activity = serde_json::from_value(raw).unwrap();
        assert_eq!(activity.typ, "invoke");
        assert_eq!(activity.name.as_deref(), Some(INVOKE_NAME_CARD_ACTION));
        let submit = activity.value.unwrap().action.unwrap();
        assert_eq!(submit.note_content.as_deref(), Some("escalating"));
        assert_eq!(submit.data.unwrap()["action"], "submitNote");
    }

    #[test]
    fn message_activity_needs_only_type() {
        let activity: Activity = serde_json::from_str(r#"{"type":"message"}"#).unwrap();
        assert_eq!(activity.typ, "message");
        assert!(activity.text.is_none());
    }
}
