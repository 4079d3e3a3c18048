//! Card-submission action parsing.
//!
//! A structured payload carries an `action` discriminator inside its `data`
//! object; free-form inputs (the note text) arrive as siblings of `data` in
//! the same payload. One validating parser turns the payload into a closed
//! variant before any handler runs, so malformed payloads are rejected at the
//! boundary instead of failing mid-handler.

use crate::gateway::activity::ActionSubmit;
use serde_json::Value;

/// Synchronous reply to an action invocation, distinct from any chat messages
/// emitted while handling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResult {
    pub status: u16,
    pub body: Option<String>,
}

impl InvokeResult {
    pub fn ok() -> Self {
        Self { status: 200, body: None }
    }

    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }
}

/// A parsed card action. Created and discarded within a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    ViewTicket { ticket_id: String },
    LoadMore { page: u32 },
    AddNote { ticket_id: String, ticket_number: String },
    SubmitNote {
        ticket_id: String,
        ticket_number: String,
        note_content: Option<String>,
    },
    Cancel,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActionParseError {
    /// Payload has no `data`, no discriminator, or a known discriminator with
    /// a missing required field.
    #[error("invalid action data")]
    Invalid,
    #[error("unknown action: {0}")]
    Unknown(String),
}

impl CardAction {
    pub fn parse(submit: &ActionSubmit) -> Result<CardAction, ActionParseError> {
        let data = submit
            .data
            .as_ref()
            .and_then(Value::as_object)
            .ok_or(ActionParseError::Invalid)?;
        let discriminator = data
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ActionParseError::Invalid)?;

        match discriminator {
            "viewTicket" => Ok(CardAction::ViewTicket {
                ticket_id: field(data, "ticketId")?,
            }),
            "loadMore" => Ok(CardAction::LoadMore {
                page: page_field(data.get("page")),
            }),
            "addNote" => Ok(CardAction::AddNote {
                ticket_id: field(data, "ticketId")?,
                ticket_number: field(data, "ticketNumber")?,
            }),
            "submitNote" => Ok(CardAction::SubmitNote {
                ticket_id: field(data, "ticketId")?,
                ticket_number: field(data, "ticketNumber")?,
                note_content: submit.note_content.clone(),
            }),
            "cancel" => Ok(CardAction::Cancel),
            other => Err(ActionParseError::Unknown(other.to_string())),
        }
    }
}

/// Required string field; numeric ids from card data are accepted too.
fn field(
    data: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, ActionParseError> {
    match data.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ActionParseError::Invalid),
    }
}

/// Absent or unusable page falls back to the first page.
fn page_field(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|p| p as u32).filter(|p| *p >= 1).unwrap_or(1),
        Some(Value::String(s)) => s.parse().ok().filter(|p| *p >= 1).unwrap_or(1),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submit(data: Option<Value>, note_content: Option<&str>) -> ActionSubmit {
        ActionSubmit {
            data,
            note_content: note_content.map(str::to_string),
        }
    }

    #[test]
    fn missing_data_is_invalid() {
        let err = CardAction::parse(&submit(None, None)).unwrap_err();
        assert_eq!(err, ActionParseError::Invalid);
    }

    #[test]
    fn missing_discriminator_is_invalid() {
        let err = CardAction::parse(&submit(Some(json!({"ticketId": "5"})), None)).unwrap_err();
        assert_eq!(err, ActionParseError::Invalid);
    }

    #[test]
    fn unknown_discriminator_is_reported_by_name() {
        let err =
            CardAction::parse(&submit(Some(json!({"action": "closeTicket"})), None)).unwrap_err();
        assert_eq!(err, ActionParseError::Unknown("closeTicket".to_string()));
    }

    #[test]
    fn view_ticket_requires_an_id() {
        let ok = CardAction::parse(&submit(
            Some(json!({"action": "viewTicket", "ticketId": "1001"})),
            None,
        ))
        .unwrap();
        assert_eq!(ok, CardAction::ViewTicket { ticket_id: "1001".to_string() });

        let err = CardAction::parse(&submit(Some(json!({"action": "viewTicket"})), None));
        assert_eq!(err, Err(ActionParseError::Invalid));
    }

    #[test]
    fn load_more_defaults_to_first_page() {
        let action = CardAction::parse(&submit(Some(json!({"action": "loadMore"})), None)).unwrap();
        assert_eq!(action, CardAction::LoadMore { page: 1 });

        let action = CardAction::parse(&submit(
            Some(json!({"action": "loadMore", "page": 3})),
            None,
        ))
        .unwrap();
        assert_eq!(action, CardAction::LoadMore { page: 3 });
    }

    #[test]
    fn submit_note_reads_sibling_note_content() {
        let action = CardAction::parse(&submit(
            Some(json!({"action": "submitNote", "ticketId": "5", "ticketNumber": "T-5"})),
            Some("needs escalation"),
        ))
        .unwrap();
        assert_eq!(
            action,
            CardAction::SubmitNote {
                ticket_id: "5".to_string(),
                ticket_number: "T-5".to_string(),
                note_content: Some("needs escalation".to_string()),
            }
        );
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let action = CardAction::parse(&submit(
            Some(json!({"action": "viewTicket", "ticketId": 1001})),
            None,
        ))
        .unwrap();
        assert_eq!(action, CardAction::ViewTicket { ticket_id: "1001".to_string() });
    }

    #[test]
    fn cancel_needs_no_fields() {
        let action = CardAction::parse(&submit(Some(json!({"action": "cancel"})), None)).unwrap();
        assert_eq!(action, CardAction::Cancel);
    }
}
