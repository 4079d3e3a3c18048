//! Adaptive-card document builders.
//!
//! Pure data-to-markup construction: each builder returns the card as a JSON
//! document ready to be attached to an outbound message. Submit-action `data`
//! objects here must round-trip through [`crate::actions::CardAction::parse`].

use crate::desk::Ticket;
use serde_json::{json, Value};

const CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const CARD_VERSION: &str = "1.4";

/// Detail card for a single ticket: facts, truncated description, a deep link
/// into a group chat, and an Add Note submit action.
pub fn ticket_card(ticket: &Ticket, chat_link: &str) -> Value {
    json!({
        "type": "AdaptiveCard",
        "$schema": CARD_SCHEMA,
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": format!("Ticket #{}", ticket.ticket_number),
                "weight": "Bolder",
                "size": "Medium",
                "color": "Accent"
            },
            {
                "type": "TextBlock",
                "text": ticket.subject.as_deref().unwrap_or("No Subject"),
                "weight": "Bolder",
                "wrap": true
            },
            {
                "type": "FactSet",
                "facts": [
                    { "title": "Status:", "value": ticket.status.as_deref().unwrap_or("Unknown") },
                    { "title": "Priority:", "value": ticket.priority.as_deref().unwrap_or("Unknown") },
                    { "title": "Created:", "value": format_created(ticket.created_time.as_deref()) },
                    {
                        "title": "Contact:",
                        "value": ticket
                            .contact
                            .as_ref()
                            .and_then(|c| c.name.as_deref())
                            .unwrap_or("Unknown")
                    }
                ]
            },
            {
                "type": "TextBlock",
                "text": ticket.description.as_deref().unwrap_or("No description available"),
                "wrap": true,
                "maxLines": 3,
                "separator": true
            }
        ],
        "actions": [
            {
                "type": "Action.OpenUrl",
                "title": "Take to Chat",
                "url": chat_link
            },
            {
                "type": "Action.Submit",
                "title": "Add Note",
                "data": {
                    "action": "addNote",
                    "ticketId": ticket.id.as_str(),
                    "ticketNumber": ticket.ticket_number.as_str()
                }
            }
        ]
    })
}

/// Summary card for a page of open tickets. Each row submits `viewTicket`;
/// when `has_more` a Load More action requests the next page.
pub fn ticket_list_card(tickets: &[Ticket], has_more: bool, current_page: u32) -> Value {
    let mut body = vec![json!({
        "type": "TextBlock",
        "text": "Open Tickets",
        "weight": "Bolder",
        "size": "Large"
    })];

    if tickets.is_empty() {
        body.push(json!({
            "type": "TextBlock",
            "text": "No open tickets found.",
            "wrap": true
        }));
    } else {
        for ticket in tickets {
            body.push(json!({
                "type": "Container",
                "separator": true,
                "items": [
                    {
                        "type": "ColumnSet",
                        "columns": [
                            {
                                "type": "Column",
                                "width": "stretch",
                                "items": [
                                    {
                                        "type": "TextBlock",
                                        "text": format!("#{}", ticket.ticket_number),
                                        "weight": "Bolder",
                                        "color": "Accent"
                                    },
                                    {
                                        "type": "TextBlock",
                                        "text": ticket.subject.as_deref().unwrap_or("No Subject"),
                                        "wrap": true,
                                        "maxLines": 2
                                    }
                                ]
                            },
                            {
                                "type": "Column",
                                "width": "auto",
                                "items": [
                                    {
                                        "type": "TextBlock",
                                        "text": ticket.priority.as_deref().unwrap_or("Medium"),
                                        "horizontalAlignment": "Right"
                                    },
                                    {
                                        "type": "TextBlock",
                                        "text": format_created(ticket.created_time.as_deref()),
                                        "horizontalAlignment": "Right",
                                        "size": "Small",
                                        "color": "Default"
                                    }
                                ]
                            }
                        ]
                    }
                ],
                "selectAction": {
                    "type": "Action.Submit",
                    "data": {
                        "action": "viewTicket",
                        "ticketId": ticket.id.as_str()
                    }
                }
            }));
        }
    }

    let mut actions = Vec::new();
    if has_more {
        actions.push(json!({
            "type": "Action.Submit",
            "title": "Load More",
            "data": {
                "action": "loadMore",
                "page": current_page + 1
            }
        }));
    }

    json!({
        "type": "AdaptiveCard",
        "$schema": CARD_SCHEMA,
        "version": CARD_VERSION,
        "body": body,
        "actions": actions
    })
}

/// Input form for adding a note to a ticket.
pub fn add_note_card(ticket_id: &str, ticket_number: &str) -> Value {
    json!({
        "type": "AdaptiveCard",
        "$schema": CARD_SCHEMA,
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": format!("Add Note to Ticket #{}", ticket_number),
                "weight": "Bolder",
                "size": "Medium"
            },
            {
                "type": "Input.Text",
                "id": "noteContent",
                "placeholder": "Enter your note here...",
                "isMultiline": true,
                "maxLength": 1000
            }
        ],
        "actions": [
            {
                "type": "Action.Submit",
                "title": "Add Note",
                "data": {
                    "action": "submitNote",
                    "ticketId": ticket_id,
                    "ticketNumber": ticket_number
                }
            },
            {
                "type": "Action.Submit",
                "title": "Cancel",
                "data": {
                    "action": "cancel"
                }
            }
        ]
    })
}

/// Deep link that opens a group chat with the two configured recipients.
pub fn chat_deep_link(upn1: &str, upn2: &str) -> String {
    let users = format!("{},{}", upn1, upn2);
    format!(
        "https://teams.microsoft.com/l/chat/0/0?users={}",
        urlencoding::encode(&users)
    )
}

/// Render a Desk createdTime (RFC 3339) as e.g. `Mar 5, 2026 02:30 PM`.
pub fn format_created(created_time: Option<&str>) -> String {
    let Some(raw) = created_time else {
        return "Unknown".to_string();
    };
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%b %-d, %Y %I:%M %p").to_string(),
        Err(_) => "Invalid Date".to_string(),
    }
}
