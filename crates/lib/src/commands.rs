//! Free-text command parsing.
//!
//! Commands are fixed-pattern, matched in priority order over the trimmed
//! message text. Matching is case-insensitive but captured groups keep the
//! casing the user typed.

use regex::Regex;
use std::sync::OnceLock;

/// Subject is everything up to the first closing quote; company is the rest
/// of the line after `for`.
fn create_ticket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)^create ticket\s+"([^"]+)"\s+for\s+(.+)$"#).expect("valid pattern")
    })
}

/// A parsed inbound command. Created and discarded within a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateTicket { subject: String, company: String },
    ListOpenTickets,
    Help,
    Unrecognized,
}

impl Command {
    /// Parse trimmed message text. Empty or whitespace-only text is not a
    /// command at all and the turn is ignored, so this returns `None`.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(caps) = create_ticket_pattern().captures(text) {
            return Some(Command::CreateTicket {
                subject: caps[1].to_string(),
                company: caps[2].to_string(),
            });
        }
        if text.eq_ignore_ascii_case("open tickets") {
            return Some(Command::ListOpenTickets);
        }
        if text.to_lowercase().contains("help") {
            return Some(Command::Help);
        }
        Some(Command::Unrecognized)
    }
}
