//! Message and action handling: routes inbound turns to Desk operations and
//! emits the replies.
//!
//! Failures are caught here, logged once with the operation that failed, and
//! turned into exactly one user-facing message. Nothing from a handler
//! propagates to the transport layer.

use crate::actions::{ActionParseError, CardAction, InvokeResult};
use crate::cards;
use crate::channels::{ChatSink, OutboundMessage};
use crate::commands::Command;
use crate::config::TeamsConfig;
use crate::desk::{DeskClient, DeskError};
use crate::gateway::activity::ActionSubmit;
use std::sync::Arc;

const PAGE_SIZE: u32 = 10;

const WELCOME_TEXT: &str = "Welcome! I can help you manage Zoho Desk tickets. Try:\n- **create ticket \"Subject\" for Company** - Create a new ticket\n- **open tickets** - View open tickets";

const HELP_TEXT: &str = "**Available Commands:**\n\n**create ticket \"Subject\" for Company**\n   - Creates a new ticket in Zoho Desk\n   - Example: `create ticket \"Login issue\" for Acme Corp`\n\n**open tickets**\n   - Shows a list of open tickets with pagination\n   - Click on tickets to view details and take actions\n\n**Ticket Actions:**\n- **Take to Chat** - Start a group chat\n- **Add Note** - Add a comment to the ticket\n\n**help** - Show this help message";

/// The bot: one instance per process, stateless across turns apart from the
/// desk client's token cache.
pub struct DeskBot {
    desk: Arc<DeskClient>,
    chat_link: String,
}

impl DeskBot {
    pub fn new(desk: Arc<DeskClient>, teams: &TeamsConfig) -> Self {
        let chat_link = cards::chat_deep_link(
            teams.upn1.as_deref().unwrap_or_default(),
            teams.upn2.as_deref().unwrap_or_default(),
        );
        Self { desk, chat_link }
    }

    /// Route one free-text message. Empty text is ignored.
    pub async fn handle_message(&self, sink: &dyn ChatSink, text: &str) {
        let Some(command) = Command::parse(text) else {
            return;
        };
        match command {
            Command::CreateTicket { subject, company } => {
                if let Err(e) = self.create_ticket(sink, &subject, &company).await {
                    log::warn!("create ticket failed: {}", e);
                    self.send(
                        sink,
                        OutboundMessage::text(
                            "Failed to create ticket. Please check the configuration and try again.",
                        ),
                    )
                    .await;
                }
            }
            Command::ListOpenTickets => {
                if let Err(e) = self.list_open_tickets(sink, 1).await {
                    log::warn!("open tickets failed: {}", e);
                    self.send(
                        sink,
                        OutboundMessage::text(
                            "Failed to fetch tickets. Please check the configuration and try again.",
                        ),
                    )
                    .await;
                }
            }
            Command::Help => {
                self.send(sink, OutboundMessage::text(HELP_TEXT)).await;
            }
            Command::Unrecognized => {
                self.send(
                    sink,
                    OutboundMessage::text(
                        "I didn't understand that command. Type \"help\" for available commands.",
                    ),
                )
                .await;
            }
        }
    }

    /// Route one card-submission invocation and produce its synchronous reply.
    pub async fn handle_action(&self, sink: &dyn ChatSink, submit: &ActionSubmit) -> InvokeResult {
        let action = match CardAction::parse(submit) {
            Ok(action) => action,
            Err(ActionParseError::Invalid) => {
                return InvokeResult::error(400, "invalid action data");
            }
            Err(ActionParseError::Unknown(name)) => {
                log::debug!("unknown card action: {}", name);
                return InvokeResult::error(400, "unknown action");
            }
        };

        let outcome = match &action {
            CardAction::ViewTicket { ticket_id } => self.view_ticket(sink, ticket_id).await,
            CardAction::LoadMore { page } => self.list_open_tickets(sink, *page).await,
            CardAction::AddNote {
                ticket_id,
                ticket_number,
            } => {
                self.send(
                    sink,
                    OutboundMessage::Card(cards::add_note_card(ticket_id, ticket_number)),
                )
                .await;
                Ok(())
            }
            CardAction::SubmitNote {
                ticket_id,
                ticket_number,
                note_content,
            } => {
                self.submit_note(sink, ticket_id, ticket_number, note_content.as_deref())
                    .await
            }
            CardAction::Cancel => {
                self.send(sink, OutboundMessage::text("Operation cancelled.")).await;
                Ok(())
            }
        };

        match outcome {
            Ok(()) => InvokeResult::ok(),
            Err(e) => {
                log::warn!("card action {} failed: {}", action_name(&action), e);
                self.send(sink, OutboundMessage::text(action_failure_text(&action)))
                    .await;
                InvokeResult::error(500, "internal server error")
            }
        }
    }

    /// Greeting for members joining the conversation.
    pub async fn send_welcome(&self, sink: &dyn ChatSink) {
        self.send(sink, OutboundMessage::text(WELCOME_TEXT)).await;
    }

    async fn create_ticket(
        &self,
        sink: &dyn ChatSink,
        subject: &str,
        company: &str,
    ) -> Result<(), DeskError> {
        self.send(sink, OutboundMessage::Typing).await;
        self.send(sink, OutboundMessage::text("Creating ticket...")).await;

        let description = format!("Ticket created from Teams for {}", company);
        let ticket = self.desk.create_ticket(subject, &description, None).await?;

        self.send(
            sink,
            OutboundMessage::text(format!(
                "Ticket created successfully!\n\n**Ticket #{}**\nSubject: {}\nCompany: {}\nStatus: {}",
                ticket.ticket_number,
                subject,
                company,
                ticket.status.as_deref().unwrap_or("Open"),
            )),
        )
        .await;
        Ok(())
    }

    async fn list_open_tickets(&self, sink: &dyn ChatSink, page: u32) -> Result<(), DeskError> {
        self.send(sink, OutboundMessage::Typing).await;
        self.send(sink, OutboundMessage::text("Fetching open tickets...")).await;

        let from = (page - 1) * PAGE_SIZE + 1;
        let tickets = self.desk.open_tickets(from, PAGE_SIZE).await?;

        // A full page is taken as a hint that more pages exist; the backend
        // reports no total count.
        let has_more = tickets.len() == PAGE_SIZE as usize;
        self.send(
            sink,
            OutboundMessage::Card(cards::ticket_list_card(&tickets, has_more, page)),
        )
        .await;
        Ok(())
    }

    async fn view_ticket(&self, sink: &dyn ChatSink, ticket_id: &str) -> Result<(), DeskError> {
        let ticket = self.desk.get_ticket(ticket_id).await?;
        self.send(
            sink,
            OutboundMessage::Card(cards::ticket_card(&ticket, &self.chat_link)),
        )
        .await;
        Ok(())
    }

    async fn submit_note(
        &self,
        sink: &dyn ChatSink,
        ticket_id: &str,
        ticket_number: &str,
        note_content: Option<&str>,
    ) -> Result<(), DeskError> {
        let content = note_content.unwrap_or_default().trim().to_string();
        if content.is_empty() {
            // An empty note is a no-op, not an error: corrective message only.
            self.send(
                sink,
                OutboundMessage::text("Please enter a note before submitting."),
            )
            .await;
            return Ok(());
        }

        self.send(sink, OutboundMessage::Typing).await;
        self.send(sink, OutboundMessage::text("Adding note to ticket...")).await;

        self.desk.add_comment(ticket_id, &content, true).await?;

        self.send(
            sink,
            OutboundMessage::text(format!(
                "Note added successfully to Ticket #{}!",
                ticket_number
            )),
        )
        .await;
        Ok(())
    }

    /// Delivery failures never abort a turn; they are logged and the turn
    /// carries on.
    async fn send(&self, sink: &dyn ChatSink, message: OutboundMessage) {
        if let Err(e) = sink.send(message).await {
            log::warn!("outbound send failed: {}", e);
        }
    }
}

fn action_name(action: &CardAction) -> &'static str {
    match action {
        CardAction::ViewTicket { .. } => "viewTicket",
        CardAction::LoadMore { .. } => "loadMore",
        CardAction::AddNote { .. } => "addNote",
        CardAction::SubmitNote { .. } => "submitNote",
        CardAction::Cancel => "cancel",
    }
}

fn action_failure_text(action: &CardAction) -> &'static str {
    match action {
        CardAction::ViewTicket { .. } => "Failed to load ticket details.",
        CardAction::LoadMore { .. } => {
            "Failed to fetch tickets. Please check the configuration and try again."
        }
        CardAction::SubmitNote { .. } => "Failed to add note to ticket. Please try again.",
        CardAction::AddNote { .. } | CardAction::Cancel => {
            "Sorry, I encountered an error processing that action."
        }
    }
}
