//! End-to-end handler tests against a mock Desk backend on a free port.
//!
//! Each test builds the real bot (token manager + desk client) pointed at the
//! mock, drives it through a turn, and asserts on both the emitted messages
//! and the requests the backend actually saw.

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use lib::actions::InvokeResult;
use lib::bot::DeskBot;
use lib::channels::{ChatSink, OutboundMessage};
use lib::config::{TeamsConfig, ZohoConfig};
use lib::desk::{DeskClient, TokenManager};
use lib::gateway::activity::ActionSubmit;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DeskState {
    created: Mutex<Vec<Value>>,
    list_queries: Mutex<Vec<HashMap<String, String>>>,
    comments: Mutex<Vec<(String, Value)>>,
    reject_auth: AtomicBool,
}

fn check_desk_headers(headers: &HeaderMap) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(auth.starts_with("Zoho-oauthtoken "), "bad auth header: {}", auth);
    assert_eq!(
        headers.get("orgId").and_then(|v| v.to_str().ok()),
        Some("org-42")
    );
}

async fn token_endpoint(
    State(state): State<Arc<DeskState>>,
    Form(_params): Form<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if state.reject_auth.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({ "access_token": "tok-1", "expires_in": 3600 })))
}

async fn create_ticket(
    State(state): State<Arc<DeskState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    check_desk_headers(&headers);
    state.created.lock().unwrap().push(body.clone());
    Json(json!({
        "id": "901",
        "ticketNumber": "1042",
        "subject": body["subject"],
        "status": "Open",
        "priority": "Medium",
    }))
}

async fn list_tickets(
    State(state): State<Arc<DeskState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    check_desk_headers(&headers);
    state.list_queries.lock().unwrap().push(query);
    let tickets: Vec<Value> = (1..=10)
        .map(|n| {
            json!({
                "id": format!("{}", 900 + n),
                "ticketNumber": format!("{}", 1040 + n),
                "subject": format!("Issue {}", n),
                "status": "Open",
                "priority": "Medium",
                "createdTime": "2026-03-05T14:30:00.000Z",
            })
        })
        .collect();
    Json(json!({ "data": tickets }))
}

async fn get_ticket(
    State(_state): State<Arc<DeskState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Json<Value> {
    check_desk_headers(&headers);
    Json(json!({
        "id": id,
        "ticketNumber": "1042",
        "subject": "Login issue",
        "description": "Cannot sign in since the upgrade",
        "status": "Open",
        "priority": "Medium",
        "createdTime": "2026-03-05T14:30:00.000Z",
        "contact": { "name": "Sam at Acme" },
    }))
}

async fn add_comment(
    State(state): State<Arc<DeskState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    check_desk_headers(&headers);
    state.comments.lock().unwrap().push((id, body));
    Json(json!({ "id": "c-1" }))
}

/// Serve the mock Desk API; returns its base URL.
async fn spawn_desk(state: Arc<DeskState>) -> String {
    let app = Router::new()
        .route("/oauth/v2/token", post(token_endpoint))
        .route("/api/v1/tickets", post(create_ticket).get(list_tickets))
        .route("/api/v1/tickets/:id", get(get_ticket))
        .route("/api/v1/tickets/:id/comments", post(add_comment))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock desk");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

async fn bot_against(state: Arc<DeskState>) -> DeskBot {
    let base_url = spawn_desk(state).await;
    let zoho = ZohoConfig {
        client_id: Some("cid".to_string()),
        client_secret: Some("csecret".to_string()),
        refresh_token: Some("rtoken".to_string()),
        org_id: Some("org-42".to_string()),
        base_url: Some(base_url.clone()),
    };
    let tokens = Arc::new(TokenManager::new(
        &zoho,
        Some(format!("{}/oauth/v2/token", base_url)),
    ));
    let desk = Arc::new(DeskClient::new(&zoho, tokens));
    let teams = TeamsConfig {
        upn1: Some("a@contoso.com".to_string()),
        upn2: Some("b@contoso.com".to_string()),
    };
    DeskBot::new(desk, &teams)
}

struct RecordingSink {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn texts(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn cards(&self) -> Vec<Value> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::Card(c) => Some(c),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn send(&self, message: OutboundMessage) -> Result<(), String> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

fn submit(data: Value, note_content: Option<&str>) -> ActionSubmit {
    ActionSubmit {
        data: Some(data),
        note_content: note_content.map(str::to_string),
    }
}

#[tokio::test]
async fn create_ticket_command_reaches_the_backend_and_reports_the_number() {
    let state = Arc::new(DeskState::default());
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    bot.handle_message(&sink, r#"create ticket "Login issue" for Acme Corp"#)
        .await;

    let created = state.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["subject"], "Login issue");
    assert!(created[0]["description"]
        .as_str()
        .unwrap()
        .contains("Acme Corp"));
    assert_eq!(created[0]["priority"], "Medium");
    assert_eq!(created[0]["status"], "Open");

    let messages = bot_messages_summary(&sink);
    assert_eq!(messages[0], "typing");
    assert_eq!(messages[1], "text:Creating ticket...");
    let final_text = sink.texts().pop().unwrap();
    assert!(final_text.contains("1042"), "missing ticket number: {}", final_text);
    assert!(final_text.contains("Acme Corp"));
}

#[tokio::test]
async fn open_tickets_full_page_offers_the_next_page() {
    let state = Arc::new(DeskState::default());
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    bot.handle_message(&sink, "open tickets").await;

    let queries = state.list_queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get("from").map(String::as_str), Some("1"));
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("10"));
    assert_eq!(queries[0].get("status").map(String::as_str), Some("Open"));

    let cards = sink.cards();
    assert_eq!(cards.len(), 1);
    let load_more = &cards[0]["actions"][0];
    assert_eq!(load_more["data"]["action"], "loadMore");
    assert_eq!(load_more["data"]["page"], 2);
}

#[tokio::test]
async fn repeated_load_more_uses_identical_page_parameters() {
    let state = Arc::new(DeskState::default());
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    for _ in 0..2 {
        let result = bot
            .handle_action(&sink, &submit(json!({"action": "loadMore", "page": 2}), None))
            .await;
        assert_eq!(result, InvokeResult::ok());
    }

    let queries = state.list_queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 2);
    for query in &queries {
        assert_eq!(query.get("from").map(String::as_str), Some("11"));
        assert_eq!(query.get("limit").map(String::as_str), Some("10"));
        assert_eq!(query.get("status").map(String::as_str), Some("Open"));
    }
}

#[tokio::test]
async fn empty_note_never_reaches_the_backend() {
    let state = Arc::new(DeskState::default());
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    let result = bot
        .handle_action(
            &sink,
            &submit(
                json!({"action": "submitNote", "ticketId": "5", "ticketNumber": "T-5"}),
                Some(""),
            ),
        )
        .await;

    assert_eq!(result, InvokeResult::ok());
    assert!(state.comments.lock().unwrap().is_empty());
    assert_eq!(
        sink.texts(),
        vec!["Please enter a note before submitting.".to_string()]
    );
}

#[tokio::test]
async fn submit_note_posts_a_public_trimmed_comment() {
    let state = Arc::new(DeskState::default());
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    let result = bot
        .handle_action(
            &sink,
            &submit(
                json!({"action": "submitNote", "ticketId": "901", "ticketNumber": "1042"}),
                Some("  escalating to tier 2  "),
            ),
        )
        .await;

    assert_eq!(result, InvokeResult::ok());
    let comments = state.comments.lock().unwrap().clone();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].0, "901");
    assert_eq!(comments[0].1["content"], "escalating to tier 2");
    assert_eq!(comments[0].1["isPublic"], true);
    let final_text = sink.texts().pop().unwrap();
    assert!(final_text.contains("1042"));
}

#[tokio::test]
async fn view_ticket_renders_the_detail_card() {
    let state = Arc::new(DeskState::default());
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    let result = bot
        .handle_action(&sink, &submit(json!({"action": "viewTicket", "ticketId": "901"}), None))
        .await;

    assert_eq!(result, InvokeResult::ok());
    let cards = sink.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["body"][0]["text"], "Ticket #1042");
    let take_to_chat = &cards[0]["actions"][0];
    assert_eq!(take_to_chat["type"], "Action.OpenUrl");
    assert!(take_to_chat["url"]
        .as_str()
        .unwrap()
        .contains("a%40contoso.com"));
}

#[tokio::test]
async fn auth_failure_surfaces_a_single_generic_message() {
    let state = Arc::new(DeskState::default());
    state.reject_auth.store(true, Ordering::SeqCst);
    let bot = bot_against(state.clone()).await;
    let sink = RecordingSink::new();

    bot.handle_message(&sink, r#"create ticket "Login issue" for Acme Corp"#)
        .await;

    assert!(state.created.lock().unwrap().is_empty());
    let texts = sink.texts();
    // Working indicator, then exactly one failure message; no token material.
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "Creating ticket...");
    assert!(texts[1].starts_with("Failed to create ticket"));
    assert!(!texts[1].contains("rtoken"));
}

fn bot_messages_summary(sink: &RecordingSink) -> Vec<String> {
    sink.messages()
        .iter()
        .map(|m| match m {
            OutboundMessage::Typing => "typing".to_string(),
            OutboundMessage::Text(t) => format!("text:{}", t),
            OutboundMessage::Card(_) => "card".to_string(),
        })
        .collect()
}
