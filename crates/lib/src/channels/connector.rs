//! Bot Framework connector channel: replies to the service URL that delivered
//! the inbound activity.
//!
//! The connector authenticates with a client-credentials grant against the
//! Bot Framework login endpoint. The bearer token is cached process-wide with
//! the same safety margin as the Desk token; when no app credentials are
//! configured (local emulator) activities are posted unauthenticated.

use crate::channels::{ChatSink, OutboundMessage};
use crate::config::BotConfig;
use crate::gateway::activity::{Activity, ChannelAccount, ConversationAccount};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_LOGIN_URL: &str =
    "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token";
const CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";
const EXPIRY_SAFETY_MARGIN_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    expires_in: u64,
}

/// Cached service credential for outbound connector calls.
pub struct ConnectorAuth {
    app_id: String,
    app_password: String,
    login_url: String,
    client: reqwest::Client,
    cached: RwLock<Option<(String, Instant)>>,
}

impl ConnectorAuth {
    /// `login_url` overrides the Bot Framework login endpoint (for tests).
    pub fn new(bot: &BotConfig, login_url: Option<String>) -> Self {
        Self {
            app_id: bot.app_id.clone().unwrap_or_default(),
            app_password: bot.app_password.clone().unwrap_or_default(),
            login_url: login_url.unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            client: reqwest::Client::new(),
            cached: RwLock::new(None),
        }
    }

    /// None when no app id is configured (unauthenticated emulator mode).
    async fn bearer_token(&self) -> Result<Option<String>, String> {
        if self.app_id.is_empty() {
            return Ok(None);
        }
        if let Some((token, expires_at)) = self.cached.read().await.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(Some(token.clone()));
            }
        }
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.app_id.as_str()),
            ("client_secret", self.app_password.as_str()),
            ("scope", CONNECTOR_SCOPE),
        ];
        let res = self
            .client
            .post(&self.login_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(format!("connector login failed: {}", status));
        }
        let data: LoginResponse = res.json().await.map_err(|e| e.to_string())?;
        let lifetime = data.expires_in.saturating_sub(EXPIRY_SAFETY_MARGIN_SECS);
        let expires_at = Instant::now() + Duration::from_secs(lifetime);
        let token = data.access_token;
        *self.cached.write().await = Some((token.clone(), expires_at));
        Ok(Some(token))
    }
}

/// Where a turn's replies go: lifted from the inbound activity.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub service_url: String,
    pub conversation_id: String,
    /// The bot account (inbound `recipient`), echoed as outbound `from`.
    pub bot: Option<ChannelAccount>,
    /// The user account (inbound `from`), echoed as outbound `recipient`.
    pub user: Option<ChannelAccount>,
    pub reply_to_id: Option<String>,
}

impl ReplyContext {
    /// None when the activity names no conversation or service URL (nothing to
    /// reply to).
    pub fn from_activity(activity: &Activity) -> Option<Self> {
        let service_url = activity.service_url.clone()?;
        let conversation_id = activity.conversation.as_ref()?.id.clone();
        Some(Self {
            service_url,
            conversation_id,
            bot: activity.recipient.clone(),
            user: activity.from.clone(),
            reply_to_id: activity.id.clone(),
        })
    }
}

/// Per-turn sink posting reply activities to the conversation.
pub struct ConnectorChannel {
    auth: Arc<ConnectorAuth>,
    reply: ReplyContext,
    client: reqwest::Client,
}

impl ConnectorChannel {
    pub fn new(auth: Arc<ConnectorAuth>, reply: ReplyContext) -> Self {
        Self {
            auth,
            reply,
            client: reqwest::Client::new(),
        }
    }

    fn activity_json(&self, message: &OutboundMessage) -> serde_json::Value {
        let mut activity = match message {
            OutboundMessage::Typing => json!({ "type": "typing" }),
            OutboundMessage::Text(text) => json!({ "type": "message", "text": text }),
            OutboundMessage::Card(card) => json!({
                "type": "message",
                "attachments": [{
                    "contentType": "application/vnd.microsoft.card.adaptive",
                    "content": card
                }]
            }),
        };
        activity["conversation"] = json!(ConversationAccount {
            id: self.reply.conversation_id.clone(),
        });
        if let Some(ref bot) = self.reply.bot {
            activity["from"] = json!(bot);
        }
        if let Some(ref user) = self.reply.user {
            activity["recipient"] = json!(user);
        }
        if let Some(ref reply_to) = self.reply.reply_to_id {
            activity["replyToId"] = json!(reply_to);
        }
        activity
    }
}

#[async_trait]
impl ChatSink for ConnectorChannel {
    async fn send(&self, message: OutboundMessage) -> Result<(), String> {
        let url = format!(
            "{}/v3/conversations/{}/activities",
            self.reply.service_url.trim_end_matches('/'),
            urlencoding::encode(&self.reply.conversation_id)
        );
        let body = self.activity_json(&message);
        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = self.auth.bearer_token().await? {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("send activity failed: {} {}", status, body));
        }
        Ok(())
    }
}
