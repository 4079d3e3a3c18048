//! Zoho Desk REST client: one method per backend capability.
//!
//! Every call obtains a token from the manager, issues a single request, and
//! propagates failures unchanged. Retry and user-facing wording are the
//! caller's concern.

use crate::config::ZohoConfig;
use crate::desk::token::{AuthError, TokenManager};
use crate::desk::types::{Contact, ListResponse, Ticket};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://desk.zoho.com";

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("desk authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("desk request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("desk api error: {0} {1}")]
    Api(StatusCode, String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTicket<'a> {
    subject: &'a str,
    description: &'a str,
    /// null selects the portal's default department.
    department_id: Option<&'a str>,
    priority: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewComment<'a> {
    content: &'a str,
    is_public: bool,
}

/// Client for the Desk REST API (`<base>/api/v1`).
pub struct DeskClient {
    base_url: String,
    org_id: String,
    tokens: Arc<TokenManager>,
    client: reqwest::Client,
}

impl DeskClient {
    pub fn new(zoho: &ZohoConfig, tokens: Arc<TokenManager>) -> Self {
        let base_url = zoho
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        Self {
            base_url,
            org_id: zoho.org_id.clone().unwrap_or_default(),
            tokens,
            client: reqwest::Client::new(),
        }
    }

    /// POST /tickets — always priority Medium and status Open; the contact is
    /// attached only when a contact id is supplied.
    pub async fn create_ticket(
        &self,
        subject: &str,
        description: &str,
        contact_id: Option<&str>,
    ) -> Result<Ticket, DeskError> {
        let body = NewTicket {
            subject,
            description,
            department_id: None,
            priority: "Medium",
            status: "Open",
            contact_id,
        };
        let url = format!("{}/api/v1/tickets", self.base_url);
        let token = self.tokens.access_token().await?;
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .header("orgId", &self.org_id)
            .json(&body)
            .send()
            .await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }

    /// GET /tickets?from&limit&status=Open — returns the page's tickets
    /// (absent `data` means an empty page).
    pub async fn open_tickets(&self, from: u32, limit: u32) -> Result<Vec<Ticket>, DeskError> {
        let url = format!("{}/api/v1/tickets", self.base_url);
        let token = self.tokens.access_token().await?;
        let res = self
            .client
            .get(&url)
            .query(&[
                ("from", from.to_string()),
                ("limit", limit.to_string()),
                ("status", "Open".to_string()),
            ])
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .header("orgId", &self.org_id)
            .send()
            .await?;
        let res = check_status(res).await?;
        let data: ListResponse<Ticket> = res.json().await?;
        Ok(data.data.unwrap_or_default())
    }

    /// GET /tickets/{id}.
    pub async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, DeskError> {
        let url = format!("{}/api/v1/tickets/{}", self.base_url, ticket_id);
        let token = self.tokens.access_token().await?;
        let res = self
            .client
            .get(&url)
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .header("orgId", &self.org_id)
            .send()
            .await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }

    /// POST /tickets/{id}/comments.
    pub async fn add_comment(
        &self,
        ticket_id: &str,
        content: &str,
        is_public: bool,
    ) -> Result<(), DeskError> {
        let body = NewComment { content, is_public };
        let url = format!("{}/api/v1/tickets/{}/comments", self.base_url, ticket_id);
        let token = self.tokens.access_token().await?;
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .header("orgId", &self.org_id)
            .json(&body)
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }

    /// GET /contacts/search?email — used to attach a requester when a contact
    /// id is needed for ticket creation.
    pub async fn search_contacts(&self, email: &str) -> Result<Vec<Contact>, DeskError> {
        let url = format!("{}/api/v1/contacts/search", self.base_url);
        let token = self.tokens.access_token().await?;
        let res = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .header("orgId", &self.org_id)
            .send()
            .await?;
        let res = check_status(res).await?;
        let data: ListResponse<Contact> = res.json().await?;
        Ok(data.data.unwrap_or_default())
    }
}

/// Non-2xx becomes `DeskError::Api` with the status and response body.
async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, DeskError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    Err(DeskError::Api(status, body))
}
