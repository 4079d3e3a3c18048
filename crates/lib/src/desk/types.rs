//! Zoho Desk wire types (camelCase JSON, read-only projections).

use serde::{Deserialize, Serialize};

/// A ticket as returned by the Desk API. Fields the API may omit are optional;
/// tickets are never cached beyond the handler invocation that fetched them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub ticket_number: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
}

/// Contact attached to a ticket (or returned by contact search).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// List envelope: Desk wraps collections as `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub(crate) data: Option<Vec<T>>,
}
