//! Zoho Desk backend: token lifecycle and the REST client.
//!
//! The token manager owns the cached OAuth2 credential; the client borrows it
//! for every call. Handlers receive normalized `DeskError`s and decide what
//! the user sees.

mod client;
mod token;
mod types;

pub use client::{DeskClient, DeskError};
pub use token::{AuthError, TokenManager};
pub use types::{Contact, Ticket};
