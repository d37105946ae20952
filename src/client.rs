//! User directory abstraction and the record types it returns.
//!
//! Commands talk to the identity provider only through [`UserDirectory`], so
//! they can run against the real REST client or an in-memory fake.

use serde::Deserialize;
use serde_json::Map;
use thiserror::Error;

use crate::claims::Claims;

/// Read-only view of a provider user record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub email_verified: bool,
    pub custom_claims: Claims,
    /// Creation time in epoch milliseconds
    pub creation_timestamp: i64,
}

/// One page of a user listing. An empty `next_page_token` ends the listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    pub next_page_token: String,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    NotFound(String),

    #[error("identity provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to obtain an access token: {0}")]
    Auth(String),

    #[error("invalid service account credential: {0}")]
    Credential(String),

    #[error("request to identity provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from identity provider: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Operations the tool needs from the identity provider
pub trait UserDirectory {
    fn get_user(&self, uid: &str) -> ClientResult<UserRecord>;

    fn get_user_by_email(&self, email: &str) -> ClientResult<UserRecord>;

    /// Fetch one page of users starting at `page_token` ("" for the first page)
    fn list_users(&self, page_token: &str, page_size: u32) -> ClientResult<UserPage>;

    /// Replace the user's custom claims with `claims`. Not a merge.
    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> ClientResult<()>;
}

/// User record as returned by the Identity Toolkit REST API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    email_verified: bool,
    /// Claims, JSON-encoded as a string
    #[serde(default)]
    custom_attributes: Option<String>,
    /// Epoch milliseconds, as a decimal string
    #[serde(default)]
    created_at: Option<String>,
}

impl TryFrom<WireUser> for UserRecord {
    type Error = ClientError;

    fn try_from(wire: WireUser) -> ClientResult<Self> {
        let custom_claims = match wire.custom_attributes.as_deref().map(str::trim) {
            None | Some("") | Some("null") => Map::new(),
            Some(raw) => serde_json::from_str::<Claims>(raw)?,
        };

        // Absent means the provider never recorded one; shown as the epoch.
        let creation_timestamp = match wire.created_at.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                <serde_json::Error as serde::de::Error>::custom(format!(
                    "invalid createdAt {raw:?}: {e}"
                ))
            })?,
        };

        Ok(UserRecord {
            uid: wire.local_id,
            email: wire.email,
            display_name: wire.display_name,
            email_verified: wire.email_verified,
            custom_claims,
            creation_timestamp,
        })
    }
}
