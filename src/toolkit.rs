//! Identity Toolkit v1 REST client.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::Claims;
use crate::client::{
    ClientError, ClientResult, UserDirectory, UserPage, UserRecord, WireUser,
};

/// Authenticated handle to one project's user directory
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: Client,
    base_url: String,
    project_id: String,
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    local_id: Option<[&'a str; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<[&'a str; 1]>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<WireUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    users: Vec<WireUser>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    custom_attributes: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl std::fmt::Debug for IdentityToolkitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl IdentityToolkitClient {
    pub fn new(http: Client, base_url: String, project_id: String, access_token: String) -> Self {
        Self {
            http,
            base_url,
            project_id,
            access_token,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, operation: &str) -> String {
        format!(
            "{}/projects/{}/accounts:{}",
            self.base_url, self.project_id, operation
        )
    }

    fn send<R: DeserializeOwned>(&self, request: RequestBuilder, subject: &str) -> ClientResult<R> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        let body = response.text()?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_default();
        Err(map_error(status, &message, subject))
    }

    fn lookup(&self, request: &LookupRequest<'_>, subject: &str) -> ClientResult<UserRecord> {
        let response: LookupResponse =
            self.send(self.http.post(self.url("lookup")).json(request), subject)?;

        match response.users.into_iter().next() {
            Some(user) => UserRecord::try_from(user),
            None => Err(ClientError::NotFound(format!("no user exists with the {subject}"))),
        }
    }
}

/// Translate a provider error into a [`ClientError`].
///
/// The provider reports missing users as `400 USER_NOT_FOUND` or
/// `400 EMAIL_NOT_FOUND`, with an optional ` : detail` suffix.
fn map_error(status: StatusCode, message: &str, subject: &str) -> ClientError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "USER_NOT_FOUND" | "EMAIL_NOT_FOUND" => {
            ClientError::NotFound(format!("no user exists with the {subject}"))
        }
        _ if message.is_empty() => ClientError::Api {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        },
        _ => ClientError::Api {
            status: status.as_u16(),
            message: message.to_string(),
        },
    }
}

impl UserDirectory for IdentityToolkitClient {
    fn get_user(&self, uid: &str) -> ClientResult<UserRecord> {
        debug!(%uid, "looking up user by uid");
        let request = LookupRequest {
            local_id: Some([uid]),
            email: None,
        };
        self.lookup(&request, &format!("uid: {uid}"))
    }

    fn get_user_by_email(&self, email: &str) -> ClientResult<UserRecord> {
        debug!(%email, "looking up user by email");
        let request = LookupRequest {
            local_id: None,
            email: Some([email]),
        };
        self.lookup(&request, &format!("email: {email}"))
    }

    fn list_users(&self, page_token: &str, page_size: u32) -> ClientResult<UserPage> {
        debug!(%page_token, page_size, "fetching user page");
        let mut query = vec![("maxResults", page_size.to_string())];
        if !page_token.is_empty() {
            query.push(("nextPageToken", page_token.to_string()));
        }

        let response: BatchGetResponse = self.send(
            self.http.get(self.url("batchGet")).query(&query),
            "requested page",
        )?;

        let users = response
            .users
            .into_iter()
            .map(UserRecord::try_from)
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(UserPage {
            users,
            next_page_token: response.next_page_token,
        })
    }

    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> ClientResult<()> {
        debug!(%uid, "replacing custom claims");
        let request = UpdateRequest {
            local_id: uid,
            custom_attributes: serde_json::to_string(claims)?,
        };

        let _: serde_json::Value = self.send(
            self.http.post(self.url("update")).json(&request),
            &format!("uid: {uid}"),
        )?;
        Ok(())
    }
}
