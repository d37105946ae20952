//! Session bootstrap: turn service-account credential bytes into an
//! authenticated [`IdentityToolkitClient`].
//!
//! Against the real service this signs an RS256 JWT assertion with the
//! account's private key and exchanges it for an OAuth2 access token. When
//! `FIREBASE_AUTH_EMULATOR_HOST` is set the exchange is skipped and requests go
//! to the local emulator instead.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ClientError, ClientResult};
use crate::toolkit::IdentityToolkitClient;

pub const EMULATOR_HOST_ENV: &str = "FIREBASE_AUTH_EMULATOR_HOST";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const PRODUCTION_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/identitytoolkit",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Parsed service-account key file
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse and validate a key file's contents
    pub fn from_slice(bytes: &[u8]) -> ClientResult<Self> {
        let key: Self = serde_json::from_slice(bytes)
            .map_err(|e| ClientError::Credential(format!("not a JSON key file: {e}")))?;
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> ClientResult<()> {
        if self.key_type != "service_account" {
            return Err(ClientError::Credential(format!(
                "expected type \"service_account\", found \"{}\"",
                self.key_type
            )));
        }
        for (field, value) in [
            ("project_id", &self.project_id),
            ("client_email", &self.client_email),
            ("private_key", &self.private_key),
        ] {
            if value.trim().is_empty() {
                return Err(ClientError::Credential(format!("missing \"{field}\"")));
            }
        }
        Ok(())
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// Where identity requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Production,
    /// Local Auth emulator at `host:port`
    Emulator(String),
}

impl Endpoint {
    pub fn from_env() -> Self {
        match std::env::var(EMULATOR_HOST_ENV) {
            Ok(host) if !host.trim().is_empty() => Endpoint::Emulator(host.trim().to_string()),
            _ => Endpoint::Production,
        }
    }

    pub fn base_url(&self) -> String {
        match self {
            Endpoint::Production => PRODUCTION_BASE_URL.to_string(),
            Endpoint::Emulator(host) => format!("http://{host}/identitytoolkit.googleapis.com/v1"),
        }
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    scope: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Open a session using the endpoint selected by the environment
pub fn open(credential: &[u8]) -> ClientResult<IdentityToolkitClient> {
    open_with(credential, &Endpoint::from_env())
}

/// Open a session against an explicit endpoint
pub fn open_with(credential: &[u8], endpoint: &Endpoint) -> ClientResult<IdentityToolkitClient> {
    let key = ServiceAccountKey::from_slice(credential)?;
    let http = Client::builder()
        .user_agent(concat!("fbauth/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let access_token = match endpoint {
        Endpoint::Production => {
            let assertion = sign_assertion(&key, Utc::now().timestamp())?;
            exchange_assertion(&http, key.token_uri(), &assertion)?
        }
        Endpoint::Emulator(host) => {
            debug!(%host, "using auth emulator, skipping token exchange");
            "owner".to_string()
        }
    };

    debug!(project = %key.project_id, account = %key.client_email, "session opened");
    Ok(IdentityToolkitClient::new(
        http,
        endpoint.base_url(),
        key.project_id,
        access_token,
    ))
}

/// Build the signed JWT used in the token exchange
fn sign_assertion(key: &ServiceAccountKey, now: i64) -> ClientResult<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| ClientError::Credential(format!("unusable private_key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    if !key.private_key_id.is_empty() {
        header.kid = Some(key.private_key_id.clone());
    }

    let claims = AssertionClaims {
        iss: &key.client_email,
        sub: &key.client_email,
        aud: key.token_uri(),
        scope: SCOPES.join(" "),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    encode(&header, &claims, &encoding_key).map_err(|e| {
        ClientError::Credential(format!("failed to sign assertion with private_key: {e}"))
    })
}

fn exchange_assertion(http: &Client, token_uri: &str, assertion: &str) -> ClientResult<String> {
    debug!(%token_uri, "exchanging service account assertion");
    let response = http
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
        .send()?;

    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        return Err(ClientError::Auth(message));
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    Ok(token.access_token)
}
