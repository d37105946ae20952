//! Custom claims parsing and client-side checks.
//!
//! Claims are sent as a full replacement of the user's claims object, so the
//! checks here apply to the whole object.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

pub type Claims = Map<String, Value>;

/// Largest serialized claims payload the provider accepts, in bytes
pub const MAX_CLAIMS_PAYLOAD: usize = 1000;

/// Claim names owned by the provider's ID tokens
pub const RESERVED_CLAIMS: &[&str] = &[
    "acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "firebase",
    "iat", "iss", "jti", "nbf", "nonce", "sub",
];

/// Parse a JSON argument that must be an object
pub fn parse_claims(json: &str) -> Result<Claims> {
    serde_json::from_str::<Claims>(json).context("Failed to parse the JSON string")
}

/// Reject reserved claim names and oversized payloads
pub fn validate_claims(claims: &Claims) -> Result<()> {
    let mut reserved: Vec<&str> = claims
        .keys()
        .map(String::as_str)
        .filter(|key| RESERVED_CLAIMS.contains(key))
        .collect();
    if !reserved.is_empty() {
        reserved.sort_unstable();
        bail!(
            "Claims use reserved names: {}\nHint: These names are set by the identity provider and cannot be overridden.",
            reserved.join(", ")
        );
    }

    let size = serde_json::to_string(claims)
        .context("Failed to serialize claims")?
        .len();
    if size > MAX_CLAIMS_PAYLOAD {
        bail!(
            "Claims payload is {} bytes, the limit is {} bytes",
            size,
            MAX_CLAIMS_PAYLOAD
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object() {
        let claims = parse_claims(r#"{"admin":true,"tier":3,"groups":["ops"]}"#).unwrap();
        assert_eq!(claims.get("admin"), Some(&json!(true)));
        assert_eq!(claims.get("tier"), Some(&json!(3)));
        assert_eq!(claims.get("groups"), Some(&json!(["ops"])));

        assert!(parse_claims("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        for input in ["not-json", "", "[1,2]", "42", "\"admin\"", "null", "{\"a\":"] {
            let err = parse_claims(input).unwrap_err();
            assert!(
                err.to_string().contains("Failed to parse the JSON string"),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_validate_reserved_names() {
        let claims = parse_claims(r#"{"sub":"x","admin":true,"iss":"y"}"#).unwrap();
        let err = validate_claims(&claims).unwrap_err();
        assert!(err.to_string().contains("iss, sub"));

        let claims = parse_claims(r#"{"admin":true,"subscriber":true}"#).unwrap();
        assert!(validate_claims(&claims).is_ok());
    }

    #[test]
    fn test_validate_payload_size() {
        let mut claims = Claims::new();
        claims.insert("blob".to_string(), json!("x".repeat(MAX_CLAIMS_PAYLOAD)));
        let err = validate_claims(&claims).unwrap_err();
        assert!(err.to_string().contains("limit is 1000 bytes"));

        let mut claims = Claims::new();
        claims.insert("blob".to_string(), json!("x".repeat(900)));
        assert!(validate_claims(&claims).is_ok());
    }
}
