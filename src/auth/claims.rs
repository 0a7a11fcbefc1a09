/// Session token header and claims
///
/// Both are parsed from untrusted JSON, so every field is optional and
/// read with its expected type; nothing here is trusted until the verifier
/// has checked the signature.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TokenError;

/// Decoded token header
#[derive(Debug, Clone)]
pub struct TokenHeader {
    fields: Map<String, Value>,
}

impl TokenHeader {
    pub fn from_json(bytes: &[u8]) -> Result<Self, TokenError> {
        Ok(Self {
            fields: json_object(bytes, "header")?,
        })
    }

    pub fn alg(&self) -> Option<&str> {
        self.fields.get("alg").and_then(Value::as_str)
    }
}

/// Decoded token payload
#[derive(Debug, Clone)]
pub struct SessionClaims {
    fields: Map<String, Value>,
}

impl SessionClaims {
    pub fn from_json(bytes: &[u8]) -> Result<Self, TokenError> {
        Ok(Self {
            fields: json_object(bytes, "payload")?,
        })
    }

    fn string(&self, claim: &str) -> Option<&str> {
        self.fields.get(claim).and_then(Value::as_str)
    }

    fn timestamp(&self, claim: &str) -> Option<i64> {
        let value = self.fields.get(claim)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|secs| secs.floor() as i64))
    }

    pub fn subject(&self) -> Option<&str> {
        self.string("sub")
    }

    /// Expiration time (Unix timestamp), if the issuer set one
    pub fn expires_at(&self) -> Option<i64> {
        self.timestamp("exp")
    }

    /// Not-before time (Unix timestamp), if the issuer set one
    pub fn not_before(&self) -> Option<i64> {
        self.timestamp("nbf")
    }

    /// Reject tokens outside their validity window
    pub fn check_time(&self, now: i64) -> Result<(), TokenError> {
        if self.expires_at().is_some_and(|exp| exp <= now) {
            return Err(TokenError::Expired);
        }
        if self.not_before().is_some_and(|nbf| nbf > now) {
            return Err(TokenError::NotYetValid);
        }
        Ok(())
    }

    /// Build the request identity from verified claims
    ///
    /// # Errors
    /// Returns `TokenError::MissingSubject` if `sub` is absent, empty or not
    /// a string
    pub fn into_identity(self) -> Result<Identity, TokenError> {
        let user_id = self
            .subject()
            .filter(|sub| !sub.is_empty())
            .ok_or(TokenError::MissingSubject)?
            .to_string();

        Ok(Identity {
            user_id,
            handle: self.string("handle").map(str::to_string),
            email: self.string("email").map(str::to_string),
        })
    }
}

fn json_object(bytes: &[u8], segment: &str) -> Result<Map<String, Value>, TokenError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TokenError::Malformed(format!("{} is not a JSON object", segment))),
        Err(e) => Err(TokenError::Malformed(format!("{} is not valid JSON: {}", segment, e))),
    }
}

/// The authenticated caller of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject of the verified token
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
