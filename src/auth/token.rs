/// Session Token Verification
///
/// Verifies compact `header.payload.signature` tokens signed with an HMAC
/// algorithm and turns their claims into an `Identity`. The verifier never
/// mints tokens; they come from the identity provider.
///
/// Steps, stopping at the first failure:
/// parse segments, parse header and payload, select algorithm, recompute the
/// signature for each candidate key, compare, check time claims, extract the
/// subject.

use crate::auth::algorithm::HmacAlgorithm;
use crate::auth::base64url::decode_segment;
use crate::auth::claims::{Identity, SessionClaims, TokenHeader};
use crate::auth::secrets::{signing_keys, SecretResolver};
use crate::error::TokenError;

const SEGMENTS: usize = 3;

/// Verifies session tokens against the configured secret
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    secrets: SecretResolver,
}

impl TokenVerifier {
    pub fn new(secrets: SecretResolver) -> Self {
        Self { secrets }
    }

    /// Verify a token at the current time
    ///
    /// # Errors
    /// Returns the `TokenError` describing why the token was refused
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify a token as of `now` (Unix seconds)
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, TokenError> {
        let secret = self.secrets.resolve().ok_or(TokenError::NoSecretConfigured)?;
        tracing::trace!(source = secret.source, name = %secret.name, "Resolved session secret");
        verify_with_secret(token, secret.value(), now)
    }
}

/// Verify a token with an explicit secret
pub fn verify_with_secret(token: &str, secret: &str, now: i64) -> Result<Identity, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != SEGMENTS {
        return Err(TokenError::Malformed(format!(
            "expected {} segments, found {}",
            SEGMENTS,
            segments.len()
        )));
    }

    let header_bytes = decode(segments[0], "header")?;
    let payload_bytes = decode(segments[1], "payload")?;
    let signature = decode(segments[2], "signature")?;

    let header = TokenHeader::from_json(&header_bytes)?;
    let claims = SessionClaims::from_json(&payload_bytes)?;

    let alg = header.alg().unwrap_or("<missing>");
    let algorithm = HmacAlgorithm::from_header(alg)
        .ok_or_else(|| TokenError::UnsupportedAlgorithm(alg.to_string()))?;

    // Everything before the final dot is what the issuer signed.
    let signing_input = token
        .rfind('.')
        .map(|idx| &token[..idx])
        .ok_or_else(|| TokenError::Malformed("missing signature separator".to_string()))?;

    let matched = signing_keys(secret)
        .into_iter()
        .find(|(_, key)| algorithm.verify(key, signing_input.as_bytes(), &signature))
        .map(|(encoding, _)| encoding)
        .ok_or(TokenError::SignatureMismatch)?;

    tracing::trace!(algorithm = algorithm.name(), key_encoding = ?matched, "Token signature verified");

    claims.check_time(now)?;
    claims.into_identity()
}

fn decode(segment: &str, name: &str) -> Result<Vec<u8>, TokenError> {
    decode_segment(segment)
        .map_err(|e| TokenError::Malformed(format!("{} is not base64url: {}", name, e)))
}
