/// Authentication module
///
/// Handles scrypt password hashing and verification, and verification of
/// HMAC-signed session tokens into a request identity.

mod algorithm;
mod base64url;
mod claims;
mod extract;
mod password;
mod secrets;
mod session;
mod token;

pub use algorithm::HmacAlgorithm;
pub use base64url::decode_segment;
pub use claims::{Identity, SessionClaims, TokenHeader};
pub use extract::{bearer_token, default_cookie_names, extract_token, SESSION_COOKIE_NAMES};
pub use password::{
    decoy_record, hash_password, is_legacy_bcrypt_hash, needs_rehash, verify_password, HashOptions,
    HASH_IDENTIFIER, HASH_VERSION, MAX_KDF_MEMORY,
};
pub use secrets::{
    signing_keys, ConfigSecrets, EnvSecrets, KeyEncoding, ResolvedSecret, SecretResolver,
    SecretSource, KEY_ENCODINGS,
};
pub use session::SessionResolver;
pub use token::{verify_with_secret, TokenVerifier};
