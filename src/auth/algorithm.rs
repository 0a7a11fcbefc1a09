/// HMAC algorithms accepted for session tokens
///
/// The set is fixed at compile time. Anything else named in a token header,
/// `none` included, is refused before a signature is looked at.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Hs256,
    Hs384,
    Hs512,
}

impl HmacAlgorithm {
    /// Map a header `alg` value, ignoring case
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg.to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::Hs256),
            "HS384" => Some(Self::Hs384),
            "HS512" => Some(Self::Hs512),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            Self::Hs256 => 32,
            Self::Hs384 => 48,
            Self::Hs512 => 64,
        }
    }

    /// Compute the raw signature of `message` under `key`
    pub fn sign(&self, key: &[u8], message: &[u8]) -> Vec<u8> {
        match self {
            Self::Hs256 => mac_bytes::<Hmac<Sha256>>(key, message),
            Self::Hs384 => mac_bytes::<Hmac<Sha384>>(key, message),
            Self::Hs512 => mac_bytes::<Hmac<Sha512>>(key, message),
        }
    }

    /// Constant-time check of `signature` against `message` under `key`
    ///
    /// A signature of the wrong length is rejected without comparing bytes.
    pub fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        if signature.len() != self.output_len() {
            return false;
        }
        match self {
            Self::Hs256 => mac_verify::<Hmac<Sha256>>(key, message, signature),
            Self::Hs384 => mac_verify::<Hmac<Sha384>>(key, message, signature),
            Self::Hs512 => mac_verify::<Hmac<Sha512>>(key, message, signature),
        }
    }
}

fn keyed<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> Option<M> {
    // HMAC accepts keys of any length; this only fails for fixed-size MACs.
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key).ok()?;
    mac.update(message);
    Some(mac)
}

fn mac_bytes<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8]) -> Vec<u8> {
    keyed::<M>(key, message)
        .map(|mac| mac.finalize().into_bytes().to_vec())
        .unwrap_or_default()
}

fn mac_verify<M: Mac + hmac::digest::KeyInit>(key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    keyed::<M>(key, message)
        .map(|mac| mac.verify_slice(signature).is_ok())
        .unwrap_or(false)
}
