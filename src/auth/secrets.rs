/// Session secret resolution
///
/// Secrets are looked up through an explicit, ordered candidate list of
/// (source, name) pairs; the first non-empty value wins. The resolved secret
/// is then expanded into the ordered key interpretations the verifier tries.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::sync::Arc;

/// Somewhere a named secret may be configured
pub trait SecretSource: Send + Sync {
    /// Short label used in logs
    fn label(&self) -> &'static str;
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Secrets handed in through application configuration
///
/// Names match case-insensitively since the config layer lowercases keys.
#[derive(Clone, Default)]
pub struct ConfigSecrets {
    values: HashMap<String, String>,
}

impl ConfigSecrets {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        }
    }
}

impl SecretSource for ConfigSecrets {
    fn label(&self) -> &'static str {
        "config"
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(&name.to_ascii_lowercase()).cloned()
    }
}

/// Process environment, read at lookup time
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn label(&self) -> &'static str {
        "env"
    }

    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A resolved secret and where it came from
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub source: &'static str,
    pub name: String,
    value: String,
}

impl ResolvedSecret {
    pub fn value(&self) -> &str {
        &self.value
    }
}

// Never print secret material.
impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Resolves the session secret from an ordered list of candidates
#[derive(Clone)]
pub struct SecretResolver {
    candidates: Vec<(Arc<dyn SecretSource>, String)>,
}

impl SecretResolver {
    /// Build the candidate list: every name in every source, sources in
    /// priority order, names in priority order within each source.
    pub fn new(sources: Vec<Arc<dyn SecretSource>>, names: &[String]) -> Self {
        let candidates = sources
            .iter()
            .flat_map(|source| {
                names
                    .iter()
                    .map(move |name| (Arc::clone(source), name.clone()))
            })
            .collect();
        Self { candidates }
    }

    /// Configuration first, process environment as the fallback
    pub fn with_config_and_env(config: ConfigSecrets, names: &[String]) -> Self {
        Self::new(vec![Arc::new(config), Arc::new(EnvSecrets)], names)
    }

    /// The ordered (source, name) pairs this resolver consults
    pub fn candidates(&self) -> Vec<(&'static str, &str)> {
        self.candidates
            .iter()
            .map(|(source, name)| (source.label(), name.as_str()))
            .collect()
    }

    pub fn resolve(&self) -> Option<ResolvedSecret> {
        self.candidates.iter().find_map(|(source, name)| {
            source
                .lookup(name)
                .filter(|value| !value.trim().is_empty())
                .map(|value| ResolvedSecret {
                    source: source.label(),
                    name: name.clone(),
                    value,
                })
        })
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver")
            .field("candidates", &self.candidates())
            .finish()
    }
}

/// How the secret text is turned into HMAC key bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Utf8,
    Base64,
}

/// Interpretations tried for every token, in order
pub const KEY_ENCODINGS: [KeyEncoding; 2] = [KeyEncoding::Utf8, KeyEncoding::Base64];

impl KeyEncoding {
    pub fn key_bytes(&self, secret: &str) -> Option<Vec<u8>> {
        match self {
            KeyEncoding::Utf8 => Some(secret.as_bytes().to_vec()),
            KeyEncoding::Base64 => STANDARD
                .decode(secret.trim())
                .ok()
                .filter(|bytes| !bytes.is_empty()),
        }
    }
}

/// Candidate keys derived from a secret, skipping interpretations that do
/// not apply (e.g. a secret that is not valid base64)
pub fn signing_keys(secret: &str) -> Vec<(KeyEncoding, Vec<u8>)> {
    KEY_ENCODINGS
        .iter()
        .filter_map(|encoding| encoding.key_bytes(secret).map(|key| (*encoding, key)))
        .collect()
}
