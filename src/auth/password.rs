/// Password Hashing and Verification
///
/// Produces self-describing scrypt records of the form
/// `scrypt:1:<cost>:<blockSize>:<parallelization>:<keyLength>:<salt>:<hash>`
/// with standard base64 salt and hash. Because every record carries its own
/// parameters, defaults can be raised at any time and old records keep
/// verifying until `needs_rehash` prompts the caller to replace them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::error::PasswordError;

pub const HASH_IDENTIFIER: &str = "scrypt";
pub const HASH_VERSION: &str = "1";

const DEFAULT_COST: u32 = 16384;
const DEFAULT_BLOCK_SIZE: u32 = 8;
const DEFAULT_PARALLELIZATION: u32 = 1;
const DEFAULT_KEY_LENGTH: usize = 64;
const DEFAULT_SALT_LENGTH: usize = 16;

const RECORD_FIELDS: usize = 8;
const LEGACY_BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Headroom applied on top of scrypt's `128 * r * (N + p)` working set.
const MEMORY_SAFETY_MULTIPLIER: u64 = 2;
/// Upper bound on the memory ceiling of a single KDF call (1 GiB).
pub const MAX_KDF_MEMORY: u64 = 1 << 30;
const MAX_KEY_LENGTH: usize = 1024;
const MAX_SALT_LENGTH: usize = 1024;

/// Tunable scrypt parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashOptions {
    /// CPU/memory cost `N`; must be a power of two greater than 1
    pub cost: u32,
    /// Block size `r`
    pub block_size: u32,
    /// Parallelization `p`
    pub parallelization: u32,
    /// Derived key length in bytes
    pub key_length: usize,
    /// Salt length in bytes
    pub salt_length: usize,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            cost: DEFAULT_COST,
            block_size: DEFAULT_BLOCK_SIZE,
            parallelization: DEFAULT_PARALLELIZATION,
            key_length: DEFAULT_KEY_LENGTH,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

impl HashOptions {
    /// Check the options before any work is done.
    ///
    /// # Errors
    /// Returns `PasswordError::InvalidParams` describing the first bad field
    pub fn validate(&self) -> Result<(), PasswordError> {
        if self.key_length == 0 || self.key_length > MAX_KEY_LENGTH {
            return Err(PasswordError::InvalidParams(format!(
                "key length must be between 1 and {}",
                MAX_KEY_LENGTH
            )));
        }
        if self.salt_length == 0 || self.salt_length > MAX_SALT_LENGTH {
            return Err(PasswordError::InvalidParams(format!(
                "salt length must be between 1 and {}",
                MAX_SALT_LENGTH
            )));
        }
        kdf_params(self.cost, self.block_size, self.parallelization)
            .map(|_| ())
            .ok_or_else(|| {
                PasswordError::InvalidParams(format!(
                    "cost={} blockSize={} parallelization={} is not a usable scrypt configuration",
                    self.cost, self.block_size, self.parallelization
                ))
            })
    }
}

/// A decoded password hash record
#[derive(Debug, Clone, PartialEq, Eq)]
struct HashRecord {
    algorithm: String,
    version: String,
    cost: u32,
    block_size: u32,
    parallelization: u32,
    key_length: usize,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl HashRecord {
    fn decode(record: &str) -> Option<Self> {
        let parts: Vec<&str> = record.split(':').collect();
        if parts.len() != RECORD_FIELDS {
            return None;
        }

        let cost = parse_positive::<u32>(parts[2])?;
        let block_size = parse_positive::<u32>(parts[3])?;
        let parallelization = parse_positive::<u32>(parts[4])?;
        let key_length = parse_positive::<usize>(parts[5])?;

        if parts[6].is_empty() || parts[7].is_empty() {
            return None;
        }
        let salt = STANDARD.decode(parts[6]).ok()?;
        let hash = STANDARD.decode(parts[7]).ok()?;

        Some(Self {
            algorithm: parts[0].to_string(),
            version: parts[1].to_string(),
            cost,
            block_size,
            parallelization,
            key_length,
            salt,
            hash,
        })
    }

    fn encode(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}",
            self.algorithm,
            self.version,
            self.cost,
            self.block_size,
            self.parallelization,
            self.key_length,
            STANDARD.encode(&self.salt),
            STANDARD.encode(&self.hash),
        )
    }

    fn is_current_scheme(&self) -> bool {
        self.algorithm == HASH_IDENTIFIER && self.version == HASH_VERSION
    }
}

fn parse_positive<T>(field: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    field.parse::<T>().ok().filter(|value| *value > T::default())
}

/// Memory ceiling for one scrypt call, or `None` on overflow.
///
/// Covers both allocations scrypt makes: the `128 * N * r` ROMix scratch
/// area and the `128 * r * p` block buffer fed through PBKDF2.
fn memory_ceiling(cost: u32, block_size: u32, parallelization: u32) -> Option<u64> {
    let block_bytes = 128u64.checked_mul(u64::from(block_size))?;
    let scratch = block_bytes.checked_mul(u64::from(cost))?;
    let blocks = block_bytes.checked_mul(u64::from(parallelization))?;
    scratch
        .checked_add(blocks)?
        .checked_mul(MEMORY_SAFETY_MULTIPLIER)
}

fn kdf_params(cost: u32, block_size: u32, parallelization: u32) -> Option<scrypt::Params> {
    if cost < 2 || !cost.is_power_of_two() {
        return None;
    }
    if memory_ceiling(cost, block_size, parallelization)? > MAX_KDF_MEMORY {
        return None;
    }
    let log_n = cost.trailing_zeros() as u8;
    scrypt::Params::new(log_n, block_size, parallelization).ok()
}

fn derive_key(
    plaintext: &str,
    salt: &[u8],
    params: &scrypt::Params,
    key_length: usize,
) -> Result<Vec<u8>, PasswordError> {
    let mut derived = vec![0u8; key_length];
    scrypt::scrypt(plaintext.as_bytes(), salt, params, &mut derived)
        .map_err(|_| PasswordError::Kdf(format!("cannot derive a {}-byte key", key_length)))?;
    Ok(derived)
}

/// Returns true for records produced by the retired bcrypt scheme
pub fn is_legacy_bcrypt_hash(record: &str) -> bool {
    LEGACY_BCRYPT_PREFIXES
        .iter()
        .any(|prefix| record.starts_with(prefix))
}

/// Hash a password with a fresh random salt
///
/// # Arguments
/// * `plaintext` - Password to hash
/// * `options` - scrypt parameters, usually `HashOptions::default()`
///
/// # Errors
/// Returns error if the options are unusable, or if the operating system
/// cannot supply randomness or the KDF fails. The latter two indicate a
/// broken environment.
pub fn hash_password(plaintext: &str, options: &HashOptions) -> Result<String, PasswordError> {
    options.validate()?;
    let params = kdf_params(options.cost, options.block_size, options.parallelization)
        .ok_or_else(|| PasswordError::InvalidParams("unusable scrypt parameters".to_string()))?;

    let mut salt = vec![0u8; options.salt_length];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| PasswordError::Randomness(e.to_string()))?;

    let hash = derive_key(plaintext, &salt, &params, options.key_length)?;

    Ok(HashRecord {
        algorithm: HASH_IDENTIFIER.to_string(),
        version: HASH_VERSION.to_string(),
        cost: options.cost,
        block_size: options.block_size,
        parallelization: options.parallelization,
        key_length: options.key_length,
        salt,
        hash,
    }
    .encode())
}

/// A valid record for a random password nobody knows
///
/// Logins for unknown accounts, or accounts without a password, are checked
/// against it so they cost the same KDF run as a real mismatch.
///
/// # Errors
/// Same as `hash_password`
pub fn decoy_record(options: &HashOptions) -> Result<String, PasswordError> {
    let mut secret = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| PasswordError::Randomness(e.to_string()))?;
    hash_password(&STANDARD.encode(secret), options)
}

/// Verify a password against a stored record
///
/// Malformed records, foreign schemes and parameters scrypt cannot run are
/// all reported as `Ok(false)`.
///
/// # Errors
/// * `PasswordError::LegacyHash` if the record is a bcrypt hash; the caller
///   must decide how to migrate the account
/// * `PasswordError::Kdf` if key derivation fails on valid parameters
pub fn verify_password(plaintext: &str, stored: &str) -> Result<bool, PasswordError> {
    if is_legacy_bcrypt_hash(stored) {
        return Err(PasswordError::LegacyHash);
    }

    let Some(record) = HashRecord::decode(stored) else {
        tracing::debug!("Stored password record could not be decoded");
        return Ok(false);
    };

    if !record.is_current_scheme() {
        tracing::debug!(
            algorithm = %record.algorithm,
            version = %record.version,
            "Stored password record uses a foreign scheme"
        );
        return Ok(false);
    }

    if record.key_length > MAX_KEY_LENGTH {
        return Ok(false);
    }
    let Some(params) = kdf_params(record.cost, record.block_size, record.parallelization) else {
        tracing::warn!(
            cost = record.cost,
            block_size = record.block_size,
            parallelization = record.parallelization,
            "Stored password record has unusable scrypt parameters"
        );
        return Ok(false);
    };

    let derived = derive_key(plaintext, &record.salt, &params, record.key_length)?;

    // Slices of different length compare unequal without an early exit.
    Ok(bool::from(derived.ct_eq(&record.hash)))
}

/// Whether a stored record should be replaced on the next successful login
pub fn needs_rehash(stored: &str, options: &HashOptions) -> bool {
    let Some(record) = HashRecord::decode(stored) else {
        return true;
    };

    if !record.is_current_scheme() {
        return true;
    }

    record.cost != options.cost
        || record.block_size != options.block_size
        || record.parallelization != options.parallelization
        || record.key_length != options.key_length
}
