use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Malformed password hash")]
    MalformedHash,
    #[error("Key derivation failed")]
    KeyDerivationError,
    #[error("Invalid signing key")]
    InvalidSigningKey,
}

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ROUNDS: u32 = 100_000;

const HASH_SCHEME: &str = "pbkdf2-sha256";

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

pub fn derive_key(password: &str, salt: &[u8], rounds: u32) -> Result<[u8; KEY_LEN], SecurityError> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, rounds, &mut key)
        .map_err(|_| SecurityError::KeyDerivationError)?;
    Ok(key)
}

/// Hashes `password` into the self-describing form
/// `pbkdf2-sha256$<rounds>$<salt hex>$<key hex>`, which is also what
/// `ADMIN_PASSWORD_HASH` is expected to contain.
pub fn hash_password(password: &str) -> Result<String, SecurityError> {
    hash_password_with(password, &generate_salt(), PBKDF2_ROUNDS)
}

pub fn hash_password_with(password: &str, salt: &[u8], rounds: u32) -> Result<String, SecurityError> {
    let key = derive_key(password, salt, rounds)?;
    Ok(format!(
        "{}${}${}${}",
        HASH_SCHEME,
        rounds,
        hex::encode(salt),
        hex::encode(key)
    ))
}

/// Checks that an encoded hash is well formed without verifying anything.
pub fn validate_hash(encoded: &str) -> Result<(), SecurityError> {
    parse_hash(encoded).map(|_| ())
}

pub fn verify_password(encoded: &str, password: &str) -> Result<bool, SecurityError> {
    let (rounds, salt, expected) = parse_hash(encoded)?;
    let key = derive_key(password, &salt, rounds)?;
    Ok(constant_time_eq(&key, &expected))
}

fn parse_hash(encoded: &str) -> Result<(u32, Vec<u8>, Vec<u8>), SecurityError> {
    let mut parts = encoded.split('$');
    let scheme = parts.next().ok_or(SecurityError::MalformedHash)?;
    if scheme != HASH_SCHEME {
        return Err(SecurityError::MalformedHash);
    }
    let rounds = parts
        .next()
        .and_then(|r| r.parse::<u32>().ok())
        .filter(|r| *r > 0)
        .ok_or(SecurityError::MalformedHash)?;
    let salt = parts
        .next()
        .and_then(|s| hex::decode(s).ok())
        .ok_or(SecurityError::MalformedHash)?;
    let key = parts
        .next()
        .and_then(|k| hex::decode(k).ok())
        .filter(|k| k.len() == KEY_LEN)
        .ok_or(SecurityError::MalformedHash)?;
    if parts.next().is_some() {
        return Err(SecurityError::MalformedHash);
    }
    Ok((rounds, salt, key))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Issues an admin session token of the form `<issued_at>.<hmac hex>`.
pub fn sign_session(secret: &str, username: &str, issued_at: i64) -> Result<String, SecurityError> {
    let mac = session_mac(secret, username, issued_at)?;
    let sig = mac.finalize().into_bytes();
    Ok(format!("{}.{}", issued_at, hex::encode(sig)))
}

/// Returns true when `token` was signed with `secret` for `username` and is
/// no older than `max_age_secs` at time `now`.
pub fn verify_session(secret: &str, username: &str, token: &str, now: i64, max_age_secs: i64) -> bool {
    let Some((issued, sig_hex)) = token.split_once('.') else {
        return false;
    };
    let Ok(issued_at) = issued.parse::<i64>() else {
        return false;
    };
    match now.checked_sub(issued_at) {
        Some(age) if (0..=max_age_secs).contains(&age) => {}
        _ => return false,
    }
    let Ok(sig) = hex::decode(sig_hex) else {
        return false;
    };
    match session_mac(secret, username, issued_at) {
        Ok(mac) => mac.verify_slice(&sig).is_ok(),
        Err(_) => false,
    }
}

fn session_mac(secret: &str, username: &str, issued_at: i64) -> Result<HmacSha256, SecurityError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SecurityError::InvalidSigningKey)?;
    mac.update(format!("admin:{}:{}", username, issued_at).as_bytes());
    Ok(mac)
}
