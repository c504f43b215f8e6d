//! Credential provisioning.
//!
//! Decodes an `application/x-www-form-urlencoded` body carrying `ssid`
//! and `password`, persists the pair, then posts
//! [`Event::CredentialsUpdated`] so the supervisor re-applies it.  The
//! transport (HTTP handler) lives in `adapters::http`.

use core::fmt;

use log::{info, warn};

use crate::credentials::Credentials;
use crate::error::CredentialError;
use crate::events::{Event, EventQueue};

use super::ports::{CredentialStore, StorageError};

/// Largest accepted form body.  Fits both fields fully percent-encoded.
pub const MAX_FORM_BYTES: usize = 512;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    TooLarge(usize),
    MissingField(&'static str),
    /// A `%` escape was truncated or not hexadecimal.
    BadEscape,
    InvalidUtf8,
    Credential(CredentialError),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge(n) => write!(f, "form body too large ({n} bytes, max {MAX_FORM_BYTES})"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::BadEscape => write!(f, "malformed percent escape"),
            Self::InvalidUtf8 => write!(f, "field is not valid UTF-8"),
            Self::Credential(e) => write!(f, "{e}"),
        }
    }
}

impl From<CredentialError> for FormError {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionError {
    Form(FormError),
    Storage(StorageError),
    /// Stored, but the supervisor could not be notified.
    QueueFull,
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form(e) => write!(f, "invalid form: {e}"),
            Self::Storage(e) => write!(f, "storing credentials failed: {e}"),
            Self::QueueFull => write!(f, "event queue full"),
        }
    }
}

impl From<FormError> for ProvisionError {
    fn from(e: FormError) -> Self {
        Self::Form(e)
    }
}

impl From<StorageError> for ProvisionError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ───────────────────────────────────────────────────────────────
// Decoding
// ───────────────────────────────────────────────────────────────

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode one form component: `+` is a space, `%XX` is a byte.
pub fn percent_decode(raw: &[u8]) -> Result<String, FormError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hi = raw.get(i + 1).copied().and_then(hex_val);
                let lo = raw.get(i + 2).copied().and_then(hex_val);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                    _ => return Err(FormError::BadEscape),
                }
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out).map_err(|_| FormError::InvalidUtf8)
}

/// Parse a provisioning form body into a validated pair.
///
/// Field order is free and unknown fields are ignored; a repeated field
/// keeps its last value.
pub fn parse_form(body: &[u8]) -> Result<Credentials, FormError> {
    if body.len() > MAX_FORM_BYTES {
        return Err(FormError::TooLarge(body.len()));
    }

    let mut ssid = None;
    let mut password = None;
    for pair in body.split(|&b| b == b'&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &[][..]),
        };
        match percent_decode(key)?.as_str() {
            "ssid" => ssid = Some(percent_decode(value)?),
            "password" => password = Some(percent_decode(value)?),
            _ => {}
        }
    }

    let ssid = ssid.ok_or(FormError::MissingField("ssid"))?;
    let password = password.ok_or(FormError::MissingField("password"))?;
    Ok(Credentials::new(&ssid, &password)?)
}

// ───────────────────────────────────────────────────────────────
// Submit
// ───────────────────────────────────────────────────────────────

/// Decode, persist, then notify the supervisor.
///
/// The store is written before the event is posted, so the supervisor's
/// refresh always reads the newest pair.
pub fn submit(
    body: &[u8],
    store: &mut impl CredentialStore,
    queue: &EventQueue,
) -> Result<Credentials, ProvisionError> {
    let creds = parse_form(body)?;
    store.save(&creds)?;
    info!("provisioning: stored credentials for '{}'", creds.ssid());

    if !queue.push(Event::CredentialsUpdated) {
        warn!("provisioning: event queue full, credentials apply on next refresh");
        return Err(ProvisionError::QueueFull);
    }
    Ok(creds)
}
