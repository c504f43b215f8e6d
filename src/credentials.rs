//! STA credential value type.
//!
//! A [`Credentials`] pair can only be built through [`Credentials::new`],
//! which rejects empty fields and anything longer than the 802.11 limits
//! instead of truncating.  Every pair the supervisor applies to the STA
//! interface has passed through this constructor.

use core::fmt;

use crate::error::{CredentialError, CredentialField};

/// Maximum SSID length in bytes (802.11).
pub const MAX_SSID_LEN: usize = 32;
/// Maximum WPA passphrase length in bytes.
pub const MAX_PASSWORD_LEN: usize = 64;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    ssid: heapless::String<MAX_SSID_LEN>,
    password: heapless::String<MAX_PASSWORD_LEN>,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, CredentialError> {
        Ok(Self {
            ssid: bounded(ssid, CredentialField::Ssid)?,
            password: bounded(password, CredentialField::Password)?,
        })
    }

    pub fn ssid(&self) -> &str {
        self.ssid.as_str()
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    pub fn ssid_string(&self) -> heapless::String<MAX_SSID_LEN> {
        self.ssid.clone()
    }
}

fn bounded<const N: usize>(
    value: &str,
    field: CredentialField,
) -> Result<heapless::String<N>, CredentialError> {
    let invalid = CredentialError::InvalidCredential {
        field,
        len: value.len(),
    };
    if value.is_empty() {
        return Err(invalid);
    }
    let mut out = heapless::String::new();
    out.push_str(value).map_err(|()| invalid)?;
    Ok(out)
}

// Passwords never reach the log.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid.as_str())
            .field("password", &"***")
            .finish()
    }
}
