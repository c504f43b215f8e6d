//! STA disconnect reasons and the recovery policy each one selects.
//!
//! ```text
//!   NoApFoundInAuthmodeThreshold          ──▶ Escalate
//!   NoApFound · 4WayHandshakeTimeout
//!     · ConnectionFail                    ──▶ RefreshCredentials
//!   everything else (incl. unknown codes) ──▶ Backoff
//! ```

use core::fmt;

/// Reason code carried by a STA disconnect event.
///
/// Codes match ESP-IDF `wifi_err_reason_t`.  Codes this firmware has no
/// name for are kept verbatim in [`DisconnectReason::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Unspecified,
    AuthExpire,
    AuthLeave,
    AssocExpire,
    AssocTooMany,
    NotAuthed,
    NotAssoced,
    AssocLeave,
    AssocNotAuthed,
    MicFailure,
    FourWayHandshakeTimeout,
    GroupKeyUpdateTimeout,
    UnsuppRsnIeVersion,
    Ieee8021xAuthFailed,
    BeaconTimeout,
    NoApFound,
    AuthFail,
    AssocFail,
    HandshakeTimeout,
    ConnectionFail,
    ApTsfReset,
    Roaming,
    SaQueryTimeout,
    NoApFoundWithCompatibleSecurity,
    NoApFoundInAuthmodeThreshold,
    NoApFoundInRssiThreshold,
    Other(u16),
}

const NAMED: [(u16, DisconnectReason); 26] = [
    (1, DisconnectReason::Unspecified),
    (2, DisconnectReason::AuthExpire),
    (3, DisconnectReason::AuthLeave),
    (4, DisconnectReason::AssocExpire),
    (5, DisconnectReason::AssocTooMany),
    (6, DisconnectReason::NotAuthed),
    (7, DisconnectReason::NotAssoced),
    (8, DisconnectReason::AssocLeave),
    (9, DisconnectReason::AssocNotAuthed),
    (14, DisconnectReason::MicFailure),
    (15, DisconnectReason::FourWayHandshakeTimeout),
    (16, DisconnectReason::GroupKeyUpdateTimeout),
    (21, DisconnectReason::UnsuppRsnIeVersion),
    (23, DisconnectReason::Ieee8021xAuthFailed),
    (200, DisconnectReason::BeaconTimeout),
    (201, DisconnectReason::NoApFound),
    (202, DisconnectReason::AuthFail),
    (203, DisconnectReason::AssocFail),
    (204, DisconnectReason::HandshakeTimeout),
    (205, DisconnectReason::ConnectionFail),
    (206, DisconnectReason::ApTsfReset),
    (207, DisconnectReason::Roaming),
    (209, DisconnectReason::SaQueryTimeout),
    (210, DisconnectReason::NoApFoundWithCompatibleSecurity),
    (211, DisconnectReason::NoApFoundInAuthmodeThreshold),
    (212, DisconnectReason::NoApFoundInRssiThreshold),
];

impl DisconnectReason {
    pub fn from_code(code: u16) -> Self {
        NAMED
            .iter()
            .find(|(c, _)| *c == code)
            .map_or(Self::Other(code), |(_, r)| *r)
    }

    pub fn code(self) -> u16 {
        if let Self::Other(code) = self {
            return code;
        }
        NAMED
            .iter()
            .find(|(_, r)| *r == self)
            .map_or(0, |(c, _)| *c)
    }

    pub fn policy(self) -> RecoveryPolicy {
        match self {
            Self::NoApFoundInAuthmodeThreshold => RecoveryPolicy::Escalate,
            Self::NoApFound | Self::FourWayHandshakeTimeout | Self::ConnectionFail => {
                RecoveryPolicy::RefreshCredentials
            }
            _ => RecoveryPolicy::Backoff,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "unknown({code})"),
            named => write!(f, "{named:?}({})", named.code()),
        }
    }
}

/// What the supervisor does after a STA disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Advance the authentication threshold and reconnect immediately.
    Escalate,
    /// Re-read stored credentials and reconnect immediately.
    RefreshCredentials,
    /// Reconnect after the fixed backoff delay.
    Backoff,
}
