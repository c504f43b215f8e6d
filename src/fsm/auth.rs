//! Authentication-mode threshold ladder.
//!
//! The STA interface only associates with networks whose security is at
//! least the configured threshold.  When the radio reports that nothing
//! matched, the supervisor climbs one rung of the ladder and retries.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of rungs a ladder may hold.
pub const MAX_LADDER_LEN: usize = 16;

/// The configured escalation order.
pub type AuthLadder = heapless::Vec<AuthMode, MAX_LADDER_LEN>;

/// STA authentication threshold.
///
/// Discriminants match ESP-IDF `wifi_auth_mode_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AuthMode {
    Open = 0,
    Wep = 1,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Psk = 4,
    Wpa2Enterprise = 5,
    Wpa3Psk = 6,
    Wpa2Wpa3Psk = 7,
    WapiPsk = 8,
    Owe = 9,
    Wpa3Enterprise192 = 10,
    Wpa3ExtPsk = 11,
    Wpa3ExtPskMixed = 12,
    Dpp = 13,
}

impl AuthMode {
    /// Every mode in driver enumeration order.
    pub const ALL: [AuthMode; 14] = [
        Self::Open,
        Self::Wep,
        Self::WpaPsk,
        Self::Wpa2Psk,
        Self::WpaWpa2Psk,
        Self::Wpa2Enterprise,
        Self::Wpa3Psk,
        Self::Wpa2Wpa3Psk,
        Self::WapiPsk,
        Self::Owe,
        Self::Wpa3Enterprise192,
        Self::Wpa3ExtPsk,
        Self::Wpa3ExtPskMixed,
        Self::Dpp,
    ];

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_raw() == raw)
    }

    /// Ladder in driver enumeration order.
    pub fn default_ladder() -> AuthLadder {
        AuthLadder::from_slice(&Self::ALL).unwrap_or_default()
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "OPEN",
            Self::Wep => "WEP",
            Self::WpaPsk => "WPA_PSK",
            Self::Wpa2Psk => "WPA2_PSK",
            Self::WpaWpa2Psk => "WPA_WPA2_PSK",
            Self::Wpa2Enterprise => "WPA2_ENTERPRISE",
            Self::Wpa3Psk => "WPA3_PSK",
            Self::Wpa2Wpa3Psk => "WPA2_WPA3_PSK",
            Self::WapiPsk => "WAPI_PSK",
            Self::Owe => "OWE",
            Self::Wpa3Enterprise192 => "WPA3_ENT_192",
            Self::Wpa3ExtPsk => "WPA3_EXT_PSK",
            Self::Wpa3ExtPskMixed => "WPA3_EXT_PSK_MIXED",
            Self::Dpp => "DPP",
        };
        f.write_str(name)
    }
}

/// Outcome of advancing the ladder by one rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub index: usize,
    /// `true` when the ladder ran out and restarted at rung 0.
    pub wrapped: bool,
}

/// Next rung after `current` on a ladder of `len` rungs.
pub fn next_index(current: usize, len: usize) -> Step {
    if len == 0 || current + 1 >= len {
        Step {
            index: 0,
            wrapped: true,
        }
    } else {
        Step {
            index: current + 1,
            wrapped: false,
        }
    }
}
