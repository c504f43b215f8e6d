//! Router configuration parameters
//!
//! All tunable parameters for the NAT router.  Defaults are compiled in;
//! a validated override can be persisted in NVS through
//! [`ConfigPort`](crate::app::ports::ConfigPort).

use core::net::Ipv4Addr;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::credentials::{Credentials, MAX_PASSWORD_LEN, MAX_SSID_LEN};
use crate::error::CredentialError;
use crate::fsm::auth::{AuthLadder, AuthMode};

/// Core router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    // --- Access point ---
    pub ap_ssid: heapless::String<MAX_SSID_LEN>,
    /// Empty means an open network.
    pub ap_password: heapless::String<MAX_PASSWORD_LEN>,
    pub ap_channel: u8,
    pub ap_max_connections: u8,
    pub ap_ip: [u8; 4],
    pub ap_netmask: [u8; 4],

    // --- Station ---
    /// Used when the credential store holds nothing.
    pub sta_default_ssid: heapless::String<MAX_SSID_LEN>,
    pub sta_default_password: heapless::String<MAX_PASSWORD_LEN>,
    /// Driver-level association retries before a disconnect is reported.
    pub sta_failure_retry_cnt: u8,

    // --- Supervisor ---
    /// Fixed backoff before a reconnect attempt (seconds)
    pub reconnect_delay_secs: u32,
    /// Threshold escalation order.
    pub auth_ladder: AuthLadder,
    /// Rung applied before the first connect.
    pub initial_auth_index: u8,

    // --- Peripherals ---
    /// Status LED poll/blink period (milliseconds)
    pub status_blink_interval_ms: u32,
    pub http_port: u16,
}

fn fixed<const N: usize>(value: &str) -> heapless::String<N> {
    let mut s = heapless::String::new();
    // Compile-time defaults are always within capacity.
    let _ = s.push_str(value);
    s
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            // Access point
            ap_ssid: fixed("ESP32-NAT"),
            ap_password: fixed("12345678"),
            ap_channel: 1,
            ap_max_connections: 3,
            ap_ip: [192, 168, 2, 1],
            ap_netmask: [255, 255, 255, 0],

            // Station
            sta_default_ssid: fixed("SSID"),
            sta_default_password: fixed("PASS"),
            sta_failure_retry_cnt: 2,

            // Supervisor
            reconnect_delay_secs: 3,
            auth_ladder: AuthMode::default_ladder(),
            initial_auth_index: AuthMode::Wpa2Psk as u8,

            // Peripherals
            status_blink_interval_ms: 500,
            http_port: 80,
        }
    }
}

impl RouterConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ap_ssid.is_empty() {
            return Err(ConfigError::ValidationFailed("ap_ssid must not be empty"));
        }
        let ap_pw = self.ap_password.len();
        if ap_pw != 0 && ap_pw < 8 {
            return Err(ConfigError::ValidationFailed(
                "ap_password must be empty or 8–64 bytes",
            ));
        }
        if !(1..=13).contains(&self.ap_channel) {
            return Err(ConfigError::ValidationFailed("ap_channel must be 1–13"));
        }
        if !(1..=10).contains(&self.ap_max_connections) {
            return Err(ConfigError::ValidationFailed(
                "ap_max_connections must be 1–10",
            ));
        }
        if self.default_credentials().is_err() {
            return Err(ConfigError::ValidationFailed(
                "sta default credentials must be non-empty",
            ));
        }
        if !(1..=300).contains(&self.reconnect_delay_secs) {
            return Err(ConfigError::ValidationFailed(
                "reconnect_delay_secs must be 1–300",
            ));
        }
        if self.auth_ladder.is_empty() {
            return Err(ConfigError::ValidationFailed("auth_ladder must not be empty"));
        }
        if usize::from(self.initial_auth_index) >= self.auth_ladder.len() {
            return Err(ConfigError::ValidationFailed(
                "initial_auth_index must index into auth_ladder",
            ));
        }
        if !(50..=10_000).contains(&self.status_blink_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "status_blink_interval_ms must be 50–10000",
            ));
        }
        if self.http_port == 0 {
            return Err(ConfigError::ValidationFailed("http_port must be non-zero"));
        }
        Ok(())
    }

    pub fn ap_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ap_ip)
    }

    pub fn ap_netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ap_netmask)
    }

    pub fn default_credentials(&self) -> Result<Credentials, CredentialError> {
        Credentials::new(&self.sta_default_ssid, &self.sta_default_password)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.reconnect_delay_secs))
    }

    pub fn status_blink_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.status_blink_interval_ms))
    }

    /// Threshold at `index`, or `None` past the end of the ladder.
    pub fn auth_mode_at(&self, index: usize) -> Option<AuthMode> {
        self.auth_ladder.get(index).copied()
    }

    /// Security the soft-AP advertises.  `sae_supported` reflects whether
    /// the driver was built with SoftAP SAE support.
    pub fn ap_auth_mode(&self, sae_supported: bool) -> AuthMode {
        if self.ap_password.is_empty() {
            AuthMode::Open
        } else if sae_supported {
            AuthMode::Wpa3Psk
        } else {
            AuthMode::Wpa2Psk
        }
    }
}
