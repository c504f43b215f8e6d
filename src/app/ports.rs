//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor (domain)
//! ```
//!
//! Driven adapters (network stack, timer, credential store, event sinks)
//! implement these traits.  The [`Supervisor`](super::service::Supervisor)
//! consumes them via generics, so the domain core never touches the radio
//! directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **CredentialStore** implementations only hand back pairs that pass
//!   [`Credentials::new`].
//! - All port errors are typed; callers must handle every variant explicitly.

use core::net::Ipv4Addr;
use core::time::Duration;

use crate::config::RouterConfig;
use crate::credentials::{Credentials, MAX_PASSWORD_LEN, MAX_SSID_LEN};
use crate::error::{NetError, TimerError};
use crate::fsm::auth::AuthMode;

// ───────────────────────────────────────────────────────────────
// Network interface pair (driven adapter: domain ↔ WiFi/IP stack)
// ───────────────────────────────────────────────────────────────

/// Which of the two network interfaces an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// Local access point that clients join.
    Ap,
    /// Station interface that joins the uplink.
    Sta,
}

/// IPv4 address assignment of one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

/// The STA fields the supervisor reads and rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaConfig {
    pub ssid: heapless::String<MAX_SSID_LEN>,
    pub password: heapless::String<MAX_PASSWORD_LEN>,
    pub auth_threshold: AuthMode,
}

impl StaConfig {
    pub fn new(credentials: &Credentials, auth_threshold: AuthMode) -> Self {
        let mut cfg = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            auth_threshold,
        };
        cfg.set_credentials(credentials);
        cfg
    }

    /// Overwrite ssid and password.
    pub fn set_credentials(&mut self, credentials: &Credentials) {
        self.ssid.clear();
        self.password.clear();
        // Both fields were length-checked by `Credentials::new`.
        let _ = self.ssid.push_str(credentials.ssid());
        let _ = self.password.push_str(credentials.password());
    }
}

/// Operations on the AP + STA interface pair.
///
/// Every call is fire-and-forget: results of `connect`/`disconnect`
/// arrive later as inbound [`Event`](crate::events::Event)s.
pub trait NetworkPort {
    fn connect(&mut self) -> Result<(), NetError>;

    fn disconnect(&mut self) -> Result<(), NetError>;

    fn sta_config(&self) -> Result<StaConfig, NetError>;

    fn set_sta_config(&mut self, config: &StaConfig) -> Result<(), NetError>;

    fn set_default_route(&mut self, iface: Interface) -> Result<(), NetError>;

    /// Enable NAPT on `iface` (forwarding towards the default route).
    fn enable_napt(&mut self, iface: Interface) -> Result<(), NetError>;

    /// Main DNS server of `iface`.  `Ok(None)` when none is known.
    fn dns_server(&self, iface: Interface) -> Result<Option<Ipv4Addr>, NetError>;

    fn set_dns_server(&mut self, iface: Interface, dns: Ipv4Addr) -> Result<(), NetError>;

    fn stop_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError>;

    fn start_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError>;

    /// Enable or disable the DHCP "offer DNS server" option on `iface`.
    fn set_dns_offer(&mut self, iface: Interface, enabled: bool) -> Result<(), NetError>;

    fn set_ip_info(&mut self, iface: Interface, info: &IpInfo) -> Result<(), NetError>;
}

// ───────────────────────────────────────────────────────────────
// Timer port (driven adapter: domain → one-shot timer)
// ───────────────────────────────────────────────────────────────

/// One-shot reconnect timer.
///
/// Expiry is delivered as [`Event::ReconnectTimerFired`](crate::events::Event::ReconnectTimerFired)
/// on the inbound queue, never as a direct callback into the domain.
pub trait TimerPort {
    fn arm_once(&mut self, delay: Duration) -> Result<(), TimerError>;
}

// ───────────────────────────────────────────────────────────────
// Credential store (driven adapter: domain ↔ persistent credentials)
// ───────────────────────────────────────────────────────────────

pub trait CredentialStore {
    /// Stored pair, or `Ok(None)` when nothing has been provisioned.
    fn load(&self) -> Result<Option<Credentials>, StorageError>;

    /// Persist a pair atomically; the next `load` returns it.
    fn save(&mut self, credentials: &Credentials) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists router configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`RouterConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<RouterConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &RouterConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage, namespaced per subsystem.
///
/// Write operations MUST be atomic: no partial writes on power loss.
/// The ESP-IDF NVS API guarantees this natively; the in-memory simulation
/// achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] and [`CredentialStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// A stored value is present but unusable.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}
