//! Unified error types for the NAT router firmware.
//!
//! Each collaborator reports failures through its own small enum; all of
//! them convert into the top-level [`Error`] so `main` can funnel startup
//! failures through one type.  Every variant is `Copy` so errors can be
//! logged and forwarded through the event sink without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A network-stack operation failed.
    Net(NetError),
    /// The reconnect timer could not be created or armed.
    Timer(TimerError),
    /// A credential pair failed validation.
    Credential(CredentialError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Net(e) => write!(f, "net: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Credential(e) => write!(f, "credential: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Network stack errors
// ---------------------------------------------------------------------------

/// Failure reported by the network interface layer.
///
/// `Driver` carries the raw `esp_err_t` so log lines match the ESP-IDF
/// error tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    Driver(i32),
    /// The interface handle has not been created yet.
    NoInterface,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(rc) => write!(f, "driver error (rc={rc})"),
            Self::NoInterface => write!(f, "interface not initialised"),
        }
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    CreateFailed(i32),
    ArmFailed(i32),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed(rc) => write!(f, "timer create failed (rc={rc})"),
            Self::ArmFailed(rc) => write!(f, "timer start failed (rc={rc})"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Ssid,
    Password,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssid => write!(f, "SSID"),
            Self::Password => write!(f, "password"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// Field is empty or longer than the 802.11 limit (`len` in bytes).
    InvalidCredential { field: CredentialField, len: usize },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential { field, len } if *len == 0 => {
                write!(f, "{field} must not be empty")
            }
            Self::InvalidCredential { field, len } => {
                write!(f, "{field} too long ({len} bytes)")
            }
        }
    }
}

impl From<CredentialError> for Error {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

