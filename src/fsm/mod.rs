//! STA connection state model.
//!
//! ```text
//!            StaStarted              StaConnected
//!   Idle ───────────────▶ Connecting ─────────────▶ Connected
//!                           ▲   ▲                       │
//!                 immediate │   │ timer expiry          │ StaDisconnected
//!                           │   │                       ▼
//!                      Escalating ◀─── threshold ── Disconnected
//! ```
//!
//! The [`ConnectionState`] is plain data.  Only
//! [`Supervisor`](crate::app::service::Supervisor) mutates it; every
//! handler receives it by exclusive borrow through the supervisor, so no
//! locking is involved.

pub mod auth;
pub mod reason;

use core::fmt;

use crate::credentials::Credentials;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle phase of the STA uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
    Escalating = 4,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Escalating => "Escalating",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub phase: Phase,
    /// Rung of the authentication ladder currently applied to the STA.
    pub auth_index: usize,
    /// Pair most recently written to the STA configuration.
    pub credentials: Credentials,
    /// Set by an IP-assigned event; gates the AP NAT/DNS coordination.
    pub uplink_ready: bool,
    /// A one-shot reconnect timer is pending.
    pub retry_timer_armed: bool,
    /// A disconnect request has been issued since the last connect request.
    pub sta_released: bool,
    /// The supervisor tore down a live association itself; the matching
    /// `AssocLeave` disconnect event is not a link failure.
    pub awaiting_own_leave: bool,
}

impl ConnectionState {
    pub fn new(auth_index: usize, credentials: Credentials) -> Self {
        Self {
            phase: Phase::Idle,
            auth_index,
            credentials,
            uplink_ready: false,
            retry_timer_armed: false,
            sta_released: false,
            awaiting_own_leave: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }
}
