//! Outbound application events.
//!
//! The [`Supervisor`](super::service::Supervisor) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, status page, etc.).

use core::net::Ipv4Addr;
use core::time::Duration;

use crate::error::Error;
use crate::events::MacAddr;
use crate::fsm::Phase;
use crate::fsm::auth::AuthMode;
use crate::fsm::reason::DisconnectReason;

use super::ports::IpInfo;

/// Step of the AP NAT/DNS coordination sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationStep {
    DefaultRoute,
    EnableNapt,
    ReadDns,
    StopDhcpServer,
    DnsOffer,
    SetDns,
    StartDhcpServer,
    SetApAddress,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The supervisor has applied the initial STA configuration.
    Started { ssid: heapless::String<32>, threshold: AuthMode },

    /// The STA phase changed.
    PhaseChanged { from: Phase, to: Phase },

    /// The STA associated with an access point.
    Associated { bssid: MacAddr, aid: u16 },

    /// The STA lost its association.
    Disconnected { reason: DisconnectReason },

    /// An uplink address was obtained.
    UplinkAcquired(IpInfo),

    /// The uplink address was lost.
    UplinkLost,

    /// The AP coordination sequence finished (`dns` is the relayed server).
    CoordinationComplete { dns: Option<Ipv4Addr> },

    /// One coordination step failed; the rest were still attempted.
    CoordinationStepFailed(CoordinationStep),

    /// The threshold moved to a new rung.
    AuthEscalated { index: usize, threshold: AuthMode },

    /// The ladder ran out and restarted at rung 0.
    AuthModesExhausted,

    /// A reconnect timer was armed.
    BackoffArmed(Duration),

    /// A disconnect arrived while the reconnect timer was already pending.
    BackoffCoalesced,

    /// Stored credentials were written to the STA configuration.
    CredentialsApplied { ssid: heapless::String<32> },

    /// A network, timer or storage operation failed.
    OperationFailed { op: &'static str, error: Error },

    // ── Informational ─────────────────────────────────────────
    StaStarted,
    StaStopped,
    ApStarted,
    ApStopped,
    ApClientJoined { mac: MacAddr, aid: u16 },
    ApClientLeft { mac: MacAddr, aid: u16, reason: u16 },
    ApClientAssignedIp { mac: MacAddr, ip: Ipv4Addr },
}
