//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { ssid, threshold } => {
                info!("START | sta_ssid='{}' | threshold={}", ssid, threshold);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::Associated { bssid, aid } => {
                info!("STA   | associated bssid={} aid={}", bssid, aid);
            }
            AppEvent::Disconnected { reason } => {
                warn!("STA   | disconnected reason={}", reason);
            }
            AppEvent::UplinkAcquired(ip) => {
                info!(
                    "UPLINK | ip={} mask={} gw={}",
                    ip.ip, ip.netmask, ip.gateway
                );
            }
            AppEvent::UplinkLost => {
                warn!("UPLINK | address lost");
            }
            AppEvent::CoordinationComplete { dns } => match dns {
                Some(dns) => info!("NAT   | enabled, AP DNS={}", dns),
                None => info!("NAT   | enabled, AP DNS unchanged"),
            },
            AppEvent::CoordinationStepFailed(step) => {
                warn!("NAT   | step {:?} failed", step);
            }
            AppEvent::AuthEscalated { index, threshold } => {
                info!("AUTH  | threshold={} rung={}", threshold, index);
            }
            AppEvent::AuthModesExhausted => {
                warn!("AUTH  | all modes tried, ladder restarted");
            }
            AppEvent::BackoffArmed(delay) => {
                info!("RETRY | reconnect in {}s", delay.as_secs());
            }
            AppEvent::BackoffCoalesced => {
                info!("RETRY | already pending");
            }
            AppEvent::CredentialsApplied { ssid } => {
                info!("CREDS | applied ssid='{}'", ssid);
            }
            AppEvent::OperationFailed { op, error } => {
                warn!("ERROR | {} failed: {}", op, error);
            }
            AppEvent::StaStarted => info!("STA   | started"),
            AppEvent::StaStopped => info!("STA   | stopped"),
            AppEvent::ApStarted => info!("AP    | started"),
            AppEvent::ApStopped => info!("AP    | stopped"),
            AppEvent::ApClientJoined { mac, aid } => {
                info!("AP    | client joined mac={} aid={}", mac, aid);
            }
            AppEvent::ApClientLeft { mac, aid, reason } => {
                info!("AP    | client left mac={} aid={} reason={}", mac, aid, reason);
            }
            AppEvent::ApClientAssignedIp { mac, ip } => {
                info!("AP    | client mac={} got ip={}", mac, ip);
            }
        }
    }
}
