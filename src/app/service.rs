//! Connectivity supervisor — the hexagonal core.
//!
//! [`Supervisor`] owns the [`ConnectionState`] and reacts to inbound
//! [`Event`]s one at a time.  All I/O flows through port traits injected
//! at call sites, making the whole state machine testable with mock
//! adapters.
//!
//! ```text
//!   EventQueue ──▶ ┌──────────────────────┐ ──▶ NetworkPort
//!                  │      Supervisor      │ ──▶ TimerPort
//! CredentialStore ▶│  phase · ladder ·    │ ──▶ EventSink
//!                  │  backoff · uplink    │ ──▶ LinkIndicator
//!                  └──────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::RouterConfig;
use crate::error::Error;
use crate::events::{Event, EventQueue};
use crate::fsm::auth::{self, AuthMode};
use crate::fsm::reason::{DisconnectReason, RecoveryPolicy};
use crate::fsm::{ConnectionState, Phase};

use super::events::AppEvent;
use super::indicator::LinkIndicator;
use super::ports::{CredentialStore, EventSink, IpInfo, NetworkPort, StaConfig, TimerPort};
use super::uplink;

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

pub struct Supervisor {
    config: RouterConfig,
    state: ConnectionState,
    indicator: LinkIndicator,
}

impl Supervisor {
    /// Construct the supervisor from configuration and the credential store.
    ///
    /// Stored credentials win; an empty or unreadable store falls back to
    /// the configured default pair.  Does **not** touch the network; call
    /// [`start`](Self::start) next.
    pub fn new(config: RouterConfig, store: &impl CredentialStore) -> Result<Self, Error> {
        config.validate()?;

        let credentials = match store.load() {
            Ok(Some(creds)) => {
                info!("Supervisor: using stored credentials for '{}'", creds.ssid());
                creds
            }
            Ok(None) => {
                info!("Supervisor: no stored credentials, using defaults");
                config.default_credentials()?
            }
            Err(e) => {
                warn!("Supervisor: credential store unreadable ({}), using defaults", e);
                config.default_credentials()?
            }
        };

        let state = ConnectionState::new(usize::from(config.initial_auth_index), credentials);
        Ok(Self {
            config,
            state,
            indicator: LinkIndicator::new(),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Configure AP addressing and write the initial STA configuration.
    ///
    /// Must run before the radio is started so the first connect (on
    /// `StaStarted`) uses these settings.
    pub fn start(&mut self, net: &mut impl NetworkPort, sink: &mut impl EventSink) {
        uplink::configure_ap_addressing(net, &self.config, sink);

        let threshold = self.threshold_at(self.state.auth_index);
        let cfg = StaConfig::new(&self.state.credentials, threshold);
        if let Err(e) = net.set_sta_config(&cfg) {
            self.report("apply initial STA config", e.into(), sink);
        }

        sink.emit(&AppEvent::Started {
            ssid: self.state.credentials.ssid_string(),
            threshold,
        });
    }

    // ── Event handling ────────────────────────────────────────

    /// Handle one inbound event to completion.
    pub fn handle(
        &mut self,
        event: Event,
        net: &mut impl NetworkPort,
        timer: &mut impl TimerPort,
        store: &impl CredentialStore,
        sink: &mut impl EventSink,
    ) {
        match event {
            Event::StaStarted => {
                sink.emit(&AppEvent::StaStarted);
                if let Err(e) = self.connect_now(net, sink) {
                    self.fall_back("connect", e, net, timer, sink);
                }
            }
            Event::StaStopped => {
                sink.emit(&AppEvent::StaStopped);
                self.state.uplink_ready = false;
                self.set_phase(Phase::Idle, sink);
            }
            Event::StaConnected { bssid, aid } => {
                self.state.awaiting_own_leave = false;
                self.set_phase(Phase::Connected, sink);
                sink.emit(&AppEvent::Associated { bssid, aid });
            }
            Event::StaDisconnected { reason, .. } => {
                self.on_disconnected(reason, net, timer, store, sink);
            }
            Event::StaGotIp(info) => self.on_got_ip(info, net, sink),
            Event::StaLostIp => {
                self.state.uplink_ready = false;
                sink.emit(&AppEvent::UplinkLost);
            }
            Event::ReconnectTimerFired => {
                self.state.retry_timer_armed = false;
                match self.state.phase {
                    Phase::Connected => {
                        debug!("Supervisor: reconnect timer fired while associated, ignored");
                        return;
                    }
                    Phase::Idle => {
                        debug!("Supervisor: reconnect timer fired with STA stopped, ignored");
                        return;
                    }
                    _ => {}
                }
                if let Err(e) = self.connect_now(net, sink) {
                    self.fall_back("reconnect", e, net, timer, sink);
                }
            }
            Event::CredentialsUpdated => {
                info!("Supervisor: credentials updated, re-applying");
                if let Err(e) = self.release_sta(net) {
                    self.report("disconnect", e, sink);
                }
                self.state.uplink_ready = false;
                self.set_phase(Phase::Disconnected, sink);
                if let Err(e) = self.refresh(net, store, sink) {
                    self.fall_back("credential refresh", e, net, timer, sink);
                }
            }
            Event::ApStarted => sink.emit(&AppEvent::ApStarted),
            Event::ApStopped => sink.emit(&AppEvent::ApStopped),
            Event::ApClientJoined { mac, aid } => {
                sink.emit(&AppEvent::ApClientJoined { mac, aid });
            }
            Event::ApClientLeft { mac, aid, reason } => {
                sink.emit(&AppEvent::ApClientLeft { mac, aid, reason });
            }
            Event::ApClientAssignedIp { mac, ip } => {
                sink.emit(&AppEvent::ApClientAssignedIp { mac, ip });
            }
        }
    }

    /// Handle every event currently queued, in arrival order.
    /// Returns how many were handled.
    pub fn dispatch_pending(
        &mut self,
        queue: &EventQueue,
        net: &mut impl NetworkPort,
        timer: &mut impl TimerPort,
        store: &impl CredentialStore,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut handled = 0;
        queue.drain(|event| {
            self.handle(event, net, timer, store, sink);
            handled += 1;
        });
        handled
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Handle for the status LED thread.
    pub fn indicator(&self) -> LinkIndicator {
        self.indicator.clone()
    }

    // ── Disconnect policies ───────────────────────────────────

    fn on_disconnected(
        &mut self,
        reason: DisconnectReason,
        net: &mut impl NetworkPort,
        timer: &mut impl TimerPort,
        store: &impl CredentialStore,
        sink: &mut impl EventSink,
    ) {
        if self.state.awaiting_own_leave && reason == DisconnectReason::AssocLeave {
            self.state.awaiting_own_leave = false;
            debug!("Supervisor: disconnect we requested, no recovery needed");
            return;
        }
        self.state.awaiting_own_leave = false;

        self.state.uplink_ready = false;
        self.set_phase(Phase::Disconnected, sink);
        sink.emit(&AppEvent::Disconnected { reason });

        match reason.policy() {
            RecoveryPolicy::Escalate => {
                if let Err(e) = self.escalate(net, sink) {
                    self.fall_back("auth escalation", e, net, timer, sink);
                }
            }
            RecoveryPolicy::RefreshCredentials => {
                if let Err(e) = self.refresh(net, store, sink) {
                    self.fall_back("credential refresh", e, net, timer, sink);
                }
            }
            RecoveryPolicy::Backoff => self.backoff(net, timer, sink),
        }
    }

    /// Raise the threshold one rung (wrapping after the last) and reconnect.
    ///
    /// The new index is committed only once the driver accepted the config.
    fn escalate(
        &mut self,
        net: &mut impl NetworkPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        self.set_phase(Phase::Escalating, sink);

        let mut cfg = net.sta_config()?;
        let step = auth::next_index(self.state.auth_index, self.config.auth_ladder.len());
        if step.wrapped {
            sink.emit(&AppEvent::AuthModesExhausted);
        }

        let threshold = self.threshold_at(step.index);
        cfg.auth_threshold = threshold;
        net.set_sta_config(&cfg)?;

        self.state.auth_index = step.index;
        sink.emit(&AppEvent::AuthEscalated {
            index: step.index,
            threshold,
        });

        self.release_sta(net)?;
        self.connect_now(net, sink)
    }

    /// Re-read the credential store, apply any stored pair, reconnect.
    fn refresh(
        &mut self,
        net: &mut impl NetworkPort,
        store: &impl CredentialStore,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        match store.load() {
            Ok(Some(creds)) => {
                let mut cfg = net.sta_config()?;
                cfg.set_credentials(&creds);
                net.set_sta_config(&cfg)?;
                sink.emit(&AppEvent::CredentialsApplied {
                    ssid: creds.ssid_string(),
                });
                self.state.credentials = creds;
            }
            Ok(None) => debug!("Supervisor: store empty, keeping current credentials"),
            Err(e) => self.report("read credential store", e.into(), sink),
        }

        self.release_sta(net)?;
        self.connect_now(net, sink)
    }

    /// Release the STA and schedule a single delayed reconnect.
    fn backoff(
        &mut self,
        net: &mut impl NetworkPort,
        timer: &mut impl TimerPort,
        sink: &mut impl EventSink,
    ) {
        if let Err(e) = self.release_sta(net) {
            self.report("disconnect", e, sink);
        }

        if self.state.retry_timer_armed {
            sink.emit(&AppEvent::BackoffCoalesced);
            return;
        }

        let delay = self.config.reconnect_delay();
        match timer.arm_once(delay) {
            Ok(()) => {
                self.state.retry_timer_armed = true;
                sink.emit(&AppEvent::BackoffArmed(delay));
            }
            Err(e) => self.report("arm reconnect timer", e.into(), sink),
        }
    }

    /// An immediate path failed part-way; make sure a retry is scheduled.
    fn fall_back(
        &mut self,
        op: &'static str,
        error: Error,
        net: &mut impl NetworkPort,
        timer: &mut impl TimerPort,
        sink: &mut impl EventSink,
    ) {
        self.report(op, error, sink);
        self.set_phase(Phase::Disconnected, sink);
        self.backoff(net, timer, sink);
    }

    // ── Uplink ────────────────────────────────────────────────

    fn on_got_ip(&mut self, info: IpInfo, net: &mut impl NetworkPort, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::UplinkAcquired(info));

        if self.state.uplink_ready {
            debug!("Supervisor: uplink already coordinated for this acquisition");
            return;
        }
        self.state.uplink_ready = true;
        uplink::coordinate(net, sink);
    }

    // ── Internal ──────────────────────────────────────────────

    fn connect_now(
        &mut self,
        net: &mut impl NetworkPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        net.connect()?;
        self.state.sta_released = false;
        self.set_phase(Phase::Connecting, sink);
        Ok(())
    }

    /// Issue a disconnect unless one is already outstanding.
    fn release_sta(&mut self, net: &mut impl NetworkPort) -> Result<(), Error> {
        if self.state.sta_released {
            return Ok(());
        }
        let was_associated = self.state.is_connected();
        net.disconnect()?;
        self.state.sta_released = true;
        self.state.awaiting_own_leave = was_associated;
        Ok(())
    }

    fn set_phase(&mut self, to: Phase, sink: &mut impl EventSink) {
        let from = self.state.phase;
        if from != to {
            self.state.phase = to;
            sink.emit(&AppEvent::PhaseChanged { from, to });
        }
        self.indicator.set(to == Phase::Connected);
    }

    fn threshold_at(&self, index: usize) -> AuthMode {
        self.config
            .auth_mode_at(index)
            .unwrap_or(AuthMode::Open)
    }

    fn report(&self, op: &'static str, error: Error, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::OperationFailed { op, error });
    }
}
