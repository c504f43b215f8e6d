//! Integration tests for the event → Supervisor → port pipeline.
//!
//! Drive the supervisor with hand-built inbound events against recording
//! mocks and assert on the exact network/timer commands issued.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::mock_net::{MemStore, MockNet, MockTimer, NetCall, RecordingSink};

use natrouter::adapters::timer::ReconnectTimer;
use natrouter::app::events::{AppEvent, CoordinationStep};
use natrouter::app::ports::{Interface, IpInfo};
use natrouter::app::provisioning;
use natrouter::app::service::Supervisor;
use natrouter::config::RouterConfig;
use natrouter::events::{Event, EventQueue, MacAddr};
use natrouter::fsm::Phase;
use natrouter::fsm::auth::AuthMode;
use natrouter::fsm::reason::DisconnectReason;

const BSSID: MacAddr = MacAddr([0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01]);

struct Rig {
    sup: Supervisor,
    net: MockNet,
    timer: MockTimer,
    store: MemStore,
    sink: RecordingSink,
}

impl Rig {
    fn new(config: RouterConfig, store: MemStore) -> Self {
        let mut sup = Supervisor::new(config, &store).unwrap();
        let mut net = MockNet::new();
        let mut sink = RecordingSink::new();
        sup.start(&mut net, &mut sink);
        Self {
            sup,
            net,
            timer: MockTimer::new(),
            store,
            sink,
        }
    }

    fn at_rung(index: u8) -> Self {
        let mut config = RouterConfig::default();
        config.initial_auth_index = index;
        Self::new(config, MemStore::empty())
    }

    fn send(&mut self, event: Event) {
        self.sup.handle(
            event,
            &mut self.net,
            &mut self.timer,
            &self.store,
            &mut self.sink,
        );
    }

    fn drop_link(&mut self, reason: DisconnectReason) {
        self.send(Event::StaDisconnected {
            bssid: BSSID,
            reason,
        });
    }

    /// Start the STA and associate, then forget the calls made so far.
    fn associated(mut self) -> Self {
        self.send(Event::StaStarted);
        self.send(Event::StaConnected { bssid: BSSID, aid: 1 });
        self.net.clear();
        self.sink.events.clear();
        self
    }
}

fn uplink() -> IpInfo {
    IpInfo {
        ip: Ipv4Addr::new(192, 168, 1, 50),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(192, 168, 1, 1),
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_applies_defaults_and_ap_addressing() {
    let rig = Rig::new(RouterConfig::default(), MemStore::empty());

    let cfg = rig.net.last_sta_config().unwrap();
    assert_eq!(cfg.ssid.as_str(), "SSID");
    assert_eq!(cfg.password.as_str(), "PASS");
    assert_eq!(cfg.auth_threshold, AuthMode::Wpa2Psk);

    let ap = IpInfo {
        ip: Ipv4Addr::new(192, 168, 2, 1),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(192, 168, 2, 1),
    };
    let stop = rig.net.position(&NetCall::StopDhcp(Interface::Ap)).unwrap();
    let set = rig.net.position(&NetCall::SetIpInfo(Interface::Ap, ap)).unwrap();
    let start = rig.net.position(&NetCall::StartDhcp(Interface::Ap)).unwrap();
    assert!(stop < set && set < start);

    assert_eq!(rig.net.connects(), 0, "connect waits for StaStarted");
    assert_eq!(rig.sup.phase(), Phase::Idle);
    assert!(!rig.sup.indicator().is_up());
}

#[test]
fn stored_credentials_win_at_startup() {
    let rig = Rig::new(RouterConfig::default(), MemStore::with("Attic", "hunter22"));
    let cfg = rig.net.last_sta_config().unwrap();
    assert_eq!(cfg.ssid.as_str(), "Attic");
    assert_eq!(cfg.password.as_str(), "hunter22");
    assert_eq!(rig.sup.state().credentials.ssid(), "Attic");
}

#[test]
fn sta_start_connects_immediately() {
    let mut rig = Rig::at_rung(3);
    rig.send(Event::StaStarted);
    assert_eq!(rig.net.connects(), 1);
    assert!(rig.timer.armed.is_empty());
    assert_eq!(rig.sup.phase(), Phase::Connecting);
}

#[test]
fn association_lights_indicator() {
    let rig = Rig::at_rung(3).associated();
    assert_eq!(rig.sup.phase(), Phase::Connected);
    assert!(rig.sup.indicator().is_up());
    assert!(!rig.sup.state().uplink_ready, "coordination waits for an address");
    assert_eq!(rig.net.napt_runs(), 0);
}

// ── Threshold escalation ──────────────────────────────────────

#[test]
fn threshold_reason_advances_one_rung() {
    let mut rig = Rig::at_rung(6).associated();
    rig.drop_link(DisconnectReason::NoApFoundInAuthmodeThreshold);

    assert_eq!(rig.sup.state().auth_index, 7);
    let cfg = rig.net.last_sta_config().unwrap();
    assert_eq!(cfg.auth_threshold, AuthMode::Wpa2Wpa3Psk);
    assert_eq!(cfg.ssid.as_str(), "SSID", "credentials untouched");

    let set = rig.net.calls.iter().position(|c| matches!(c, NetCall::SetStaConfig(_)));
    let disc = rig.net.position(&NetCall::Disconnect);
    let conn = rig.net.position(&NetCall::Connect);
    assert!(set < disc && disc < conn, "write, disconnect, reconnect: {:?}", rig.net.calls);
    assert_eq!(rig.net.disconnects(), 1);
    assert_eq!(rig.net.connects(), 1);
    assert!(rig.timer.armed.is_empty(), "no backoff on escalation");
    assert_eq!(rig.sup.phase(), Phase::Connecting);
    assert!(rig.sink.contains(&AppEvent::AuthEscalated {
        index: 7,
        threshold: AuthMode::Wpa2Wpa3Psk,
    }));
}

#[test]
fn last_rung_wraps_to_zero() {
    let last = (AuthMode::default_ladder().len() - 1) as u8;
    let mut rig = Rig::at_rung(last).associated();
    rig.drop_link(DisconnectReason::NoApFoundInAuthmodeThreshold);

    assert_eq!(rig.sup.state().auth_index, 0);
    assert_eq!(rig.net.last_sta_config().unwrap().auth_threshold, AuthMode::Open);
    assert!(rig.sink.contains(&AppEvent::AuthModesExhausted));
    assert_eq!(rig.net.connects(), 1);
    assert!(rig.timer.armed.is_empty());
}

#[test]
fn only_threshold_reason_moves_the_ladder() {
    let mut codes: Vec<u16> = (0..=255).collect();
    codes.extend([1000, u16::MAX]);

    for code in codes {
        let mut rig = Rig::at_rung(3).associated();
        rig.drop_link(DisconnectReason::from_code(code));
        let expected = if code == 211 { 4 } else { 3 };
        assert_eq!(
            rig.sup.state().auth_index,
            expected,
            "reason {} moved the ladder unexpectedly",
            code
        );
    }
}

#[test]
fn custom_ladder_order_is_followed() {
    let mut config = RouterConfig::default();
    config.auth_ladder.clear();
    for m in [AuthMode::Wpa3Psk, AuthMode::Wpa2Psk, AuthMode::Open] {
        config.auth_ladder.push(m).unwrap();
    }
    config.initial_auth_index = 0;
    let mut rig = Rig::new(config, MemStore::empty()).associated();

    rig.drop_link(DisconnectReason::NoApFoundInAuthmodeThreshold);
    assert_eq!(rig.net.last_sta_config().unwrap().auth_threshold, AuthMode::Wpa2Psk);
}

// ── Credential refresh ────────────────────────────────────────

#[test]
fn connection_failure_applies_stored_pair() {
    let mut rig = Rig::at_rung(3).associated();
    rig.store = MemStore::with("HomeNet", "s3cr3t!");

    rig.drop_link(DisconnectReason::ConnectionFail);

    let cfg = rig.net.last_sta_config().unwrap();
    assert_eq!(cfg.ssid.as_str(), "HomeNet");
    assert_eq!(cfg.password.as_str(), "s3cr3t!");
    assert_eq!(cfg.auth_threshold, AuthMode::Wpa2Psk, "threshold preserved");
    assert_eq!(rig.net.disconnects(), 1);
    assert_eq!(rig.net.connects(), 1);
    assert!(rig.timer.armed.is_empty());
    assert_eq!(rig.sup.state().auth_index, 3);
    assert_eq!(rig.sup.state().credentials.ssid(), "HomeNet");
}

#[test]
fn refresh_reasons_reread_store() {
    for reason in [
        DisconnectReason::NoApFound,
        DisconnectReason::FourWayHandshakeTimeout,
        DisconnectReason::ConnectionFail,
    ] {
        let mut rig = Rig::at_rung(3).associated();
        let before = rig.store.loads.get();
        rig.drop_link(reason);
        assert_eq!(rig.store.loads.get(), before + 1, "{:?}", reason);
        assert_eq!(rig.net.connects(), 1, "{:?}", reason);
        assert!(rig.timer.armed.is_empty(), "{:?}", reason);
    }
}

#[test]
fn refresh_with_empty_store_keeps_current_pair() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::NoApFound);

    assert!(rig.net.last_sta_config().is_none(), "STA config not rewritten");
    assert_eq!(rig.net.disconnects(), 1);
    assert_eq!(rig.net.connects(), 1);
}

// ── Backoff ───────────────────────────────────────────────────

#[test]
fn beacon_timeout_arms_one_timer() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::BeaconTimeout);

    assert_eq!(rig.net.disconnects(), 1);
    assert_eq!(rig.timer.armed, vec![Duration::from_secs(3)]);
    assert_eq!(rig.net.connects(), 0, "reconnect waits for expiry");
    assert!(rig.sup.state().retry_timer_armed);
    assert_eq!(rig.sup.phase(), Phase::Disconnected);
    assert!(!rig.sup.indicator().is_up());

    rig.send(Event::ReconnectTimerFired);
    assert_eq!(rig.net.connects(), 1);
    assert!(!rig.sup.state().retry_timer_armed);
    assert_eq!(rig.sup.phase(), Phase::Connecting);
}

#[test]
fn disconnect_storm_is_coalesced() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::BeaconTimeout);
    for reason in [
        DisconnectReason::AuthExpire,
        DisconnectReason::Other(77),
        DisconnectReason::BeaconTimeout,
    ] {
        rig.drop_link(reason);
    }

    assert_eq!(rig.timer.armed.len(), 1);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::BackoffCoalesced), 3);
    assert_eq!(rig.net.disconnects(), 1, "already released");
}

#[test]
fn repeated_disconnect_changes_nothing() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::BeaconTimeout);
    let state = rig.sup.state().clone();
    let calls = rig.net.calls.len();

    rig.drop_link(DisconnectReason::BeaconTimeout);

    assert_eq!(rig.sup.state(), &state);
    assert_eq!(rig.net.calls.len(), calls);
    assert_eq!(rig.timer.armed.len(), 1);
}

#[test]
fn new_backoff_after_expiry_arms_again() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::BeaconTimeout);
    rig.send(Event::ReconnectTimerFired);
    rig.drop_link(DisconnectReason::AuthFail);
    assert_eq!(rig.timer.armed.len(), 2);
}

#[test]
fn stale_timer_ignored_once_associated() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::BeaconTimeout);
    rig.send(Event::StaConnected { bssid: BSSID, aid: 2 });
    rig.send(Event::ReconnectTimerFired);

    assert_eq!(rig.net.connects(), 0);
    assert!(!rig.sup.state().retry_timer_armed);
    assert_eq!(rig.sup.phase(), Phase::Connected);
}

#[test]
fn expiry_after_sta_stop_is_ignored() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::BeaconTimeout);
    rig.send(Event::StaStopped);
    rig.send(Event::ReconnectTimerFired);

    assert_eq!(rig.net.connects(), 0);
    assert_eq!(rig.timer.armed.len(), 1, "no re-arm while stopped");
    assert!(!rig.sup.state().retry_timer_armed);
    assert_eq!(rig.sup.phase(), Phase::Idle);
}

static BUSY_QUEUE: EventQueue = EventQueue::new();

#[test]
fn expiry_reaches_supervisor_through_full_queue() {
    let config = RouterConfig {
        reconnect_delay_secs: 1,
        ..Default::default()
    };
    let store = MemStore::empty();
    let mut sup = Supervisor::new(config, &store).unwrap();
    let mut net = MockNet::new();
    let mut timer = ReconnectTimer::new(&BUSY_QUEUE).unwrap();
    let mut sink = RecordingSink::new();
    sup.start(&mut net, &mut sink);
    sup.handle(Event::StaStarted, &mut net, &mut timer, &store, &mut sink);
    sup.handle(
        Event::StaConnected { bssid: BSSID, aid: 1 },
        &mut net,
        &mut timer,
        &store,
        &mut sink,
    );

    while BUSY_QUEUE.push(Event::ApStarted) {}
    let backlog = BUSY_QUEUE.len();
    let beacon_lost = Event::StaDisconnected {
        bssid: BSSID,
        reason: DisconnectReason::BeaconTimeout,
    };
    sup.handle(beacon_lost, &mut net, &mut timer, &store, &mut sink);
    assert!(sup.state().retry_timer_armed);
    net.clear();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while BUSY_QUEUE.len() == backlog && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    let handled = sup.dispatch_pending(&BUSY_QUEUE, &mut net, &mut timer, &store, &mut sink);

    assert_eq!(handled, backlog + 1);
    assert_eq!(net.connects(), 1);
    assert!(!sup.state().retry_timer_armed);
    assert_eq!(sup.phase(), Phase::Connecting);

    sup.handle(beacon_lost, &mut net, &mut timer, &store, &mut sink);
    assert!(sup.state().retry_timer_armed);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::BackoffArmed(_))),
        2,
        "a later drop arms a fresh timer"
    );
}

// ── Failure fallback ──────────────────────────────────────────

#[test]
fn failed_escalation_falls_back_to_backoff() {
    let mut rig = Rig::at_rung(3).associated();
    rig.net.fail_set_sta_config = true;
    rig.drop_link(DisconnectReason::NoApFoundInAuthmodeThreshold);

    assert_eq!(rig.sup.state().auth_index, 3, "index committed only on success");
    assert_eq!(rig.timer.armed.len(), 1);
    assert_eq!(rig.sup.phase(), Phase::Disconnected);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::OperationFailed { .. })),
        1
    );
}

#[test]
fn failed_connect_schedules_retry() {
    let mut rig = Rig::at_rung(3);
    rig.net.fail_connect = true;
    rig.send(Event::StaStarted);

    assert_eq!(rig.timer.armed.len(), 1);
    assert_eq!(rig.sup.phase(), Phase::Disconnected);
}

#[test]
fn timer_failure_is_reported_and_not_marked_armed() {
    let mut rig = Rig::at_rung(3).associated();
    rig.timer.fail = true;
    rig.drop_link(DisconnectReason::BeaconTimeout);

    assert!(!rig.sup.state().retry_timer_armed);
    assert!(rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::OperationFailed { .. })));
}

// ── Uplink coordination ───────────────────────────────────────

#[test]
fn address_triggers_full_coordination() {
    let mut rig = Rig::at_rung(3).associated();
    rig.send(Event::StaGotIp(uplink()));

    let dns = Ipv4Addr::new(1, 1, 1, 1);
    assert_eq!(
        rig.net.calls,
        vec![
            NetCall::SetDefaultRoute(Interface::Sta),
            NetCall::EnableNapt(Interface::Ap),
            NetCall::StopDhcp(Interface::Ap),
            NetCall::SetDnsOffer(Interface::Ap, true),
            NetCall::SetDns(Interface::Ap, dns),
            NetCall::StartDhcp(Interface::Ap),
        ]
    );
    assert!(rig.sup.state().uplink_ready);
    assert!(rig.sink.contains(&AppEvent::CoordinationComplete { dns: Some(dns) }));
}

#[test]
fn coordination_runs_once_per_acquisition() {
    let mut rig = Rig::at_rung(3).associated();
    rig.send(Event::StaGotIp(uplink()));
    rig.send(Event::StaGotIp(uplink()));
    assert_eq!(rig.net.napt_runs(), 1);

    rig.drop_link(DisconnectReason::BeaconTimeout);
    assert!(!rig.sup.state().uplink_ready);

    rig.send(Event::ReconnectTimerFired);
    rig.send(Event::StaConnected { bssid: BSSID, aid: 1 });
    rig.send(Event::StaGotIp(uplink()));
    assert_eq!(rig.net.napt_runs(), 2);
}

#[test]
fn coordination_reruns_after_address_loss() {
    let mut rig = Rig::at_rung(3).associated();
    rig.send(Event::StaGotIp(uplink()));
    rig.send(Event::StaLostIp);
    assert!(!rig.sup.state().uplink_ready);
    rig.send(Event::StaGotIp(uplink()));
    assert_eq!(rig.net.napt_runs(), 2);
}

#[test]
fn missing_uplink_dns_skips_dhcp_update() {
    let mut rig = Rig::at_rung(3).associated();
    rig.net.uplink_dns = None;
    rig.send(Event::StaGotIp(uplink()));

    assert_eq!(
        rig.net.calls,
        vec![
            NetCall::SetDefaultRoute(Interface::Sta),
            NetCall::EnableNapt(Interface::Ap),
        ]
    );
    assert!(rig.sink.contains(&AppEvent::CoordinationComplete { dns: None }));
}

#[test]
fn failed_step_does_not_stop_the_sequence() {
    let mut rig = Rig::at_rung(3).associated();
    rig.net.fail_napt = true;
    rig.send(Event::StaGotIp(uplink()));

    assert!(rig.sink.contains(&AppEvent::CoordinationStepFailed(
        CoordinationStep::EnableNapt
    )));
    assert_eq!(rig.net.count(&NetCall::StartDhcp(Interface::Ap)), 1);
    assert!(rig.sup.state().uplink_ready);
}

// ── Provisioning ──────────────────────────────────────────────

#[test]
fn provisioning_while_connected_reconnects_with_new_pair() {
    let mut rig = Rig::at_rung(3).associated();
    let queue = EventQueue::new();

    provisioning::submit(b"ssid=NewNet&password=newpass", &mut rig.store, &queue).unwrap();
    let handled = rig.sup.dispatch_pending(
        &queue,
        &mut rig.net,
        &mut rig.timer,
        &rig.store,
        &mut rig.sink,
    );

    assert_eq!(handled, 1);
    assert_eq!(rig.store.creds.as_ref().unwrap().ssid(), "NewNet");
    let cfg = rig.net.last_sta_config().unwrap();
    assert_eq!(cfg.ssid.as_str(), "NewNet");
    assert_eq!(cfg.password.as_str(), "newpass");
    assert_eq!(rig.net.disconnects(), 1);
    assert_eq!(rig.net.connects(), 1);
    assert!(rig.net.position(&NetCall::Disconnect) < rig.net.position(&NetCall::Connect));
    assert_eq!(rig.sup.state().auth_index, 3);
    assert!(rig.timer.armed.is_empty());

    // The driver reports the teardown we asked for; it is not a failure.
    rig.drop_link(DisconnectReason::AssocLeave);
    assert_eq!(rig.net.disconnects(), 1);
    assert_eq!(rig.net.connects(), 1);
    assert!(rig.timer.armed.is_empty());
    assert_eq!(rig.sup.phase(), Phase::Connecting);
}

#[test]
fn peer_assoc_leave_still_backs_off() {
    let mut rig = Rig::at_rung(3).associated();
    rig.drop_link(DisconnectReason::AssocLeave);
    assert_eq!(rig.timer.armed.len(), 1);
}

// ── Informational ─────────────────────────────────────────────

#[test]
fn sta_stop_returns_to_idle() {
    let mut rig = Rig::at_rung(3).associated();
    rig.send(Event::StaGotIp(uplink()));
    rig.send(Event::StaStopped);
    assert_eq!(rig.sup.phase(), Phase::Idle);
    assert!(!rig.sup.state().uplink_ready);
    assert!(!rig.sup.indicator().is_up());
}

#[test]
fn ap_events_are_forwarded_without_side_effects() {
    let mut rig = Rig::at_rung(3).associated();
    let mac = MacAddr([2, 0, 0, 0, 0, 9]);
    rig.send(Event::ApStarted);
    rig.send(Event::ApClientJoined { mac, aid: 1 });
    rig.send(Event::ApClientAssignedIp {
        mac,
        ip: Ipv4Addr::new(192, 168, 2, 2),
    });
    rig.send(Event::ApClientLeft { mac, aid: 1, reason: 8 });

    assert!(rig.net.calls.is_empty());
    assert!(rig.sink.contains(&AppEvent::ApClientJoined { mac, aid: 1 }));
    assert_eq!(rig.sup.phase(), Phase::Connected);
}
