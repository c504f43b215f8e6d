//! Recording mocks for integration tests.
//!
//! Records every network and timer call so tests can assert on the full
//! command history without touching a radio.

use std::cell::Cell;
use std::net::Ipv4Addr;
use std::time::Duration;

use natrouter::app::events::AppEvent;
use natrouter::app::ports::{
    CredentialStore, EventSink, Interface, IpInfo, NetworkPort, StaConfig, StorageError,
    TimerPort,
};
use natrouter::credentials::Credentials;
use natrouter::error::{NetError, TimerError};
use natrouter::fsm::auth::AuthMode;

// ── Network call record ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NetCall {
    Connect,
    Disconnect,
    SetStaConfig(StaConfig),
    SetDefaultRoute(Interface),
    EnableNapt(Interface),
    StopDhcp(Interface),
    StartDhcp(Interface),
    SetDnsOffer(Interface, bool),
    SetDns(Interface, Ipv4Addr),
    SetIpInfo(Interface, IpInfo),
}

// ── MockNet ───────────────────────────────────────────────────

pub struct MockNet {
    pub calls: Vec<NetCall>,
    pub sta: StaConfig,
    pub uplink_dns: Option<Ipv4Addr>,
    pub fail_connect: bool,
    pub fail_set_sta_config: bool,
    pub fail_napt: bool,
}

#[allow(dead_code)]
impl MockNet {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            sta: StaConfig {
                ssid: heapless::String::new(),
                password: heapless::String::new(),
                auth_threshold: AuthMode::Open,
            },
            uplink_dns: Some(Ipv4Addr::new(1, 1, 1, 1)),
            fail_connect: false,
            fail_set_sta_config: false,
            fail_napt: false,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, call: &NetCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn connects(&self) -> usize {
        self.count(&NetCall::Connect)
    }

    pub fn disconnects(&self) -> usize {
        self.count(&NetCall::Disconnect)
    }

    /// Number of completed coordination runs (one NAT enable each).
    pub fn napt_runs(&self) -> usize {
        self.count(&NetCall::EnableNapt(Interface::Ap))
    }

    pub fn position(&self, call: &NetCall) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn last_sta_config(&self) -> Option<&StaConfig> {
        self.calls.iter().rev().find_map(|c| match c {
            NetCall::SetStaConfig(cfg) => Some(cfg),
            _ => None,
        })
    }
}

impl Default for MockNet {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPort for MockNet {
    fn connect(&mut self) -> Result<(), NetError> {
        if self.fail_connect {
            return Err(NetError::Driver(0x3001));
        }
        self.calls.push(NetCall::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), NetError> {
        self.calls.push(NetCall::Disconnect);
        Ok(())
    }

    fn sta_config(&self) -> Result<StaConfig, NetError> {
        Ok(self.sta.clone())
    }

    fn set_sta_config(&mut self, config: &StaConfig) -> Result<(), NetError> {
        if self.fail_set_sta_config {
            return Err(NetError::Driver(0x3005));
        }
        self.sta = config.clone();
        self.calls.push(NetCall::SetStaConfig(config.clone()));
        Ok(())
    }

    fn set_default_route(&mut self, iface: Interface) -> Result<(), NetError> {
        self.calls.push(NetCall::SetDefaultRoute(iface));
        Ok(())
    }

    fn enable_napt(&mut self, iface: Interface) -> Result<(), NetError> {
        self.calls.push(NetCall::EnableNapt(iface));
        if self.fail_napt {
            return Err(NetError::Driver(-1));
        }
        Ok(())
    }

    fn dns_server(&self, iface: Interface) -> Result<Option<Ipv4Addr>, NetError> {
        match iface {
            Interface::Sta => Ok(self.uplink_dns),
            Interface::Ap => Ok(None),
        }
    }

    fn set_dns_server(&mut self, iface: Interface, dns: Ipv4Addr) -> Result<(), NetError> {
        self.calls.push(NetCall::SetDns(iface, dns));
        Ok(())
    }

    fn stop_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError> {
        self.calls.push(NetCall::StopDhcp(iface));
        Ok(())
    }

    fn start_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError> {
        self.calls.push(NetCall::StartDhcp(iface));
        Ok(())
    }

    fn set_dns_offer(&mut self, iface: Interface, enabled: bool) -> Result<(), NetError> {
        self.calls.push(NetCall::SetDnsOffer(iface, enabled));
        Ok(())
    }

    fn set_ip_info(&mut self, iface: Interface, info: &IpInfo) -> Result<(), NetError> {
        self.calls.push(NetCall::SetIpInfo(iface, *info));
        Ok(())
    }
}

// ── MockTimer ─────────────────────────────────────────────────

pub struct MockTimer {
    pub armed: Vec<Duration>,
    pub fail: bool,
}

impl MockTimer {
    pub fn new() -> Self {
        Self {
            armed: Vec::new(),
            fail: false,
        }
    }
}

impl Default for MockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerPort for MockTimer {
    fn arm_once(&mut self, delay: Duration) -> Result<(), TimerError> {
        if self.fail {
            return Err(TimerError::ArmFailed(-1));
        }
        self.armed.push(delay);
        Ok(())
    }
}

// ── MemStore ──────────────────────────────────────────────────

pub struct MemStore {
    pub creds: Option<Credentials>,
    pub loads: Cell<usize>,
    pub saves: usize,
}

#[allow(dead_code)]
impl MemStore {
    pub fn empty() -> Self {
        Self {
            creds: None,
            loads: Cell::new(0),
            saves: 0,
        }
    }

    pub fn with(ssid: &str, password: &str) -> Self {
        Self {
            creds: Some(Credentials::new(ssid, password).unwrap()),
            ..Self::empty()
        }
    }
}

impl CredentialStore for MemStore {
    fn load(&self) -> Result<Option<Credentials>, StorageError> {
        self.loads.set(self.loads.get() + 1);
        Ok(self.creds.clone())
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StorageError> {
        self.creds = Some(credentials.clone());
        self.saves += 1;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.iter().any(|e| e == event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
