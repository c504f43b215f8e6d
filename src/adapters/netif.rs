//! Network interface adapter.
//!
//! Implements [`NetworkPort`] on top of the raw `esp_wifi_*` and
//! `esp_netif_*` APIs for the AP + STA interface pair created by the
//! [`wifi`](super::wifi) adapter.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: holds the two `esp_netif_t` handles and calls the C API.
//! On host/test: tracks interface state in-memory so the whole
//! supervisor can run without a radio.

use core::net::Ipv4Addr;

use crate::app::ports::{Interface, IpInfo, NetworkPort, StaConfig};
use crate::error::NetError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use crate::fsm::auth::AuthMode;

/// Option byte enabling the DNS server entry in DHCP offers.
#[cfg(target_os = "espidf")]
const OFFER_DNS: u8 = 0x02;

pub struct NetifAdapter {
    #[cfg(target_os = "espidf")]
    ap: *mut esp_netif_t,
    #[cfg(target_os = "espidf")]
    sta: *mut esp_netif_t,

    #[cfg(not(target_os = "espidf"))]
    sim: SimNetif,
}

/// In-memory interface state used off-device.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimNetif {
    pub connect_requested: bool,
    pub sta: StaConfig,
    pub default_route: Option<Interface>,
    pub napt: Option<Interface>,
    pub sta_dns: Option<Ipv4Addr>,
    pub ap_dns: Option<Ipv4Addr>,
    pub ap_dhcp_running: bool,
    pub ap_dns_offer: bool,
    pub ap_ip: Option<IpInfo>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimNetif {
    fn default() -> Self {
        Self {
            connect_requested: false,
            sta: StaConfig {
                ssid: heapless::String::new(),
                password: heapless::String::new(),
                auth_threshold: AuthMode::Open,
            },
            default_route: None,
            napt: None,
            sta_dns: None,
            ap_dns: None,
            ap_dhcp_running: true,
            ap_dns_offer: false,
            ap_ip: None,
        }
    }
}

impl NetifAdapter {
    /// Wrap the interface handles owned by the WiFi driver.
    ///
    /// # Safety
    ///
    /// Both handles must stay valid for the lifetime of the adapter,
    /// i.e. the `EspWifi` instance that created them must outlive it.
    #[cfg(target_os = "espidf")]
    pub unsafe fn new(ap: *mut esp_netif_t, sta: *mut esp_netif_t) -> Self {
        Self { ap, sta }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            sim: SimNetif::default(),
        }
    }

    /// Simulated interface state (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&self) -> &SimNetif {
        &self.sim
    }

    /// Mutable simulated state, e.g. to inject the uplink DNS server.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_mut(&mut self) -> &mut SimNetif {
        &mut self.sim
    }

    #[cfg(target_os = "espidf")]
    fn handle(&self, iface: Interface) -> Result<*mut esp_netif_t, NetError> {
        let h = match iface {
            Interface::Ap => self.ap,
            Interface::Sta => self.sta,
        };
        if h.is_null() {
            Err(NetError::NoInterface)
        } else {
            Ok(h)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NetifAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t) -> Result<(), NetError> {
    if ret == ESP_OK {
        Ok(())
    } else {
        Err(NetError::Driver(ret))
    }
}

/// Copy a NUL-padded C byte field into a bounded string.
#[cfg(target_os = "espidf")]
fn c_field<const N: usize>(raw: &[u8]) -> heapless::String<N> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len()).min(N);
    let mut out = heapless::String::new();
    if let Ok(s) = core::str::from_utf8(&raw[..end]) {
        let _ = out.push_str(s);
    }
    out
}

#[cfg(target_os = "espidf")]
fn fill_c_field(dst: &mut [u8], src: &str) {
    dst.fill(0);
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
}

#[cfg(target_os = "espidf")]
fn to_esp_ip(ip: Ipv4Addr) -> esp_ip4_addr_t {
    esp_ip4_addr_t {
        addr: u32::from_le_bytes(ip.octets()),
    }
}

#[cfg(target_os = "espidf")]
impl NetifAdapter {
    fn read_sta(&self) -> Result<wifi_config_t, NetError> {
        // SAFETY: wifi_config_t is a plain C union; all-zero is a valid value.
        let mut cfg: wifi_config_t = unsafe { core::mem::zeroed() };
        // SAFETY: `cfg` is a valid out-pointer for the duration of the call.
        check(unsafe { esp_wifi_get_config(wifi_interface_t_WIFI_IF_STA, &mut cfg) })?;
        Ok(cfg)
    }
}

#[cfg(target_os = "espidf")]
impl NetworkPort for NetifAdapter {
    fn connect(&mut self) -> Result<(), NetError> {
        // SAFETY: the WiFi driver is started before the dispatcher runs.
        check(unsafe { esp_wifi_connect() })
    }

    fn disconnect(&mut self) -> Result<(), NetError> {
        // SAFETY: as above.
        check(unsafe { esp_wifi_disconnect() })
    }

    fn sta_config(&self) -> Result<StaConfig, NetError> {
        let cfg = self.read_sta()?;
        // SAFETY: the STA arm of the union is the one the driver filled.
        let sta = unsafe { cfg.sta };
        Ok(StaConfig {
            ssid: c_field(&sta.ssid),
            password: c_field(&sta.password),
            auth_threshold: crate::fsm::auth::AuthMode::from_raw(sta.threshold.authmode)
                .unwrap_or(crate::fsm::auth::AuthMode::Open),
        })
    }

    fn set_sta_config(&mut self, config: &StaConfig) -> Result<(), NetError> {
        let mut cfg = self.read_sta()?;
        // SAFETY: read-modify-write of the STA arm, then handed back to
        // the driver which copies it.
        unsafe {
            fill_c_field(&mut cfg.sta.ssid, &config.ssid);
            fill_c_field(&mut cfg.sta.password, &config.password);
            cfg.sta.threshold.authmode = config.auth_threshold.as_raw();
            check(esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut cfg))
        }
    }

    fn set_default_route(&mut self, iface: Interface) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        // SAFETY: `h` is a live netif handle (see `new`).
        check(unsafe { esp_netif_set_default_netif(h) })
    }

    fn enable_napt(&mut self, iface: Interface) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        // SAFETY: as above.
        check(unsafe { esp_netif_napt_enable(h) })
    }

    fn dns_server(&self, iface: Interface) -> Result<Option<Ipv4Addr>, NetError> {
        let h = self.handle(iface)?;
        // SAFETY: plain C struct; zero is a valid initial value and the
        // call only writes through the out-pointer.
        let addr = unsafe {
            let mut dns: esp_netif_dns_info_t = core::mem::zeroed();
            check(esp_netif_get_dns_info(
                h,
                esp_netif_dns_type_t_ESP_NETIF_DNS_MAIN,
                &mut dns,
            ))?;
            dns.ip.u_addr.ip4.addr
        };
        if addr == 0 {
            Ok(None)
        } else {
            Ok(Some(Ipv4Addr::from(addr.to_le_bytes())))
        }
    }

    fn set_dns_server(&mut self, iface: Interface, dns: Ipv4Addr) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        // SAFETY: `info` lives across the call; the stack copies it.
        unsafe {
            let mut info: esp_netif_dns_info_t = core::mem::zeroed();
            info.ip.u_addr.ip4 = to_esp_ip(dns);
            info.ip.type_ = ESP_IPADDR_TYPE_V4 as u8;
            check(esp_netif_set_dns_info(
                h,
                esp_netif_dns_type_t_ESP_NETIF_DNS_MAIN,
                &mut info,
            ))
        }
    }

    fn stop_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        // SAFETY: `h` is a live netif handle.
        let ret = unsafe { esp_netif_dhcps_stop(h) };
        if ret == ESP_ERR_ESP_NETIF_DHCP_ALREADY_STOPPED {
            return Ok(());
        }
        check(ret)
    }

    fn start_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        // SAFETY: `h` is a live netif handle.
        let ret = unsafe { esp_netif_dhcps_start(h) };
        if ret == ESP_ERR_ESP_NETIF_DHCP_ALREADY_STARTED {
            return Ok(());
        }
        check(ret)
    }

    fn set_dns_offer(&mut self, iface: Interface, enabled: bool) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        let mut value: u8 = if enabled { OFFER_DNS } else { 0 };
        // SAFETY: the option value is a single byte that outlives the call.
        check(unsafe {
            esp_netif_dhcps_option(
                h,
                esp_netif_dhcp_option_mode_t_ESP_NETIF_OP_SET,
                esp_netif_dhcp_option_id_t_ESP_NETIF_DOMAIN_NAME_SERVER,
                (&mut value as *mut u8).cast(),
                1,
            )
        })
    }

    fn set_ip_info(&mut self, iface: Interface, info: &IpInfo) -> Result<(), NetError> {
        let h = self.handle(iface)?;
        let raw = esp_netif_ip_info_t {
            ip: to_esp_ip(info.ip),
            netmask: to_esp_ip(info.netmask),
            gw: to_esp_ip(info.gateway),
        };
        // SAFETY: `raw` lives across the call; the stack copies it.
        check(unsafe { esp_netif_set_ip_info(h, &raw) })
    }
}

#[cfg(not(target_os = "espidf"))]
impl NetworkPort for NetifAdapter {
    fn connect(&mut self) -> Result<(), NetError> {
        self.sim.connect_requested = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), NetError> {
        self.sim.connect_requested = false;
        Ok(())
    }

    fn sta_config(&self) -> Result<StaConfig, NetError> {
        Ok(self.sim.sta.clone())
    }

    fn set_sta_config(&mut self, config: &StaConfig) -> Result<(), NetError> {
        self.sim.sta = config.clone();
        Ok(())
    }

    fn set_default_route(&mut self, iface: Interface) -> Result<(), NetError> {
        self.sim.default_route = Some(iface);
        Ok(())
    }

    fn enable_napt(&mut self, iface: Interface) -> Result<(), NetError> {
        self.sim.napt = Some(iface);
        Ok(())
    }

    fn dns_server(&self, iface: Interface) -> Result<Option<Ipv4Addr>, NetError> {
        Ok(match iface {
            Interface::Ap => self.sim.ap_dns,
            Interface::Sta => self.sim.sta_dns,
        })
    }

    fn set_dns_server(&mut self, iface: Interface, dns: Ipv4Addr) -> Result<(), NetError> {
        match iface {
            Interface::Ap => self.sim.ap_dns = Some(dns),
            Interface::Sta => self.sim.sta_dns = Some(dns),
        }
        Ok(())
    }

    fn stop_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError> {
        if iface == Interface::Ap {
            self.sim.ap_dhcp_running = false;
        }
        Ok(())
    }

    fn start_dhcp_server(&mut self, iface: Interface) -> Result<(), NetError> {
        if iface == Interface::Ap {
            self.sim.ap_dhcp_running = true;
        }
        Ok(())
    }

    fn set_dns_offer(&mut self, iface: Interface, enabled: bool) -> Result<(), NetError> {
        if iface != Interface::Ap {
            return Err(NetError::NoInterface);
        }
        self.sim.ap_dns_offer = enabled;
        Ok(())
    }

    fn set_ip_info(&mut self, iface: Interface, info: &IpInfo) -> Result<(), NetError> {
        if iface != Interface::Ap {
            return Err(NetError::NoInterface);
        }
        self.sim.ap_ip = Some(*info);
        Ok(())
    }
}
