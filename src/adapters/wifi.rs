//! WiFi AP + STA bring-up and event translation.
//!
//! [`WifiStack`] owns the `EspWifi` driver running in mixed mode: the
//! access point that local clients join and the station that joins the
//! uplink.  It also registers one raw handler on the default event loop
//! that turns `WIFI_EVENT` / `IP_EVENT` notifications into
//! [`Event`]s on the inbound queue.  No decision is made here; the
//! supervisor sees every notification in arrival order.
//!
//! Device only.  On host the supervisor is driven through
//! [`NetifAdapter`](super::netif::NetifAdapter)'s simulation and
//! hand-built events.

use core::ffi::c_void;
use core::net::Ipv4Addr;

use anyhow::anyhow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::handle::RawHandle;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::*;
use esp_idf_svc::sys::{EspError, esp};
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};
use log::info;

use crate::app::ports::IpInfo;
use crate::config::RouterConfig;
use crate::events::{push_event, Event, MacAddr};
use crate::fsm::auth::AuthMode;
use crate::fsm::reason::DisconnectReason;

use super::netif::NetifAdapter;

/// SoftAP SAE is a driver build option; without it the AP stays on WPA2.
const SOFTAP_SAE: bool = cfg!(esp_idf_esp_wifi_softap_sae_support);

pub struct WifiStack {
    wifi: EspWifi<'static>,
    wifi_handler: esp_event_handler_instance_t,
    ip_handler: esp_event_handler_instance_t,
}

impl WifiStack {
    /// Create the driver, apply the mixed configuration and register the
    /// event translator.  The radio is not started yet.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        config: &RouterConfig,
    ) -> anyhow::Result<Self> {
        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        wifi.set_configuration(&Configuration::Mixed(
            ClientConfiguration::default(),
            access_point(config)?,
        ))?;
        tune_station(config)?;
        if config.ap_auth_mode(SOFTAP_SAE) == AuthMode::Wpa3Psk {
            tune_access_point()?;
        }

        let mut wifi_handler: esp_event_handler_instance_t = core::ptr::null_mut();
        let mut ip_handler: esp_event_handler_instance_t = core::ptr::null_mut();
        // SAFETY: the handler is a plain function that only enqueues; the
        // instance handles are unregistered on drop.
        unsafe {
            esp!(esp_event_handler_instance_register(
                WIFI_EVENT,
                ESP_EVENT_ANY_ID,
                Some(on_system_event),
                core::ptr::null_mut(),
                &mut wifi_handler,
            ))?;
            esp!(esp_event_handler_instance_register(
                IP_EVENT,
                ESP_EVENT_ANY_ID,
                Some(on_system_event),
                core::ptr::null_mut(),
                &mut ip_handler,
            ))?;
        }

        info!(
            "wifi: AP '{}' ch={} max_clients={} ({})",
            config.ap_ssid,
            config.ap_channel,
            config.ap_max_connections,
            config.ap_auth_mode(SOFTAP_SAE)
        );

        Ok(Self {
            wifi,
            wifi_handler,
            ip_handler,
        })
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        self.wifi.start()?;
        Ok(())
    }

    /// Network port over this driver's two interfaces.
    pub fn netif(&self) -> NetifAdapter {
        // SAFETY: the returned adapter is used only while `self` is alive;
        // `main` keeps the stack for the lifetime of the firmware.
        unsafe {
            NetifAdapter::new(
                self.wifi.ap_netif().handle(),
                self.wifi.sta_netif().handle(),
            )
        }
    }
}

impl Drop for WifiStack {
    fn drop(&mut self) {
        // SAFETY: both instances were registered in `new`.
        unsafe {
            let _ = esp_event_handler_instance_unregister(
                WIFI_EVENT,
                ESP_EVENT_ANY_ID,
                self.wifi_handler,
            );
            let _ = esp_event_handler_instance_unregister(
                IP_EVENT,
                ESP_EVENT_ANY_ID,
                self.ip_handler,
            );
        }
    }
}

fn access_point(config: &RouterConfig) -> anyhow::Result<AccessPointConfiguration> {
    Ok(AccessPointConfiguration {
        ssid: config
            .ap_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("AP ssid too long"))?,
        password: config
            .ap_password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("AP password too long"))?,
        channel: config.ap_channel,
        auth_method: match config.ap_auth_mode(SOFTAP_SAE) {
            AuthMode::Open => AuthMethod::None,
            AuthMode::Wpa3Psk => AuthMethod::WPA3Personal,
            _ => AuthMethod::WPA2Personal,
        },
        max_connections: u16::from(config.ap_max_connections),
        ..Default::default()
    })
}

/// AP knobs WPA3 needs that the high-level configuration does not expose.
fn tune_access_point() -> Result<(), EspError> {
    // SAFETY: read-modify-write of the AP config arm; the driver copies it.
    unsafe {
        let mut cfg: wifi_config_t = core::mem::zeroed();
        esp!(esp_wifi_get_config(wifi_interface_t_WIFI_IF_AP, &mut cfg))?;
        cfg.ap.authmode = wifi_auth_mode_t_WIFI_AUTH_WPA3_PSK;
        cfg.ap.sae_pwe_h2e = wifi_sae_pwe_method_t_WPA3_SAE_PWE_BOTH;
        cfg.ap.pmf_cfg.required = true;
        esp!(esp_wifi_set_config(wifi_interface_t_WIFI_IF_AP, &mut cfg))
    }
}

/// STA knobs the high-level configuration does not expose.
fn tune_station(config: &RouterConfig) -> Result<(), EspError> {
    // SAFETY: read-modify-write of the STA config arm; the driver copies it.
    unsafe {
        let mut cfg: wifi_config_t = core::mem::zeroed();
        esp!(esp_wifi_get_config(wifi_interface_t_WIFI_IF_STA, &mut cfg))?;
        cfg.sta.scan_method = wifi_scan_method_t_WIFI_ALL_CHANNEL_SCAN;
        cfg.sta.failure_retry_cnt = config.sta_failure_retry_cnt;
        cfg.sta.sae_pwe_h2e = wifi_sae_pwe_method_t_WPA3_SAE_PWE_BOTH;
        esp!(esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut cfg))
    }
}

// ── Event translation ─────────────────────────────────────────

fn ip(addr: esp_ip4_addr_t) -> Ipv4Addr {
    Ipv4Addr::from(addr.addr.to_le_bytes())
}

unsafe extern "C" fn on_system_event(
    _arg: *mut c_void,
    base: esp_event_base_t,
    id: i32,
    data: *mut c_void,
) {
    let Ok(id) = u32::try_from(id) else {
        return;
    };
    // SAFETY: the event loop hands `data` pointing at the struct that
    // matches (base, id) for the duration of this call.
    let event = unsafe {
        if base == WIFI_EVENT {
            wifi_event(id, data)
        } else if base == IP_EVENT {
            ip_event(id, data)
        } else {
            None
        }
    };
    if let Some(event) = event {
        push_event(event);
    }
}

#[allow(non_upper_case_globals)]
unsafe fn wifi_event(id: u32, data: *const c_void) -> Option<Event> {
    let event = match id {
        wifi_event_t_WIFI_EVENT_STA_START => Event::StaStarted,
        wifi_event_t_WIFI_EVENT_STA_STOP => Event::StaStopped,
        wifi_event_t_WIFI_EVENT_AP_START => Event::ApStarted,
        wifi_event_t_WIFI_EVENT_AP_STOP => Event::ApStopped,
        wifi_event_t_WIFI_EVENT_STA_CONNECTED if !data.is_null() => {
            // SAFETY: see `on_system_event`.
            let ev = unsafe { &*data.cast::<wifi_event_sta_connected_t>() };
            Event::StaConnected {
                bssid: MacAddr(ev.bssid),
                aid: u16::from(ev.aid),
            }
        }
        wifi_event_t_WIFI_EVENT_STA_DISCONNECTED if !data.is_null() => {
            // SAFETY: see `on_system_event`.
            let ev = unsafe { &*data.cast::<wifi_event_sta_disconnected_t>() };
            Event::StaDisconnected {
                bssid: MacAddr(ev.bssid),
                reason: DisconnectReason::from_code(u16::from(ev.reason)),
            }
        }
        wifi_event_t_WIFI_EVENT_AP_STACONNECTED if !data.is_null() => {
            // SAFETY: see `on_system_event`.
            let ev = unsafe { &*data.cast::<wifi_event_ap_staconnected_t>() };
            Event::ApClientJoined {
                mac: MacAddr(ev.mac),
                aid: u16::from(ev.aid),
            }
        }
        wifi_event_t_WIFI_EVENT_AP_STADISCONNECTED if !data.is_null() => {
            // SAFETY: see `on_system_event`.
            let ev = unsafe { &*data.cast::<wifi_event_ap_stadisconnected_t>() };
            Event::ApClientLeft {
                mac: MacAddr(ev.mac),
                aid: u16::from(ev.aid),
                reason: u16::from(ev.reason),
            }
        }
        _ => return None,
    };
    Some(event)
}

#[allow(non_upper_case_globals)]
unsafe fn ip_event(id: u32, data: *const c_void) -> Option<Event> {
    let event = match id {
        ip_event_t_IP_EVENT_STA_GOT_IP if !data.is_null() => {
            // SAFETY: see `on_system_event`.
            let ev = unsafe { &*data.cast::<ip_event_got_ip_t>() };
            Event::StaGotIp(IpInfo {
                ip: ip(ev.ip_info.ip),
                netmask: ip(ev.ip_info.netmask),
                gateway: ip(ev.ip_info.gw),
            })
        }
        ip_event_t_IP_EVENT_STA_LOST_IP => Event::StaLostIp,
        ip_event_t_IP_EVENT_ASSIGNED_IP_TO_CLIENT if !data.is_null() => {
            // SAFETY: see `on_system_event`.
            let ev = unsafe { &*data.cast::<ip_event_assigned_ip_to_client_t>() };
            Event::ApClientAssignedIp {
                mac: MacAddr(ev.mac),
                ip: ip(ev.ip),
            }
        }
        _ => return None,
    };
    Some(event)
}
