//! NAT Router Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single event-driven dispatcher.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiStack ──▶ EVENTS ◀── ReconnectTimer ◀── ProvisioningServer│
//! │  NetifAdapter   NvsAdapter      LogEventSink     StatusLed     │
//! │  (NetworkPort)  (CredentialStore)(EventSink)     (GPIO2)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             Supervisor (pure logic)                    │    │
//! │  │  phase · auth ladder · backoff · NAT/DNS coordination  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use futures_lite::future::block_on;
use log::{info, warn};

use natrouter::adapters::http::ProvisioningServer;
use natrouter::adapters::log_sink::LogEventSink;
use natrouter::adapters::nvs::NvsAdapter;
use natrouter::adapters::timer::ReconnectTimer;
use natrouter::adapters::wifi::WifiStack;
use natrouter::app::ports::ConfigPort;
use natrouter::app::service::Supervisor;
use natrouter::config::RouterConfig;
use natrouter::drivers::status_led::StatusLed;
use natrouter::error::Error;
use natrouter::events::EVENTS;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  NAT Router v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage + config ───────────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            RouterConfig::default()
        }
    };
    let store = Arc::new(Mutex::new(nvs));

    // ── 3. Radio ──────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut wifi = WifiStack::new(peripherals.modem, sysloop, nvs_partition, &config)?;
    let mut net = wifi.netif();
    let mut timer = ReconnectTimer::new(&EVENTS).map_err(Error::from)?;
    let mut sink = LogEventSink::new();

    // ── 4. Supervisor ─────────────────────────────────────────
    let mut supervisor = Supervisor::new(config.clone(), &*lock(&store))?;
    supervisor.start(&mut net, &mut sink);
    wifi.start()?;

    // ── 5. Provisioning + status LED ──────────────────────────
    let _http = ProvisioningServer::start(
        config.http_port,
        Arc::clone(&store),
        supervisor.indicator(),
    )?;

    let indicator = supervisor.indicator();
    let blink = config.status_blink_interval();
    let mut led = StatusLed::new(PinDriver::output(peripherals.pins.gpio2)?)?;
    std::thread::Builder::new()
        .name("status-led".into())
        .stack_size(3072)
        .spawn(move || loop {
            if let Err(e) = led.tick(indicator.is_up()) {
                warn!("status LED write failed: {}", e);
            }
            std::thread::sleep(blink);
        })?;

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let event = block_on(EVENTS.next());
        let creds = lock(&store);
        supervisor.handle(event, &mut net, &mut timer, &*creds, &mut sink);
    }
}
