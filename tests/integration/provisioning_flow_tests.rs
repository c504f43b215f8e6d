//! End-to-end provisioning flow: form body → credential store → queued
//! event → supervisor → STA configuration.
//!
//! Uses the host backends of the real adapters (`NvsAdapter`,
//! `NetifAdapter`) rather than the recording mocks.

use natrouter::adapters::log_sink::LogEventSink;
use natrouter::adapters::netif::NetifAdapter;
use natrouter::adapters::nvs::NvsAdapter;
use natrouter::app::ports::CredentialStore;
use natrouter::app::provisioning::{self, FormError, MAX_FORM_BYTES, ProvisionError};
use natrouter::app::service::Supervisor;
use natrouter::config::RouterConfig;
use natrouter::events::{Event, EventQueue, MacAddr};
use natrouter::fsm::Phase;

use crate::mock_net::MockTimer;

struct Device {
    sup: Supervisor,
    net: NetifAdapter,
    timer: MockTimer,
    store: NvsAdapter,
    sink: LogEventSink,
    queue: EventQueue,
}

impl Device {
    fn boot() -> Self {
        let store = NvsAdapter::new().unwrap();
        let mut sup = Supervisor::new(RouterConfig::default(), &store).unwrap();
        let mut net = NetifAdapter::new();
        let mut sink = LogEventSink::new();
        sup.start(&mut net, &mut sink);
        Self {
            sup,
            net,
            timer: MockTimer::new(),
            store,
            sink,
            queue: EventQueue::new(),
        }
    }

    fn post(&mut self, body: &[u8]) -> Result<(), ProvisionError> {
        provisioning::submit(body, &mut self.store, &self.queue).map(|_| ())
    }

    fn push(&mut self, event: Event) {
        assert!(self.queue.push(event));
    }

    fn pump(&mut self) -> usize {
        self.sup.dispatch_pending(
            &self.queue,
            &mut self.net,
            &mut self.timer,
            &self.store,
            &mut self.sink,
        )
    }
}

#[test]
fn boot_uses_defaults_with_empty_flash() {
    let dev = Device::boot();
    assert_eq!(dev.net.sim().sta.ssid.as_str(), "SSID");
    assert_eq!(dev.net.sim().sta.password.as_str(), "PASS");
    assert!(dev.net.sim().ap_ip.is_some());
}

#[test]
fn posted_pair_reaches_the_radio() {
    let mut dev = Device::boot();
    dev.push(Event::StaStarted);
    dev.push(Event::StaConnected {
        bssid: MacAddr([1, 2, 3, 4, 5, 6]),
        aid: 1,
    });
    dev.pump();
    assert_eq!(dev.sup.phase(), Phase::Connected);

    dev.post(b"ssid=Cafe+Wifi&password=caf%C3%A9-2024").unwrap();
    assert_eq!(dev.pump(), 1);

    let sta = &dev.net.sim().sta;
    assert_eq!(sta.ssid.as_str(), "Cafe Wifi");
    assert_eq!(sta.password.as_str(), "caf\u{e9}-2024");
    assert!(dev.net.sim().connect_requested);
    assert_eq!(dev.sup.phase(), Phase::Connecting);

    let stored = dev.store.load().unwrap().unwrap();
    assert_eq!(stored.ssid(), "Cafe Wifi");
}

#[test]
fn newest_of_two_posts_wins() {
    let mut dev = Device::boot();
    dev.post(b"ssid=First&password=one11111").unwrap();
    dev.post(b"password=two22222&ssid=Second").unwrap();
    assert_eq!(dev.pump(), 2);

    assert_eq!(dev.net.sim().sta.ssid.as_str(), "Second");
    assert_eq!(dev.sup.state().credentials.ssid(), "Second");
}

#[test]
fn rejected_form_leaves_store_and_queue_alone() {
    let mut dev = Device::boot();

    assert_eq!(
        dev.post(b"password=abc"),
        Err(ProvisionError::Form(FormError::MissingField("ssid")))
    );
    assert!(matches!(
        dev.post(b"ssid=&password=x"),
        Err(ProvisionError::Form(FormError::Credential(_)))
    ));
    let oversized = vec![b'a'; MAX_FORM_BYTES + 1];
    assert!(matches!(
        dev.post(&oversized),
        Err(ProvisionError::Form(FormError::TooLarge(_)))
    ));

    assert!(dev.queue.is_empty());
    assert_eq!(dev.store.load().unwrap(), None);
}

#[test]
fn stored_pair_survives_reboot() {
    let mut dev = Device::boot();
    dev.post(b"ssid=Loft&password=pa55word").unwrap();

    let sup = Supervisor::new(RouterConfig::default(), &dev.store).unwrap();
    assert_eq!(sup.state().credentials.ssid(), "Loft");
}
