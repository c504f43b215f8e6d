//! Inbound event queue.
//!
//! Events are produced by:
//! - the ESP-IDF event loop (WiFi and IP events, translated by the
//!   `wifi` adapter)
//! - the one-shot reconnect timer callback (through a dedicated
//!   one-slot signal, so a full queue can never swallow an expiry)
//! - the HTTP provisioning handler after a credential write
//!
//! Events are consumed by the single dispatcher loop in `main`, which
//! hands them to the supervisor one at a time in arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ WiFi / IP   │────▶│              │     │              │
//! │ Timer       │────▶│  EventQueue  │────▶│  Dispatcher  │
//! │ HTTP        │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::fmt;
use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::warn;

use crate::app::ports::IpInfo;
use crate::fsm::reason::DisconnectReason;

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 32;

/// 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Inbound events, one variant per source notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // ── STA radio ─────────────────────────────────────────
    StaStarted,
    StaStopped,
    StaConnected { bssid: MacAddr, aid: u16 },
    StaDisconnected { bssid: MacAddr, reason: DisconnectReason },

    // ── STA IP ────────────────────────────────────────────
    StaGotIp(IpInfo),
    StaLostIp,

    // ── AP ────────────────────────────────────────────────
    ApStarted,
    ApStopped,
    ApClientJoined { mac: MacAddr, aid: u16 },
    ApClientLeft { mac: MacAddr, aid: u16, reason: u16 },
    ApClientAssignedIp { mac: MacAddr, ip: Ipv4Addr },

    // ── Internal ──────────────────────────────────────────
    /// The one-shot reconnect timer expired.
    ReconnectTimerFired,
    /// New credentials were persisted by the provisioning interface.
    CredentialsUpdated,
}

// ── Bounded MPSC queue ────────────────────────────────────────
//
// Producers run on the event-loop, timer and httpd tasks; the
// dispatcher is the only consumer.  Timer expiry bypasses the bounded
// channel: at most one reconnect timer is ever pending, so a single
// latched slot is enough and cannot overflow.

pub struct EventQueue {
    chan: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
    expiry: Signal<CriticalSectionRawMutex, ()>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            chan: Channel::new(),
            expiry: Signal::new(),
        }
    }

    /// Latch a reconnect-timer expiry.  Never fails; repeated posts before
    /// the dispatcher runs collapse into one [`Event::ReconnectTimerFired`].
    pub fn post_expiry(&self) {
        self.expiry.signal(());
    }

    /// Enqueue without blocking.  Returns `false` if the queue is full
    /// (event dropped).
    pub fn push(&self, event: Event) -> bool {
        self.chan.try_send(event).is_ok()
    }

    /// Dequeue the oldest event, if any.  A latched timer expiry is
    /// handed out once the channel is empty.
    pub fn pop(&self) -> Option<Event> {
        self.chan
            .try_receive()
            .ok()
            .or_else(|| self.expiry.try_take().map(|()| Event::ReconnectTimerFired))
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    /// Wait for the next event.
    pub async fn next(&self) -> Event {
        futures_lite::future::or(self.chan.receive(), async {
            self.expiry.wait().await;
            Event::ReconnectTimerFired
        })
        .await
    }

    pub fn len(&self) -> usize {
        self.chan.len() + usize::from(self.expiry.signaled())
    }

    pub fn is_empty(&self) -> bool {
        self.chan.is_empty() && !self.expiry.signaled()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide inbound queue shared by every producer.
pub static EVENTS: EventQueue = EventQueue::new();

/// Push onto [`EVENTS`], logging when the event is dropped.
pub fn push_event(event: Event) -> bool {
    let queued = EVENTS.push(event);
    if !queued {
        warn!("event queue full, dropped {:?}", event);
    }
    queued
}
