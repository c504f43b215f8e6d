//! One-shot reconnect timer.
//!
//! Implements [`TimerPort`].  On expiry the timer latches
//! [`Event::ReconnectTimerFired`](crate::events::Event::ReconnectTimerFired) on the queue it was created with
//! ([`EventQueue::post_expiry`]); the dispatcher then hands it to the
//! supervisor like any other event.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: a single `esp_timer` created once and re-armed with
//! `esp_timer_start_once`.  The callback runs in the esp_timer task
//! (not ISR) and only enqueues.
//! On host/test: each arm spawns a sleeper thread.

use core::time::Duration;

use crate::app::ports::TimerPort;
use crate::error::TimerError;
use crate::events::EventQueue;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub struct ReconnectTimer {
    #[cfg(target_os = "espidf")]
    handle: esp_timer_handle_t,
    #[cfg(not(target_os = "espidf"))]
    queue: &'static EventQueue,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_expiry(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static EventQueue` passed to `ReconnectTimer::new`.
    let queue = unsafe { &*(arg as *const EventQueue) };
    queue.post_expiry();
}

impl ReconnectTimer {
    #[cfg(target_os = "espidf")]
    pub fn new(queue: &'static EventQueue) -> Result<Self, TimerError> {
        let args = esp_timer_create_args_t {
            callback: Some(on_expiry),
            arg: (queue as *const EventQueue).cast_mut().cast(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"reconnect".as_ptr(),
            skip_unhandled_events: false,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` is fully initialised and `handle` is a valid
        // out-pointer; the queue outlives the timer.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK {
            return Err(TimerError::CreateFailed(ret));
        }
        Ok(Self { handle })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(queue: &'static EventQueue) -> Result<Self, TimerError> {
        Ok(Self { queue })
    }
}

#[cfg(target_os = "espidf")]
impl TimerPort for ReconnectTimer {
    fn arm_once(&mut self, delay: Duration) -> Result<(), TimerError> {
        let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        // SAFETY: `handle` was created in `new` and is only deleted on drop.
        let ret = unsafe { esp_timer_start_once(self.handle, micros) };
        if ret != ESP_OK {
            return Err(TimerError::ArmFailed(ret));
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        // SAFETY: stop may fail if the timer is idle, which is harmless;
        // delete requires it to be stopped.
        unsafe {
            let _ = esp_timer_stop(self.handle);
            let _ = esp_timer_delete(self.handle);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimerPort for ReconnectTimer {
    fn arm_once(&mut self, delay: Duration) -> Result<(), TimerError> {
        let queue = self.queue;
        std::thread::Builder::new()
            .name("reconnect".into())
            .spawn(move || {
                std::thread::sleep(delay);
                queue.post_expiry();
            })
            .map(|_| ())
            .map_err(|_| TimerError::ArmFailed(-1))
    }
}
