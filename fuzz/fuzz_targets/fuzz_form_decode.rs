//! Fuzz target: provisioning form parser
//!
//! Feeds arbitrary bytes to `parse_form` as an HTTP POST body.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Accepted pairs are never empty and never exceed 32 / 64 bytes
//! - Bodies over `MAX_FORM_BYTES` are always rejected
//!
//! cargo fuzz run fuzz_form_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use natrouter::app::provisioning::{parse_form, FormError, MAX_FORM_BYTES};
use natrouter::credentials::{MAX_PASSWORD_LEN, MAX_SSID_LEN};

// Links the std critical-section implementation for the event queue.
use critical_section as _;

fuzz_target!(|data: &[u8]| {
    match parse_form(data) {
        Ok(creds) => {
            assert!(data.len() <= MAX_FORM_BYTES);
            assert!(!creds.ssid().is_empty() && creds.ssid().len() <= MAX_SSID_LEN);
            assert!(!creds.password().is_empty() && creds.password().len() <= MAX_PASSWORD_LEN);
        }
        Err(FormError::TooLarge(n)) => assert_eq!(n, data.len()),
        Err(_) => assert!(data.len() <= MAX_FORM_BYTES),
    }
});
