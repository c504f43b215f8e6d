//! HTTP provisioning interface.
//!
//! | Route         | Behaviour                                              |
//! |---------------|--------------------------------------------------------|
//! | `GET /`       | Credential form                                        |
//! | `POST /`      | Store `ssid` / `password`, post `CredentialsUpdated`   |
//! | `GET /status` | JSON `{ "uplink_connected": bool, "firmware": "x.y" }` |
//!
//! Every response carries `Cache-Control: no-cache` and
//! `X-Content-Type-Options: nosniff`.  The page rendering and status
//! document are target independent; the server itself is ESP-IDF only.

use serde::Serialize;

use crate::app::indicator::LinkIndicator;
use crate::app::provisioning::{FormError, ProvisionError};

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>NAT Router</title></head>
<body>
<h1>Uplink network</h1>
<form method="post" action="/">
<label>SSID <input name="ssid" maxlength="32" required></label><br>
<label>Password <input name="password" type="password" maxlength="64"></label><br>
<button type="submit">Save</button>
</form>
<p><a href="/status">status</a></p>
</body></html>
"#;

/// Body of `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub uplink_connected: bool,
    pub firmware: &'static str,
}

impl StatusReport {
    pub fn current(indicator: &LinkIndicator) -> Self {
        Self {
            uplink_connected: indicator.is_up(),
            firmware: FIRMWARE_VERSION,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn saved_page(ssid: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>NAT Router</title></head>\
         <body><p>Saved. Connecting to <b>{}</b>.</p><p><a href=\"/\">back</a></p></body></html>",
        escape_html(ssid)
    )
}

/// Status line and message for a failed submission.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn rejection(err: &ProvisionError) -> (u16, &'static str) {
    match err {
        ProvisionError::Form(FormError::TooLarge(_)) => (413, "Payload Too Large"),
        ProvisionError::Form(_) => (400, "Bad Request"),
        ProvisionError::Storage(_) => (500, "Internal Server Error"),
        ProvisionError::QueueFull => (503, "Service Unavailable"),
    }
}

#[cfg(target_os = "espidf")]
pub use server::ProvisioningServer;

#[cfg(target_os = "espidf")]
mod server {
    use std::sync::{Arc, Mutex};

    use esp_idf_svc::http::{Headers, Method};
    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::io::{Read, Write};
    use log::{info, warn};

    use super::*;
    use crate::app::ports::CredentialStore;
    use crate::app::provisioning::{self, MAX_FORM_BYTES};
    use crate::events::EVENTS;

    const HTML: [(&str, &str); 3] = [
        ("Content-Type", "text/html; charset=utf-8"),
        ("Cache-Control", "no-cache"),
        ("X-Content-Type-Options", "nosniff"),
    ];
    const JSON: [(&str, &str); 3] = [
        ("Content-Type", "application/json"),
        ("Cache-Control", "no-cache"),
        ("X-Content-Type-Options", "nosniff"),
    ];

    pub struct ProvisioningServer {
        _server: EspHttpServer<'static>,
    }

    impl ProvisioningServer {
        pub fn start<S>(
            port: u16,
            store: Arc<Mutex<S>>,
            indicator: LinkIndicator,
        ) -> anyhow::Result<Self>
        where
            S: CredentialStore + Send + 'static,
        {
            let mut server = EspHttpServer::new(&Configuration {
                http_port: port,
                ..Default::default()
            })?;

            server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
                req.into_response(200, Some("OK"), &HTML)?
                    .write_all(FORM_PAGE.as_bytes())?;
                Ok(())
            })?;

            server.fn_handler::<anyhow::Error, _>("/", Method::Post, move |mut req| {
                if req.content_len().unwrap_or(0) > MAX_FORM_BYTES as u64 {
                    let err = ProvisionError::Form(FormError::TooLarge(MAX_FORM_BYTES + 1));
                    let (status, msg) = rejection(&err);
                    req.into_response(status, Some(msg), &HTML)?
                        .write_all(msg.as_bytes())?;
                    return Ok(());
                }

                // One spare byte detects a body longer than its header claims.
                let mut buf = [0u8; MAX_FORM_BYTES + 1];
                let mut len = 0;
                while len < buf.len() {
                    let n = req.read(&mut buf[len..])?;
                    if n == 0 {
                        break;
                    }
                    len += n;
                }

                let result = {
                    let mut guard = match store.lock() {
                        Ok(g) => g,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    provisioning::submit(&buf[..len], &mut *guard, &EVENTS)
                };

                match result {
                    Ok(creds) => {
                        req.into_response(200, Some("OK"), &HTML)?
                            .write_all(saved_page(creds.ssid()).as_bytes())?;
                    }
                    Err(e) => {
                        warn!("http: provisioning rejected: {}", e);
                        let (status, msg) = rejection(&e);
                        req.into_response(status, Some(msg), &HTML)?
                            .write_all(msg.as_bytes())?;
                    }
                }
                Ok(())
            })?;

            server.fn_handler::<anyhow::Error, _>("/status", Method::Get, move |req| {
                let body = StatusReport::current(&indicator).to_json()?;
                req.into_response(200, Some("OK"), &JSON)?.write_all(&body)?;
                Ok(())
            })?;

            info!("http: provisioning server on port {}", port);
            Ok(Self { _server: server })
        }
    }
}
