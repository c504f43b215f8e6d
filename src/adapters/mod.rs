//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                    |
//! |------------|-------------------------|--------------------------------|
//! | `netif`    | NetworkPort             | esp_wifi / esp_netif (AP+STA)  |
//! | `timer`    | TimerPort               | esp_timer one-shot             |
//! | `nvs`      | CredentialStore         | NVS `wifi` namespace           |
//! |            | ConfigPort, StoragePort | NVS config blob                |
//! | `log_sink` | EventSink               | Serial log output              |
//! | `wifi`     | (bring-up)              | EspWifi driver, event loop     |
//! | `http`     | (provisioning surface)  | esp_http_server                |

pub mod http;
pub mod log_sink;
pub mod netif;
pub mod nvs;
pub mod timer;
#[cfg(target_os = "espidf")]
pub mod wifi;
