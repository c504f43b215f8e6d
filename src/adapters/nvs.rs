//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`], [`StoragePort`] and [`CredentialStore`].
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Namespace isolation: router config lives in `natrouter`, STA
//!   credentials in `wifi` (keys `ssid` / `password`, stored as NVS
//!   strings so pairs written by earlier firmware stay readable).
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`; a
//!   credential pair is written under one handle and committed once.

use crate::app::ports::{ConfigError, ConfigPort, CredentialStore, StorageError, StoragePort};
use crate::config::RouterConfig;
use crate::credentials::Credentials;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "natrouter";
const CONFIG_KEY: &str = "routercfg";

const MAX_BLOB_SIZE: usize = 1024;

const CRED_NAMESPACE: &str = "wifi";
const CRED_SSID_KEY: &str = "ssid";
const CRED_PASSWORD_KEY: &str = "password";

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// NUL-terminated copy of an NVS key or namespace (max 15 bytes).
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns_buf = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: ns_buf is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used after close.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Read an NVS string value under an open handle.
    #[cfg(target_os = "espidf")]
    fn get_str(handle: nvs_handle_t, key: &str) -> Result<String, i32> {
        let key_buf = Self::c_name(key);
        let mut size: usize = 0;
        // SAFETY: a null output pointer asks NVS for the required length.
        let ret = unsafe {
            nvs_get_str(
                handle,
                key_buf.as_ptr() as *const _,
                core::ptr::null_mut(),
                &mut size,
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        if size == 0 || size > MAX_BLOB_SIZE {
            return Err(ESP_ERR_NVS_INVALID_LENGTH);
        }

        let mut buf = vec![0u8; size];
        // SAFETY: buf holds `size` bytes as reported by the first call.
        let ret = unsafe {
            nvs_get_str(
                handle,
                key_buf.as_ptr() as *const _,
                buf.as_mut_ptr() as *mut _,
                &mut size,
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        // Drop the trailing NUL.
        buf.truncate(size.saturating_sub(1));
        String::from_utf8(buf).map_err(|_| ESP_ERR_NVS_INVALID_LENGTH)
    }

    #[cfg(target_os = "espidf")]
    fn set_str(handle: nvs_handle_t, key: &str, value: &str) -> Result<(), i32> {
        let key_buf = Self::c_name(key);
        let mut val = Vec::with_capacity(value.len() + 1);
        val.extend_from_slice(value.as_bytes());
        val.push(0);
        // SAFETY: both buffers are NUL-terminated and outlive the call.
        let ret = unsafe {
            nvs_set_str(
                handle,
                key_buf.as_ptr() as *const _,
                val.as_ptr() as *const _,
            )
        };
        if ret != ESP_OK {
            return Err(ret);
        }
        Ok(())
    }
}

// ── Router config ──────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<RouterConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: RouterConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                cfg.validate()?;
                info!("NvsAdapter: loaded config from store ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(RouterConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({}), using defaults", e);
                Ok(RouterConfig::default())
            }
        }
    }

    fn save(&self, config: &RouterConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }

        match self.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes) {
            Ok(()) => {
                info!("NvsAdapter: config saved ({} bytes)", bytes.len());
                Ok(())
            }
            Err(StorageError::Full) => Err(ConfigError::StorageFull),
            Err(e) => {
                warn!("NvsAdapter: config write error ({})", e);
                Err(ConfigError::IoError)
            }
        }
    }
}

// ── Generic key/value storage ─────────────────────────────────

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let key_buf = Self::c_name(key);
                let mut size = buf.len();
                // SAFETY: buf is valid for `size` bytes.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let key_buf = Self::c_name(key);
                // SAFETY: key_buf is NUL-terminated; data outlives the call.
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }
}

// ── STA credentials ───────────────────────────────────────────

impl CredentialStore for NvsAdapter {
    fn load(&self) -> Result<Option<Credentials>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        let pair = {
            let store = self.store.borrow();
            let get = |key| {
                store
                    .get(&Self::composite_key(CRED_NAMESPACE, key))
                    .map(|v| String::from_utf8(v.clone()).map_err(|_| StorageError::Corrupted))
                    .transpose()
            };
            (get(CRED_SSID_KEY)?, get(CRED_PASSWORD_KEY)?)
        };

        #[cfg(target_os = "espidf")]
        let pair = {
            let result = Self::with_nvs_handle(CRED_NAMESPACE, false, |handle| {
                let get = |key| match Self::get_str(handle, key) {
                    Ok(v) => Ok(Some(v)),
                    Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
                    Err(e) => Err(e),
                };
                Ok((get(CRED_SSID_KEY)?, get(CRED_PASSWORD_KEY)?))
            });
            match result {
                Ok(pair) => pair,
                // Namespace is created on first write.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => (None, None),
                Err(e) => {
                    warn!("NvsAdapter: credential read error {}", e);
                    return Err(StorageError::IoError);
                }
            }
        };

        match pair {
            (Some(ssid), Some(password)) => match Credentials::new(&ssid, &password) {
                Ok(creds) => Ok(Some(creds)),
                Err(e) => {
                    warn!("NvsAdapter: stored credentials unusable: {}", e);
                    Err(StorageError::Corrupted)
                }
            },
            _ => Ok(None),
        }
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let mut store = self.store.borrow_mut();
            store.insert(
                Self::composite_key(CRED_NAMESPACE, CRED_SSID_KEY),
                credentials.ssid().as_bytes().to_vec(),
            );
            store.insert(
                Self::composite_key(CRED_NAMESPACE, CRED_PASSWORD_KEY),
                credentials.password().as_bytes().to_vec(),
            );
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CRED_NAMESPACE, true, |handle| {
                Self::set_str(handle, CRED_SSID_KEY, credentials.ssid())?;
                Self::set_str(handle, CRED_PASSWORD_KEY, credentials.password())?;
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            if let Err(e) = result {
                warn!("NvsAdapter: credential write error {}", e);
                return Err(if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                });
            }
        }

        info!("NvsAdapter: credentials saved for '{}'", credentials.ssid());
        Ok(())
    }
}
