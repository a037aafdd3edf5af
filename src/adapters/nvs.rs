//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ByteStore`] (the calibration region) and [`ConfigPort`]
//! for the FireNode.
//!
//! - The calibration region is an EEPROM-style byte array: reads and writes
//!   hit a RAM shadow, `commit` stores the whole shadow as one NVS blob.
//!   NVS commits are atomic, so the region on flash is always either the
//!   old or the new image.
//! - A failed read poisons the region until the next successful
//!   [`NvsAdapter::reload`]: every byte access and commit reports
//!   [`StorageError::IoError`], so a blank shadow can never overwrite the
//!   blob still on flash.
//! - Config lives in its own namespace, `postcard`-encoded, and is validated
//!   before persistence.

use crate::app::ports::{ByteStore, ConfigError, ConfigPort};
use crate::config::{NodeConfig, validate_config};
use crate::error::StorageError;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

const CONFIG_NAMESPACE: &str = "firenode";
const CONFIG_KEY: &[u8] = b"nodecfg\0";

const CALIB_NAMESPACE: &str = "eeprom";
const CALIB_KEY: &[u8] = b"calib\0";

/// Calibration region size: one marker byte plus the largest blob.
pub const CALIB_REGION_LEN: usize = 256;

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    shadow: [u8; CALIB_REGION_LEN],
    dirty: bool,
    read_failed: bool,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
    #[cfg(not(target_os = "espidf"))]
    fail_reads: std::cell::Cell<bool>,
}

impl NvsAdapter {
    /// Initialise NVS flash and load the calibration shadow.
    ///
    /// On first boot or after a version mismatch the NVS partition is erased
    /// and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK as i32 {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as i32 {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        let mut nvs = Self {
            shadow: [0xFF; CALIB_REGION_LEN],
            dirty: false,
            read_failed: false,
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            fail_reads: std::cell::Cell::new(false),
        };
        nvs.reload();
        Ok(nvs)
    }

    /// Re-read the calibration region from flash, dropping uncommitted writes.
    pub fn reload(&mut self) {
        self.shadow = [0xFF; CALIB_REGION_LEN];
        let mut buf = [0u8; CALIB_REGION_LEN];
        match self.read_blob(CALIB_NAMESPACE, CALIB_KEY, &mut buf) {
            Ok(Some(len)) => {
                self.shadow[..len].copy_from_slice(&buf[..len]);
                info!("NvsAdapter: calibration region loaded ({} bytes)", len);
            }
            Ok(None) => info!("NvsAdapter: calibration region empty"),
            Err(e) => {
                warn!("NvsAdapter: calibration region unreadable ({}), region locked", e);
                self.read_failed = true;
                self.dirty = false;
                return;
            }
        }
        self.read_failed = false;
        self.dirty = false;
    }

    /// Whether the shadow holds writes not yet committed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the last reload failed to read the region.
    pub fn read_failed(&self) -> bool {
        self.read_failed
    }

    fn check_readable(&self) -> Result<(), StorageError> {
        if self.read_failed {
            Err(StorageError::IoError)
        } else {
            Ok(())
        }
    }

    /// Make every following flash read fail until cleared.
    #[cfg(not(target_os = "espidf"))]
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// The calibration blob as it sits in the backing store.
    #[cfg(not(target_os = "espidf"))]
    pub fn stored_region(&self) -> Option<Vec<u8>> {
        self.store
            .borrow()
            .get(&Self::composite_key(CALIB_NAMESPACE, CALIB_KEY))
            .cloned()
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &[u8]) -> String {
        let key = key.strip_suffix(b"\0").unwrap_or(key);
        format!("{}::{}", namespace, String::from_utf8_lossy(key))
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Read a blob into `buf`.  `Ok(None)` when the key does not exist.
    fn read_blob(
        &self,
        namespace: &str,
        key: &[u8],
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if self.fail_reads.get() {
                return Err(StorageError::IoError);
            }
            match self.store.borrow().get(&Self::composite_key(namespace, key)) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(Some(len))
                }
                None => Ok(None),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(Some(size)),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Ok(None),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    /// Write a blob and commit it.
    fn write_blob(&self, namespace: &str, key: &[u8], data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("NvsAdapter: NVS write error {}", e);
                StorageError::CommitFailed
            })
        }
    }
}

// ── Calibration region ─────────────────────────────────────────

impl ByteStore for NvsAdapter {
    fn capacity(&self) -> usize {
        CALIB_REGION_LEN
    }

    fn read_byte(&self, addr: usize) -> Result<u8, StorageError> {
        self.check_readable()?;
        self.shadow.get(addr).copied().ok_or(StorageError::OutOfBounds)
    }

    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), StorageError> {
        self.check_readable()?;
        let slot = self.shadow.get_mut(addr).ok_or(StorageError::OutOfBounds)?;
        if *slot != value {
            *slot = value;
            self.dirty = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.check_readable()?;
        if !self.dirty {
            return Ok(());
        }
        self.write_blob(CALIB_NAMESPACE, CALIB_KEY, &self.shadow)?;
        self.dirty = false;
        Ok(())
    }
}

// ── Node config ────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        #[cfg(target_os = "espidf")]
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        #[cfg(not(target_os = "espidf"))]
        let mut buf = vec![0u8; 1024];

        match self.read_blob(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(Some(len)) => {
                let cfg: NodeConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Ok(None) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(NodeConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({}), using defaults", e);
                Ok(NodeConfig::default())
            }
        }
    }

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
