//! Output device discovery and default-device switching.
//!
//! The registry queries the host for the full device list on demand (no
//! live subscription), keeps the output-capable subset in host enumeration
//! order, and records the default output device it last set. A device whose
//! name lookup fails is skipped rather than failing the whole refresh.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AudioError;
use crate::host::{AudioHost, DeviceId};

/// Immutable snapshot of one output-capable device.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDevice {
    pub id: DeviceId,
    pub name: String,
    pub is_output: bool,
}

struct RegistryInner {
    devices: Vec<OutputDevice>,
    current: Option<DeviceId>,
}

/// Discovers output devices and switches the host default output.
pub struct OutputDeviceRegistry {
    host: Arc<dyn AudioHost>,
    inner: Mutex<RegistryInner>,
}

impl OutputDeviceRegistry {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self {
            host,
            inner: Mutex::new(RegistryInner {
                devices: Vec::new(),
                current: None,
            }),
        }
    }

    /// Query the host device list and return the output-capable devices in
    /// host enumeration order.
    ///
    /// Fails with [`AudioError::DeviceQueryFailed`] only when the list
    /// query itself fails; a device whose name lookup fails is skipped and
    /// logged.
    pub fn refresh(&self) -> Result<Vec<OutputDevice>, AudioError> {
        let ids = self
            .host
            .device_ids()
            .map_err(AudioError::DeviceQueryFailed)?;

        let mut devices = Vec::new();
        for id in ids {
            if self.host.output_channels(id) == 0 {
                continue;
            }
            let name = match self.host.device_name(id) {
                Ok(name) => name,
                Err(status) => {
                    warn!(device = id.0, %status, "skipping device, name lookup failed");
                    continue;
                }
            };
            devices.push(OutputDevice {
                id,
                name,
                is_output: true,
            });
        }

        debug!(count = devices.len(), "output device list refreshed");
        self.inner.lock().devices = devices.clone();
        Ok(devices)
    }

    /// The snapshot taken by the last successful `refresh`.
    pub fn devices(&self) -> Vec<OutputDevice> {
        self.inner.lock().devices.clone()
    }

    /// Make `device` the host's default output. On success the identifier
    /// is recorded; on failure the previously recorded default is left
    /// unchanged.
    pub fn set_default_output(&self, device: DeviceId) -> Result<(), AudioError> {
        self.host
            .set_default_output_device(device)
            .map_err(|status| AudioError::DeviceSwitchFailed { device, status })?;

        self.inner.lock().current = Some(device);
        debug!(device = device.0, "default output device switched");
        Ok(())
    }

    /// The identifier last successfully set by this process, if any. This
    /// never queries the host's actual current default.
    pub fn default_output(&self) -> Option<DeviceId> {
        self.inner.lock().current
    }
}
