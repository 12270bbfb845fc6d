//! Timeline semaphores.
//!
//! Every physical queue owns one timeline [`Semaphore`]. Each submission
//! signals the next counter value, so "has submission `v` finished" is the
//! single comparison `counter >= v`.
//!
//! # Cached counter value
//!
//! The counter only ever moves forward, so it is cached in an [`AtomicU64`]
//! and refreshed on every device query. [`is_signaled`](Semaphore::is_signaled)
//! consults the cache first and only touches the driver when the cache is
//! behind, which makes polling loops cheap.

use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;

use crate::error::Result;

/// A timeline semaphore with a cached counter value.
pub struct Semaphore {
    device: ash::Device,
    handle: vk::Semaphore,
    value: AtomicU64,
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Semaphore")
            .field(&self.handle)
            .field(&self.value.load(Ordering::Relaxed))
            .finish()
    }
}

impl Semaphore {
    /// Creates a timeline semaphore with the given initial counter value.
    pub fn new(device: ash::Device, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo {
            semaphore_type: vk::SemaphoreType::TIMELINE,
            initial_value,
            ..Default::default()
        };
        let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let handle = unsafe { device.create_semaphore(&info, None)? };
        Ok(Self {
            device,
            handle,
            value: AtomicU64::new(initial_value),
        })
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }

    /// Queries the current counter value and refreshes the cache.
    pub fn value(&self) -> Result<u64> {
        let new_value = unsafe { self.device.get_semaphore_counter_value(self.handle)? };
        self.value.fetch_max(new_value, Ordering::Relaxed);
        Ok(new_value)
    }

    /// Returns `true` once the counter has reached `value`.
    ///
    /// Checks the cached counter before querying the device.
    pub fn is_signaled(&self, value: u64) -> Result<bool> {
        if self.value.load(Ordering::Relaxed) >= value {
            return Ok(true);
        }
        Ok(self.value()? >= value)
    }

    /// Signals the counter to `value` from the host.
    ///
    /// No-op if the cached counter is already at or past `value`.
    pub fn signal(&self, value: u64) -> Result<()> {
        if self.value.load(Ordering::Relaxed) >= value {
            return Ok(());
        }
        let info = vk::SemaphoreSignalInfo {
            semaphore: self.handle,
            value,
            ..Default::default()
        };
        unsafe { self.device.signal_semaphore(&info)? };
        self.value.fetch_max(value, Ordering::Relaxed);
        Ok(())
    }

    /// Blocks until the counter reaches `value` or `timeout_ns` elapses.
    ///
    /// Returns early without a driver call when the cache already covers
    /// `value`. On timeout the driver error surfaces unchanged.
    pub fn wait(&self, value: u64, timeout_ns: u64) -> Result<()> {
        if self.value.load(Ordering::Relaxed) >= value {
            return Ok(());
        }
        let info = vk::SemaphoreWaitInfo {
            semaphore_count: 1,
            p_semaphores: &self.handle,
            p_values: &value,
            ..Default::default()
        };
        unsafe { self.device.wait_semaphores(&info, timeout_ns)? };
        self.value.fetch_max(value, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.handle, None);
        }
    }
}
