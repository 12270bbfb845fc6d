//! Multi-queue submission coordination.
//!
//! Vulkan queues are externally synchronized: two threads must never call
//! `vkQueueSubmit2` on the same `vk::Queue` concurrently. [`Queues`] owns one
//! slot per distinct physical queue, each behind its own mutex, and maps the
//! three [`QueueRole`]s onto those slots. When two roles alias the same queue
//! family they resolve to the same slot and therefore share the same mutex,
//! so external synchronization holds no matter how roles map to hardware.
//!
//! The critical section of [`submit`](Queues::submit) covers only timeline
//! value assignment and the driver enqueue call. Command buffer recording
//! happens outside any lock, so independent roles submit fully in parallel.
//!
//! Each slot also owns the timeline [`Semaphore`] that every submission on
//! that queue signals. The monotonically increasing signal value is handed
//! back as a [`SubmitTicket`] for completion tracking, typically feeding
//! [`TimelinePool::submit`](crate::pool::TimelinePool::submit).

use std::sync::{Mutex, MutexGuard};

use ash::vk;

use crate::adapter::QueueFamilyAssignment;
use crate::error::Result;
use crate::sync::Semaphore;

/// The functional roles work can be submitted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueRole {
    /// Graphics, compute, and transfer. Always backed by a real family.
    Direct,
    /// Compute work overlapping the direct queue, when hardware allows.
    AsyncCompute,
    /// Bulk copies overlapping everything else, when hardware allows.
    AsyncTransfer,
}

impl QueueRole {
    pub const ALL: [QueueRole; 3] = [
        QueueRole::Direct,
        QueueRole::AsyncCompute,
        QueueRole::AsyncTransfer,
    ];

    #[inline]
    const fn index(self) -> usize {
        match self {
            QueueRole::Direct => 0,
            QueueRole::AsyncCompute => 1,
            QueueRole::AsyncTransfer => 2,
        }
    }
}

/// Maps the three roles onto mutex-guarded per-queue slots.
///
/// Roles that alias the same queue family share one slot, hence one mutex.
/// The slot type is generic so the mapping and locking behavior stand apart
/// from any particular driver object.
pub struct RoleTable<T> {
    slots: Vec<Mutex<T>>,
    /// Slot index per role, indexed by [`QueueRole::index`].
    roles: [usize; 3],
}

impl<T> RoleTable<T> {
    /// Builds the table from a family assignment, creating one slot per
    /// distinct family via `make_slot`.
    ///
    /// Slot creation is fallible so driver calls (queue retrieval, semaphore
    /// creation) can propagate their errors.
    pub fn build(
        assignment: &QueueFamilyAssignment,
        mut make_slot: impl FnMut(u32) -> Result<T>,
    ) -> Result<Self> {
        let families = assignment.distinct_families();
        let mut slots = Vec::with_capacity(families.len());
        for &family in &families {
            slots.push(Mutex::new(make_slot(family)?));
        }
        let mut roles = [0usize; 3];
        for role in QueueRole::ALL {
            let family = assignment.family_for(role);
            roles[role.index()] = families
                .iter()
                .position(|&f| f == family)
                .expect("role family missing from distinct family list");
        }
        Ok(Self { slots, roles })
    }

    /// Locks the slot backing `role`.
    ///
    /// A poisoned mutex means a submitting thread panicked mid-enqueue; the
    /// queue state is unrecoverable at that point, so this propagates the
    /// panic.
    pub fn lock(&self, role: QueueRole) -> MutexGuard<'_, T> {
        self.slots[self.roles[role.index()]]
            .lock()
            .expect("queue slot mutex poisoned")
    }

    /// The slot index `role` resolves to.
    pub fn slot_index(&self, role: QueueRole) -> usize {
        self.roles[role.index()]
    }

    /// Whether two roles resolve to the same physical queue.
    pub fn is_aliased(&self, a: QueueRole, b: QueueRole) -> bool {
        self.slot_index(a) == self.slot_index(b)
    }

    /// Number of distinct physical queues behind the table.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Proof of one submission: the role it went to and the timeline value its
/// completion signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitTicket {
    pub role: QueueRole,
    pub value: u64,
}

/// One physical queue with its timeline semaphore and submission counter.
struct QueueSlot {
    queue: vk::Queue,
    family_index: u32,
    semaphore: Semaphore,
    /// Timeline value of the latest successful submission.
    value: u64,
}

/// The device's queues, one slot per distinct queue family.
pub struct Queues {
    device: ash::Device,
    table: RoleTable<QueueSlot>,
}

impl Queues {
    /// Retrieves queue 0 of each distinct family in the assignment and
    /// creates the per-queue timeline semaphores.
    pub fn new(device: &ash::Device, assignment: &QueueFamilyAssignment) -> Result<Self> {
        let table = RoleTable::build(assignment, |family_index| {
            let queue = unsafe { device.get_device_queue(family_index, 0) };
            let semaphore = Semaphore::new(device.clone(), 0)?;
            tracing::debug!(family_index, ?queue, "created queue slot");
            Ok(QueueSlot {
                queue,
                family_index,
                semaphore,
                value: 0,
            })
        })?;
        for role in QueueRole::ALL {
            tracing::debug!(
                ?role,
                slot = table.slot_index(role),
                "assigned queue role"
            );
        }
        Ok(Self {
            device: device.clone(),
            table,
        })
    }

    /// Submits recorded command buffers under `role`.
    ///
    /// Takes the slot's mutex, reserves the next timeline value, and enqueues
    /// a single `vkQueueSubmit2` signaling the slot's semaphore at that
    /// value. The counter only advances on a successful enqueue, so a failed
    /// submission leaves the timeline dense.
    ///
    /// `waits` lets the submission wait on other queues' semaphores for
    /// cross-queue dependencies.
    pub fn submit(
        &self,
        role: QueueRole,
        command_buffers: &[vk::CommandBufferSubmitInfo],
        waits: &[vk::SemaphoreSubmitInfo],
    ) -> Result<SubmitTicket> {
        let mut slot = self.table.lock(role);
        let value = slot.value + 1;
        let signal = [vk::SemaphoreSubmitInfo {
            semaphore: slot.semaphore.handle(),
            value,
            stage_mask: vk::PipelineStageFlags2::ALL_COMMANDS,
            ..Default::default()
        }];
        let submit = vk::SubmitInfo2::default()
            .command_buffer_infos(command_buffers)
            .wait_semaphore_infos(waits)
            .signal_semaphore_infos(&signal);
        unsafe {
            self.device
                .queue_submit2(slot.queue, &[submit], vk::Fence::null())?;
        }
        slot.value = value;
        tracing::trace!(?role, value, "submitted batch");
        Ok(SubmitTicket { role, value })
    }

    /// The latest completed timeline value on `role`'s queue.
    pub fn completed_value(&self, role: QueueRole) -> Result<u64> {
        self.table.lock(role).semaphore.value()
    }

    /// Blocks until `role`'s queue has completed timeline value `value`.
    ///
    /// The lock is only held long enough to read the semaphore handle; other
    /// threads keep submitting for the duration of the wait.
    pub fn wait(&self, role: QueueRole, value: u64, timeout_ns: u64) -> Result<()> {
        let handle = self.table.lock(role).semaphore.handle();
        let info = vk::SemaphoreWaitInfo {
            semaphore_count: 1,
            p_semaphores: &handle,
            p_values: &value,
            ..Default::default()
        };
        unsafe { self.device.wait_semaphores(&info, timeout_ns)? };
        Ok(())
    }

    /// Blocks until every queue on the device is idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// The queue family backing `role`.
    pub fn family_index(&self, role: QueueRole) -> u32 {
        self.table.lock(role).family_index
    }

    /// Whether two roles share one physical queue (and one mutex).
    pub fn is_aliased(&self, a: QueueRole, b: QueueRole) -> bool {
        self.table.is_aliased(a, b)
    }
}

impl Drop for Queues {
    fn drop(&mut self) {
        // The per-slot semaphores are destroyed right after this; the device
        // must be idle before any of them go away.
        if let Err(err) = unsafe { self.device.device_wait_idle() } {
            tracing::warn!(?err, "device_wait_idle failed during queue teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn assignment(
        direct: u32,
        async_compute: Option<u32>,
        async_transfer: Option<u32>,
    ) -> QueueFamilyAssignment {
        QueueFamilyAssignment {
            direct,
            async_compute,
            async_transfer,
        }
    }

    #[test]
    fn fully_dedicated_hardware_gets_three_slots() {
        let table = RoleTable::build(&assignment(0, Some(1), Some(2)), Ok).unwrap();
        assert_eq!(table.slot_count(), 3);
        assert!(!table.is_aliased(QueueRole::Direct, QueueRole::AsyncCompute));
        assert!(!table.is_aliased(QueueRole::AsyncCompute, QueueRole::AsyncTransfer));
        assert_eq!(table.slot_index(QueueRole::Direct), 0);
        assert_eq!(*table.lock(QueueRole::AsyncTransfer), 2);
    }

    #[test]
    fn missing_roles_alias_the_direct_slot() {
        let table = RoleTable::build(&assignment(0, None, None), Ok).unwrap();
        assert_eq!(table.slot_count(), 1);
        assert!(table.is_aliased(QueueRole::Direct, QueueRole::AsyncCompute));
        assert!(table.is_aliased(QueueRole::Direct, QueueRole::AsyncTransfer));
    }

    #[test]
    fn roles_sharing_a_family_share_a_slot() {
        // Compute aliases direct's family explicitly; transfer is dedicated.
        let table = RoleTable::build(&assignment(0, Some(0), Some(3)), Ok).unwrap();
        assert_eq!(table.slot_count(), 2);
        assert!(table.is_aliased(QueueRole::Direct, QueueRole::AsyncCompute));
        assert!(!table.is_aliased(QueueRole::Direct, QueueRole::AsyncTransfer));
        assert_eq!(*table.lock(QueueRole::AsyncTransfer), 3);
    }

    #[test]
    fn slot_creation_errors_propagate() {
        let result: Result<RoleTable<u32>> =
            RoleTable::build(&assignment(0, Some(1), None), |_| {
                Err(crate::error::Error::OutOfMemory)
            });
        assert!(result.is_err());
    }

    #[test]
    fn aliased_roles_are_mutually_exclusive() {
        // No dedicated compute family: Direct and AsyncCompute share a slot.
        // Hammer both roles from many threads and count how many are inside
        // a slot's critical section at once; the mutex must keep it at one.
        let table = Arc::new(RoleTable::build(&assignment(0, None, Some(1)), Ok).unwrap());
        let occupancy: Arc<Vec<AtomicUsize>> =
            Arc::new((0..table.slot_count()).map(|_| AtomicUsize::new(0)).collect());

        let handles: Vec<_> = [
            QueueRole::Direct,
            QueueRole::AsyncCompute,
            QueueRole::AsyncTransfer,
            QueueRole::Direct,
            QueueRole::AsyncCompute,
        ]
        .into_iter()
        .map(|role| {
            let table = table.clone();
            let occupancy = occupancy.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let guard = table.lock(role);
                    let slot = table.slot_index(role);
                    let inside = occupancy[slot].fetch_add(1, Ordering::SeqCst);
                    assert_eq!(inside, 0, "two submitters inside one queue slot");
                    std::hint::spin_loop();
                    occupancy[slot].fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                }
            })
        })
        .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn distinct_slots_lock_independently() {
        let table = RoleTable::build(&assignment(0, Some(1), None), Ok).unwrap();
        // Holding one slot's lock must not block another slot.
        let _direct = table.lock(QueueRole::Direct);
        let _compute = table.lock(QueueRole::AsyncCompute);
    }
}
