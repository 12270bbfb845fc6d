//! Device selection, queue coordination, and timeline-tracked resource
//! pooling for Vulkan.
//!
//! This crate covers the ground between "a Vulkan instance exists" and
//! "command buffers are flowing":
//!
//! - [`adapter`]: pick a physical device by score and classify its queue
//!   families into functional roles.
//! - [`queues`]: one mutex-guarded slot per distinct physical queue, with a
//!   timeline semaphore and monotonic submission counter per slot. Roles
//!   that alias a family share the slot and its mutex.
//! - [`pool`]: recycle driver handles through a Free/Recording/Pending
//!   lifecycle keyed by the timeline values those submissions signal.
//! - [`sync`]: timeline semaphores with a cached counter value.
//!
//! The crate wraps `vk` handles rather than owning higher-level resource
//! types; instance and logical device creation stay with the caller.
//!
//! ```no_run
//! # use scoria::{ash::vk, QueueFamilyAssignment, QueueRole, Queues, TimelinePool, Version};
//! # fn demo(instance: &ash::Instance, device: &ash::Device) -> scoria::Result<()> {
//! let adapters = scoria::enumerate_adapters(instance, Version::V1_3)?;
//! let families = unsafe {
//!     instance.get_physical_device_queue_family_properties(adapters[0].handle())
//! };
//! let assignment = QueueFamilyAssignment::classify(&families)?;
//! let queues = Queues::new(device, &assignment)?;
//!
//! let mut pool: TimelinePool<vk::CommandBuffer> = TimelinePool::new();
//! // ... register command buffers with pool.grow, record into pool.request ...
//! let ticket = queues.submit(QueueRole::Direct, &[], &[])?;
//! pool.submit(ticket.value);
//! for _reusable in pool.reset(queues.completed_value(QueueRole::Direct)?) {}
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod error;
pub mod pool;
pub mod queues;
pub mod sync;
pub mod utils;

pub use adapter::{
    enumerate_adapters, rank_adapters, select_adapter, Adapter, QueueFamilyAssignment,
};
pub use error::{Error, Result};
pub use pool::TimelinePool;
pub use queues::{QueueRole, Queues, SubmitTicket};
pub use sync::Semaphore;
pub use utils::{RingDeque, Version};

pub use ash;
