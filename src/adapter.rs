//! Adapter selection and queue family classification.
//!
//! An adapter is a physical GPU that has passed the minimum-requirements
//! check and been scored for preference. Selection is a pure function of the
//! properties the driver reports, so policy is testable without a device:
//!
//! 1. Enumerate physical devices and read their properties.
//! 2. Score each one — discrete beats integrated beats everything else, and
//!    anything below the minimum API version is excluded outright.
//! 3. Rank by score; the best adapter comes first. Ties keep enumeration
//!    order, which preserves any OS-level GPU preference.
//!
//! Once an adapter is chosen, [`QueueFamilyAssignment::classify`] maps its
//! queue families onto the three [`QueueRole`](crate::queues::QueueRole)s.
//! Every Vulkan implementation exposes at most a handful of families with
//! overlapping capabilities; classification picks a dedicated family per role
//! where one exists and lets the remaining roles alias the direct family.

use ash::vk;

use crate::error::{Error, Result};
use crate::queues::QueueRole;
use crate::utils::Version;

/// Preference weight for a discrete GPU.
const SCORE_DISCRETE: u32 = 1000;
/// Preference weight for an integrated GPU.
const SCORE_INTEGRATED: u32 = 100;

/// A physical device that passed the minimum-requirements check, with the
/// preference score assigned to it.
#[derive(Clone, Debug)]
pub struct Adapter {
    handle: vk::PhysicalDevice,
    name: String,
    device_type: vk::PhysicalDeviceType,
    api_version: Version,
    score: u32,
}

impl Adapter {
    /// Builds an adapter record from driver-reported properties.
    ///
    /// The score is zero when the device's API version is below
    /// `min_version`; such adapters are rejected by [`rank_adapters`].
    pub fn new(
        handle: vk::PhysicalDevice,
        properties: &vk::PhysicalDeviceProperties,
        min_version: Version,
    ) -> Self {
        let name = properties
            .device_name_as_c_str()
            .unwrap_or(c"<invalid utf-8>")
            .to_string_lossy()
            .into_owned();
        let api_version = Version(properties.api_version);
        Self {
            handle,
            name,
            device_type: properties.device_type,
            api_version,
            score: score(properties.device_type, api_version, min_version),
        }
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.device_type
    }

    pub fn api_version(&self) -> Version {
        self.api_version
    }

    pub fn score(&self) -> u32 {
        self.score
    }
}

/// Scores a device for selection.
///
/// Every device that meets `min_version` scores at least 1, so an otherwise
/// unremarkable software rasterizer still beats nothing at all. Discrete GPUs
/// get the largest bonus, integrated a smaller one. Below the minimum version
/// the score is 0 regardless of device type.
fn score(device_type: vk::PhysicalDeviceType, api_version: Version, min_version: Version) -> u32 {
    if api_version < min_version {
        return 0;
    }
    let type_bonus = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => SCORE_DISCRETE,
        vk::PhysicalDeviceType::INTEGRATED_GPU => SCORE_INTEGRATED,
        _ => 0,
    };
    1 + type_bonus
}

/// Orders adapters best-first, dropping any that scored zero.
///
/// The sort is stable, so adapters with equal scores keep the driver's
/// enumeration order.
///
/// # Errors
///
/// [`Error::NoSuitableAdapter`] when nothing survives the score filter.
pub fn rank_adapters(mut adapters: Vec<Adapter>) -> Result<Vec<Adapter>> {
    adapters.retain(|adapter| adapter.score > 0);
    if adapters.is_empty() {
        return Err(Error::NoSuitableAdapter);
    }
    adapters.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(adapters)
}

/// Enumerates all physical devices and returns them ranked best-first.
///
/// # Errors
///
/// [`Error::NoSuitableAdapter`] when no device meets `min_version`, or the
/// driver error from enumeration.
pub fn enumerate_adapters(instance: &ash::Instance, min_version: Version) -> Result<Vec<Adapter>> {
    let handles = unsafe { instance.enumerate_physical_devices()? };
    let adapters = handles
        .into_iter()
        .map(|handle| {
            let properties = unsafe { instance.get_physical_device_properties(handle) };
            let adapter = Adapter::new(handle, &properties, min_version);
            tracing::debug!(
                name = %adapter.name,
                ty = ?adapter.device_type,
                version = %adapter.api_version,
                score = adapter.score,
                "enumerated physical device"
            );
            adapter
        })
        .collect();
    let ranked = rank_adapters(adapters)?;
    tracing::info!(
        name = %ranked[0].name,
        version = %ranked[0].api_version,
        "selected adapter"
    );
    Ok(ranked)
}

/// Selects the best adapter and classifies its queue families in one step.
///
/// # Errors
///
/// [`Error::NoSuitableAdapter`] when no device meets `min_version`,
/// [`Error::NoDirectQueue`] when the best device has no graphics family, or
/// the driver error from enumeration.
pub fn select_adapter(
    instance: &ash::Instance,
    min_version: Version,
) -> Result<(Adapter, QueueFamilyAssignment)> {
    let mut ranked = enumerate_adapters(instance, min_version)?;
    let adapter = ranked.swap_remove(0);
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(adapter.handle()) };
    let assignment = QueueFamilyAssignment::classify(&families)?;
    tracing::info!(
        direct = assignment.direct,
        async_compute = ?assignment.async_compute,
        async_transfer = ?assignment.async_transfer,
        "classified queue families"
    );
    Ok((adapter, assignment))
}

/// The queue families backing each queue role on one adapter.
///
/// `direct` always exists; a missing dedicated family for the async roles is
/// recorded as `None` and the role aliases the direct family at device
/// creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilyAssignment {
    pub direct: u32,
    pub async_compute: Option<u32>,
    pub async_transfer: Option<u32>,
}

impl QueueFamilyAssignment {
    /// Classifies an adapter's queue families into roles.
    ///
    /// Single pass over the family list; each family is claimed for exactly
    /// one role and only the first match per role wins:
    ///
    /// - graphics-capable: direct
    /// - compute-capable without graphics: async compute
    /// - transfer-only (no graphics, no compute): async transfer
    ///
    /// Families reporting zero queues are skipped. Transfer capability is
    /// implied by graphics or compute bits, so the transfer check does not
    /// require `TRANSFER` to be set explicitly.
    ///
    /// # Errors
    ///
    /// [`Error::NoDirectQueue`] when no family supports graphics.
    pub fn classify(families: &[vk::QueueFamilyProperties]) -> Result<Self> {
        let mut direct = None;
        let mut async_compute = None;
        let mut async_transfer = None;
        for (index, family) in families.iter().enumerate() {
            if family.queue_count == 0 {
                continue;
            }
            let index = index as u32;
            let flags = family.queue_flags;
            if flags.contains(vk::QueueFlags::GRAPHICS) {
                if direct.is_none() {
                    direct = Some(index);
                }
            } else if flags.contains(vk::QueueFlags::COMPUTE) {
                if async_compute.is_none() {
                    async_compute = Some(index);
                }
            } else if flags.contains(vk::QueueFlags::TRANSFER) && async_transfer.is_none() {
                async_transfer = Some(index);
            }
        }
        let direct = direct.ok_or(Error::NoDirectQueue)?;
        Ok(Self {
            direct,
            async_compute,
            async_transfer,
        })
    }

    /// The family a role resolves to, with aliasing applied.
    pub fn family_for(&self, role: QueueRole) -> u32 {
        match role {
            QueueRole::Direct => self.direct,
            QueueRole::AsyncCompute => self.async_compute.unwrap_or(self.direct),
            QueueRole::AsyncTransfer => self.async_transfer.unwrap_or(self.direct),
        }
    }

    /// Whether the role has its own family rather than aliasing direct.
    pub fn is_dedicated(&self, role: QueueRole) -> bool {
        match role {
            QueueRole::Direct => true,
            QueueRole::AsyncCompute => self.async_compute.is_some(),
            QueueRole::AsyncTransfer => self.async_transfer.is_some(),
        }
    }

    /// The distinct family indices across all roles, without duplicates.
    pub fn distinct_families(&self) -> Vec<u32> {
        let mut families = vec![self.direct];
        for family in [self.async_compute, self.async_transfer].into_iter().flatten() {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }

    /// Queue create infos requesting one queue per distinct family.
    ///
    /// The priority slice must outlive the returned infos; Vulkan reads it at
    /// device creation.
    pub fn queue_create_infos<'a>(&self, priority: &'a [f32; 1]) -> Vec<vk::DeviceQueueCreateInfo<'a>> {
        self.distinct_families()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(priority)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn properties(
        device_type: vk::PhysicalDeviceType,
        api_version: Version,
    ) -> vk::PhysicalDeviceProperties {
        vk::PhysicalDeviceProperties {
            device_type,
            api_version: api_version.as_raw(),
            ..Default::default()
        }
    }

    fn adapter(
        raw: u64,
        device_type: vk::PhysicalDeviceType,
        api_version: Version,
        min_version: Version,
    ) -> Adapter {
        Adapter::new(
            vk::PhysicalDevice::from_raw(raw),
            &properties(device_type, api_version),
            min_version,
        )
    }

    fn family(queue_flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags,
            queue_count,
            ..Default::default()
        }
    }

    #[test]
    fn discrete_outranks_integrated_and_old_discrete() {
        let min = Version::V1_3;
        let discrete = adapter(1, vk::PhysicalDeviceType::DISCRETE_GPU, Version::V1_3, min);
        let integrated = adapter(2, vk::PhysicalDeviceType::INTEGRATED_GPU, Version::V1_3, min);
        let outdated = adapter(3, vk::PhysicalDeviceType::DISCRETE_GPU, Version::V1_2, min);

        assert_eq!(discrete.score(), 1001);
        assert_eq!(integrated.score(), 101);
        assert_eq!(outdated.score(), 0);

        let ranked = rank_adapters(vec![integrated, outdated, discrete]).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].handle(), vk::PhysicalDevice::from_raw(1));
        assert_eq!(ranked[1].handle(), vk::PhysicalDevice::from_raw(2));
    }

    #[test]
    fn other_device_types_score_base_one() {
        let min = Version::V1_0;
        let cpu = adapter(1, vk::PhysicalDeviceType::CPU, Version::V1_3, min);
        let virtual_gpu = adapter(2, vk::PhysicalDeviceType::VIRTUAL_GPU, Version::V1_3, min);
        assert_eq!(cpu.score(), 1);
        assert_eq!(virtual_gpu.score(), 1);
    }

    #[test]
    fn equal_scores_keep_enumeration_order() {
        let min = Version::V1_0;
        let first = adapter(1, vk::PhysicalDeviceType::DISCRETE_GPU, Version::V1_3, min);
        let second = adapter(2, vk::PhysicalDeviceType::DISCRETE_GPU, Version::V1_4, min);
        let ranked = rank_adapters(vec![first, second]).unwrap();
        assert_eq!(ranked[0].handle(), vk::PhysicalDevice::from_raw(1));
        assert_eq!(ranked[1].handle(), vk::PhysicalDevice::from_raw(2));
    }

    #[test]
    fn all_excluded_is_no_suitable_adapter() {
        let min = Version::V1_3;
        let outdated = adapter(1, vk::PhysicalDeviceType::DISCRETE_GPU, Version::V1_1, min);
        assert!(matches!(
            rank_adapters(vec![outdated]),
            Err(Error::NoSuitableAdapter)
        ));
        assert!(matches!(rank_adapters(vec![]), Err(Error::NoSuitableAdapter)));
    }

    #[test]
    fn classify_finds_dedicated_families() {
        // Typical discrete GPU layout: an all-purpose family, a compute
        // family, and a DMA transfer family.
        let families = [
            family(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                16,
            ),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 4),
            family(vk::QueueFlags::TRANSFER, 2),
        ];
        let assignment = QueueFamilyAssignment::classify(&families).unwrap();
        assert_eq!(assignment.direct, 0);
        assert_eq!(assignment.async_compute, Some(1));
        assert_eq!(assignment.async_transfer, Some(2));
        assert_eq!(assignment.distinct_families(), vec![0, 1, 2]);
        assert!(assignment.is_dedicated(QueueRole::AsyncCompute));
    }

    #[test]
    fn classify_aliases_missing_roles_to_direct() {
        // Single-family hardware: everything runs on the one family.
        let families = [family(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            1,
        )];
        let assignment = QueueFamilyAssignment::classify(&families).unwrap();
        assert_eq!(assignment.direct, 0);
        assert_eq!(assignment.async_compute, None);
        assert_eq!(assignment.async_transfer, None);
        assert_eq!(assignment.family_for(QueueRole::AsyncCompute), 0);
        assert_eq!(assignment.family_for(QueueRole::AsyncTransfer), 0);
        assert_eq!(assignment.distinct_families(), vec![0]);
        assert!(!assignment.is_dedicated(QueueRole::AsyncTransfer));
    }

    #[test]
    fn classify_skips_empty_families_and_claims_first_match() {
        let families = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 0),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 8),
            family(vk::QueueFlags::COMPUTE, 2),
            family(vk::QueueFlags::COMPUTE, 2),
        ];
        let assignment = QueueFamilyAssignment::classify(&families).unwrap();
        assert_eq!(assignment.direct, 1);
        assert_eq!(assignment.async_compute, Some(2));
        assert_eq!(assignment.async_transfer, None);
    }

    #[test]
    fn compute_capable_family_is_not_transfer_only() {
        // A compute family implies transfer capability but must still be
        // classified as compute, not transfer.
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1),
        ];
        let assignment = QueueFamilyAssignment::classify(&families).unwrap();
        assert_eq!(assignment.async_compute, Some(1));
        assert_eq!(assignment.async_transfer, None);
    }

    #[test]
    fn no_graphics_family_is_an_error() {
        let families = [
            family(vk::QueueFlags::COMPUTE, 4),
            family(vk::QueueFlags::TRANSFER, 2),
        ];
        assert!(matches!(
            QueueFamilyAssignment::classify(&families),
            Err(Error::NoDirectQueue)
        ));
    }

    #[test]
    fn queue_create_infos_cover_each_distinct_family_once() {
        let assignment = QueueFamilyAssignment {
            direct: 0,
            async_compute: Some(1),
            async_transfer: None,
        };
        let priority = [1.0f32];
        let infos = assignment.queue_create_infos(&priority);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].queue_family_index, 0);
        assert_eq!(infos[1].queue_family_index, 1);
        assert_eq!(infos[0].queue_count, 1);
    }
}
