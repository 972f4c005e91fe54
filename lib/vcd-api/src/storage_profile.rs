//! Provider VDC storage profiles

use crate::xml::Element;

/// Reference to a storage profile, found in a provider VDC detail document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageProfileRef {
    pub name: String,
    pub href: String,
}

impl StorageProfileRef {
    /// Collect the `ProviderVdcStorageProfile` references listed under the
    /// document's `StorageProfiles` section. Entries missing a name or href
    /// are skipped.
    pub fn list_from(document: &Element) -> Vec<Self> {
        let Some(section) = document.find("StorageProfiles") else {
            return Vec::new();
        };

        section
            .descendants("ProviderVdcStorageProfile")
            .into_iter()
            .filter_map(|profile| {
                let name = profile.attr("name").filter(|n| !n.is_empty())?;
                let href = profile.attr("href").filter(|h| !h.is_empty())?;
                Some(Self {
                    name: name.to_string(),
                    href: href.to_string(),
                })
            })
            .collect()
    }
}

/// Capacity (MB) and IOPS accounting of a storage profile
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StorageProfileStats {
    pub capacity_total_mb: f64,
    pub capacity_used_mb: f64,
    pub iops_capacity: f64,
    pub iops_allocated: f64,
}

impl StorageProfileStats {
    /// Decode a storage profile detail document; unparsable values read as 0.0
    pub fn from_element(document: &Element) -> Self {
        Self {
            capacity_total_mb: document.float_descendant_or("CapacityTotal", 0.0),
            capacity_used_mb: document.float_descendant_or("CapacityUsed", 0.0),
            iops_capacity: document.float_descendant_or("IopsCapacity", 0.0),
            iops_allocated: document.float_descendant_or("IopsAllocated", 0.0),
        }
    }
}

/// A named storage tier with its statistics
#[derive(Clone, Debug, PartialEq)]
pub struct StorageProfile {
    pub name: String,
    pub stats: StorageProfileStats,
}

impl StorageProfile {
    pub fn new(name: impl Into<String>, stats: StorageProfileStats) -> Self {
        Self {
            name: name.into(),
            stats,
        }
    }
}
