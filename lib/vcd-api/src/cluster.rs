//! Provider VDC (cluster) resources

use crate::vdc::non_empty;
use crate::xml::Element;

/// Resolvable link from a cluster name to its provider VDC detail resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRef {
    pub name: String,
    pub href: String,
}

impl ClusterRef {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
        }
    }
}

/// Aggregate storage counters of a cluster, in MB
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClusterStorage {
    pub allocation_mb: i64,
    pub limit_mb: i64,
    pub used_mb: i64,
}

/// One item of the provider VDC record listing
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderVdcRecord {
    pub name: String,
    pub href: Option<String>,
    pub storage: ClusterStorage,
}

impl ProviderVdcRecord {
    /// Record element name in query results
    pub const ELEMENT: &'static str = "VMWProviderVdcRecord";

    /// Decode from a `VMWProviderVdcRecord` element. Returns `None` for
    /// records without a name, since they cannot be keyed.
    pub fn from_element(element: &Element) -> Option<Self> {
        let name = non_empty(element.attr("name"))?;
        Some(Self {
            name,
            href: non_empty(element.attr("href")),
            storage: ClusterStorage {
                allocation_mb: element.int_attr_or("storageAllocationMB", 0),
                limit_mb: element.int_attr_or("storageLimitMB", 0),
                used_mb: element.int_attr_or("storageUsedMB", 0),
            },
        })
    }
}

/// CPU (MHz) and memory (MB) capacity snapshot of a cluster
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComputeCapacity {
    pub cpu_allocation: i64,
    pub cpu_reserved: i64,
    pub cpu_total: i64,
    pub cpu_used: i64,
    pub cpu_overhead: i64,
    pub mem_allocation: i64,
    pub mem_reserved: i64,
    pub mem_total: i64,
    pub mem_used: i64,
    pub mem_overhead: i64,
}

impl ComputeCapacity {
    /// Section element holding the capacity counters
    pub const ELEMENT: &'static str = "ComputeCapacity";

    /// Decode the `ComputeCapacity` section of a provider VDC detail
    /// document. A missing section or counter reads as 0.
    pub fn from_element(document: &Element) -> Self {
        Self::find_in(document).unwrap_or_default()
    }

    /// Like `from_element`, but `None` when the document has no
    /// `ComputeCapacity` section at all
    pub fn find_in(document: &Element) -> Option<Self> {
        let section = if document.name == Self::ELEMENT {
            document
        } else {
            document.find(Self::ELEMENT)?
        };
        let cpu = section.child("Cpu");
        let mem = section.child("Memory");
        let read = |el: Option<&Element>, tag: &str| el.map_or(0, |e| e.int_child_or(tag, 0));

        Some(Self {
            cpu_allocation: read(cpu, "Allocation"),
            cpu_reserved: read(cpu, "Reserved"),
            cpu_total: read(cpu, "Total"),
            cpu_used: read(cpu, "Used"),
            cpu_overhead: read(cpu, "Overhead"),
            mem_allocation: read(mem, "Allocation"),
            mem_reserved: read(mem, "Reserved"),
            mem_total: read(mem, "Total"),
            mem_used: read(mem, "Used"),
            mem_overhead: read(mem, "Overhead"),
        })
    }
}
