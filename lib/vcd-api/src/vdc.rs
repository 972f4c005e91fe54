//! AdminVdcRecord decoding

use crate::xml::Element;

/// Label value used when a record omits a name attribute
pub const UNKNOWN_LABEL: &str = "unknown";

/// One virtual datacenter from the VDC record listing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VdcRecord {
    pub name: String,
    pub org_name: String,
    /// Name of the provider VDC (cluster) backing this VDC
    pub provider_vdc_name: Option<String>,
    /// Detail href of the provider VDC
    pub provider_vdc_href: Option<String>,
    pub cpu_allocation_mhz: i64,
    pub cpu_used_mhz: i64,
    pub memory_allocation_mb: i64,
    pub memory_used_mb: i64,
    pub vm_count: i64,
    pub storage_limit_mb: i64,
    pub storage_used_mb: i64,
}

impl VdcRecord {
    /// Record element name in query results
    pub const ELEMENT: &'static str = "AdminVdcRecord";

    /// Decode from an `AdminVdcRecord` element. Never fails: absent or
    /// non-numeric counters read as 0, absent names as `unknown`.
    pub fn from_element(element: &Element) -> Self {
        Self {
            name: element.str_attr_or("name", UNKNOWN_LABEL),
            org_name: element.str_attr_or("orgName", UNKNOWN_LABEL),
            provider_vdc_name: non_empty(element.attr("providerVdcName")),
            provider_vdc_href: non_empty(element.attr("providerVdc")),
            cpu_allocation_mhz: element.int_attr_or("cpuAllocationMhz", 0),
            cpu_used_mhz: element.int_attr_or("cpuUsedMhz", 0),
            memory_allocation_mb: element.int_attr_or("memoryAllocationMB", 0),
            memory_used_mb: element.int_attr_or("memoryUsedMB", 0),
            vm_count: element.int_attr_or("numberOfVMs", 0),
            storage_limit_mb: element.int_attr_or("storageLimitMB", 0),
            storage_used_mb: element.int_attr_or("storageUsedMB", 0),
        }
    }

    /// Cluster label value for this VDC
    pub fn cluster_label(&self) -> &str {
        self.provider_vdc_name.as_deref().unwrap_or(UNKNOWN_LABEL)
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
