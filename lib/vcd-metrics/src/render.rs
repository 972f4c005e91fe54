//! Prometheus text exposition of a collection snapshot
//!
//! All HELP and TYPE lines come first, in family order VDC, cluster, storage
//! profile, followed by the samples in the same order. Every VDC and every
//! cluster emits its full set of series, zeros included.

use std::fmt::Write;
use vcd_api::{ClusterStorage, ComputeCapacity, StorageProfileStats, VdcRecord};
use vcd_core::Snapshot;

/// Declared metric family
struct Family {
    name: &'static str,
    help: &'static str,
}

const fn family(name: &'static str, help: &'static str) -> Family {
    Family { name, help }
}

pub const VDC_TOTAL_RECORDS: &str = "vcd_vdc_total_records";

const VDC_FAMILIES: &[Family] = &[
    family("vcd_vdc_cpu_allocated", "Allocated CPU (MHz) for VDC"),
    family("vcd_vdc_cpu_used", "Used CPU (MHz) for VDC"),
    family("vcd_vdc_mem_allocated_mb", "Allocated memory (MB) for VDC"),
    family("vcd_vdc_mem_used_mb", "Used memory (MB) for VDC"),
    family("vcd_vdc_vm_count", "Number of VMs in VDC"),
    family("vcd_vdc_storage_allocated_mb", "Storage limit (MB) for VDC"),
    family("vcd_vdc_storage_used_mb", "Storage used (MB) for VDC"),
    family(VDC_TOTAL_RECORDS, "Number of VDC records processed in this scrape"),
];

const CLUSTER_FAMILIES: &[Family] = &[
    family("vcd_cluster_cpu_allocated", "Allocated CPU (MHz) for cluster"),
    family("vcd_cluster_cpu_reserved", "Reserved CPU (MHz) for cluster"),
    family("vcd_cluster_cpu_total", "Total CPU (MHz) for cluster"),
    family("vcd_cluster_cpu_used", "Used CPU (MHz) for cluster"),
    family("vcd_cluster_cpu_overhead", "Overhead CPU (MHz) for cluster"),
    family("vcd_cluster_mem_allocated_mb", "Allocated memory (MB) for cluster"),
    family("vcd_cluster_mem_reserved_mb", "Reserved memory (MB) for cluster"),
    family("vcd_cluster_mem_total_mb", "Total memory (MB) for cluster"),
    family("vcd_cluster_mem_used_mb", "Used memory (MB) for cluster"),
    family("vcd_cluster_mem_overhead_mb", "Overhead memory (MB) for cluster"),
    family("vcd_cluster_storage_allocated_mb", "Storage allocation (MB) for cluster"),
    family("vcd_cluster_storage_limit_mb", "Storage limit (MB) for cluster"),
    family("vcd_cluster_storage_used_mb", "Storage used (MB) for cluster"),
];

const STORAGE_PROFILE_FAMILIES: &[Family] = &[
    family("vcd_storage_profile_info", "Storage profile info"),
    family("vcd_storage_profile_capacity_total_mb", "Total capacity (MB) for profile"),
    family("vcd_storage_profile_capacity_used_mb", "Used capacity (MB) for profile"),
    family("vcd_storage_profile_iops_capacity", "IOPS capacity for profile"),
    family("vcd_storage_profile_iops_allocated", "IOPS allocated for profile"),
];

/// Escape a label value for the text exposition format
pub fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Render a snapshot as a Prometheus text document
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    for family in VDC_FAMILIES
        .iter()
        .chain(CLUSTER_FAMILIES)
        .chain(STORAGE_PROFILE_FAMILIES)
    {
        let _ = writeln!(out, "# HELP {} {}", family.name, family.help);
        let _ = writeln!(out, "# TYPE {} gauge", family.name);
    }

    for record in &snapshot.vdc_records {
        write_vdc(&mut out, record);
    }
    let _ = writeln!(out, "{} {}", VDC_TOTAL_RECORDS, snapshot.vdc_records.len());

    for (name, capacity, storage) in snapshot.clusters() {
        write_cluster(&mut out, name, capacity, &storage);
    }

    for (name, profile) in &snapshot.storage_profiles {
        write_storage_profile(&mut out, name, &profile.stats);
    }

    out
}

fn write_vdc(out: &mut String, record: &VdcRecord) {
    let labels = format!(
        "vdc=\"{}\",org=\"{}\",cluster=\"{}\"",
        escape_label_value(&record.name),
        escape_label_value(&record.org_name),
        escape_label_value(record.cluster_label()),
    );
    let values = [
        record.cpu_allocation_mhz,
        record.cpu_used_mhz,
        record.memory_allocation_mb,
        record.memory_used_mb,
        record.vm_count,
        record.storage_limit_mb,
        record.storage_used_mb,
    ];
    for (family, value) in VDC_FAMILIES.iter().zip(values) {
        let _ = writeln!(out, "{}{{{}}} {}", family.name, labels, value);
    }
}

fn write_cluster(out: &mut String, name: &str, capacity: &ComputeCapacity, storage: &ClusterStorage) {
    let labels = format!("cluster=\"{}\"", escape_label_value(name));
    let values = [
        capacity.cpu_allocation,
        capacity.cpu_reserved,
        capacity.cpu_total,
        capacity.cpu_used,
        capacity.cpu_overhead,
        capacity.mem_allocation,
        capacity.mem_reserved,
        capacity.mem_total,
        capacity.mem_used,
        capacity.mem_overhead,
        storage.allocation_mb,
        storage.limit_mb,
        storage.used_mb,
    ];
    for (family, value) in CLUSTER_FAMILIES.iter().zip(values) {
        let _ = writeln!(out, "{}{{{}}} {}", family.name, labels, value);
    }
}

fn write_storage_profile(out: &mut String, name: &str, stats: &StorageProfileStats) {
    let labels = format!("storage_profile=\"{}\"", escape_label_value(name));
    let _ = writeln!(out, "{}{{{}}} 1", STORAGE_PROFILE_FAMILIES[0].name, labels);

    let values = [
        stats.capacity_total_mb,
        stats.capacity_used_mb,
        stats.iops_capacity,
        stats.iops_allocated,
    ];
    for (family, value) in STORAGE_PROFILE_FAMILIES[1..].iter().zip(values) {
        let _ = writeln!(out, "{}{{{}}} {:.2}", family.name, labels, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcd_api::StorageProfile;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.vdc_records.push(VdcRecord {
            name: "vdc1".to_string(),
            org_name: "org1".to_string(),
            provider_vdc_name: Some("clusterA".to_string()),
            cpu_used_mhz: 500,
            vm_count: 4,
            ..Default::default()
        });
        snapshot.capacities.insert(
            "clusterA".to_string(),
            ComputeCapacity {
                cpu_total: 64000,
                mem_overhead: -1,
                ..Default::default()
            },
        );
        snapshot.storage.insert(
            "clusterA".to_string(),
            ClusterStorage {
                used_mb: 1000,
                ..Default::default()
            },
        );
        snapshot.storage_profiles.insert(
            "gold".to_string(),
            StorageProfile::new(
                "gold",
                StorageProfileStats {
                    capacity_total_mb: 2048.0,
                    capacity_used_mb: 512.5,
                    iops_capacity: 1000.0,
                    iops_allocated: 0.0,
                },
            ),
        );
        snapshot
    }

    fn sample_lines(text: &str) -> Vec<&str> {
        text.lines().filter(|l| !l.starts_with('#')).collect()
    }

    #[test]
    fn test_preamble_precedes_samples() {
        let text = render(&sample_snapshot());
        let lines: Vec<&str> = text.lines().collect();
        let first_sample = lines
            .iter()
            .position(|l| !l.starts_with('#'))
            .expect("has samples");
        assert!(lines[first_sample..].iter().all(|l| !l.starts_with('#')));

        let families = VDC_FAMILIES.len() + CLUSTER_FAMILIES.len() + STORAGE_PROFILE_FAMILIES.len();
        assert_eq!(first_sample, families * 2);
        assert_eq!(lines[0], "# HELP vcd_vdc_cpu_allocated Allocated CPU (MHz) for VDC");
        assert_eq!(lines[1], "# TYPE vcd_vdc_cpu_allocated gauge");
        assert!(text.ends_with('\n'));

        let help_count = lines.iter().filter(|l| l.starts_with("# HELP vcd_cluster_cpu_used ")).count();
        assert_eq!(help_count, 1);
    }

    #[test]
    fn test_family_order_in_preamble() {
        let text = render(&Snapshot::default());
        let vdc = text.find("# HELP vcd_vdc_cpu_allocated").unwrap();
        let cluster = text.find("# HELP vcd_cluster_cpu_allocated").unwrap();
        let profile = text.find("# HELP vcd_storage_profile_info").unwrap();
        assert!(vdc < cluster && cluster < profile);
    }

    #[test]
    fn test_sample_values() {
        let text = render(&sample_snapshot());
        let samples = sample_lines(&text);

        assert!(samples.contains(&r#"vcd_vdc_cpu_used{vdc="vdc1",org="org1",cluster="clusterA"} 500"#));
        assert!(samples.contains(&r#"vcd_vdc_cpu_allocated{vdc="vdc1",org="org1",cluster="clusterA"} 0"#));
        assert!(samples.contains(&r#"vcd_vdc_vm_count{vdc="vdc1",org="org1",cluster="clusterA"} 4"#));
        assert!(samples.contains(&"vcd_vdc_total_records 1"));
        assert!(samples.contains(&r#"vcd_cluster_cpu_total{cluster="clusterA"} 64000"#));
        assert!(samples.contains(&r#"vcd_cluster_mem_overhead_mb{cluster="clusterA"} -1"#));
        assert!(samples.contains(&r#"vcd_cluster_storage_used_mb{cluster="clusterA"} 1000"#));
        assert!(samples.contains(&r#"vcd_storage_profile_info{storage_profile="gold"} 1"#));
        assert!(samples.contains(&r#"vcd_storage_profile_capacity_total_mb{storage_profile="gold"} 2048.00"#));
        assert!(samples.contains(&r#"vcd_storage_profile_capacity_used_mb{storage_profile="gold"} 512.50"#));
        assert!(samples.contains(&r#"vcd_storage_profile_iops_capacity{storage_profile="gold"} 1000.00"#));
        assert!(samples.contains(&r#"vcd_storage_profile_iops_allocated{storage_profile="gold"} 0.00"#));

        // 7 VDC series, 1 total, 13 cluster series, 5 profile series
        assert_eq!(samples.len(), 7 + 1 + 13 + 5);
    }

    #[test]
    fn test_total_records_follows_vdc_samples() {
        let text = render(&sample_snapshot());
        let samples = sample_lines(&text);
        assert!(samples[6].starts_with("vcd_vdc_storage_used_mb{"));
        assert_eq!(samples[7], "vcd_vdc_total_records 1");
        assert!(samples[8].starts_with("vcd_cluster_cpu_allocated{"));
    }

    #[test]
    fn test_empty_snapshot() {
        let text = render(&Snapshot::default());
        assert_eq!(sample_lines(&text), vec!["vcd_vdc_total_records 0"]);
        assert!(text.contains("# TYPE vcd_storage_profile_iops_allocated gauge"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut snapshot = sample_snapshot();
        for name in ["zeta", "alpha", "mid"] {
            snapshot.capacities.insert(name.to_string(), ComputeCapacity::default());
            snapshot.storage.insert(name.to_string(), ClusterStorage::default());
        }
        let first = render(&snapshot);
        assert_eq!(first, render(&snapshot.clone()));

        let alpha = first.find(r#"cluster="alpha""#).unwrap();
        let zeta = first.find(r#"cluster="zeta""#).unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label_value(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_label_value(r"back\slash"), r"back\\slash");
        assert_eq!(escape_label_value("two\nlines"), r"two\nlines");

        let mut snapshot = Snapshot::default();
        snapshot.vdc_records.push(VdcRecord {
            name: r#"vdc "quoted""#.to_string(),
            org_name: r#"org"1"#.to_string(),
            ..Default::default()
        });
        let text = render(&snapshot);
        assert!(text.contains(r#"vcd_vdc_cpu_used{vdc="vdc \"quoted\"",org="org\"1",cluster="unknown"} 0"#));
    }
}
