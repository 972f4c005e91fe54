//! Aggregation of listings and per-cluster detail into a render snapshot

use crate::outcome::DetailOutcome;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;
use vcd_api::{ClusterRef, ClusterStorage, ComputeCapacity, ProviderVdcRecord, StorageProfile, VdcRecord};

/// Detail collected for one cluster reference
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterDetail {
    pub cluster: ClusterRef,
    pub capacity: DetailOutcome<ComputeCapacity>,
    pub storage_profiles: DetailOutcome<Vec<StorageProfile>>,
    /// Profiles whose own detail fetch failed and were zeroed
    pub degraded_profiles: usize,
}

/// Aggregated state of one scrape, ready for rendering
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// VDC records in listing order
    pub vdc_records: Vec<VdcRecord>,
    pub capacities: BTreeMap<String, ComputeCapacity>,
    pub storage: BTreeMap<String, ClusterStorage>,
    pub storage_profiles: BTreeMap<String, StorageProfile>,
}

impl Snapshot {
    /// Every known cluster with its capacity and storage counters, by name
    pub fn clusters(&self) -> impl Iterator<Item = (&str, &ComputeCapacity, ClusterStorage)> + '_ {
        self.capacities.iter().map(move |(name, capacity)| {
            let storage = self.storage.get(name).copied().unwrap_or_default();
            (name.as_str(), capacity, storage)
        })
    }
}

/// Single forward pass over the collected records.
///
/// Entries are never overwritten once written: the first href seen for a
/// cluster name wins, the first capacity and storage sample wins, and the
/// first storage profile with a given name wins.
#[derive(Debug, Default)]
pub struct Aggregator {
    vdc_records: Vec<VdcRecord>,
    cluster_refs: Vec<ClusterRef>,
    ref_names: HashSet<String>,
    known_clusters: BTreeSet<String>,
    capacities: BTreeMap<String, ComputeCapacity>,
    storage: BTreeMap<String, ClusterStorage>,
    storage_profiles: BTreeMap<String, StorageProfile>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records from the VDC listing
    pub fn add_vdc_records(&mut self, records: impl IntoIterator<Item = VdcRecord>) {
        for record in records {
            if let Some(name) = &record.provider_vdc_name {
                self.known_clusters.insert(name.clone());
                if let Some(href) = &record.provider_vdc_href {
                    self.register_ref(name, href);
                }
            }
            self.vdc_records.push(record);
        }
    }

    /// Add records from the provider VDC listing
    pub fn add_provider_records(&mut self, records: impl IntoIterator<Item = ProviderVdcRecord>) {
        for record in records {
            self.known_clusters.insert(record.name.clone());
            self.storage.entry(record.name.clone()).or_insert(record.storage);
            if let Some(href) = &record.href {
                self.register_ref(&record.name, href);
            }
        }
    }

    fn register_ref(&mut self, name: &str, href: &str) {
        if self.ref_names.insert(name.to_string()) {
            self.cluster_refs.push(ClusterRef::new(name, href));
        } else {
            debug!("Keeping first href for cluster {}, ignoring {}", name, href);
        }
    }

    /// Cluster references in discovery order
    pub fn cluster_refs(&self) -> &[ClusterRef] {
        &self.cluster_refs
    }

    /// Add the detail collected for one cluster
    pub fn add_cluster_detail(&mut self, detail: ClusterDetail) {
        let name = detail.cluster.name;
        self.known_clusters.insert(name.clone());
        self.capacities
            .entry(name)
            .or_insert_with(|| *detail.capacity.value());

        for profile in detail.storage_profiles.into_value() {
            self.storage_profiles
                .entry(profile.name.clone())
                .or_insert(profile);
        }
    }

    /// Backfill zero entries for every known cluster and produce the snapshot
    pub fn finish(mut self) -> Snapshot {
        for name in &self.known_clusters {
            self.capacities.entry(name.clone()).or_default();
            self.storage.entry(name.clone()).or_default();
        }

        Snapshot {
            vdc_records: self.vdc_records,
            capacities: self.capacities,
            storage: self.storage,
            storage_profiles: self.storage_profiles,
        }
    }
}
