//! Per-cluster compute capacity and storage profile collection

use crate::client::{resolve_href, ResourceClient};
use crate::transport::RequestHeaders;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};
use vcd_api::{ClusterRef, ComputeCapacity, Element, StorageProfile, StorageProfileRef, StorageProfileStats};
use vcd_core::{ClusterDetail, DetailOutcome, FetchError};

/// Default number of clusters collected concurrently
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Collects provider VDC detail for discovered cluster references.
///
/// Failures are isolated per cluster: a cluster whose detail cannot be
/// fetched contributes zero capacity and no storage profiles, and a profile
/// whose own detail cannot be fetched contributes zero statistics. A detail
/// document without a `ComputeCapacity` section counts as a failed capacity
/// fetch.
#[derive(Clone)]
pub struct CapacityCollector {
    client: ResourceClient,
    concurrency: usize,
}

impl CapacityCollector {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch a provider VDC and decode its compute capacity
    pub async fn fetch_compute_capacity(
        &self,
        href: &str,
        headers: &RequestHeaders,
    ) -> Result<ComputeCapacity, FetchError> {
        let document = self.client.fetch_document(href, headers).await?;
        decode_capacity(href, &document)
    }

    /// Fetch a provider VDC and the detail of every storage profile it lists
    pub async fn fetch_storage_profiles(
        &self,
        href: &str,
        headers: &RequestHeaders,
    ) -> Result<Vec<StorageProfile>, FetchError> {
        let document = self.client.fetch_document(href, headers).await?;
        let (profiles, _) = self.resolve_storage_profiles(href, &document, headers).await;
        Ok(profiles)
    }

    /// Collect detail for every reference, at most `concurrency` at a time.
    /// Results are returned in reference order.
    pub async fn collect(&self, refs: &[ClusterRef], headers: &RequestHeaders) -> Vec<ClusterDetail> {
        stream::iter(refs.iter().cloned())
            .map(|cluster| self.collect_one(cluster, headers))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// One document fetch per cluster, decoded the same way as
    /// `fetch_compute_capacity` and `fetch_storage_profiles`
    async fn collect_one(&self, cluster: ClusterRef, headers: &RequestHeaders) -> ClusterDetail {
        let document = match self.client.fetch_document(&cluster.href, headers).await {
            Ok(document) => document,
            Err(error) => {
                warn!("Cluster {} detail unavailable, reporting zeros: {}", cluster.name, error);
                return ClusterDetail {
                    cluster,
                    capacity: DetailOutcome::from_result(Err(error.clone())),
                    storage_profiles: DetailOutcome::from_result(Err(error)),
                    degraded_profiles: 0,
                };
            }
        };

        let capacity = DetailOutcome::from_result(decode_capacity(&cluster.href, &document));
        if let Some(error) = capacity.error() {
            warn!("Cluster {} capacity unavailable, reporting zeros: {}", cluster.name, error);
        }

        let (profiles, degraded_profiles) = self
            .resolve_storage_profiles(&cluster.href, &document, headers)
            .await;
        debug!(
            "Collected cluster {}: {} storage profiles ({} degraded)",
            cluster.name,
            profiles.len(),
            degraded_profiles
        );

        ClusterDetail {
            cluster,
            capacity,
            storage_profiles: DetailOutcome::Fetched(profiles),
            degraded_profiles,
        }
    }

    /// Fetch detail for each profile referenced by `document`, returning the
    /// profiles and how many of them fell back to zero statistics
    async fn resolve_storage_profiles(
        &self,
        base: &str,
        document: &Element,
        headers: &RequestHeaders,
    ) -> (Vec<StorageProfile>, usize) {
        let mut profiles = Vec::new();
        let mut degraded = 0;

        for profile in StorageProfileRef::list_from(document) {
            let stats = match self.fetch_profile_stats(base, &profile.href, headers).await {
                Ok(stats) => stats,
                Err(error) => {
                    warn!("Storage profile {} detail unavailable, reporting zeros: {}", profile.name, error);
                    degraded += 1;
                    StorageProfileStats::default()
                }
            };
            profiles.push(StorageProfile::new(profile.name, stats));
        }

        (profiles, degraded)
    }

    async fn fetch_profile_stats(
        &self,
        base: &str,
        href: &str,
        headers: &RequestHeaders,
    ) -> Result<StorageProfileStats, FetchError> {
        let url = resolve_href(base, href)?;
        let document = self.client.fetch_document(&url, headers).await?;
        Ok(StorageProfileStats::from_element(&document))
    }
}

fn decode_capacity(url: &str, document: &Element) -> Result<ComputeCapacity, FetchError> {
    ComputeCapacity::find_in(document).ok_or_else(|| FetchError::MissingElement {
        url: url.to_string(),
        element: ComputeCapacity::ELEMENT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, MemoryTransport, Transport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const PVDC_A: &str = "https://vcd.example.com/api/admin/providervdc/a";
    const PVDC_B: &str = "https://vcd.example.com/api/admin/providervdc/b";
    const GOLD: &str = "https://vcd.example.com/api/admin/pvdcStorageProfile/gold";
    const SILVER: &str = "https://vcd.example.com/api/admin/pvdcStorageProfile/silver";

    fn provider_vdc(cpu_total: i64, profiles: &[(&str, &str)]) -> String {
        let refs: String = profiles
            .iter()
            .map(|(name, href)| format!(r#"<ProviderVdcStorageProfile name="{}" href="{}"/>"#, name, href))
            .collect();
        format!(
            r#"<ProviderVdc xmlns="http://www.vmware.com/vcloud/v1.5">
    <ComputeCapacity>
        <Cpu><Total>{}</Total><Used>100</Used></Cpu>
        <Memory><Total>4096</Total></Memory>
    </ComputeCapacity>
    <StorageProfiles>{}</StorageProfiles>
</ProviderVdc>"#,
            cpu_total, refs
        )
    }

    fn profile_detail(total: f64, used: f64) -> String {
        format!(
            r#"<ProviderVdcStorageProfile xmlns="http://www.vmware.com/vcloud/v1.5">
    <CapacityTotal>{}</CapacityTotal>
    <CapacityUsed>{}</CapacityUsed>
    <IopsCapacity>1000</IopsCapacity>
    <IopsAllocated>250</IopsAllocated>
</ProviderVdcStorageProfile>"#,
            total, used
        )
    }

    /// Delays every response and records the peak number of requests in flight
    #[derive(Default)]
    struct InFlightTransport {
        inner: MemoryTransport,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl InFlightTransport {
        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Transport for InFlightTransport {
        async fn get(&self, url: &str, headers: &RequestHeaders) -> Result<HttpResponse, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let response = self.inner.get(url, headers).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }

    fn collector(transport: Arc<MemoryTransport>) -> CapacityCollector {
        CapacityCollector::new(ResourceClient::new(transport)).with_concurrency(2)
    }

    #[tokio::test]
    async fn test_fetch_compute_capacity() {
        let transport = Arc::new(MemoryTransport::new());
        transport.respond(PVDC_A, provider_vdc(64000, &[]));

        let capacity = collector(transport)
            .fetch_compute_capacity(PVDC_A, &RequestHeaders::new())
            .await
            .unwrap();
        assert_eq!(capacity.cpu_total, 64000);
        assert_eq!(capacity.cpu_used, 100);
        assert_eq!(capacity.mem_total, 4096);
        assert_eq!(capacity.mem_used, 0);
    }

    #[tokio::test]
    async fn test_fetch_compute_capacity_error() {
        let transport = Arc::new(MemoryTransport::new());
        transport.respond_status(PVDC_A, 500);

        let err = collector(transport)
            .fetch_compute_capacity(PVDC_A, &RequestHeaders::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_storage_profiles_with_failed_detail() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .respond(PVDC_A, provider_vdc(1, &[("gold", GOLD), ("silver", SILVER)]))
            .respond(GOLD, profile_detail(2048.0, 512.5))
            .respond_status(SILVER, 500);

        let profiles = collector(transport)
            .fetch_storage_profiles(PVDC_A, &RequestHeaders::new())
            .await
            .unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "gold");
        assert_eq!(profiles[0].stats.capacity_total_mb, 2048.0);
        assert_eq!(profiles[0].stats.capacity_used_mb, 512.5);
        assert_eq!(profiles[0].stats.iops_capacity, 1000.0);
        assert_eq!(profiles[0].stats.iops_allocated, 250.0);
        assert_eq!(profiles[1].name, "silver");
        assert_eq!(profiles[1].stats, StorageProfileStats::default());
    }

    #[tokio::test]
    async fn test_collect_isolates_failures() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .fail(
                PVDC_A,
                FetchError::Timeout {
                    url: PVDC_A.to_string(),
                },
            )
            .respond(PVDC_B, provider_vdc(32000, &[("gold", GOLD)]))
            .respond(GOLD, profile_detail(100.0, 10.0));
        let refs = vec![ClusterRef::new("clusterA", PVDC_A), ClusterRef::new("clusterB", PVDC_B)];

        let details = collector(transport.clone())
            .collect(&refs, &RequestHeaders::new())
            .await;
        assert_eq!(details.len(), 2);

        assert_eq!(details[0].cluster.name, "clusterA");
        assert!(details[0].capacity.is_degraded());
        assert_eq!(details[0].capacity.value(), &ComputeCapacity::default());
        assert!(details[0].storage_profiles.is_degraded());
        assert!(details[0].storage_profiles.value().is_empty());

        assert_eq!(details[1].cluster.name, "clusterB");
        assert!(!details[1].capacity.is_degraded());
        assert_eq!(details[1].capacity.value().cpu_total, 32000);
        assert_eq!(details[1].storage_profiles.value().len(), 1);
        assert_eq!(details[1].degraded_profiles, 0);

        // One detail document fetch per cluster
        assert_eq!(transport.request_count(PVDC_A), 1);
        assert_eq!(transport.request_count(PVDC_B), 1);
    }

    #[tokio::test]
    async fn test_collect_counts_degraded_profiles() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .respond(PVDC_A, provider_vdc(1, &[("gold", GOLD), ("silver", SILVER)]))
            .respond(GOLD, "<not-xml");
        let refs = vec![ClusterRef::new("clusterA", PVDC_A)];

        let details = collector(transport).collect(&refs, &RequestHeaders::new()).await;
        assert_eq!(details[0].degraded_profiles, 2);
        assert!(!details[0].storage_profiles.is_degraded());
        assert_eq!(details[0].storage_profiles.value().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_capacity_section_is_degraded() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .respond(
                PVDC_A,
                format!(
                    r#"<ProviderVdc><StorageProfiles><ProviderVdcStorageProfile name="gold" href="{}"/></StorageProfiles></ProviderVdc>"#,
                    GOLD
                ),
            )
            .respond(GOLD, profile_detail(100.0, 10.0));
        let collector = collector(transport);

        let err = collector
            .fetch_compute_capacity(PVDC_A, &RequestHeaders::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::MissingElement {
                url: PVDC_A.to_string(),
                element: "ComputeCapacity",
            }
        );

        let details = collector
            .collect(&[ClusterRef::new("clusterA", PVDC_A)], &RequestHeaders::new())
            .await;
        assert!(details[0].capacity.is_degraded());
        assert_eq!(details[0].capacity.value(), &ComputeCapacity::default());
        assert!(!details[0].storage_profiles.is_degraded());
        assert_eq!(details[0].storage_profiles.value()[0].stats.capacity_total_mb, 100.0);
    }

    fn many_clusters(transport: &InFlightTransport, count: usize) -> Vec<ClusterRef> {
        (0..count)
            .map(|n| {
                let href = format!("https://vcd.example.com/api/admin/providervdc/{}", n);
                transport.inner.respond(href.clone(), provider_vdc(n as i64, &[]));
                ClusterRef::new(format!("cluster{}", n), href)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_collect_bounds_concurrency() {
        let transport = Arc::new(InFlightTransport::default());
        let refs = many_clusters(&transport, 6);
        let collector = CapacityCollector::new(ResourceClient::new(transport.clone())).with_concurrency(3);

        let details = collector.collect(&refs, &RequestHeaders::new()).await;
        let totals: Vec<_> = details.iter().map(|d| d.capacity.value().cpu_total).collect();
        assert_eq!(totals, vec![0, 1, 2, 3, 4, 5]);

        assert!(transport.peak() > 1, "clusters were fetched one at a time");
        assert!(transport.peak() <= 3, "peak of {} requests in flight", transport.peak());
    }

    #[tokio::test]
    async fn test_collect_with_concurrency_one_is_sequential() {
        let transport = Arc::new(InFlightTransport::default());
        let refs = many_clusters(&transport, 3);
        let collector = CapacityCollector::new(ResourceClient::new(transport.clone())).with_concurrency(1);

        collector.collect(&refs, &RequestHeaders::new()).await;
        assert_eq!(transport.peak(), 1);
    }

    #[tokio::test]
    async fn test_collect_empty() {
        let transport = Arc::new(MemoryTransport::new());
        let details = collector(transport.clone())
            .collect(&[], &RequestHeaders::new())
            .await;
        assert!(details.is_empty());
        assert!(transport.requests().is_empty());
    }
}
