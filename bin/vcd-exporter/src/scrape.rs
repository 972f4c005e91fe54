//! The fetch-aggregate-render pipeline behind `/metrics`

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use vcd_api::{ProviderVdcRecord, VdcRecord};
use vcd_client::client::provider_query_url;
use vcd_client::{CapacityCollector, RequestHeaders, ResourceClient, Transport};
use vcd_core::{Aggregator, ExporterConfig, FetchError, ScrapeError, Snapshot, TokenProvider};
use vcd_metrics::{render, ExporterMetrics};

/// Runs one independent collection per call
pub struct Scraper {
    config: ExporterConfig,
    tokens: Arc<TokenProvider>,
    client: ResourceClient,
    collector: CapacityCollector,
    metrics: ExporterMetrics,
}

impl Scraper {
    pub fn new(
        config: ExporterConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenProvider>,
        metrics: ExporterMetrics,
    ) -> Self {
        let client = ResourceClient::new(transport).with_max_pages(config.max_pages);
        let collector = CapacityCollector::new(client.clone()).with_concurrency(config.detail_concurrency);

        Self {
            config,
            tokens,
            client,
            collector,
            metrics,
        }
    }

    /// Collect and render a full exposition document
    pub async fn scrape(&self) -> Result<String, ScrapeError> {
        let started = Instant::now();
        let result = self.collect().await.map(|snapshot| render(&snapshot));

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        self.metrics.observe_scrape(outcome, started.elapsed());
        result
    }

    /// Collect and aggregate without rendering
    pub async fn collect(&self) -> Result<Snapshot, ScrapeError> {
        let base_url = self.config.base_url()?;
        let token = self.tokens.get_token().await?;
        let headers = RequestHeaders::for_api(&self.config.api_version, &token)?;

        let vdc_records: Vec<VdcRecord> = self
            .primary_listing("VDC", base_url, VdcRecord::ELEMENT, &headers)
            .await?
            .iter()
            .map(VdcRecord::from_element)
            .collect();

        let provider_url = provider_query_url(base_url, self.config.page_size).map_err(|source| {
            ScrapeError::PrimaryFetch {
                listing: "provider VDC",
                source,
            }
        })?;
        let provider_records: Vec<ProviderVdcRecord> = self
            .primary_listing("provider VDC", &provider_url, ProviderVdcRecord::ELEMENT, &headers)
            .await?
            .iter()
            .filter_map(ProviderVdcRecord::from_element)
            .collect();

        info!(
            "Listed {} VDC records and {} provider VDC records",
            vdc_records.len(),
            provider_records.len()
        );

        let mut aggregator = Aggregator::new();
        aggregator.add_vdc_records(vdc_records);
        aggregator.add_provider_records(provider_records);

        let details = self.collector.collect(aggregator.cluster_refs(), &headers).await;

        let degraded_clusters = details.iter().filter(|d| d.capacity.is_degraded()).count();
        let degraded_profile_lists = details.iter().filter(|d| d.storage_profiles.is_degraded()).count();
        let degraded_profiles: usize = details.iter().map(|d| d.degraded_profiles).sum();
        self.metrics.record_degraded("compute_capacity", degraded_clusters);
        self.metrics.record_degraded("storage_profile_list", degraded_profile_lists);
        self.metrics.record_degraded("storage_profile", degraded_profiles);
        if degraded_clusters + degraded_profiles > 0 {
            warn!(
                "{} of {} clusters and {} storage profiles reported as zeros",
                degraded_clusters,
                details.len(),
                degraded_profiles
            );
        }

        for detail in details {
            aggregator.add_cluster_detail(detail);
        }

        let snapshot = aggregator.finish();
        debug!(
            "Snapshot has {} clusters and {} storage profiles",
            snapshot.capacities.len(),
            snapshot.storage_profiles.len()
        );
        Ok(snapshot)
    }

    async fn primary_listing(
        &self,
        listing: &'static str,
        url: &str,
        record: &str,
        headers: &RequestHeaders,
    ) -> Result<Vec<vcd_api::Element>, ScrapeError> {
        match self.client.fetch_all(url, record, headers).await {
            Ok(records) => Ok(records),
            Err(source) => {
                if matches!(source, FetchError::Status { status: 401, .. }) {
                    warn!("{} listing rejected the bearer token, dropping it", listing);
                    self.tokens.invalidate().await;
                }
                Err(ScrapeError::PrimaryFetch { listing, source })
            }
        }
    }
}
