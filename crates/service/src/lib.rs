mod error;

use std::sync::Arc;
use std::time::Instant;

use duty_core::{
    calculate, hts, render_breakdown, HtsHierarchy, HtsNumber, LandedCostBreakdown, Shipment,
    TariffRecord, ValidationError,
};
use duty_observability::AppMetrics;
use duty_storage::TariffRepository;
use serde::Serialize;
use tracing::{info, instrument, warn};

pub use error::ServiceError;

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub default_search_limit: usize,
    pub max_search_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_search_limit: 10,
            max_search_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DutyCalculation {
    /// Display form of the requested number.
    pub hts_number: String,
    pub breakdown: LandedCostBreakdown,
    pub formatted_breakdown: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HtsInfo {
    pub formatted_number: String,
    pub record: TariffRecord,
    pub hierarchy: HtsHierarchy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub hts_number: String,
    pub description: String,
    pub general_rate: Option<String>,
    pub special_rate: Option<String>,
}

#[derive(Clone)]
pub struct TariffService<S>
where
    S: TariffRepository,
{
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    settings: ServiceSettings,
}

impl<S> TariffService<S>
where
    S: TariffRepository,
{
    pub fn new(store: Arc<S>, metrics: Arc<AppMetrics>, settings: ServiceSettings) -> Self {
        Self {
            store,
            metrics,
            settings,
        }
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    #[instrument(skip(self, shipment))]
    pub async fn calculate_duty(
        &self,
        hts_number: &str,
        shipment: Shipment,
    ) -> Result<DutyCalculation, ServiceError> {
        let started = Instant::now();
        self.metrics.inc_calculation();

        let result = self.compute(hts_number, &shipment).await;
        self.metrics.observe_latency(started.elapsed());
        self.track_failure(&result);

        let calculation = result?;
        let unparsed = calculation.breakdown.unparsed_columns().count();
        if unparsed > 0 {
            self.metrics.add_unparsed_rates(unparsed);
            warn!(hts = %calculation.hts_number, unparsed, "rate text needs review");
        }

        info!(
            hts = %calculation.hts_number,
            applicable_duty = calculation.breakdown.applicable_duty,
            landed_cost = calculation.breakdown.landed_cost,
            "calculated duties"
        );
        Ok(calculation)
    }

    async fn compute(
        &self,
        hts_number: &str,
        shipment: &Shipment,
    ) -> Result<DutyCalculation, ServiceError> {
        shipment.validate()?;
        let record = self.resolve(hts_number).await?;
        let breakdown = calculate(&record, shipment)?;

        Ok(DutyCalculation {
            hts_number: hts::format(hts_number),
            formatted_breakdown: render_breakdown(&breakdown),
            breakdown,
        })
    }

    #[instrument(skip(self))]
    pub async fn lookup_hts_info(&self, hts_number: &str) -> Result<HtsInfo, ServiceError> {
        self.metrics.inc_lookup();
        let result = self.resolve(hts_number).await;
        self.track_failure(&result);
        let record = result?;

        Ok(HtsInfo {
            formatted_number: hts::format(hts_number),
            hierarchy: hts::hierarchy(hts_number),
            record,
        })
    }

    #[instrument(skip(self))]
    pub async fn search_by_description(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        let query = text.trim();
        if query.is_empty() {
            self.metrics.inc_validation_failure();
            return Err(ValidationError::EmptyQuery.into());
        }

        let limit = limit
            .unwrap_or(self.settings.default_search_limit)
            .clamp(1, self.settings.max_search_limit.max(1));
        let records = self.store.search_by_description(query, limit).await?;
        info!(query, hits = records.len(), "searched descriptions");

        Ok(records
            .into_iter()
            .map(|record| SearchHit {
                hts_number: hts::format(&record.hts_number),
                description: record.description,
                general_rate: record.general_rate,
                special_rate: record.special_rate,
            })
            .collect())
    }

    /// Worked example against the first line of the development schedule.
    pub async fn sample_calculation(&self) -> Result<DutyCalculation, ServiceError> {
        self.calculate_duty(
            "0101.30.00.00",
            Shipment {
                product_cost: 10_000.0,
                freight: 500.0,
                insurance: 100.0,
                unit_weight: 100.0,
                quantity: 5,
            },
        )
        .await
    }

    async fn resolve(&self, hts_number: &str) -> Result<TariffRecord, ServiceError> {
        let hts = HtsNumber::parse(hts_number)?;
        self.store
            .get_rate_record(&hts)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                hts_number: hts_number.to_string(),
            })
    }

    fn track_failure<T>(&self, result: &Result<T, ServiceError>) {
        match result {
            Err(ServiceError::Validation(_)) => self.metrics.inc_validation_failure(),
            Err(ServiceError::NotFound { .. }) => self.metrics.inc_not_found(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duty_storage::{sample_records, MemoryStore};

    async fn service() -> TariffService<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_records(sample_records()).await.unwrap();
        TariffService::new(
            Arc::new(store),
            AppMetrics::shared(),
            ServiceSettings::default(),
        )
    }

    #[tokio::test]
    async fn sample_calculation_matches_worked_example() {
        let calculation = service().await.sample_calculation().await.unwrap();
        assert_eq!(calculation.hts_number, "0101.30.00.00");
        assert!((calculation.breakdown.landed_cost - 11_320.8).abs() < 1e-6);
        assert!(calculation
            .formatted_breakdown
            .contains("Total Landed Cost: $11,320.80"));
    }

    #[tokio::test]
    async fn search_limit_is_clamped() {
        let service = TariffService::new(
            Arc::new({
                let store = MemoryStore::new();
                store.insert_records(sample_records()).await.unwrap();
                store
            }),
            AppMetrics::shared(),
            ServiceSettings {
                default_search_limit: 10,
                max_search_limit: 1,
            },
        );
        let hits = service.search_by_description("e", Some(50)).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn blank_search_is_a_validation_error() {
        let err = service()
            .await
            .search_by_description("   ", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
