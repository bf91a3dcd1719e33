//! Shared fixtures for the cross-crate integration tests.

use std::sync::Arc;

use duty_core::{Shipment, TariffRecord};
use duty_observability::AppMetrics;
use duty_service::{ServiceSettings, TariffService};
use duty_storage::{sample_records, Store, TariffRepository};

pub fn worked_example_shipment() -> Shipment {
    Shipment {
        product_cost: 10_000.0,
        freight: 500.0,
        insurance: 100.0,
        unit_weight: 100.0,
        quantity: 5,
    }
}

pub async fn service_with(
    store: Store,
    extra: Vec<TariffRecord>,
) -> anyhow::Result<TariffService<Store>> {
    store.insert_records(sample_records()).await?;
    store.insert_records(extra).await?;
    Ok(TariffService::new(
        Arc::new(store),
        AppMetrics::shared(),
        ServiceSettings::default(),
    ))
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}
