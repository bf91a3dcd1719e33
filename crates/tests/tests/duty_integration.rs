use duty_core::{ApplicableDutyKind, RateColumn, TariffRecord};
use duty_service::ServiceError;
use duty_storage::{read_tariff_csv, Store, TariffRepository};
use duty_tests::{approx, service_with, worked_example_shipment};

#[tokio::test]
async fn worked_example_on_sqlite() {
    let store = Store::sqlite("sqlite::memory:").await.expect("sqlite should open");
    let service = service_with(store, Vec::new()).await.unwrap();

    let calculation = service
        .calculate_duty("0101.30.00.00", worked_example_shipment())
        .await
        .unwrap();
    let breakdown = &calculation.breakdown;

    assert!(approx(breakdown.cif_value, 10_600.0));
    assert!(approx(breakdown.applicable_duty, 720.8));
    assert!(approx(breakdown.landed_cost, 11_320.8));
    assert_eq!(breakdown.applicable_duty_kind, ApplicableDutyKind::General);
    assert_eq!(breakdown.duties.len(), 3);

    let special = breakdown.duty(RateColumn::Special).unwrap();
    assert_eq!(special.result.label, "Free");
}

#[tokio::test]
async fn undotted_and_dotted_numbers_resolve_alike() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();

    let dotted = service
        .calculate_duty("0201.10.05.00", worked_example_shipment())
        .await
        .unwrap();
    let plain = service
        .calculate_duty("0201100500", worked_example_shipment())
        .await
        .unwrap();

    assert_eq!(dotted.hts_number, plain.hts_number);
    assert!(approx(dotted.breakdown.applicable_duty, 11.0));
    assert_eq!(
        dotted.breakdown.applicable_duty_kind,
        ApplicableDutyKind::Special
    );
}

#[tokio::test]
async fn invalid_shipments_are_validation_errors() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();

    let mut negative_freight = worked_example_shipment();
    negative_freight.freight = -10.0;
    let mut zero_quantity = worked_example_shipment();
    zero_quantity.quantity = 0;
    let mut zero_weight = worked_example_shipment();
    zero_weight.unit_weight = 0.0;

    for shipment in [negative_freight, zero_quantity, zero_weight] {
        let err = service
            .calculate_duty("0101.30.00.00", shipment)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "got {err:?}");
    }

    assert_eq!(service.metrics().snapshot().validation_failures_total, 3);
}

#[tokio::test]
async fn malformed_hts_numbers_are_validation_errors() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();

    for raw in ["", "0101.30.00.00.99", "abc"] {
        let err = service
            .calculate_duty(raw, worked_example_shipment())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation", "input {raw:?}");
    }
}

#[tokio::test]
async fn unknown_numbers_are_not_found_not_validation() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();

    let err = service
        .calculate_duty("8471.30.01.00", worked_example_shipment())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert!(err.user_message().contains("check the code"));
    assert_eq!(service.metrics().snapshot().not_found_total, 1);
}

#[tokio::test]
async fn unparsed_rate_text_still_yields_a_breakdown() {
    let odd = TariffRecord::new("9903.88.15", "Goods subject to note").with_general("see note 3");
    let service = service_with(Store::memory(), vec![odd]).await.unwrap();

    let calculation = service
        .calculate_duty("9903.88.15", worked_example_shipment())
        .await
        .unwrap();

    let general = calculation.breakdown.duty(RateColumn::General).unwrap();
    assert!(general.result.label.starts_with("Unparsed:"));
    assert_eq!(calculation.breakdown.applicable_duty, 0.0);
    assert_eq!(
        calculation.breakdown.applicable_duty_kind,
        ApplicableDutyKind::None
    );
    assert_eq!(service.metrics().snapshot().unparsed_rates_total, 1);
}

#[tokio::test]
async fn compound_rate_uses_total_weight() {
    let record = TariffRecord::new("0406.90.12", "Cheese")
        .with_general("5% or 10¢/kg, whichever is greater")
        .with_column2("35%");
    let service = service_with(Store::memory(), vec![record]).await.unwrap();

    let mut shipment = worked_example_shipment();
    shipment.product_cost = 400.0;
    shipment.freight = 0.0;
    shipment.insurance = 0.0;
    shipment.unit_weight = 400.0;
    shipment.quantity = 5;

    let calculation = service.calculate_duty("0406.90.12", shipment).await.unwrap();
    // 2000 kg at 10¢ beats 5% of 400.
    assert!(approx(calculation.breakdown.applicable_duty, 200.0));
    assert!(calculation
        .formatted_breakdown
        .contains("(higher of two options)"));
}

#[tokio::test]
async fn lookup_returns_hierarchy_for_prefix_queries() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();

    let info = service.lookup_hts_info("0301").await.unwrap();
    assert_eq!(info.record.hts_number, "0301.11.00.00");
    assert_eq!(info.formatted_number, "0301");
    assert_eq!(info.hierarchy.chapter.as_deref(), Some("03"));
    assert_eq!(info.hierarchy.subheading, None);
}

#[tokio::test]
async fn search_formats_numbers_and_rates() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();

    let hits = service.search_by_description("beef", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].hts_number, "0201.10.05.00");
    assert_eq!(hits[0].general_rate.as_deref(), Some("4.4¢/kg"));

    assert!(service
        .search_by_description("unobtainium", None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn csv_import_feeds_calculation() {
    let csv = "\
HTS Number,Description,General Rate of Duty,Special Rate of Duty,Column 2 Rate of Duty
8471.30.01.00,Portable computers,Free,,35%
6109.10.00.12,\"T-shirts, cotton\",16.5%,\"Free (AU,BH,CA)\",90%
";
    let import = read_tariff_csv(csv.as_bytes()).unwrap();
    let store = Store::sqlite("sqlite::memory:").await.unwrap();
    let service = service_with(store.clone(), import.records).await.unwrap();

    assert_eq!(store.list_hts_numbers().await.unwrap().len(), 6);

    let calculation = service
        .calculate_duty("6109.10.00.12", worked_example_shipment())
        .await
        .unwrap();
    assert!(approx(calculation.breakdown.applicable_duty, 1749.0));

    let laptops = service
        .calculate_duty("8471.30.01.00", worked_example_shipment())
        .await
        .unwrap();
    assert_eq!(
        laptops.breakdown.applicable_duty_kind,
        ApplicableDutyKind::None
    );
    assert!(approx(laptops.breakdown.landed_cost, 10_600.0));
}

#[tokio::test]
async fn calculation_serializes_for_callers() {
    let service = service_with(Store::memory(), Vec::new()).await.unwrap();
    let calculation = service.sample_calculation().await.unwrap();

    let value = serde_json::to_value(&calculation).unwrap();
    assert_eq!(value["hts_number"], "0101.30.00.00");
    assert_eq!(value["breakdown"]["applicable_duty_kind"], "general");
    assert_eq!(value["breakdown"]["duties"][0]["column"], "general");
}
