use tracing::debug;

use crate::error::ValidationError;
use crate::models::{
    ApplicableDutyKind, ColumnDuty, LandedCostBreakdown, RateColumn, Shipment, TariffRecord,
};
use crate::rate::{self, RateContext};

/// Computes CIF, every populated rate column and the duty that applies.
///
/// Column 2 is reported but never selected: it only applies under trade
/// status determinations made outside this calculation.
pub fn calculate(
    record: &TariffRecord,
    shipment: &Shipment,
) -> Result<LandedCostBreakdown, ValidationError> {
    shipment.validate()?;

    let cif_value = shipment.cif_value();
    let total_weight = shipment.total_weight();
    let context = RateContext::new(cif_value)
        .with_total_weight(total_weight)
        .with_quantity(shipment.quantity);

    let duties: Vec<ColumnDuty> = RateColumn::ALL
        .into_iter()
        .filter_map(|column| {
            let rate = record.rate(column)?;
            Some(ColumnDuty {
                column,
                rate: rate.to_string(),
                result: rate::parse(rate, &context),
            })
        })
        .collect();

    let (applicable_duty, applicable_duty_kind) = select_applicable(&duties);
    debug!(
        hts = %record.hts_number,
        cif_value,
        applicable_duty,
        kind = applicable_duty_kind.as_code(),
        "computed landed cost"
    );

    Ok(LandedCostBreakdown {
        hts_number: record.hts_number.clone(),
        description: record.description.clone(),
        shipment: *shipment,
        cif_value,
        total_weight,
        duties,
        applicable_duty,
        applicable_duty_kind,
        landed_cost: cif_value + applicable_duty,
    })
}

fn select_applicable(duties: &[ColumnDuty]) -> (f64, ApplicableDutyKind) {
    let amount_for = |column: RateColumn| {
        duties
            .iter()
            .find(|duty| duty.column == column)
            .map(|duty| duty.result.amount)
            .filter(|amount| *amount > 0.0)
    };

    let mut applicable = (0.0, ApplicableDutyKind::None);
    if let Some(general) = amount_for(RateColumn::General) {
        applicable = (general, ApplicableDutyKind::General);
    }
    if let Some(special) = amount_for(RateColumn::Special) {
        if applicable.0 == 0.0 || special < applicable.0 {
            applicable = (special, ApplicableDutyKind::Special);
        }
    }
    applicable
}
