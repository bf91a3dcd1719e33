use std::fmt::{self, Write};

use crate::models::LandedCostBreakdown;

/// `$12,345.67` style dollar amount.
pub fn format_money(amount: f64) -> String {
    let rendered = format!("{:.2}", amount.abs());
    let (whole, cents) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && rendered != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Fixed-order plain-text rendering: header, cost breakdown, duty rates,
/// final calculation.
pub fn render_breakdown(breakdown: &LandedCostBreakdown) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_breakdown(&mut out, breakdown);
    out
}

fn write_breakdown(out: &mut String, breakdown: &LandedCostBreakdown) -> fmt::Result {
    let shipment = &breakdown.shipment;

    writeln!(out, "=== HTS DUTY CALCULATION ===")?;
    writeln!(out, "HTS Number: {}", breakdown.hts_number)?;
    writeln!(out, "Description: {}", breakdown.description)?;
    writeln!(out)?;

    writeln!(out, "=== COST BREAKDOWN ===")?;
    writeln!(out, "Product Cost (FOB): {}", format_money(shipment.product_cost))?;
    writeln!(out, "Freight: {}", format_money(shipment.freight))?;
    writeln!(out, "Insurance: {}", format_money(shipment.insurance))?;
    writeln!(out, "CIF Value: {}", format_money(breakdown.cif_value))?;
    writeln!(out)?;
    writeln!(out, "Quantity: {} units", shipment.quantity)?;
    writeln!(out, "Unit Weight: {} kg", shipment.unit_weight)?;
    writeln!(out, "Total Weight: {} kg", breakdown.total_weight)?;
    writeln!(out)?;

    writeln!(out, "=== DUTY RATES ===")?;
    for duty in &breakdown.duties {
        writeln!(out, "{} Rate: {}", duty.column.title(), duty.rate)?;
        writeln!(
            out,
            "  Amount: {} ({})",
            format_money(duty.result.amount),
            duty.result.label
        )?;
    }
    writeln!(out)?;

    writeln!(out, "=== FINAL CALCULATION ===")?;
    writeln!(
        out,
        "Applicable Duty ({}): {}",
        breakdown.applicable_duty_kind.as_code(),
        format_money(breakdown.applicable_duty)
    )?;
    writeln!(out, "Total Landed Cost: {}", format_money(breakdown.landed_cost))?;
    write!(out, "Effective Duty Rate: {:.2}%", breakdown.effective_rate())
}

impl fmt::Display for LandedCostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_breakdown(self))
    }
}
