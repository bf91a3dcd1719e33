use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One schedule line as held by the lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffRecord {
    pub hts_number: String,
    pub description: String,
    pub general_rate: Option<String>,
    pub special_rate: Option<String>,
    pub column2_rate: Option<String>,
    pub section: Option<String>,
    pub chapter: Option<String>,
}

impl TariffRecord {
    pub fn new(hts_number: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            hts_number: hts_number.into(),
            description: description.into(),
            general_rate: None,
            special_rate: None,
            column2_rate: None,
            section: None,
            chapter: None,
        }
    }

    pub fn with_general(mut self, rate: impl Into<String>) -> Self {
        self.general_rate = Some(rate.into());
        self
    }

    pub fn with_special(mut self, rate: impl Into<String>) -> Self {
        self.special_rate = Some(rate.into());
        self
    }

    pub fn with_column2(mut self, rate: impl Into<String>) -> Self {
        self.column2_rate = Some(rate.into());
        self
    }

    /// Rate text for a column, skipping blank cells.
    pub fn rate(&self, column: RateColumn) -> Option<&str> {
        let raw = match column {
            RateColumn::General => self.general_rate.as_deref(),
            RateColumn::Special => self.special_rate.as_deref(),
            RateColumn::Column2 => self.column2_rate.as_deref(),
        };
        raw.filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateColumn {
    General,
    Special,
    Column2,
}

impl RateColumn {
    pub const ALL: [RateColumn; 3] = [Self::General, Self::Special, Self::Column2];

    pub fn as_code(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Special => "special",
            Self::Column2 => "column2",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Special => "Special",
            Self::Column2 => "Column 2",
        }
    }
}

/// Per-request shipment economics. Weight is kilograms per unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub product_cost: f64,
    pub freight: f64,
    pub insurance: f64,
    pub unit_weight: f64,
    pub quantity: u32,
}

impl Shipment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("product_cost", self.product_cost),
            ("freight", self.freight),
            ("insurance", self.insurance),
            ("unit_weight", self.unit_weight),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
        }

        for (field, value) in [
            ("product_cost", self.product_cost),
            ("freight", self.freight),
            ("insurance", self.insurance),
        ] {
            if value < 0.0 {
                return Err(ValidationError::NegativeAmount { field, value });
            }
        }

        if self.unit_weight <= 0.0 {
            return Err(ValidationError::NonPositive {
                field: "unit_weight",
            });
        }
        if self.quantity == 0 {
            return Err(ValidationError::NonPositive { field: "quantity" });
        }

        // Finite inputs can still overflow once combined.
        if !self.cif_value().is_finite() {
            return Err(ValidationError::NotFinite { field: "cif_value" });
        }
        if !self.total_weight().is_finite() {
            return Err(ValidationError::NotFinite {
                field: "total_weight",
            });
        }

        Ok(())
    }

    pub fn cif_value(&self) -> f64 {
        self.product_cost + self.freight + self.insurance
    }

    pub fn total_weight(&self) -> f64 {
        self.unit_weight * f64::from(self.quantity)
    }
}

/// Which parsing rule produced a duty amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    NoDuty,
    Free,
    AdValorem,
    PerKilogram,
    PerUnit,
    Unparsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyParseResult {
    pub amount: f64,
    pub label: String,
    pub kind: RateKind,
}

impl DutyParseResult {
    pub fn zero(kind: RateKind, label: impl Into<String>) -> Self {
        Self {
            amount: 0.0,
            label: label.into(),
            kind,
        }
    }

    pub fn is_unparsed(&self) -> bool {
        self.kind == RateKind::Unparsed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDuty {
    pub column: RateColumn,
    pub rate: String,
    pub result: DutyParseResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicableDutyKind {
    General,
    Special,
    None,
}

impl ApplicableDutyKind {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Special => "special",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandedCostBreakdown {
    pub hts_number: String,
    pub description: String,
    pub shipment: Shipment,
    pub cif_value: f64,
    pub total_weight: f64,
    pub duties: Vec<ColumnDuty>,
    pub applicable_duty: f64,
    pub applicable_duty_kind: ApplicableDutyKind,
    pub landed_cost: f64,
}

impl LandedCostBreakdown {
    pub fn duty(&self, column: RateColumn) -> Option<&ColumnDuty> {
        self.duties.iter().find(|duty| duty.column == column)
    }

    /// Applicable duty as a percentage of CIF; zero when CIF is zero.
    pub fn effective_rate(&self) -> f64 {
        if self.cif_value == 0.0 {
            0.0
        } else {
            self.applicable_duty / self.cif_value * 100.0
        }
    }

    pub fn unparsed_columns(&self) -> impl Iterator<Item = &ColumnDuty> {
        self.duties.iter().filter(|duty| duty.result.is_unparsed())
    }
}
