//! Duty rate text → dollar amount.
//!
//! Schedule text is hand-written prose, so parsing is an ordered cascade of
//! rules over the trimmed text. Rules match against an ASCII-lowercased copy,
//! which keeps byte offsets aligned with the original for slicing. The first rule that produces a
//! result wins; a rule that needs a shipment figure it was not given
//! declines and lets the cascade continue.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::models::{DutyParseResult, RateKind};

static AD_VALOREM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d*\.?\d+)\s*%").expect("valid ad valorem regex"));
static PER_KILOGRAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d*\.?\d+)\s*¢/kg").expect("valid per-kg regex"));
static PER_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(\d*\.?\d+)/(?:unit|each)").expect("valid per-unit regex")
});

const HIGHER_OF_TWO: &str = " (higher of two options)";

/// Shipment figures a rate may be applied against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateContext {
    pub cif_value: f64,
    /// Total shipment weight in kilograms.
    pub total_weight: Option<f64>,
    pub quantity: Option<u32>,
}

impl RateContext {
    pub fn new(cif_value: f64) -> Self {
        Self {
            cif_value,
            total_weight: None,
            quantity: None,
        }
    }

    pub fn with_total_weight(mut self, kilograms: f64) -> Self {
        self.total_weight = Some(kilograms);
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets both the unit count and the total weight it implies.
    pub fn with_unit_weight(self, unit_weight: f64, quantity: u32) -> Self {
        self.with_total_weight(unit_weight * f64::from(quantity))
            .with_quantity(quantity)
    }
}

/// `(original, lowercased)` text plus shipment figures.
type Rule = fn(&str, &str, &RateContext) -> Option<DutyParseResult>;

// Compound expressions must be tried before the single-pattern rules, which
// would otherwise match the first alternative on its own.
const RULES: [(&str, Rule); 5] = [
    ("free", free_treatment as Rule),
    ("whichever_greater", higher_of_two as Rule),
    ("ad_valorem", ad_valorem as Rule),
    ("per_kilogram", per_kilogram as Rule),
    ("per_unit", per_unit as Rule),
];

/// Parses a rate expression against the shipment. Never fails: text no rule
/// understands yields a zero amount labelled `Unparsed: <text>`.
pub fn parse(rate_text: &str, context: &RateContext) -> DutyParseResult {
    let text = rate_text.trim();
    if text.is_empty() {
        return DutyParseResult::zero(RateKind::NoDuty, "No duty");
    }

    let lower = text.to_ascii_lowercase();
    for (name, rule) in RULES {
        if let Some(result) = rule(text, &lower, context) {
            debug!(rule = name, rate = text, amount = result.amount, "parsed duty rate");
            return result;
        }
    }

    warn!(rate = text, "could not parse duty rate");
    DutyParseResult::zero(RateKind::Unparsed, format!("Unparsed: {text}"))
}

fn free_treatment(_original: &str, text: &str, _context: &RateContext) -> Option<DutyParseResult> {
    text.contains("free")
        .then(|| DutyParseResult::zero(RateKind::Free, "Free"))
}

fn ad_valorem(_original: &str, text: &str, context: &RateContext) -> Option<DutyParseResult> {
    let (raw, percent) = capture_number(&AD_VALOREM, text)?;
    Some(DutyParseResult {
        amount: percent / 100.0 * context.cif_value,
        label: format!("{raw}% ad valorem"),
        kind: RateKind::AdValorem,
    })
}

fn per_kilogram(_original: &str, text: &str, context: &RateContext) -> Option<DutyParseResult> {
    let weight = context.total_weight?;
    let (raw, cents) = capture_number(&PER_KILOGRAM, text)?;
    Some(DutyParseResult {
        amount: cents * weight / 100.0,
        label: format!("{raw}¢/kg specific duty"),
        kind: RateKind::PerKilogram,
    })
}

fn per_unit(_original: &str, text: &str, context: &RateContext) -> Option<DutyParseResult> {
    let quantity = context.quantity?;
    let (raw, dollars) = capture_number(&PER_UNIT, text)?;
    Some(DutyParseResult {
        amount: dollars * f64::from(quantity),
        label: format!("${raw}/unit specific duty"),
        kind: RateKind::PerUnit,
    })
}

/// `A or B, whichever is greater|higher`. Anything after the first comma of
/// `B` (country lists, the "whichever" clause) is dropped before parsing.
fn higher_of_two(original: &str, text: &str, context: &RateContext) -> Option<DutyParseResult> {
    if !(text.contains("whichever is greater") || text.contains("whichever is higher")) {
        return None;
    }

    let first_end = text.find(" or ")?;
    let second_start = first_end + " or ".len();
    let second_end = text[second_start..]
        .find(" or ")
        .map_or(text.len(), |offset| second_start + offset);

    let first = &original[..first_end];
    let second = &original[second_start..second_end];
    let second = second.split(',').next().unwrap_or(second);

    let first = parse(first, context);
    let second = parse(second, context);
    let mut chosen = if first.amount >= second.amount {
        first
    } else {
        second
    };
    chosen.label.push_str(HIGHER_OF_TWO);
    Some(chosen)
}

fn capture_number<'t>(pattern: &Regex, text: &'t str) -> Option<(&'t str, f64)> {
    let raw = pattern.captures(text)?.get(1)?.as_str();
    let value = raw.parse().ok()?;
    Some((raw, value))
}
