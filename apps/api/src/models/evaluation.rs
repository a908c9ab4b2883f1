//! Evaluation schema: the single typed snapshot every pipeline stage reads from.
//!
//! Upstream collectors send loosely-shaped JSON: absent fields, `null`, numbers as
//! strings, the occasional negative. All of that is absorbed here, once, at the
//! boundary. Numeric fields deserialize through `lenient_f64` (anything that is not a
//! finite, non-negative number becomes `0.0`), so downstream code never re-checks.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Default compliance target for an extended-producer-responsibility product (percent).
pub const DEFAULT_REP_TARGET_PCT: f64 = 50.0;

// ────────────────────────────────────────────────────────────────────────────
// Schema
// ────────────────────────────────────────────────────────────────────────────

/// Root record: one organization, one reporting period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Evaluation {
    /// Identifier assigned by the external store, if the record was persisted.
    pub id: Option<Uuid>,
    pub company: CompanyProfile,
    /// Free-form period label, e.g. "2024" or "2024-H1".
    pub period: String,
    pub carbon: CarbonInputs,
    pub water: WaterInputs,
    pub waste: WasteInputs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub sector: String,
    pub region: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub employees: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonInputs {
    pub fuels: FuelInputs,
    #[serde(deserialize_with = "lenient_f64")]
    pub electricity_kwh: f64,
}

/// Fuel volumes burned on site (Scope 1 sources).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelInputs {
    #[serde(deserialize_with = "lenient_f64")]
    pub diesel_l: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub gasoline_l: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub natural_gas_m3: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lpg_kg: f64,
}

/// How water consumption is normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterBasis {
    #[default]
    PerPerson,
    PerProductionUnit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterInputs {
    #[serde(deserialize_with = "lenient_f64")]
    pub volume_m3: f64,
    pub basis: WaterBasis,
    /// Denominator for `WaterBasis::PerProductionUnit`.
    #[serde(deserialize_with = "lenient_f64")]
    pub production_units: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasteInputs {
    #[serde(deserialize_with = "lenient_f64")]
    pub generated_kg: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub valorized_kg: f64,
    pub rep_products: Vec<RepProduct>,
}

/// A regulated product category under extended producer responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepProduct {
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub generated_kg: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub valorized_kg: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub target_pct: f64,
}

impl Default for RepProduct {
    fn default() -> Self {
        Self {
            name: String::new(),
            generated_kg: 0.0,
            valorized_kg: 0.0,
            target_pct: DEFAULT_REP_TARGET_PCT,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Derived accessors
// ────────────────────────────────────────────────────────────────────────────

/// valorized / generated, capped at 1.0. Zero generation yields 0.0.
fn rate(generated: f64, valorized: f64) -> f64 {
    if generated <= 0.0 {
        return 0.0;
    }
    (valorized / generated).clamp(0.0, 1.0)
}

impl WasteInputs {
    /// Fraction (0.0 – 1.0) of generated waste that was recovered.
    pub fn valorization_rate(&self) -> f64 {
        rate(self.generated_kg, self.valorized_kg)
    }

    /// Mass sent to final disposal.
    pub fn disposed_kg(&self) -> f64 {
        (self.generated_kg - self.valorized_kg).max(0.0)
    }
}

impl RepProduct {
    /// Fraction (0.0 – 1.0) of this product's generated mass that was recovered.
    pub fn valorization_rate(&self) -> f64 {
        rate(self.generated_kg, self.valorized_kg)
    }

    /// Compliance target in percent; a zero target (missing or coerced) falls back to 50%.
    pub fn effective_target_pct(&self) -> f64 {
        if self.target_pct > 0.0 {
            self.target_pct.min(100.0)
        } else {
            DEFAULT_REP_TARGET_PCT
        }
    }

    pub fn is_below_target(&self) -> bool {
        self.valorization_rate() * 100.0 < self.effective_target_pct()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Boundary validation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("company.name is required")]
    MissingCompanyName,
}

impl Evaluation {
    /// Trims identity strings and checks the fields the report cannot be named without.
    ///
    /// Numeric fields are already coerced during deserialization; this never rejects
    /// an evaluation for missing measurements.
    pub fn validated(mut self) -> Result<Self, EvaluationError> {
        self.company.name = self.company.name.trim().to_string();
        self.company.sector = self.company.sector.trim().to_string();
        self.company.region = self.company.region.trim().to_string();
        self.period = self.period.trim().to_string();
        for product in &mut self.waste.rep_products {
            product.name = product.name.trim().to_string();
        }

        if self.company.name.is_empty() {
            return Err(EvaluationError::MissingCompanyName);
        }
        Ok(self)
    }
}

/// Accepts numbers, numeric strings (with `,` as decimal separator), `null`, or garbage.
/// Anything that does not parse to a finite, non-negative value becomes `0.0`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if parsed.is_finite() && parsed > 0.0 {
        parsed
    } else {
        0.0
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_defaults_to_zero() {
        let eval: Evaluation = serde_json::from_value(json!({})).unwrap();
        assert_eq!(eval.carbon.electricity_kwh, 0.0);
        assert_eq!(eval.water.basis, WaterBasis::PerPerson);
        assert!(eval.waste.rep_products.is_empty());
    }

    #[test]
    fn test_lenient_numbers_are_coerced() {
        let eval: Evaluation = serde_json::from_value(json!({
            "company": { "name": "Acme", "employees": "25" },
            "carbon": {
                "fuels": { "diesel_l": null, "gasoline_l": "abc", "natural_gas_m3": -4, "lpg_kg": "12,5" },
                "electricity_kwh": 1000
            }
        }))
        .unwrap();
        assert_eq!(eval.company.employees, 25.0);
        assert_eq!(eval.carbon.fuels.diesel_l, 0.0);
        assert_eq!(eval.carbon.fuels.gasoline_l, 0.0);
        assert_eq!(eval.carbon.fuels.natural_gas_m3, 0.0);
        assert!((eval.carbon.fuels.lpg_kg - 12.5).abs() < 1e-9);
        assert_eq!(eval.carbon.electricity_kwh, 1000.0);
    }

    #[test]
    fn test_rep_product_target_defaults_to_fifty() {
        let eval: Evaluation = serde_json::from_value(json!({
            "waste": { "rep_products": [ { "name": "Packaging", "generated_kg": 100 } ] }
        }))
        .unwrap();
        let product = &eval.waste.rep_products[0];
        assert_eq!(product.target_pct, DEFAULT_REP_TARGET_PCT);
        assert!(product.is_below_target());
    }

    #[test]
    fn test_zero_target_falls_back_to_default() {
        let product = RepProduct {
            target_pct: 0.0,
            ..RepProduct::default()
        };
        assert_eq!(product.effective_target_pct(), DEFAULT_REP_TARGET_PCT);
    }

    #[test]
    fn test_valorization_rate_is_capped() {
        let waste = WasteInputs {
            generated_kg: 100.0,
            valorized_kg: 180.0,
            rep_products: vec![],
        };
        assert_eq!(waste.valorization_rate(), 1.0);
        assert_eq!(waste.disposed_kg(), 0.0);
    }

    #[test]
    fn test_valorization_rate_zero_generation() {
        assert_eq!(WasteInputs::default().valorization_rate(), 0.0);
    }

    #[test]
    fn test_validated_requires_company_name() {
        let mut eval = Evaluation::default();
        eval.company.name = "   ".to_string();
        assert_eq!(eval.validated(), Err(EvaluationError::MissingCompanyName));
    }

    #[test]
    fn test_validated_trims_identity() {
        let mut eval = Evaluation::default();
        eval.company.name = "  Acme Foods  ".to_string();
        eval.period = " 2024 ".to_string();
        let eval = eval.validated().unwrap();
        assert_eq!(eval.company.name, "Acme Foods");
        assert_eq!(eval.period, "2024");
    }
}
