//! Scoring Normalizer: raw measurements → three 0–100 dimension scores.
//!
//! Each dimension is reduced to one intensity figure and mapped onto a linear band:
//! at or below the `best` edge scores 100, at or above the `worst` edge scores 0.
//! Higher intensity never raises a score, and every score is clamped to [0, 100].
//! Total function: a zeroed `Evaluation` scores without panicking.

use serde::{Deserialize, Serialize};

use crate::models::{CarbonInputs, Evaluation, WaterBasis};

// ────────────────────────────────────────────────────────────────────────────
// Emission factors (kgCO2e per unit)
// ────────────────────────────────────────────────────────────────────────────

pub const DIESEL_KG_PER_L: f64 = 2.68;
pub const GASOLINE_KG_PER_L: f64 = 2.32;
pub const NATURAL_GAS_KG_PER_M3: f64 = 1.98;
pub const LPG_KG_PER_KG: f64 = 2.94;
pub const GRID_KG_PER_KWH: f64 = 0.40;

// ────────────────────────────────────────────────────────────────────────────
// Normalization bands
// ────────────────────────────────────────────────────────────────────────────

/// tCO2e per employee per period.
const CARBON_BAND: Band = Band { best: 0.5, worst: 12.0 };
/// m³ per person per period.
const WATER_PER_PERSON_BAND: Band = Band { best: 10.0, worst: 60.0 };
/// m³ per production unit.
const WATER_PER_UNIT_BAND: Band = Band { best: 0.5, worst: 5.0 };

#[derive(Debug, Clone, Copy)]
struct Band {
    best: f64,
    worst: f64,
}

impl Band {
    fn score(&self, intensity: f64) -> f64 {
        if !intensity.is_finite() || intensity >= self.worst {
            return 0.0;
        }
        if intensity <= self.best {
            return 100.0;
        }
        (100.0 * (self.worst - intensity) / (self.worst - self.best)).clamp(0.0, 100.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// One of the three scored dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Carbon,
    Water,
    Waste,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Carbon, Dimension::Water, Dimension::Waste];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Carbon => "Carbon footprint",
            Dimension::Water => "Water use",
            Dimension::Waste => "Waste management",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Carbon => "carbon",
            Dimension::Water => "water",
            Dimension::Waste => "waste",
        }
    }
}

/// The three dimension scores, each in [0, 100]. Recomputed on every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub carbon: f64,
    pub water: f64,
    pub waste: f64,
}

impl Scores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Carbon => self.carbon,
            Dimension::Water => self.water,
            Dimension::Waste => self.waste,
        }
    }

    /// Unweighted mean of the three dimensions.
    pub fn overall(&self) -> f64 {
        (self.carbon + self.water + self.waste) / 3.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// Maturity label attached to the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityLevel {
    Leading,
    Advanced,
    Developing,
    Initial,
}

impl MaturityLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => MaturityLevel::Leading,
            s if s >= 70.0 => MaturityLevel::Advanced,
            s if s >= 50.0 => MaturityLevel::Developing,
            _ => MaturityLevel::Initial,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaturityLevel::Leading => "Leading",
            MaturityLevel::Advanced => "Advanced",
            MaturityLevel::Developing => "Developing",
            MaturityLevel::Initial => "Initial",
        }
    }
}

/// Emissions for a single fuel line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelEmission {
    pub fuel: String,
    pub quantity: f64,
    pub unit: String,
    pub kg_co2e: f64,
}

/// Scope 1 / Scope 2 breakdown in kgCO2e.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonFootprint {
    pub by_fuel: Vec<FuelEmission>,
    pub scope1_kg: f64,
    pub scope2_kg: f64,
}

impl CarbonFootprint {
    pub fn total_kg(&self) -> f64 {
        self.scope1_kg + self.scope2_kg
    }

    pub fn total_tonnes(&self) -> f64 {
        self.total_kg() / 1000.0
    }

    /// Scope 2 as a multiple of Scope 1. `None` when there are no direct emissions.
    pub fn indirect_to_direct_ratio(&self) -> Option<f64> {
        (self.scope1_kg > 0.0).then(|| self.scope2_kg / self.scope1_kg)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Applies the fixed emission factors to fuel volumes and purchased electricity.
pub fn compute_footprint(carbon: &CarbonInputs) -> CarbonFootprint {
    let fuels = &carbon.fuels;
    let by_fuel = vec![
        fuel_line("Diesel", fuels.diesel_l, "L", DIESEL_KG_PER_L),
        fuel_line("Gasoline", fuels.gasoline_l, "L", GASOLINE_KG_PER_L),
        fuel_line("Natural gas", fuels.natural_gas_m3, "m³", NATURAL_GAS_KG_PER_M3),
        fuel_line("LPG", fuels.lpg_kg, "kg", LPG_KG_PER_KG),
    ];
    let scope1_kg = by_fuel.iter().map(|f| f.kg_co2e).sum();
    let scope2_kg = carbon.electricity_kwh * GRID_KG_PER_KWH;

    CarbonFootprint {
        by_fuel,
        scope1_kg,
        scope2_kg,
    }
}

/// Computes all three dimension scores for an evaluation.
pub fn compute_scores(eval: &Evaluation) -> Scores {
    let footprint = compute_footprint(&eval.carbon);
    Scores {
        carbon: carbon_score(&footprint, eval.company.employees),
        water: water_score(eval),
        waste: eval.waste.valorization_rate() * 100.0,
    }
}

/// Carbon intensity in tCO2e per employee; headcount below one counts as one.
pub fn carbon_intensity(footprint: &CarbonFootprint, employees: f64) -> f64 {
    footprint.total_tonnes() / employees.max(1.0)
}

/// Water intensity and its unit label, per the evaluation's measurement basis.
pub fn water_intensity(eval: &Evaluation) -> (f64, &'static str) {
    let water = &eval.water;
    match water.basis {
        WaterBasis::PerPerson => (
            water.volume_m3 / eval.company.employees.max(1.0),
            "m³/person",
        ),
        WaterBasis::PerProductionUnit => (
            water.volume_m3 / water.production_units.max(1.0),
            "m³/unit",
        ),
    }
}

fn carbon_score(footprint: &CarbonFootprint, employees: f64) -> f64 {
    CARBON_BAND.score(carbon_intensity(footprint, employees))
}

fn water_score(eval: &Evaluation) -> f64 {
    let (intensity, _) = water_intensity(eval);
    match eval.water.basis {
        WaterBasis::PerPerson => WATER_PER_PERSON_BAND.score(intensity),
        WaterBasis::PerProductionUnit => WATER_PER_UNIT_BAND.score(intensity),
    }
}

fn fuel_line(fuel: &str, quantity: f64, unit: &str, factor: f64) -> FuelEmission {
    FuelEmission {
        fuel: fuel.to_string(),
        quantity,
        unit: unit.to_string(),
        kg_co2e: quantity * factor,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
