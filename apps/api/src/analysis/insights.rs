//! Insight Analyzer: classifies dimensions and REP products into Strengths and Opportunities.
//!
//! # Classification rules
//! - Dimension score ≥ 85 → Strength; < 70 → Opportunity; 70–84 stays unclassified.
//! - REP product valorization ≥ 85% → Strength; < 50% → Opportunity, independent of
//!   the dimension scores.
//!
//! Strengths are ordered best first, Opportunities worst first. Both sorts are stable,
//! so equal scores keep dimension order followed by product input order.

use serde::{Deserialize, Serialize};

use crate::analysis::scoring::{
    carbon_intensity, compute_footprint, water_intensity, CarbonFootprint, Dimension, Scores,
};
use crate::models::{Evaluation, RepProduct};

pub const STRENGTH_THRESHOLD: f64 = 85.0;
pub const OPPORTUNITY_THRESHOLD: f64 = 70.0;
pub const REP_STRENGTH_RATE_PCT: f64 = 85.0;
pub const REP_OPPORTUNITY_RATE_PCT: f64 = 50.0;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Strength,
    Opportunity,
}

/// What an insight is about: a scored dimension or a single REP product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum InsightArea {
    Dimension(Dimension),
    RepProduct(String),
}

impl InsightArea {
    pub fn label(&self) -> String {
        match self {
            InsightArea::Dimension(d) => d.label().to_string(),
            InsightArea::RepProduct(name) => format!("REP product: {name}"),
        }
    }
}

/// Extra diagnosis attached to every Opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityDetail {
    /// 100 − score.
    pub gap: f64,
    /// The dominant contributing sub-metric.
    pub cause: String,
    pub key_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub area: InsightArea,
    pub score: f64,
    /// The measurement that backs the classification, formatted for display.
    pub datum: String,
    pub narrative: String,
    pub category: InsightCategory,
    pub opportunity: Option<OpportunityDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub strengths: Vec<Insight>,
    pub opportunities: Vec<Insight>,
}

// ────────────────────────────────────────────────────────────────────────────
// Core function
// ────────────────────────────────────────────────────────────────────────────

/// Derives ordered Strengths and Opportunities from the scores and raw inputs.
pub fn analyze_insights(eval: &Evaluation, scores: &Scores) -> InsightReport {
    let footprint = compute_footprint(&eval.carbon);
    let mut strengths = Vec::new();
    let mut opportunities = Vec::new();

    for (dimension, score) in scores.iter() {
        let datum = dimension_datum(dimension, eval, &footprint);
        if score >= STRENGTH_THRESHOLD {
            strengths.push(Insight {
                area: InsightArea::Dimension(dimension),
                score,
                narrative: format!(
                    "{} performs at {:.0}/100, above the {STRENGTH_THRESHOLD:.0}-point strength threshold.",
                    dimension.label(),
                    score
                ),
                datum,
                category: InsightCategory::Strength,
                opportunity: None,
            });
        } else if score < OPPORTUNITY_THRESHOLD {
            let gap = 100.0 - score;
            opportunities.push(Insight {
                area: InsightArea::Dimension(dimension),
                score,
                narrative: format!(
                    "{} scores {:.0}/100, leaving a gap of {:.0} points to best practice.",
                    dimension.label(),
                    score,
                    gap
                ),
                datum,
                category: InsightCategory::Opportunity,
                opportunity: Some(OpportunityDetail {
                    gap,
                    cause: dominant_cause(dimension, eval, &footprint),
                    key_action: key_action(dimension).to_string(),
                }),
            });
        }
    }

    for product in &eval.waste.rep_products {
        if let Some(insight) = product_insight(product) {
            match insight.category {
                InsightCategory::Strength => strengths.push(insight),
                InsightCategory::Opportunity => opportunities.push(insight),
            }
        }
    }

    strengths.sort_by(|a, b| b.score.total_cmp(&a.score));
    opportunities.sort_by(|a, b| a.score.total_cmp(&b.score));

    InsightReport {
        strengths,
        opportunities,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Fixed lookup: one recommended action per weak dimension.
fn key_action(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Carbon => "Run an energy audit and switch high-consumption equipment to efficient or electric alternatives",
        Dimension::Water => "Install sub-metering and fix leaks in the highest-consuming processes",
        Dimension::Waste => "Introduce source segregation and contract certified recyclers for each waste stream",
    }
}

fn dimension_datum(dimension: Dimension, eval: &Evaluation, footprint: &CarbonFootprint) -> String {
    match dimension {
        Dimension::Carbon => format!(
            "{:.2} tCO2e total, {:.2} tCO2e per employee",
            footprint.total_tonnes(),
            carbon_intensity(footprint, eval.company.employees)
        ),
        Dimension::Water => {
            let (intensity, unit) = water_intensity(eval);
            format!("{:.0} m³ consumed, {intensity:.2} {unit}", eval.water.volume_m3)
        }
        Dimension::Waste => format!(
            "{:.0}% of {:.0} kg valorized",
            eval.waste.valorization_rate() * 100.0,
            eval.waste.generated_kg
        ),
    }
}

fn dominant_cause(dimension: Dimension, eval: &Evaluation, footprint: &CarbonFootprint) -> String {
    match dimension {
        Dimension::Carbon => {
            if footprint.scope1_kg >= footprint.scope2_kg {
                let top_fuel = footprint
                    .by_fuel
                    .iter()
                    .filter(|f| f.kg_co2e > 0.0)
                    .max_by(|a, b| a.kg_co2e.total_cmp(&b.kg_co2e))
                    .map(|f| f.fuel.to_lowercase())
                    .unwrap_or_else(|| "fuel".to_string());
                format!(
                    "Direct emissions (Scope 1) dominate at {:.2} tCO2e, mostly from {top_fuel}",
                    footprint.scope1_kg / 1000.0
                )
            } else {
                format!(
                    "Purchased electricity (Scope 2) dominates at {:.2} tCO2e",
                    footprint.scope2_kg / 1000.0
                )
            }
        }
        Dimension::Water => {
            let (intensity, unit) = water_intensity(eval);
            format!("Consumption intensity of {intensity:.2} {unit} is above the reference band")
        }
        Dimension::Waste => format!(
            "{:.0} kg sent to final disposal instead of being recovered",
            eval.waste.disposed_kg()
        ),
    }
}

fn product_insight(product: &RepProduct) -> Option<Insight> {
    let rate_pct = product.valorization_rate() * 100.0;
    let area = InsightArea::RepProduct(product.name.clone());
    let datum = format!(
        "{:.0} of {:.0} kg valorized ({rate_pct:.0}%)",
        product.valorized_kg, product.generated_kg
    );

    if rate_pct >= REP_STRENGTH_RATE_PCT {
        Some(Insight {
            area,
            score: rate_pct,
            datum,
            narrative: format!(
                "{} reaches {rate_pct:.0}% valorization, well above its {:.0}% target.",
                product.name,
                product.effective_target_pct()
            ),
            category: InsightCategory::Strength,
            opportunity: None,
        })
    } else if rate_pct < REP_OPPORTUNITY_RATE_PCT {
        Some(Insight {
            area,
            score: rate_pct,
            datum,
            narrative: format!(
                "{} only reaches {rate_pct:.0}% valorization against a {:.0}% target.",
                product.name,
                product.effective_target_pct()
            ),
            category: InsightCategory::Opportunity,
            opportunity: Some(OpportunityDetail {
                gap: 100.0 - rate_pct,
                cause: format!(
                    "{:.0} kg of {} not recovered",
                    (product.generated_kg - product.valorized_kg).max(0.0),
                    product.name
                ),
                key_action: format!(
                    "Join a collective compliance scheme for {}",
                    product.name
                ),
            }),
        })
    } else {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarbonInputs, FuelInputs, WasteInputs};

    fn make_product(name: &str, generated: f64, valorized: f64) -> RepProduct {
        RepProduct {
            name: name.to_string(),
            generated_kg: generated,
            valorized_kg: valorized,
            ..RepProduct::default()
        }
    }

    fn dimension_of(insight: &Insight) -> Option<Dimension> {
        match insight.area {
            InsightArea::Dimension(d) => Some(d),
            InsightArea::RepProduct(_) => None,
        }
    }

    #[test]
    fn test_scenario_strengths_and_opportunities_worst_first() {
        let scores = Scores {
            carbon: 40.0,
            water: 85.0,
            waste: 60.0,
        };
        let report = analyze_insights(&Evaluation::default(), &scores);

        let strengths: Vec<_> = report.strengths.iter().filter_map(dimension_of).collect();
        assert_eq!(strengths, vec![Dimension::Water]);

        let opportunities: Vec<_> = report.opportunities.iter().filter_map(dimension_of).collect();
        assert_eq!(opportunities, vec![Dimension::Carbon, Dimension::Waste]);

        let gaps: Vec<f64> = report
            .opportunities
            .iter()
            .map(|i| i.opportunity.as_ref().unwrap().gap)
            .collect();
        assert_eq!(gaps, vec![60.0, 40.0]);
    }

    #[test]
    fn test_unclassified_band_is_preserved() {
        let scores = Scores {
            carbon: 70.0,
            water: 84.9,
            waste: 77.0,
        };
        let report = analyze_insights(&Evaluation::default(), &scores);
        assert!(report.strengths.is_empty());
        assert!(report.opportunities.is_empty());
    }

    #[test]
    fn test_strengths_and_opportunities_disjoint() {
        for carbon in [0.0, 50.0, 69.9, 70.0, 84.9, 85.0, 100.0] {
            let scores = Scores {
                carbon,
                water: 100.0 - carbon,
                waste: carbon / 2.0,
            };
            let report = analyze_insights(&Evaluation::default(), &scores);
            for s in &report.strengths {
                assert!(!report.opportunities.iter().any(|o| o.area == s.area));
            }
        }
    }

    #[test]
    fn test_carbon_cause_picks_larger_scope() {
        let mut eval = Evaluation::default();
        eval.carbon = CarbonInputs {
            fuels: FuelInputs::default(),
            electricity_kwh: 50_000.0,
        };
        let scores = Scores {
            carbon: 30.0,
            water: 75.0,
            waste: 75.0,
        };
        let report = analyze_insights(&eval, &scores);
        let detail = report.opportunities[0].opportunity.as_ref().unwrap();
        assert!(detail.cause.contains("Scope 2"), "cause was {}", detail.cause);

        eval.carbon.fuels.diesel_l = 50_000.0;
        let report = analyze_insights(&eval, &scores);
        let detail = report.opportunities[0].opportunity.as_ref().unwrap();
        assert!(detail.cause.contains("Scope 1"), "cause was {}", detail.cause);
        assert!(detail.cause.contains("diesel"));
    }

    #[test]
    fn test_key_action_is_fixed_per_dimension() {
        let scores = Scores {
            carbon: 75.0,
            water: 20.0,
            waste: 75.0,
        };
        let report = analyze_insights(&Evaluation::default(), &scores);
        let detail = report.opportunities[0].opportunity.as_ref().unwrap();
        assert_eq!(detail.key_action, key_action(Dimension::Water));
    }

    #[test]
    fn test_rep_products_folded_in() {
        let mut eval = Evaluation::default();
        eval.waste = WasteInputs {
            generated_kg: 0.0,
            valorized_kg: 0.0,
            rep_products: vec![
                make_product("Packaging", 100.0, 90.0), // 90% → strength
                make_product("Tyres", 100.0, 60.0),     // 60% → unclassified
                make_product("Batteries", 100.0, 10.0), // 10% → opportunity
            ],
        };
        let scores = Scores {
            carbon: 75.0,
            water: 75.0,
            waste: 75.0,
        };
        let report = analyze_insights(&eval, &scores);
        assert_eq!(report.strengths.len(), 1);
        assert_eq!(
            report.strengths[0].area,
            InsightArea::RepProduct("Packaging".to_string())
        );
        assert_eq!(report.opportunities.len(), 1);
        let detail = report.opportunities[0].opportunity.as_ref().unwrap();
        assert!((detail.gap - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_opportunities_sorted_across_products_and_dimensions() {
        let mut eval = Evaluation::default();
        eval.waste.rep_products = vec![make_product("Oils", 100.0, 5.0)];
        let scores = Scores {
            carbon: 40.0,
            water: 75.0,
            waste: 75.0,
        };
        let report = analyze_insights(&eval, &scores);
        let ordered: Vec<f64> = report.opportunities.iter().map(|i| i.score).collect();
        assert_eq!(ordered, vec![5.0, 40.0]);
    }
}
