//! Recommendation Generator: independent rules over the evaluation and its scores.
//!
//! Every rule in `RULES` is evaluated on its own; any number may fire. A rule whose
//! trigger is absent contributes nothing (no placeholder entry). Priority tier is
//! fixed by the rule at generation time and never recomputed downstream.

use serde::{Deserialize, Serialize};

use crate::analysis::scoring::{compute_footprint, CarbonFootprint, Scores};
use crate::models::Evaluation;

/// Scope 2 must exceed this fraction of Scope 1 to trigger the energy-efficiency rule.
pub const INDIRECT_DIRECT_TRIGGER: f64 = 0.4;
/// Valorization below this rate triggers source segregation.
pub const SEGREGATION_TRIGGER_RATE: f64 = 0.75;
/// Valorization below this rate escalates segregation to High priority.
pub const SEGREGATION_HIGH_PRIORITY_RATE: f64 = 0.50;
/// Valorization at or above this rate unlocks advanced circular-economy work.
pub const CIRCULAR_TRIGGER_RATE: f64 = 0.70;
/// Any dimension below this score triggers EMS certification.
pub const EMS_TRIGGER_SCORE: f64 = 75.0;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    pub fn label(&self) -> &'static str {
        match self {
            PriorityTier::High => "High",
            PriorityTier::Medium => "Medium",
            PriorityTier::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Energy,
    Waste,
    Management,
    Compliance,
    CircularEconomy,
}

impl RecommendationCategory {
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationCategory::Energy => "Energy",
            RecommendationCategory::Waste => "Waste",
            RecommendationCategory::Management => "Management",
            RecommendationCategory::Compliance => "Compliance",
            RecommendationCategory::CircularEconomy => "Circular economy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub budget: String,
    pub time: String,
    pub team: String,
}

/// A single improvement action. Immutable after generation; ranking reorders, never edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub category: RecommendationCategory,
    pub priority: PriorityTier,
    /// 0 – 10.
    pub impact: u8,
    /// 0 – 10.
    pub effort: u8,
    pub roi: String,
    pub steps: Vec<String>,
    pub resources: ResourceEstimate,
    pub kpis: Vec<String>,
}

impl Recommendation {
    /// impact / effort. Zero effort ranks ahead of everything that has impact.
    pub fn impact_effort_ratio(&self) -> f64 {
        match (self.impact, self.effort) {
            (0, _) => 0.0,
            (_, 0) => f64::INFINITY,
            (i, e) => i as f64 / e as f64,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rule table
// ────────────────────────────────────────────────────────────────────────────

/// Everything a rule may look at, computed once.
pub struct RuleContext<'a> {
    pub eval: &'a Evaluation,
    pub scores: &'a Scores,
    pub footprint: CarbonFootprint,
    pub valorization_rate: f64,
}

type Rule = fn(&RuleContext) -> Option<Recommendation>;

/// Evaluation order doubles as generation order, which the ranker uses as tie-break.
const RULES: &[Rule] = &[
    energy_efficiency_rule,
    source_segregation_rule,
    ems_certification_rule,
    collective_scheme_rule,
    circular_economy_rule,
];

/// Runs every rule and collects the candidates that fired, in rule order.
pub fn generate_recommendations(eval: &Evaluation, scores: &Scores) -> Vec<Recommendation> {
    let ctx = RuleContext {
        eval,
        scores,
        footprint: compute_footprint(&eval.carbon),
        valorization_rate: eval.waste.valorization_rate(),
    };
    RULES.iter().filter_map(|rule| rule(&ctx)).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────────────────────────────────────

fn energy_efficiency_rule(ctx: &RuleContext) -> Option<Recommendation> {
    let fp = &ctx.footprint;
    if fp.scope2_kg <= INDIRECT_DIRECT_TRIGGER * fp.scope1_kg {
        return None;
    }
    let scope2_share = fp.scope2_kg / fp.total_kg() * 100.0;
    Some(Recommendation {
        id: "energy-efficiency".to_string(),
        title: "Electrical energy efficiency programme".to_string(),
        category: RecommendationCategory::Energy,
        priority: PriorityTier::High,
        impact: 9,
        effort: 5,
        roi: format!(
            "Purchased electricity is {scope2_share:.0}% of the footprint; efficiency measures typically cut 15–25% of consumption and pay back within 2–3 years."
        ),
        steps: vec![
            "Commission an energy audit of lighting, HVAC, motors and compressed air".to_string(),
            "Replace lighting with LED and add occupancy controls".to_string(),
            "Install variable-speed drives on high-load motors".to_string(),
            "Evaluate on-site solar or a renewable supply contract".to_string(),
        ],
        resources: ResourceEstimate {
            budget: "Medium (audit plus staged retrofits)".to_string(),
            time: "6–9 months".to_string(),
            team: "Maintenance lead plus external energy auditor".to_string(),
        },
        kpis: vec![
            "kWh per employee".to_string(),
            "Scope 2 tCO2e".to_string(),
            "Share of renewable electricity".to_string(),
        ],
    })
}

fn source_segregation_rule(ctx: &RuleContext) -> Option<Recommendation> {
    if ctx.valorization_rate >= SEGREGATION_TRIGGER_RATE {
        return None;
    }
    let priority = if ctx.valorization_rate < SEGREGATION_HIGH_PRIORITY_RATE {
        PriorityTier::High
    } else {
        PriorityTier::Medium
    };
    Some(Recommendation {
        id: "source-segregation".to_string(),
        title: "Waste segregation at source".to_string(),
        category: RecommendationCategory::Waste,
        priority,
        impact: 8,
        effort: 3,
        roi: format!(
            "Only {:.0}% of waste is recovered today; segregating streams lowers disposal fees and opens revenue from recyclables.",
            ctx.valorization_rate * 100.0
        ),
        steps: vec![
            "Map waste streams and volumes per area".to_string(),
            "Deploy labelled containers for each recoverable stream".to_string(),
            "Train staff and assign area champions".to_string(),
            "Contract authorised recyclers and track certificates".to_string(),
        ],
        resources: ResourceEstimate {
            budget: "Low (containers and signage)".to_string(),
            time: "2–3 months".to_string(),
            team: "Operations supervisor plus area champions".to_string(),
        },
        kpis: vec![
            "Valorization rate (%)".to_string(),
            "kg sent to landfill per month".to_string(),
        ],
    })
}

fn ems_certification_rule(ctx: &RuleContext) -> Option<Recommendation> {
    let weakest = ctx
        .scores
        .iter()
        .filter(|(_, score)| *score < EMS_TRIGGER_SCORE)
        .min_by(|a, b| a.1.total_cmp(&b.1))?;
    Some(Recommendation {
        id: "ems-certification".to_string(),
        title: "Environmental management system certification".to_string(),
        category: RecommendationCategory::Management,
        priority: PriorityTier::Medium,
        impact: 9,
        effort: 8,
        roi: format!(
            "{} sits at {:.0}/100; a certified management system turns one-off fixes into a continuous improvement cycle and is increasingly required by buyers.",
            weakest.0.label(),
            weakest.1
        ),
        steps: vec![
            "Run a gap analysis against the management system standard".to_string(),
            "Define environmental policy, objectives and responsibilities".to_string(),
            "Document operational controls and monitoring procedures".to_string(),
            "Complete an internal audit and management review".to_string(),
            "Schedule the certification audit".to_string(),
        ],
        resources: ResourceEstimate {
            budget: "High (consultancy and certification fees)".to_string(),
            time: "9–12 months".to_string(),
            team: "Management representative plus cross-functional committee".to_string(),
        },
        kpis: vec![
            "Objectives met per year".to_string(),
            "Audit non-conformities".to_string(),
            "Overall environmental score".to_string(),
        ],
    })
}

fn collective_scheme_rule(ctx: &RuleContext) -> Option<Recommendation> {
    let lagging: Vec<&str> = ctx
        .eval
        .waste
        .rep_products
        .iter()
        .filter(|p| p.is_below_target())
        .map(|p| p.name.as_str())
        .collect();
    if lagging.is_empty() {
        return None;
    }
    Some(Recommendation {
        id: "rep-collective-scheme".to_string(),
        title: "Join a collective REP compliance scheme".to_string(),
        category: RecommendationCategory::Compliance,
        priority: PriorityTier::High,
        impact: 9,
        effort: 2,
        roi: format!(
            "{} below the collection target; a collective scheme shares logistics cost and removes exposure to compliance penalties.",
            lagging.join(", ")
        ),
        steps: vec![
            "Register placed-on-market quantities per product category".to_string(),
            "Compare collective schemes and sign with one".to_string(),
            "Report declarations through the scheme each period".to_string(),
        ],
        resources: ResourceEstimate {
            budget: "Low (scheme membership fee)".to_string(),
            time: "1–2 months".to_string(),
            team: "Compliance officer".to_string(),
        },
        kpis: vec![
            "Products meeting target (%)".to_string(),
            "Declarations filed on time".to_string(),
        ],
    })
}

fn circular_economy_rule(ctx: &RuleContext) -> Option<Recommendation> {
    if ctx.valorization_rate < CIRCULAR_TRIGGER_RATE {
        return None;
    }
    Some(Recommendation {
        id: "circular-economy".to_string(),
        title: "Advanced circular-economy initiatives".to_string(),
        category: RecommendationCategory::CircularEconomy,
        priority: PriorityTier::Low,
        impact: 7,
        effort: 8,
        roi: format!(
            "With {:.0}% valorization already achieved, the next gains come from redesign, reuse loops and industrial symbiosis.",
            ctx.valorization_rate * 100.0
        ),
        steps: vec![
            "Identify by-products with value for nearby industries".to_string(),
            "Pilot reusable packaging with key suppliers".to_string(),
            "Apply eco-design criteria to the next product revision".to_string(),
        ],
        resources: ResourceEstimate {
            budget: "Medium to high (pilots and redesign)".to_string(),
            time: "12–18 months".to_string(),
            team: "Product, procurement and operations leads".to_string(),
        },
        kpis: vec![
            "Material circularity rate".to_string(),
            "Revenue from by-products".to_string(),
        ],
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarbonInputs, FuelInputs, RepProduct, WasteInputs};

    fn good_scores() -> Scores {
        Scores {
            carbon: 90.0,
            water: 90.0,
            waste: 90.0,
        }
    }

    fn ids(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.id.as_str()).collect()
    }

    /// Diesel litres yielding `kg` of Scope 1.
    fn diesel_for(kg: f64) -> f64 {
        kg / crate::analysis::scoring::DIESEL_KG_PER_L
    }

    /// kWh yielding `kg` of Scope 2.
    fn kwh_for(kg: f64) -> f64 {
        kg / crate::analysis::scoring::GRID_KG_PER_KWH
    }

    fn carbon(scope1_kg: f64, scope2_kg: f64) -> CarbonInputs {
        CarbonInputs {
            fuels: FuelInputs {
                diesel_l: diesel_for(scope1_kg),
                ..FuelInputs::default()
            },
            electricity_kwh: kwh_for(scope2_kg),
        }
    }

    // ── energy efficiency ───────────────────────────────────────────────────

    #[test]
    fn test_low_indirect_ratio_skips_energy_rule() {
        let mut eval = Evaluation::default();
        eval.carbon = carbon(80.0, 20.0); // ratio 0.25
        eval.waste.generated_kg = 100.0;
        eval.waste.valorized_kg = 100.0;
        let recs = generate_recommendations(&eval, &good_scores());
        assert!(!ids(&recs).contains(&"energy-efficiency"));
    }

    #[test]
    fn test_high_indirect_ratio_fires_energy_rule() {
        let mut eval = Evaluation::default();
        eval.carbon = carbon(80.0, 40.0); // ratio 0.5
        let recs = generate_recommendations(&eval, &good_scores());
        let rec = recs.iter().find(|r| r.id == "energy-efficiency").unwrap();
        assert_eq!((rec.impact, rec.effort), (9, 5));
        assert_eq!(rec.priority, PriorityTier::High);
    }

    #[test]
    fn test_no_emissions_skips_energy_rule() {
        let recs = generate_recommendations(&Evaluation::default(), &good_scores());
        assert!(!ids(&recs).contains(&"energy-efficiency"));
    }

    // ── segregation ─────────────────────────────────────────────────────────

    #[test]
    fn test_segregation_high_priority_below_half() {
        let mut eval = Evaluation::default();
        eval.waste = WasteInputs {
            generated_kg: 1000.0,
            valorized_kg: 200.0,
            rep_products: vec![],
        };
        let recs = generate_recommendations(&eval, &good_scores());
        let rec = recs.iter().find(|r| r.id == "source-segregation").unwrap();
        assert_eq!(rec.priority, PriorityTier::High);
        assert_eq!((rec.impact, rec.effort), (8, 3));
        assert!(!ids(&recs).contains(&"circular-economy"));
    }

    #[test]
    fn test_segregation_medium_priority_between_half_and_threshold() {
        let mut eval = Evaluation::default();
        eval.waste.generated_kg = 1000.0;
        eval.waste.valorized_kg = 600.0;
        let recs = generate_recommendations(&eval, &good_scores());
        let rec = recs.iter().find(|r| r.id == "source-segregation").unwrap();
        assert_eq!(rec.priority, PriorityTier::Medium);
    }

    #[test]
    fn test_segregation_and_circular_overlap_band() {
        let mut eval = Evaluation::default();
        eval.waste.generated_kg = 1000.0;
        eval.waste.valorized_kg = 720.0;
        let recs = generate_recommendations(&eval, &good_scores());
        assert!(ids(&recs).contains(&"source-segregation"));
        assert!(ids(&recs).contains(&"circular-economy"));
    }

    // ── EMS certification ───────────────────────────────────────────────────

    #[test]
    fn test_ems_fires_on_any_weak_dimension() {
        let scores = Scores {
            carbon: 90.0,
            water: 74.9,
            waste: 90.0,
        };
        let recs = generate_recommendations(&Evaluation::default(), &scores);
        let rec = recs.iter().find(|r| r.id == "ems-certification").unwrap();
        assert_eq!((rec.impact, rec.effort), (9, 8));
        assert!(rec.roi.contains("Water use"));
    }

    #[test]
    fn test_ems_skipped_when_all_dimensions_strong() {
        let recs = generate_recommendations(&Evaluation::default(), &good_scores());
        assert!(!ids(&recs).contains(&"ems-certification"));
    }

    // ── REP collective scheme ───────────────────────────────────────────────

    #[test]
    fn test_collective_scheme_fires_for_lagging_product() {
        let mut eval = Evaluation::default();
        eval.waste.rep_products = vec![
            RepProduct {
                name: "Packaging".to_string(),
                generated_kg: 100.0,
                valorized_kg: 70.0,
                ..RepProduct::default()
            },
            RepProduct {
                name: "Tyres".to_string(),
                generated_kg: 100.0,
                valorized_kg: 30.0,
                ..RepProduct::default()
            },
        ];
        let recs = generate_recommendations(&eval, &good_scores());
        let rec = recs.iter().find(|r| r.id == "rep-collective-scheme").unwrap();
        assert_eq!((rec.impact, rec.effort), (9, 2));
        assert!(rec.roi.contains("Tyres"));
        assert!(!rec.roi.contains("Packaging"));
    }

    #[test]
    fn test_collective_scheme_skipped_when_products_on_target() {
        let mut eval = Evaluation::default();
        eval.waste.rep_products = vec![RepProduct {
            name: "Packaging".to_string(),
            generated_kg: 100.0,
            valorized_kg: 50.0,
            ..RepProduct::default()
        }];
        let recs = generate_recommendations(&eval, &good_scores());
        assert!(!ids(&recs).contains(&"rep-collective-scheme"));
    }

    // ── generation order ────────────────────────────────────────────────────

    #[test]
    fn test_all_rules_fire_in_rule_order() {
        let mut eval = Evaluation::default();
        eval.carbon = carbon(100.0, 100.0);
        eval.waste.generated_kg = 1000.0;
        eval.waste.valorized_kg = 720.0;
        eval.waste.rep_products = vec![RepProduct {
            name: "Oils".to_string(),
            generated_kg: 10.0,
            ..RepProduct::default()
        }];
        let scores = Scores {
            carbon: 40.0,
            water: 90.0,
            waste: 72.0,
        };
        let recs = generate_recommendations(&eval, &scores);
        assert_eq!(
            ids(&recs),
            vec![
                "energy-efficiency",
                "source-segregation",
                "ems-certification",
                "rep-collective-scheme",
                "circular-economy"
            ]
        );
    }

    #[test]
    fn test_ratio_edge_cases() {
        let zero = Scores {
            carbon: 0.0,
            water: 0.0,
            waste: 0.0,
        };
        let mut rec = generate_recommendations(&Evaluation::default(), &zero).remove(0);
        rec.effort = 0;
        assert_eq!(rec.impact_effort_ratio(), f64::INFINITY);
        rec.impact = 0;
        assert_eq!(rec.impact_effort_ratio(), 0.0);
    }
}
