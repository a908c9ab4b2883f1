//! Analysis pipeline: Evaluation → Scores → Insights → Recommendations → {Roadmap, Quick wins}.
//!
//! Pure and deterministic: the same snapshot always yields the same `Analysis`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::insights::{analyze_insights, InsightReport};
use crate::analysis::ranking::{rank_recommendations, select_quick_wins};
use crate::analysis::recommendations::{generate_recommendations, Recommendation};
use crate::analysis::roadmap::{build_roadmap, RoadmapBucket};
use crate::analysis::scoring::{compute_footprint, compute_scores, CarbonFootprint, MaturityLevel, Scores};
use crate::models::Evaluation;

/// Everything derived from one evaluation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub scores: Scores,
    pub overall_score: f64,
    pub maturity: MaturityLevel,
    pub footprint: CarbonFootprint,
    pub insights: InsightReport,
    /// Ranked by impact/effort ratio.
    pub recommendations: Vec<Recommendation>,
    pub quick_wins: Vec<Recommendation>,
    pub roadmap: Vec<RoadmapBucket>,
    pub summary: String,
}

/// Runs every analysis stage in order.
pub fn run_analysis(eval: &Evaluation) -> Analysis {
    let scores = compute_scores(eval);
    let overall_score = scores.overall();
    let maturity = MaturityLevel::from_score(overall_score);
    info!(
        company = %eval.company.name,
        carbon = scores.carbon,
        water = scores.water,
        waste = scores.waste,
        "Scores computed"
    );

    let insights = analyze_insights(eval, &scores);
    let candidates = generate_recommendations(eval, &scores);
    let recommendations = rank_recommendations(candidates);
    let quick_wins = select_quick_wins(&recommendations);
    let roadmap = build_roadmap(&recommendations);
    info!(
        strengths = insights.strengths.len(),
        opportunities = insights.opportunities.len(),
        recommendations = recommendations.len(),
        quick_wins = quick_wins.len(),
        "Analysis complete"
    );

    let summary = build_summary(eval, overall_score, maturity, &insights);

    Analysis {
        scores,
        overall_score,
        maturity,
        footprint: compute_footprint(&eval.carbon),
        insights,
        recommendations,
        quick_wins,
        roadmap,
        summary,
    }
}

/// Executive summary paragraph: overall standing, strongest area, most urgent gap.
fn build_summary(
    eval: &Evaluation,
    overall: f64,
    maturity: MaturityLevel,
    insights: &InsightReport,
) -> String {
    let mut summary = format!(
        "{} obtains an overall environmental score of {overall:.0}/100 for {}, placing it at the {} maturity level.",
        eval.company.name,
        if eval.period.is_empty() { "the period" } else { eval.period.as_str() },
        maturity.label()
    );

    match insights.strengths.first() {
        Some(top) => summary.push_str(&format!(
            " Its strongest area is {} ({:.0}).",
            top.area.label().to_lowercase(),
            top.score
        )),
        None => summary.push_str(" No area yet reaches the strength threshold."),
    }

    if let Some(worst) = insights.opportunities.first() {
        if let Some(detail) = &worst.opportunity {
            summary.push_str(&format!(
                " The most urgent opportunity is {} with a {:.0}-point gap; key action: {}.",
                worst.area.label().to_lowercase(),
                detail.gap,
                detail.key_action.to_lowercase()
            ));
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarbonInputs, CompanyProfile, FuelInputs, RepProduct, WasteInputs};

    fn make_eval() -> Evaluation {
        Evaluation {
            company: CompanyProfile {
                name: "Acme Foods".to_string(),
                sector: "Food processing".to_string(),
                region: "Valparaíso".to_string(),
                employees: 40.0,
            },
            period: "2024".to_string(),
            carbon: CarbonInputs {
                fuels: FuelInputs {
                    diesel_l: 12_000.0,
                    lpg_kg: 3_000.0,
                    ..FuelInputs::default()
                },
                electricity_kwh: 180_000.0,
            },
            waste: WasteInputs {
                generated_kg: 1000.0,
                valorized_kg: 200.0,
                rep_products: vec![RepProduct {
                    name: "Packaging".to_string(),
                    generated_kg: 500.0,
                    valorized_kg: 100.0,
                    ..RepProduct::default()
                }],
            },
            ..Evaluation::default()
        }
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let eval = make_eval();
        assert_eq!(run_analysis(&eval), run_analysis(&eval));
    }

    #[test]
    fn test_pipeline_quick_wins_subset_of_ranked() {
        let analysis = run_analysis(&make_eval());
        assert!(!analysis.quick_wins.is_empty());
        for win in &analysis.quick_wins {
            assert!(analysis.recommendations.contains(win));
        }
    }

    #[test]
    fn test_pipeline_summary_mentions_company() {
        let analysis = run_analysis(&make_eval());
        assert!(analysis.summary.starts_with("Acme Foods"));
        assert!(analysis.summary.contains("2024"));
    }

    #[test]
    fn test_pipeline_on_empty_evaluation() {
        let analysis = run_analysis(&Evaluation::default());
        assert!(analysis.overall_score >= 0.0 && analysis.overall_score <= 100.0);
        assert!(analysis.roadmap.iter().any(|b| b.label == "Q4"));
    }
}
