//! Prioritization Ranker and Quick-Win Selector.
//!
//! The ranker only reorders: every candidate survives, sorted descending by
//! impact/effort ratio. Equal ratios keep generation order (stable sort).

use tracing::debug;

use crate::analysis::recommendations::Recommendation;

pub const QUICK_WIN_MIN_IMPACT: u8 = 7;
pub const QUICK_WIN_MAX_EFFORT: u8 = 4;

/// Orders candidates by impact/effort ratio, highest first.
pub fn rank_recommendations(mut candidates: Vec<Recommendation>) -> Vec<Recommendation> {
    candidates.sort_by(|a, b| b.impact_effort_ratio().total_cmp(&a.impact_effort_ratio()));
    debug!(
        order = ?candidates.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        "Recommendations ranked"
    );
    candidates
}

/// High impact, low effort. Preserves the ranked order.
pub fn select_quick_wins(ranked: &[Recommendation]) -> Vec<Recommendation> {
    ranked
        .iter()
        .filter(|r| is_quick_win(r))
        .cloned()
        .collect()
}

pub fn is_quick_win(rec: &Recommendation) -> bool {
    rec.impact >= QUICK_WIN_MIN_IMPACT && rec.effort <= QUICK_WIN_MAX_EFFORT
}
