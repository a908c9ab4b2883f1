//! Roadmap Builder: allocates ranked recommendations into time buckets.
//!
//! Allocation is driven by a `BucketPlan`: each bucket declares slots that draw from
//! per-tier queues (in ranked order) plus fixed actions that are always appended.
//! `BucketPlan::quarterly()` is the four-quarter plan used in reports; other plans
//! exist so the allocator can be exercised without the quarter assumption.
//! Buckets that end up with no actions are omitted.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::analysis::recommendations::{PriorityTier, Recommendation};

pub const REVIEW_ACTION: &str = "Review progress against KPIs and adjust the plan";
pub const REEVALUATE_ACTION: &str = "Re-run the environmental diagnostic to measure improvement";

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: u8,
    pub end: u8,
}

/// One time bucket of the roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapBucket {
    pub label: String,
    pub months: MonthRange,
    /// Recommendation titles followed by fixed actions.
    pub actions: Vec<String>,
}

/// How many items a slot pulls from its tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Take {
    UpTo(usize),
    Rest,
}

/// Draws from the first non-empty tier queue in `tiers`, repeatedly, until `take` is met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub tiers: Vec<PriorityTier>,
    pub take: Take,
}

impl Slot {
    pub fn new(tier: PriorityTier, take: Take) -> Self {
        Self {
            tiers: vec![tier],
            take,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub label: String,
    pub months: MonthRange,
    pub slots: Vec<Slot>,
    pub fixed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    pub buckets: Vec<BucketSpec>,
}

impl BucketPlan {
    /// Q1: first two High. Q2: remaining High plus first Medium. Q3: next two Medium.
    /// Q4: review and re-evaluate, regardless of input.
    pub fn quarterly() -> Self {
        let quarter = |n: u8, slots: Vec<Slot>, fixed: Vec<String>| BucketSpec {
            label: format!("Q{n}"),
            months: MonthRange {
                start: (n - 1) * 3 + 1,
                end: n * 3,
            },
            slots,
            fixed,
        };
        Self {
            buckets: vec![
                quarter(1, vec![Slot::new(PriorityTier::High, Take::UpTo(2))], vec![]),
                quarter(
                    2,
                    vec![
                        Slot::new(PriorityTier::High, Take::Rest),
                        Slot::new(PriorityTier::Medium, Take::UpTo(1)),
                    ],
                    vec![],
                ),
                quarter(3, vec![Slot::new(PriorityTier::Medium, Take::UpTo(2))], vec![]),
                quarter(
                    4,
                    vec![],
                    vec![REVIEW_ACTION.to_string(), REEVALUATE_ACTION.to_string()],
                ),
            ],
        }
    }

    /// `bucket_count` equal buckets of `months_per_bucket`, each filled with up to
    /// `capacity` items drawn in `tier_order`.
    pub fn uniform(
        bucket_count: usize,
        capacity: usize,
        tier_order: &[PriorityTier],
        months_per_bucket: u8,
    ) -> Self {
        let buckets = (0..bucket_count)
            .map(|i| {
                // Month numbers saturate at u8::MAX for very long plans.
                let start = u8::try_from(i)
                    .unwrap_or(u8::MAX)
                    .saturating_mul(months_per_bucket)
                    .saturating_add(1);
                BucketSpec {
                    label: format!("Phase {}", i + 1),
                    months: MonthRange {
                        start,
                        end: start.saturating_add(months_per_bucket.saturating_sub(1)),
                    },
                    slots: vec![Slot {
                        tiers: tier_order.to_vec(),
                        take: Take::UpTo(capacity),
                    }],
                    fixed: vec![],
                }
            })
            .collect();
        Self { buckets }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Allocation
// ────────────────────────────────────────────────────────────────────────────

/// Builds the quarterly roadmap from ranked recommendations.
pub fn build_roadmap(ranked: &[Recommendation]) -> Vec<RoadmapBucket> {
    allocate(&BucketPlan::quarterly(), ranked)
}

/// Allocates ranked recommendations into the plan's buckets.
///
/// Within a tier, items leave their queue in ranked order, so order is preserved
/// end-to-end. Items not claimed by any slot are left out of the roadmap.
pub fn allocate(plan: &BucketPlan, ranked: &[Recommendation]) -> Vec<RoadmapBucket> {
    let mut queues: HashMap<PriorityTier, VecDeque<&str>> = HashMap::new();
    for rec in ranked {
        queues
            .entry(rec.priority)
            .or_default()
            .push_back(rec.title.as_str());
    }

    let mut buckets = Vec::with_capacity(plan.buckets.len());
    for spec in &plan.buckets {
        let mut actions: Vec<String> = Vec::new();
        for slot in &spec.slots {
            let limit = match slot.take {
                Take::UpTo(n) => n,
                Take::Rest => usize::MAX,
            };
            let mut taken = 0usize;
            while taken < limit {
                let next = slot
                    .tiers
                    .iter()
                    .find_map(|tier| queues.get_mut(tier).and_then(|q| q.pop_front()));
                match next {
                    Some(title) => {
                        actions.push(title.to_string());
                        taken += 1;
                    }
                    None => break,
                }
            }
        }
        actions.extend(spec.fixed.iter().cloned());

        if !actions.is_empty() {
            buckets.push(RoadmapBucket {
                label: spec.label.clone(),
                months: spec.months,
                actions,
            });
        }
    }
    buckets
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
