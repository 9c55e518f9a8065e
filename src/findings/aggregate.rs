use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::models::{EngagementSummary, Finding, FindingStatus, SeverityRank};
use super::normalize::{bucket, risk_weight, Bucket};

pub const MAX_RISK_SCORE: u8 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainAggregate {
    pub domain: String,
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FindingsAggregate {
    /// One entry per domain, in first-seen order.
    pub domains: Vec<DomainAggregate>,
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Findings not yet closed. A missing status counts as open.
    pub open: usize,
    pub score: u8,
    pub by_severity: BTreeMap<SeverityRank, usize>,
}

/// 0..=100. Sum of per-finding weights over ten, capped.
pub fn risk_score<'a, I>(findings: I) -> u8
where
    I: IntoIterator<Item = &'a Finding>,
{
    score_from_weight(findings.into_iter().map(|f| u64::from(risk_weight(f.rank()))).sum())
}

fn is_open(finding: &Finding) -> bool {
    finding.status != Some(FindingStatus::Closed)
}

pub fn aggregate<'a, I>(findings: I) -> FindingsAggregate
where
    I: IntoIterator<Item = &'a Finding>,
{
    let mut agg = FindingsAggregate::default();
    let mut weights: Vec<u64> = Vec::new();
    let mut overall_weight: u64 = 0;

    for finding in findings {
        let rank = finding.rank();
        let weight = u64::from(risk_weight(rank));
        let idx = match agg.domains.iter().position(|d| d.domain == finding.domain) {
            Some(i) => i,
            None => {
                agg.domains.push(DomainAggregate { domain: finding.domain.clone(), ..Default::default() });
                weights.push(0);
                agg.domains.len() - 1
            }
        };

        let domain = &mut agg.domains[idx];
        domain.total += 1;
        agg.total += 1;
        match bucket(rank) {
            Bucket::High => {
                domain.high += 1;
                agg.high += 1;
            }
            Bucket::Medium => {
                domain.medium += 1;
                agg.medium += 1;
            }
            Bucket::Low => {
                domain.low += 1;
                agg.low += 1;
            }
        }
        weights[idx] += weight;
        overall_weight += weight;
        *agg.by_severity.entry(rank).or_insert(0) += 1;
        if is_open(finding) {
            agg.open += 1;
        }
    }

    for (domain, weight) in agg.domains.iter_mut().zip(weights) {
        domain.score = score_from_weight(weight);
    }
    agg.score = score_from_weight(overall_weight);
    agg
}

fn score_from_weight(weight: u64) -> u8 {
    (weight / 10).min(u64::from(MAX_RISK_SCORE)) as u8
}

/// Server-side engagement counters that disagree with the loaded findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryDrift {
    pub server_open: u32,
    pub computed_open: usize,
    pub server_high: u32,
    pub computed_high: usize,
}

/// Compare the engagement summary against a recomputation over `findings`.
/// Returns `None` when they agree.
pub fn check_summary(summary: &EngagementSummary, findings: &[Finding]) -> Option<SummaryDrift> {
    let computed = aggregate(findings);
    let computed_high = findings
        .iter()
        .filter(|f| is_open(f) && bucket(f.rank()) == Bucket::High)
        .count();
    let drift = SummaryDrift {
        server_open: summary.findings_open,
        computed_open: computed.open,
        server_high: summary.high_severity,
        computed_high,
    };
    if drift.server_open as usize == drift.computed_open && drift.server_high as usize == drift.computed_high {
        return None;
    }
    warn!(
        server_open = drift.server_open,
        computed_open = drift.computed_open,
        server_high = drift.server_high,
        computed_high = drift.computed_high,
        "Engagement summary disagrees with loaded findings"
    );
    Some(drift)
}
