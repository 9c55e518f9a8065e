use std::collections::HashSet;
use std::str::FromStr;

use crate::errors::TaxopsError;
use crate::models::{Finding, FindingSeverity, FindingSource, SeverityRank};

/// The only place the two source vocabularies meet the shared scale.
pub fn rank_of(severity: FindingSeverity) -> SeverityRank {
    match severity {
        FindingSeverity::Critical => SeverityRank::Critical,
        FindingSeverity::Major | FindingSeverity::High => SeverityRank::High,
        FindingSeverity::Medium => SeverityRank::Medium,
        FindingSeverity::Minor | FindingSeverity::Low => SeverityRank::Low,
        FindingSeverity::Warning => SeverityRank::Warning,
        FindingSeverity::Info => SeverityRank::Info,
    }
}

/// Per-finding contribution to the risk score. Strictly increasing with rank.
pub fn risk_weight(rank: SeverityRank) -> u32 {
    match rank {
        SeverityRank::Critical => 250,
        SeverityRank::High => 100,
        SeverityRank::Medium => 40,
        SeverityRank::Low => 15,
        SeverityRank::Warning => 5,
        SeverityRank::Info => 1,
    }
}

/// Three-way grouping used by the per-domain counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    High,
    Medium,
    Low,
}

pub fn bucket(rank: SeverityRank) -> Bucket {
    match rank {
        SeverityRank::Critical | SeverityRank::High => Bucket::High,
        SeverityRank::Medium => Bucket::Medium,
        SeverityRank::Low | SeverityRank::Warning | SeverityRank::Info => Bucket::Low,
    }
}

impl FromStr for SeverityRank {
    type Err = TaxopsError;

    /// Accepts any label from either vocabulary (`major` → `High`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<FindingSeverity>().map(rank_of)
    }
}

/// Concatenate finding streams in the order given, dropping repeats of the
/// same `(source, id)`; the first occurrence wins.
pub fn merge_streams<I>(streams: I) -> Vec<Finding>
where
    I: IntoIterator<Item = Vec<Finding>>,
{
    let mut seen: HashSet<(FindingSource, String)> = HashSet::new();
    let mut merged = Vec::new();
    for stream in streams {
        for finding in stream {
            if seen.insert((finding.source, finding.id.clone())) {
                merged.push(finding);
            }
        }
    }
    merged
}
