//! Evidence packs and quota allocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::FragmentSnapshot;

/// Which cascade step supplied a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceMethod {
    /// Evidence ids already attached to the suggestion by the caller.
    Caller,
    /// Fragments coded with both endpoints.
    Cooccurrence,
    /// Fragments coded with one endpoint and not the other.
    Contrast,
    /// Semantic search fallback.
    Semantic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPair {
    pub positive: usize,
    pub negative: usize,
}

/// Evidence gathered for a single suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEvidence {
    pub positive: Vec<FragmentSnapshot>,
    pub negative: Vec<FragmentSnapshot>,
    pub coverage: BTreeMap<EvidenceMethod, usize>,
    pub quota: QuotaPair,
}

impl SuggestionEvidence {
    pub fn with_quota(quota: QuotaPair) -> Self {
        Self {
            quota,
            ..Self::default()
        }
    }

    pub fn positive_open(&self) -> usize {
        self.quota.positive.saturating_sub(self.positive.len())
    }

    pub fn negative_open(&self) -> usize {
        self.quota.negative.saturating_sub(self.negative.len())
    }

    pub fn record(&mut self, method: EvidenceMethod) {
        *self.coverage.entry(method).or_insert(0) += 1;
    }

    /// Whether the fragment is already on either side.
    pub fn contains(&self, fragment_id: &str) -> bool {
        self.positive.iter().chain(&self.negative).any(|s| s.fragment_id == fragment_id)
    }
}

/// Requested budget against what was actually allocated after the safety cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSummary {
    pub requested: usize,
    pub allocated: usize,
    pub capped: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaReport {
    pub positive: QuotaSummary,
    pub negative: QuotaSummary,
}

/// Evidence for a batch of suggestions, keyed by suggestion id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    pub project_id: String,
    pub items: BTreeMap<String, SuggestionEvidence>,
    pub quota_summary: QuotaReport,
}

/// Split `total` across `n` slots with no rounding loss, then clamp each slot.
///
/// The first `total % n` slots get one extra unit. Before clamping the slots
/// sum to exactly `total`; after clamping they sum to `min(total, n * cap)`.
pub fn distribute_quota(total: usize, n: usize, cap: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let base = total / n;
    let remainder = total % n;
    (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .map(|q| q.min(cap))
        .collect()
}

/// Summarize one side of an allocation.
pub fn summarize_quota(requested: usize, quotas: &[usize]) -> QuotaSummary {
    let allocated: usize = quotas.iter().sum();
    QuotaSummary {
        requested,
        allocated,
        capped: allocated < requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split_clamped() {
        assert_eq!(distribute_quota(24, 3, 6), vec![6, 6, 6]);
        assert_eq!(distribute_quota(12, 3, 4), vec![4, 4, 4]);
    }

    #[test]
    fn test_remainder_goes_first() {
        assert_eq!(distribute_quota(10, 3, 6), vec![4, 3, 3]);
        assert_eq!(distribute_quota(2, 5, 6), vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_conservation() {
        for n in 1..12usize {
            for total in 0..80usize {
                for cap in 0..8usize {
                    let quotas = distribute_quota(total, n, cap);
                    assert_eq!(quotas.len(), n);
                    assert_eq!(quotas.iter().sum::<usize>(), total.min(n * cap), "n={n} total={total} cap={cap}");
                }
            }
        }
    }

    #[test]
    fn test_zero_suggestions() {
        assert!(distribute_quota(10, 0, 6).is_empty());
    }

    #[test]
    fn test_summary_flags_capping() {
        let summary = summarize_quota(24, &[6, 6, 6]);
        assert_eq!(summary.allocated, 18);
        assert!(summary.capped);
        assert!(!summarize_quota(9, &[3, 3, 3]).capped);
    }
}
