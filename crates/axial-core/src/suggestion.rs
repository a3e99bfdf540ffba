//! Predicted, unconfirmed relationships between two nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::{node_key, NodeType};

/// How a suggestion was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionMethod {
    CommonNeighbors,
    Jaccard,
    AdamicAdar,
    PreferentialAttachment,
    Composite,
    Cooccurrence,
    SharedParent,
    SameCommunity,
}

impl SuggestionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionMethod::CommonNeighbors => "common_neighbors",
            SuggestionMethod::Jaccard => "jaccard",
            SuggestionMethod::AdamicAdar => "adamic_adar",
            SuggestionMethod::PreferentialAttachment => "preferential_attachment",
            SuggestionMethod::Composite => "composite",
            SuggestionMethod::Cooccurrence => "cooccurrence",
            SuggestionMethod::SharedParent => "shared_parent",
            SuggestionMethod::SameCommunity => "same_community",
        }
    }

    /// Methods that infer a link from graph shape rather than shared text.
    pub fn is_structural(&self) -> bool {
        !matches!(self, SuggestionMethod::Cooccurrence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Strength of the textual support behind a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
    /// Fragments exist in which both endpoints are coded together.
    Direct,
    /// No shared fragment, but each endpoint has fragments of its own.
    Indirect,
    None,
}

/// Why a suggestion did not reach the `direct` evidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    StructuralWithoutCooccurrence,
    CooccurrenceWithoutFragments,
}

/// A scored candidate relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_type: NodeType,
    pub target_type: NodeType,
    pub score: f64,
    pub method: SuggestionMethod,
    pub evidence_ids: Vec<String>,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_tier: Option<EvidenceTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_reason: Option<GapReason>,
}

impl Suggestion {
    pub fn new(
        source: impl Into<String>,
        source_type: NodeType,
        target: impl Into<String>,
        target_type: NodeType,
        score: f64,
        method: SuggestionMethod,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: suggestion_id(method, &node_key(source_type, &source), &node_key(target_type, &target)),
            source,
            target,
            source_type,
            target_type,
            score,
            method,
            evidence_ids: Vec::new(),
            confidence: Confidence::Low,
            evidence_tier: None,
            gap_reason: None,
        }
    }

    pub fn with_evidence(mut self, evidence_ids: Vec<String>) -> Self {
        self.evidence_ids = evidence_ids;
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Unordered identity of the pair this suggestion is about.
    pub fn pair_key(&self) -> (String, String) {
        let a = node_key(self.source_type, &self.source);
        let b = node_key(self.target_type, &self.target);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Deterministic id over the ordered pair of node keys (`"{type}:{name}"`).
pub fn suggestion_id(method: SuggestionMethod, a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}~{}", method.as_str(), lo, hi)
}

/// Collapse suggestions about the same unordered pair, keeping the best score.
///
/// First-seen order is preserved among survivors; on a score tie the earlier
/// suggestion wins.
pub fn dedup_by_pair(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut position: HashMap<(String, String), usize> = HashMap::new();
    let mut kept: Vec<Suggestion> = Vec::new();

    for suggestion in suggestions {
        let key = suggestion.pair_key();
        match position.get(&key) {
            Some(&idx) => {
                if suggestion.score > kept[idx].score {
                    kept[idx] = suggestion;
                }
            }
            None => {
                position.insert(key, kept.len());
                kept.push(suggestion);
            }
        }
    }

    kept
}

/// Order by score descending, then by endpoint names.
pub fn sort_by_score(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });
}
