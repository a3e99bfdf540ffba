//! Link prediction heuristics.
//!
//! Each heuristic is a pure function of two node ids and an adjacency
//! index. Candidates are typed node pairs that are neither identical nor
//! already connected.

use std::collections::BTreeMap;
use std::str::FromStr;

use axial_core::suggestion::sort_by_score;
use axial_core::{AdjacencyIndex, AxialError, Confidence, NodeType, Suggestion, SuggestionMethod};
use tracing::debug;

/// `|N(a) ∩ N(b)|`
pub fn common_neighbors(index: &AdjacencyIndex, a: &str, b: &str) -> usize {
    index.neighbors(a).intersection(index.neighbors(b)).count()
}

/// `|N(a) ∩ N(b)| / |N(a) ∪ N(b)|`, zero when both are isolated.
pub fn jaccard(index: &AdjacencyIndex, a: &str, b: &str) -> f64 {
    let union = index.neighbors(a).union(index.neighbors(b)).count();
    if union == 0 {
        return 0.0;
    }
    common_neighbors(index, a, b) as f64 / union as f64
}

/// Sum of `1 / ln(deg(z))` over shared neighbours with degree above one.
pub fn adamic_adar(index: &AdjacencyIndex, a: &str, b: &str) -> f64 {
    index
        .neighbors(a)
        .intersection(index.neighbors(b))
        .map(|z| index.degree(z))
        .filter(|&d| d > 1)
        .map(|d| 1.0 / (d as f64).ln())
        .sum()
}

/// `deg(a) * deg(b)`
pub fn preferential_attachment(index: &AdjacencyIndex, a: &str, b: &str) -> usize {
    index.degree(a) * index.degree(b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    CommonNeighbors,
    Jaccard,
    AdamicAdar,
    PreferentialAttachment,
    /// Average of common neighbours, Jaccard and Adamic-Adar.
    Composite,
}

const COMPOSITE_PARTS: [Heuristic; 3] = [Heuristic::CommonNeighbors, Heuristic::Jaccard, Heuristic::AdamicAdar];

impl Heuristic {
    pub fn as_str(&self) -> &'static str {
        self.method().as_str()
    }

    pub fn method(&self) -> SuggestionMethod {
        match self {
            Heuristic::CommonNeighbors => SuggestionMethod::CommonNeighbors,
            Heuristic::Jaccard => SuggestionMethod::Jaccard,
            Heuristic::AdamicAdar => SuggestionMethod::AdamicAdar,
            Heuristic::PreferentialAttachment => SuggestionMethod::PreferentialAttachment,
            Heuristic::Composite => SuggestionMethod::Composite,
        }
    }

    /// Score of a single heuristic. Composite has no pairwise score of its own.
    fn score(&self, index: &AdjacencyIndex, a: &str, b: &str) -> f64 {
        match self {
            Heuristic::CommonNeighbors => common_neighbors(index, a, b) as f64,
            Heuristic::Jaccard => jaccard(index, a, b),
            Heuristic::AdamicAdar => adamic_adar(index, a, b),
            Heuristic::PreferentialAttachment => preferential_attachment(index, a, b) as f64,
            Heuristic::Composite => 0.0,
        }
    }
}

impl FromStr for Heuristic {
    type Err = AxialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "common_neighbors" | "common_neighbours" => Ok(Self::CommonNeighbors),
            "jaccard" => Ok(Self::Jaccard),
            "adamic_adar" => Ok(Self::AdamicAdar),
            "preferential_attachment" => Ok(Self::PreferentialAttachment),
            "composite" => Ok(Self::Composite),
            other => Err(AxialError::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// A scored candidate pair of node ids.
#[derive(Debug, Clone)]
struct Scored {
    source: String,
    target: String,
    score: f64,
}

pub struct LinkPredictor<'a> {
    index: &'a AdjacencyIndex,
}

impl<'a> LinkPredictor<'a> {
    pub fn new(index: &'a AdjacencyIndex) -> Self {
        Self { index }
    }

    /// Unconnected `(source, target)` id pairs of the requested types.
    ///
    /// When both types are equal each unordered pair appears once.
    pub fn candidates(&self, source_type: NodeType, target_type: NodeType) -> Vec<(&'a str, &'a str)> {
        let index = self.index;
        let mut pairs = Vec::new();
        for a in index.nodes_of_type(source_type) {
            for b in index.nodes_of_type(target_type) {
                if a == b || (source_type == target_type && b < a) || index.are_connected(a, b) {
                    continue;
                }
                pairs.push((a, b));
            }
        }
        pairs
    }

    /// Top-`top_k` suggestions scoring strictly above `min_score`.
    pub fn predict(
        &self,
        heuristic: Heuristic,
        source_type: NodeType,
        target_type: NodeType,
        top_k: usize,
        min_score: f64,
    ) -> Vec<Suggestion> {
        let candidates = self.candidates(source_type, target_type);
        debug!(candidates = candidates.len(), heuristic = heuristic.as_str(), "Scoring link candidates");

        let mut suggestions: Vec<Suggestion> = if heuristic == Heuristic::Composite {
            self.composite(&candidates, source_type, target_type, top_k, min_score)
        } else {
            self.rank(heuristic, &candidates, top_k, min_score)
                .into_iter()
                .map(|s| self.suggestion(&s, source_type, target_type, heuristic.method()))
                .collect()
        };
        sort_by_score(&mut suggestions);
        suggestions.truncate(top_k);
        suggestions
    }

    fn rank(&self, heuristic: Heuristic, candidates: &[(&str, &str)], top_k: usize, min_score: f64) -> Vec<Scored> {
        let mut scored: Vec<Scored> = candidates
            .iter()
            .map(|(a, b)| Scored {
                source: a.to_string(),
                target: b.to_string(),
                score: heuristic.score(self.index, a, b),
            })
            .filter(|s| s.score > min_score)
            .collect();
        scored.sort_by(|x, y| {
            y.score
                .total_cmp(&x.score)
                .then_with(|| self.index.name(&x.source).cmp(self.index.name(&y.source)))
                .then_with(|| self.index.name(&x.target).cmp(self.index.name(&y.target)))
        });
        scored.truncate(top_k);
        scored
    }

    /// Average each pair's score over the heuristics that ranked it.
    fn composite(
        &self,
        candidates: &[(&str, &str)],
        source_type: NodeType,
        target_type: NodeType,
        top_k: usize,
        min_score: f64,
    ) -> Vec<Suggestion> {
        let mut totals: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        for part in COMPOSITE_PARTS {
            for s in self.rank(part, candidates, top_k, min_score) {
                let entry = totals.entry((s.source, s.target)).or_insert((0.0, 0));
                entry.0 += s.score;
                entry.1 += 1;
            }
        }

        totals
            .into_iter()
            .map(|((source, target), (sum, count))| {
                let scored = Scored {
                    source,
                    target,
                    score: sum / count as f64,
                };
                let confidence = if count >= 2 { Confidence::High } else { Confidence::Medium };
                self.suggestion(&scored, source_type, target_type, SuggestionMethod::Composite)
                    .with_confidence(confidence)
            })
            .collect()
    }

    fn suggestion(&self, s: &Scored, source_type: NodeType, target_type: NodeType, method: SuggestionMethod) -> Suggestion {
        Suggestion::new(
            self.index.name(&s.source),
            source_type,
            self.index.name(&s.target),
            target_type,
            s.score,
            method,
        )
        .with_confidence(Confidence::Low)
    }
}
