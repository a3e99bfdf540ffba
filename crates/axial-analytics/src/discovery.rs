//! Hidden relationship discovery.
//!
//! Three strategies look for code pairs the data implies but nobody has
//! linked: co-occurrence in fragments, a shared parent category, and a
//! shared community from an earlier persisted community run. Their results
//! are merged per unordered pair and graded by the fragments behind them.

use std::collections::{BTreeMap, BTreeSet};

use axial_core::config::DiscoveryConfig;
use axial_core::suggestion::{dedup_by_pair, sort_by_score};
use axial_core::{
    CanonicalIndex, Confidence, EvidenceTier, GapReason, NodeStatus, NodeType, Suggestion, SuggestionMethod,
};
use axial_graph::queries::discovery::{code_communities, fragment_codings};
use axial_graph::GraphSession;
use tracing::{debug, info, warn};

use crate::engine::Stores;
use crate::extractor::{cooccurrence_pairs, EdgeOrigin, ExtractedGraph, GraphExtractor};

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Explicit code links and category membership, by canonical code name.
struct Structure {
    linked: BTreeSet<(String, String)>,
    parents: BTreeMap<String, BTreeSet<String>>,
}

impl Structure {
    fn from_graph(graph: &ExtractedGraph) -> Self {
        let mut linked = BTreeSet::new();
        let mut parents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for edge in graph.edges().iter().filter(|e| e.origin == EdgeOrigin::Explicit) {
            let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target)) else {
                continue;
            };
            match (source.node_type, target.node_type) {
                (NodeType::Code, NodeType::Code) => {
                    linked.insert(ordered(&source.name, &target.name));
                }
                (NodeType::Category, NodeType::Code) => {
                    parents.entry(target.name.clone()).or_default().insert(source.name.clone());
                }
                _ => {}
            }
        }
        Self { linked, parents }
    }

    fn is_linked(&self, a: &str, b: &str) -> bool {
        self.linked.contains(&ordered(a, b))
    }

    fn shares_parent(&self, a: &str, b: &str) -> bool {
        match (self.parents.get(a), self.parents.get(b)) {
            (Some(pa), Some(pb)) => !pa.is_disjoint(pb),
            _ => false,
        }
    }
}

/// Fragment support used to grade suggestions.
struct Support {
    shared: BTreeMap<(String, String), Vec<String>>,
    coded: BTreeSet<String>,
}

impl Support {
    fn new(codings: &[(String, String)], index: &CanonicalIndex) -> Self {
        let shared = cooccurrence_pairs(codings, index, 1)
            .into_iter()
            .map(|p| ((p.a, p.b), p.fragments))
            .collect();
        let coded = codings.iter().filter_map(|(_, code)| index.resolve(code)).collect();
        Self { shared, coded }
    }

    fn grade(&self, suggestion: &mut Suggestion, sample: usize) {
        let tier = match self.shared.get(&ordered(&suggestion.source, &suggestion.target)) {
            Some(fragments) => {
                if suggestion.evidence_ids.is_empty() {
                    suggestion.evidence_ids = fragments.iter().take(sample).cloned().collect();
                }
                EvidenceTier::Direct
            }
            None if self.coded.contains(&suggestion.source) && self.coded.contains(&suggestion.target) => {
                EvidenceTier::Indirect
            }
            None => EvidenceTier::None,
        };

        suggestion.evidence_tier = Some(tier);
        suggestion.gap_reason = match (tier, suggestion.method) {
            (EvidenceTier::Direct, _) => None,
            (_, SuggestionMethod::Cooccurrence) => Some(GapReason::CooccurrenceWithoutFragments),
            _ => Some(GapReason::StructuralWithoutCooccurrence),
        };
        suggestion.confidence = match tier {
            EvidenceTier::Direct => Confidence::High,
            EvidenceTier::Indirect => Confidence::Medium,
            EvidenceTier::None => Confidence::Low,
        };
    }
}

fn code_pair(a: &str, b: &str, score: f64, method: SuggestionMethod) -> Suggestion {
    Suggestion::new(a, NodeType::Code, b, NodeType::Code, score, method)
}

pub struct HiddenRelationshipDiscoverer<'a> {
    stores: Stores<'a>,
    config: &'a DiscoveryConfig,
}

impl<'a> HiddenRelationshipDiscoverer<'a> {
    pub fn new(stores: Stores<'a>, config: &'a DiscoveryConfig) -> Self {
        Self { stores, config }
    }

    pub async fn discover(&self, project_id: &str, top_k: usize) -> Vec<Suggestion> {
        let extractor = GraphExtractor::new(self.stores, self.config.min_cooccurrence);
        let index = extractor.canonical_index(project_id);
        let graph = extractor.extract_with(project_id, &index).await;
        let structure = Structure::from_graph(&graph);
        let (codings, native) = self.codings(project_id).await;

        let mut suggestions = self.by_cooccurrence(&codings, &index, &structure);
        suggestions.extend(self.by_shared_parent(&structure));
        match self.stores.graph {
            Some(session) if native => {
                suggestions.extend(self.by_community(session, project_id, &index, &structure).await)
            }
            _ => debug!(project_id, "Same-community discovery needs the native store, skipped"),
        }

        let mut merged = dedup_by_pair(suggestions);
        sort_by_score(&mut merged);
        merged.truncate(top_k);

        let support = Support::new(&codings, &index);
        for suggestion in &mut merged {
            support.grade(suggestion, self.config.evidence_sample);
        }

        info!(project_id, suggestions = merged.len(), native, "Hidden relationship discovery complete");
        merged
    }

    /// Fragment codings, and whether they came from the native store.
    async fn codings(&self, project_id: &str) -> (Vec<(String, String)>, bool) {
        if let Some(session) = self.stores.graph {
            match fragment_codings(session, project_id).await {
                Ok(rows) if !rows.is_empty() => return (rows, true),
                Ok(_) => {
                    debug!(project_id, "Native store has no codings, reading relational store");
                    return (self.relational_codings(project_id), true);
                }
                Err(e) => warn!(project_id, error = %e, "Native codings failed, reading relational store"),
            }
        }
        (self.relational_codings(project_id), false)
    }

    fn relational_codings(&self, project_id: &str) -> Vec<(String, String)> {
        axial_db::queries::fragments::fragment_codings(self.stores.db, project_id).unwrap_or_else(|e| {
            warn!(project_id, error = %e, "Relational codings failed");
            Vec::new()
        })
    }

    /// Pairs sharing enough fragments with no link and no common category.
    fn by_cooccurrence(
        &self,
        codings: &[(String, String)],
        index: &CanonicalIndex,
        structure: &Structure,
    ) -> Vec<Suggestion> {
        let suggestions: Vec<Suggestion> = cooccurrence_pairs(codings, index, self.config.min_cooccurrence)
            .into_iter()
            .filter(|p| !structure.is_linked(&p.a, &p.b) && !structure.shares_parent(&p.a, &p.b))
            .map(|p| {
                let evidence = p.fragments.iter().take(self.config.evidence_sample).cloned().collect();
                code_pair(&p.a, &p.b, p.fragments.len() as f64, SuggestionMethod::Cooccurrence)
                    .with_evidence(evidence)
            })
            .collect();
        debug!(count = suggestions.len(), "Co-occurrence candidates");
        suggestions
    }

    /// Unlinked pairs under a common category, scored by shared categories.
    fn by_shared_parent(&self, structure: &Structure) -> Vec<Suggestion> {
        let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (code, categories) in &structure.parents {
            for category in categories {
                children.entry(category.as_str()).or_default().push(code.as_str());
            }
        }

        let mut shared: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for codes in children.values() {
            for (i, a) in codes.iter().enumerate() {
                for b in &codes[i + 1..] {
                    if !structure.is_linked(a, b) {
                        *shared.entry((*a, *b)).or_insert(0) += 1;
                    }
                }
            }
        }

        let suggestions: Vec<Suggestion> = shared
            .into_iter()
            .map(|((a, b), count)| code_pair(a, b, count as f64, SuggestionMethod::SharedParent))
            .collect();
        debug!(count = suggestions.len(), "Shared-parent candidates");
        suggestions
    }

    /// Unlinked pairs in the same persisted community.
    async fn by_community(
        &self,
        session: &dyn GraphSession,
        project_id: &str,
        index: &CanonicalIndex,
        structure: &Structure,
    ) -> Vec<Suggestion> {
        let rows = match code_communities(session, project_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(project_id, error = %e, "Community lookup failed, same-community skipped");
                return Vec::new();
            }
        };

        let mut communities: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            if row.status == NodeStatus::Merged {
                continue;
            }
            if let Some(code) = index.resolve(&row.code_name) {
                communities.entry(row.community_id).or_default().insert(code);
            }
        }

        let mut suggestions = Vec::new();
        for members in communities.values() {
            let members: Vec<&String> = members.iter().collect();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if !structure.is_linked(a, b) {
                        suggestions.push(code_pair(a, b, 1.0, SuggestionMethod::SameCommunity));
                    }
                }
            }
        }
        debug!(count = suggestions.len(), "Same-community candidates");
        suggestions
    }
}
