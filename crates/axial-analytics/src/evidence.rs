//! Evidence packs.
//!
//! Each suggestion gets a positive and a negative quota carved out of the
//! caller's totals. Quotas are filled through a cascade that stops as soon
//! as a side is full:
//!
//! 1. fragment ids the caller already attached,
//! 2. fragments coded with both endpoints,
//! 3. fragments coded with one endpoint and not the other (negative side),
//! 4. semantic search, only when the earlier steps fell below the floors.
//!
//! Positive evidence is gathered for every suggestion before any negative
//! evidence. A fragment used as positive evidence is never handed out
//! again, on either side; contrasting fragments may serve several
//! suggestions. Non-subject speech is dropped and excerpts are truncated.

use std::collections::{BTreeMap, HashMap, HashSet};

use axial_core::config::EvidenceConfig;
use axial_core::evidence::summarize_quota;
use axial_core::{
    distribute_quota, CanonicalIndex, CanonicalResolver, EvidenceMethod, EvidencePack, Fragment, FragmentHit,
    NodeType, QuotaPair, QuotaReport, SemanticFallback, Suggestion, SuggestionEvidence,
};
use axial_db::queries::fragments;
use axial_graph::queries::evidence::{contrast_fragment_ids, cooccurrence_fragment_ids, fetch_fragments};
use tracing::{debug, info, warn};

use crate::engine::Stores;

/// Ids requested per open slot, to leave room for filtered fragments.
const OVERFETCH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Positive,
    Negative,
}

/// Every code name that resolves to the same canonical code as `name`.
fn members(index: &CanonicalIndex, node_type: NodeType, name: &str) -> Vec<String> {
    if node_type != NodeType::Code {
        return vec![name.to_string()];
    }
    match index.resolve(name) {
        Some(canonical) => index.members(&canonical),
        None => vec![name.to_string()],
    }
}

/// One suggestion per id, first-seen order, highest score kept.
fn unique_by_id(suggestions: &[Suggestion]) -> Vec<&Suggestion> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut kept: Vec<&Suggestion> = Vec::new();
    for suggestion in suggestions {
        match position.get(suggestion.id.as_str()) {
            Some(&idx) => {
                if suggestion.score > kept[idx].score {
                    kept[idx] = suggestion;
                }
            }
            None => {
                position.insert(&suggestion.id, kept.len());
                kept.push(suggestion);
            }
        }
    }
    kept
}

/// A suggestion with its resolved endpoint aliases and the evidence so far.
struct Slot<'s> {
    suggestion: &'s Suggestion,
    source: Vec<String>,
    target: Vec<String>,
    evidence: SuggestionEvidence,
}

pub struct EvidencePackBuilder<'a> {
    stores: Stores<'a>,
    config: &'a EvidenceConfig,
}

impl<'a> EvidencePackBuilder<'a> {
    pub fn new(stores: Stores<'a>, config: &'a EvidenceConfig) -> Self {
        Self { stores, config }
    }

    pub async fn build(
        &self,
        project_id: &str,
        suggestions: &[Suggestion],
        positive_total: usize,
        negative_total: usize,
    ) -> EvidencePack {
        let suggestions = unique_by_id(suggestions);
        let n = suggestions.len();
        let positive = distribute_quota(positive_total, n, self.config.positive_cap);
        let negative = distribute_quota(negative_total, n, self.config.negative_cap);
        let quota_summary = QuotaReport {
            positive: summarize_quota(positive_total, &positive),
            negative: summarize_quota(negative_total, &negative),
        };
        if quota_summary.positive.capped || quota_summary.negative.capped {
            info!(
                positive_requested = positive_total,
                positive_allocated = quota_summary.positive.allocated,
                negative_requested = negative_total,
                negative_allocated = quota_summary.negative.allocated,
                "Evidence quotas capped"
            );
        }

        let index = self.stores.db.canonical_index(project_id).unwrap_or_else(|e| {
            warn!(project_id, error = %e, "Canonical resolver failed, endpoints used as given");
            CanonicalIndex::new()
        });

        let mut slots: Vec<Slot<'_>> = suggestions
            .into_iter()
            .enumerate()
            .map(|(i, suggestion)| Slot {
                suggestion,
                source: members(&index, suggestion.source_type, &suggestion.source),
                target: members(&index, suggestion.target_type, &suggestion.target),
                evidence: SuggestionEvidence::with_quota(QuotaPair {
                    positive: positive[i],
                    negative: negative[i],
                }),
            })
            .collect();

        let mut positive_used: HashSet<String> = HashSet::new();
        for slot in &mut slots {
            self.fill_positive(project_id, slot, &mut positive_used).await;
        }
        for slot in &mut slots {
            self.fill_negative(project_id, slot, &mut positive_used).await;
            debug!(
                suggestion = %slot.suggestion.id,
                positive = slot.evidence.positive.len(),
                negative = slot.evidence.negative.len(),
                "Evidence gathered"
            );
        }

        info!(project_id, suggestions = n, positive_fragments = positive_used.len(), "Evidence pack built");
        EvidencePack {
            project_id: project_id.to_string(),
            items: slots
                .into_iter()
                .map(|slot| (slot.suggestion.id.clone(), slot.evidence))
                .collect::<BTreeMap<_, _>>(),
            quota_summary,
        }
    }

    async fn fill_positive(&self, project_id: &str, slot: &mut Slot<'_>, used: &mut HashSet<String>) {
        let evidence = &mut slot.evidence;

        if evidence.positive_open() > 0 && !slot.suggestion.evidence_ids.is_empty() {
            let fragments = self.load(project_id, &slot.suggestion.evidence_ids, used).await;
            self.take(fragments, EvidenceMethod::Caller, Side::Positive, None, evidence, used);
        }

        let open = evidence.positive_open();
        if open > 0 {
            let limit = open * OVERFETCH + used.len();
            let ids = self.cooccurring(project_id, &slot.source, &slot.target, limit).await;
            let fragments = self.load(project_id, &ids, used).await;
            self.take(fragments, EvidenceMethod::Cooccurrence, Side::Positive, None, evidence, used);
        }

        let floor = self.config.positive_floor.min(evidence.quota.positive);
        if evidence.positive.len() < floor {
            if let Some(semantic) = self.stores.semantic {
                let query = format!("{} {}", slot.suggestion.source, slot.suggestion.target);
                if let Some(fragments) = self.search(semantic, project_id, &query, used).await {
                    self.take(fragments, EvidenceMethod::Semantic, Side::Positive, None, evidence, used);
                }
            }
        }
    }

    async fn fill_negative(&self, project_id: &str, slot: &mut Slot<'_>, used: &mut HashSet<String>) {
        let evidence = &mut slot.evidence;

        for (present, absent) in [(&slot.source, &slot.target), (&slot.target, &slot.source)] {
            let open = evidence.negative_open();
            if open == 0 {
                break;
            }
            let limit = open * OVERFETCH + used.len() + evidence.negative.len();
            let ids = self.contrasting(project_id, present, absent, limit).await;
            let fragments = self.load(project_id, &ids, used).await;
            self.take(fragments, EvidenceMethod::Contrast, Side::Negative, None, evidence, used);
        }

        let floor = self.config.negative_floor.min(evidence.quota.negative);
        if evidence.negative.len() < floor {
            if let Some(semantic) = self.stores.semantic {
                let reject = slot.suggestion.target.to_lowercase();
                if let Some(fragments) = self.search(semantic, project_id, &slot.suggestion.source, used).await {
                    self.take(fragments, EvidenceMethod::Semantic, Side::Negative, Some(reject.as_str()), evidence, used);
                }
            }
        }
    }

    /// Semantic hits as fragments. Hits missing from both stores keep the
    /// payload the search returned.
    async fn search(
        &self,
        semantic: &dyn SemanticFallback,
        project_id: &str,
        query: &str,
        used: &HashSet<String>,
    ) -> Option<Vec<Fragment>> {
        let hits = match semantic.search_fragments(query, project_id, self.config.semantic_top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(project_id, query, error = %e, "Semantic fallback failed");
                return None;
            }
        };
        debug!(query, hits = hits.len(), "Semantic fallback hits");

        let ids: Vec<String> = hits.iter().map(|h| h.fragment_id.clone()).collect();
        let mut loaded: HashMap<String, Fragment> = self
            .load(project_id, &ids, used)
            .await
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();

        Some(
            hits.into_iter()
                .filter(|h| !used.contains(&h.fragment_id))
                .map(|hit| match loaded.remove(&hit.fragment_id) {
                    Some(fragment) => fragment,
                    None => fragment_from_hit(project_id, hit),
                })
                .collect(),
        )
    }

    /// Move admissible fragments into one side until it is full.
    ///
    /// Fragments already used as positive evidence anywhere, or already held
    /// by this suggestion, are skipped. Positives are added to `used`.
    fn take(
        &self,
        fragments: Vec<Fragment>,
        method: EvidenceMethod,
        side: Side,
        reject: Option<&str>,
        evidence: &mut SuggestionEvidence,
        used: &mut HashSet<String>,
    ) {
        for fragment in fragments {
            let open = match side {
                Side::Positive => evidence.positive_open(),
                Side::Negative => evidence.negative_open(),
            };
            if open == 0 {
                break;
            }
            if used.contains(&fragment.id) || evidence.contains(&fragment.id) {
                continue;
            }
            if !fragment.is_subject_speech(&self.config.subject_roles) {
                debug!(fragment = %fragment.id, role = ?fragment.speaker_role, "Skipping non-subject speech");
                continue;
            }
            if reject.is_some_and(|term| fragment.excerpt.to_lowercase().contains(term)) {
                continue;
            }

            let snapshot = fragment.snapshot(self.config.excerpt_chars, method);
            match side {
                Side::Positive => {
                    used.insert(fragment.id);
                    evidence.positive.push(snapshot);
                }
                Side::Negative => evidence.negative.push(snapshot),
            }
            evidence.record(method);
        }
    }

    /// Fragment bodies for unused ids, in the given order. The relational
    /// store is read first; the native store fills in what it lacks.
    async fn load(&self, project_id: &str, ids: &[String], used: &HashSet<String>) -> Vec<Fragment> {
        let wanted: Vec<String> = ids.iter().filter(|id| !used.contains(*id)).cloned().collect();
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut found = fragments::get_fragments(self.stores.db, project_id, &wanted).unwrap_or_else(|e| {
            warn!(project_id, error = %e, "Relational fragment lookup failed");
            Vec::new()
        });

        if found.len() < wanted.len() {
            if let Some(session) = self.stores.graph {
                let missing: Vec<String> = wanted
                    .iter()
                    .filter(|id| !found.iter().any(|f| &f.id == *id))
                    .cloned()
                    .collect();
                match fetch_fragments(session, project_id, &missing).await {
                    Ok(more) => found.extend(more),
                    Err(e) => warn!(project_id, error = %e, "Native fragment lookup failed"),
                }
            }
        }

        found.sort_by_key(|f| wanted.iter().position(|id| *id == f.id).unwrap_or(usize::MAX));
        found
    }

    async fn cooccurring(&self, project_id: &str, left: &[String], right: &[String], limit: usize) -> Vec<String> {
        if let Some(session) = self.stores.graph {
            match cooccurrence_fragment_ids(session, project_id, left, right, limit).await {
                Ok(ids) if !ids.is_empty() => return ids,
                Ok(_) => {}
                Err(e) => warn!(project_id, error = %e, "Native co-occurrence lookup failed, using relational store"),
            }
        }
        fragments::cooccurrence_fragments(self.stores.db, project_id, left, right, limit).unwrap_or_else(|e| {
            warn!(project_id, error = %e, "Relational co-occurrence lookup failed");
            Vec::new()
        })
    }

    async fn contrasting(&self, project_id: &str, present: &[String], absent: &[String], limit: usize) -> Vec<String> {
        if let Some(session) = self.stores.graph {
            match contrast_fragment_ids(session, project_id, present, absent, limit).await {
                Ok(ids) if !ids.is_empty() => return ids,
                Ok(_) => {}
                Err(e) => warn!(project_id, error = %e, "Native contrast lookup failed, using relational store"),
            }
        }
        fragments::contrast_fragments(self.stores.db, project_id, present, absent, limit).unwrap_or_else(|e| {
            warn!(project_id, error = %e, "Relational contrast lookup failed");
            Vec::new()
        })
    }
}

fn fragment_from_hit(project_id: &str, hit: FragmentHit) -> Fragment {
    Fragment {
        id: hit.fragment_id,
        project_id: project_id.to_string(),
        source_document: hit.source_document.unwrap_or_default(),
        sequence_index: 0,
        speaker_role: hit.speaker_role,
        excerpt: hit.excerpt.unwrap_or_default(),
    }
}
