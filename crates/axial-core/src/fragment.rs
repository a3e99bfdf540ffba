//! Text fragments and the truncated snapshots handed out as evidence.

use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceMethod;

/// An immutable excerpt of a source document, produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub project_id: String,
    pub source_document: String,
    pub sequence_index: i64,
    pub speaker_role: Option<String>,
    pub excerpt: String,
}

impl Fragment {
    /// Whether the fragment is attributed to one of the subject roles.
    ///
    /// Fragments without attribution are kept.
    pub fn is_subject_speech(&self, subject_roles: &[String]) -> bool {
        match self.speaker_role.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(role) => subject_roles.iter().any(|r| r.eq_ignore_ascii_case(role)),
        }
    }

    /// Produce an evidence snapshot truncated to `max_chars` characters.
    pub fn snapshot(&self, max_chars: usize, method: EvidenceMethod) -> FragmentSnapshot {
        let (excerpt, truncated) = truncate_chars(&self.excerpt, max_chars);
        FragmentSnapshot {
            fragment_id: self.id.clone(),
            source_document: self.source_document.clone(),
            sequence_index: self.sequence_index,
            speaker_role: self.speaker_role.clone(),
            excerpt,
            truncated,
            method,
        }
    }
}

/// A fragment as returned inside an evidence pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentSnapshot {
    pub fragment_id: String,
    pub source_document: String,
    pub sequence_index: i64,
    pub speaker_role: Option<String>,
    pub excerpt: String,
    pub truncated: bool,
    pub method: EvidenceMethod,
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (trimmed[..byte_idx].trim_end().to_string(), true),
        None => (trimmed.to_string(), false),
    }
}
