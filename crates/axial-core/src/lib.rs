//! Axial Core Library
//!
//! Data model and shared contracts for the Axial graph analytics engine:
//! coding-graph nodes and edges, merge-alias canonicalization, the ephemeral
//! adjacency index, suggestions, evidence packs and engine configuration.

pub mod adjacency;
pub mod algorithm;
pub mod canonical;
pub mod config;
pub mod error;
pub mod evidence;
pub mod fragment;
pub mod graph;
pub mod search;
pub mod suggestion;

pub use adjacency::AdjacencyIndex;
pub use algorithm::{
    AlgorithmName, AlgorithmParams, AlgorithmReport, AlgorithmRow, ClusterAlgorithm,
    ClusterParams, ClusterRow, ResolvedParams, Tier, TierEvent,
};
pub use canonical::{CanonicalIndex, CanonicalResolver, MergeRecord};
pub use config::EngineConfig;
pub use error::{AxialError, AxialResult};
pub use evidence::{
    distribute_quota, EvidenceMethod, EvidencePack, QuotaPair, QuotaReport, QuotaSummary,
    SuggestionEvidence,
};
pub use fragment::{Fragment, FragmentSnapshot};
pub use graph::{node_key, split_node_key, Edge, Node, NodeStatus, NodeType, RelationType};
pub use search::{FragmentHit, SemanticFallback};
pub use suggestion::{Confidence, EvidenceTier, GapReason, Suggestion, SuggestionMethod};
